//! SessionController - Single owner of all session state.
//!
//! The controller runs as one tokio task fed by two channels:
//!
//! - **commands** from presentation code (send, dismiss, switch model, shutdown)
//! - **events** from the I/O tasks it spawned (connect results, inbound frames,
//!   closures, reconnect timer, fallback and model-switch completions)
//!
//! Every mutation of connection state, the pending exchange, the warning and
//! the transcript happens inside this task. After each command or event a fresh
//! [`SessionSnapshot`] is published on a `watch` channel, which is the only way
//! presentation code observes the session.
//!
//! # Example
//!
//! ```ignore
//! let handle = SessionController::spawn(settings, connector, backend);
//! handle.send_message("hello").await?;
//! let snapshot = handle.wait_for(|s| !s.pending).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::error::SessionError;
use super::events::{EventReceiver, EventSender, SessionEvent};
use super::fallback::FallbackRequester;
use super::reply_router::{self, ReplySource};
use super::snapshot::SessionSnapshot;
use super::state::{ConversationState, ExchangeId, PendingExchange};
use super::streaming_session::{Lifecycle, StreamingSession};
use crate::domain::conversation::Message;
use crate::domain::foundation::{ConversationId, MessageId};
use crate::domain::session::{select_transport, SessionIdentity, TransportRoute};
use crate::ports::{
    parse_inbound, ApiError, ChatBackend, InboundFrame, ModelSwitchOutcome, ModelSwitchRequest,
    OutboundFrame, StreamConnector,
};

/// Warning shown while the streaming connection is unavailable.
pub const REALTIME_FAILED_WARNING: &str =
    "Real-time connection failed. Falling back to HTTP API.";

/// Warning shown when a model switch request cannot be completed.
pub const SWITCH_FAILED_WARNING: &str = "Failed to switch model. Please try again.";

/// Settings for one session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Streaming base address; the conversation id is appended as a path segment.
    pub stream_base: String,
    pub reconnect_delay: Duration,
    pub command_buffer: usize,
}

impl SessionSettings {
    pub fn new(stream_base: impl Into<String>) -> Self {
        Self {
            stream_base: stream_base.into(),
            reconnect_delay: Duration::from_secs(5),
            command_buffer: 32,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }

    fn stream_url(&self, conversation_id: &ConversationId) -> String {
        format!("{}/{}", self.stream_base.trim_end_matches('/'), conversation_id)
    }
}

enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<Result<MessageId, SessionError>>,
    },
    DismissWarning,
    SwitchModel {
        request: ModelSwitchRequest,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle used by presentation code.
#[derive(Clone)]
pub struct SessionHandle {
    conversation_id: ConversationId,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Sends a user message through whichever transport is live.
    ///
    /// Returns once the message is dispatched, not when the reply arrives.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage` if the text is blank
    /// - `SendInProgress` if an earlier message still awaits its reply
    /// - `Closed` if the session has shut down
    pub async fn send_message(&self, text: impl Into<String>) -> Result<MessageId, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send {
            text: text.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn dismiss_warning(&self) -> Result<(), SessionError> {
        self.command(Command::DismissWarning).await
    }

    /// Starts a model switch. The outcome shows up in later snapshots.
    pub async fn switch_model(
        &self,
        provider: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::SwitchModel {
            request: ModelSwitchRequest::new(provider, model_name),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Tears the session down and waits for the controller to finish.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (done, rx) = oneshot::channel();
        self.command(Command::Shutdown { done }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    async fn command(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Owns the streaming session, the conversation state and every spawned task.
pub struct SessionController {
    identity: SessionIdentity,
    stream: StreamingSession,
    fallback: FallbackRequester,
    backend: Arc<dyn ChatBackend>,
    state: ConversationState,
    next_exchange: ExchangeId,
    tasks: Vec<JoinHandle<()>>,
    events: EventSender,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Starts a session on the current tokio runtime and returns its handle.
    ///
    /// A fresh conversation id is generated and the first streaming connection
    /// attempt begins immediately.
    pub fn spawn(
        settings: SessionSettings,
        connector: Arc<dyn StreamConnector>,
        backend: Arc<dyn ChatBackend>,
    ) -> SessionHandle {
        let identity = SessionIdentity::generate();
        let conversation_id = identity.conversation_id();

        let (command_tx, command_rx) = mpsc::channel(settings.command_buffer.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::initial(conversation_id));

        let stream = StreamingSession::new(
            connector,
            settings.stream_url(&conversation_id),
            settings.reconnect_delay,
            event_tx.clone(),
        );
        let controller = Self {
            identity,
            stream,
            fallback: FallbackRequester::new(Arc::clone(&backend)),
            backend,
            state: ConversationState::default(),
            next_exchange: ExchangeId::first(),
            tasks: Vec::new(),
            events: event_tx,
            snapshots: snapshot_tx,
        };

        let span = tracing::info_span!("session", conversation_id = %conversation_id);
        tokio::spawn(controller.run(command_rx, event_rx).instrument(span));

        SessionHandle {
            conversation_id,
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut events: EventReceiver) {
        tracing::info!(url = %self.stream.url(), "Session started");
        self.stream.start();
        self.publish();

        loop {
            let published = tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { done }) => {
                        self.shutdown().await;
                        self.publish();
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All handles dropped");
                        self.shutdown().await;
                        self.publish();
                        break;
                    }
                },
                Some(event) = events.recv() => {
                    self.handle_event(event);
                    false
                }
            };
            if !published {
                self.publish();
            }
        }
    }

    /// Applies one command. Returns true if the snapshot was already published.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            // Callers see the snapshot reflecting their command once it returns.
            Command::Send { text, reply } => {
                let result = self.send(text);
                self.publish();
                let _ = reply.send(result);
                true
            }
            Command::DismissWarning => {
                self.state.warning = None;
                false
            }
            Command::SwitchModel { request, reply } => {
                let result = self.switch_model(request);
                self.publish();
                let _ = reply.send(result);
                true
            }
            Command::Shutdown { .. } => false,
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StreamConnected { epoch, link } => {
                let change = self.stream.on_connected(epoch, link);
                self.apply(change);
            }
            SessionEvent::StreamConnectFailed { epoch, error } => {
                let change = self.stream.on_connect_failed(epoch, error);
                self.apply(change);
            }
            SessionEvent::Inbound { epoch, text } => self.on_inbound(epoch, &text),
            SessionEvent::StreamClosed { epoch, cause } => {
                let change = self.stream.on_closed(epoch, cause);
                self.apply(change);
            }
            SessionEvent::ReconnectDue { epoch } => self.stream.on_reconnect_due(epoch),
            SessionEvent::FallbackCompleted { exchange, result } => match result {
                Ok(reply) => {
                    reply_router::route_reply(&mut self.state, ReplySource::Fallback(exchange), reply);
                }
                Err(error) => {
                    reply_router::route_fallback_failure(&mut self.state, exchange, &error);
                }
            },
            SessionEvent::ModelSwitchCompleted { request, result } => {
                self.on_model_switched(request, result)
            }
        }
    }

    fn send(&mut self, text: String) -> Result<MessageId, SessionError> {
        if self.state.pending.is_some() {
            return Err(SessionError::SendInProgress);
        }
        let message = Message::user(text.as_str()).map_err(|_| SessionError::EmptyMessage)?;
        let id = *message.id();

        self.state.warning = None;
        self.state.transcript.append(message);
        let exchange = self.take_exchange_id();

        match select_transport(self.stream.phase()) {
            TransportRoute::Streaming => {
                tracing::debug!(exchange = %exchange, "Sending over stream");
                self.state.pending = Some(PendingExchange::new(
                    exchange,
                    TransportRoute::Streaming,
                    text.as_str(),
                ));
                let frame = OutboundFrame::new(text, &self.identity.conversation_id());
                if self.stream.send(&frame).is_err() {
                    self.apply(Some(Lifecycle::Dropped { clean: false }));
                }
            }
            TransportRoute::Fallback => self.dispatch_fallback(exchange, text),
        }
        Ok(id)
    }

    fn dispatch_fallback(&mut self, exchange: ExchangeId, text: String) {
        tracing::debug!(exchange = %exchange, "Sending over fallback");
        self.state.pending = Some(PendingExchange::new(
            exchange,
            TransportRoute::Fallback,
            text.as_str(),
        ));

        let requester = self.fallback.clone();
        let conversation_id = self.identity.conversation_id();
        let events = self.events.clone();
        self.track(tokio::spawn(async move {
            let result = requester.request_reply(&text, &conversation_id).await;
            let _ = events.send(SessionEvent::FallbackCompleted { exchange, result });
        }));
    }

    fn on_inbound(&mut self, epoch: u64, text: &str) {
        if !self.stream.is_live(epoch) {
            tracing::debug!(epoch, "Discarding frame from replaced connection");
            return;
        }
        match parse_inbound(text) {
            Ok(InboundFrame::Reply(frame)) => {
                let reply = reply_router::streamed_message(frame);
                reply_router::route_reply(&mut self.state, ReplySource::Streaming, reply);
            }
            Ok(InboundFrame::Notice(notice)) => reply_router::observe_notice(&notice),
            Err(error) => tracing::warn!(epoch, error = %error, "Dropping malformed frame"),
        }
    }

    fn apply(&mut self, change: Option<Lifecycle>) {
        match change {
            Some(Lifecycle::Opened) => self.state.warning = None,
            Some(Lifecycle::ConnectFailed) => {
                self.state.warning = Some(REALTIME_FAILED_WARNING.to_string());
            }
            Some(Lifecycle::Dropped { clean }) => {
                if !clean {
                    self.state.warning = Some(REALTIME_FAILED_WARNING.to_string());
                }
                self.redispatch_streaming_exchange();
            }
            None => {}
        }
    }

    /// Moves a send that was waiting on the dropped stream to the fallback path.
    fn redispatch_streaming_exchange(&mut self) {
        if !self.state.is_awaiting(TransportRoute::Streaming) {
            return;
        }
        if let Some(pending) = self.state.pending.take() {
            tracing::info!(exchange = %pending.id, "Resending in-flight message over fallback");
            self.dispatch_fallback(pending.id, pending.text);
        }
    }

    fn switch_model(&mut self, request: ModelSwitchRequest) -> Result<(), SessionError> {
        if self.state.model_switching {
            return Err(SessionError::SwitchInProgress);
        }
        self.state.model_switching = true;
        tracing::info!(provider = %request.provider, model = %request.model_name, "Switching model");

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        self.track(tokio::spawn(async move {
            let result = backend.switch_model(request.clone()).await;
            let _ = events.send(SessionEvent::ModelSwitchCompleted { request, result });
        }));
        Ok(())
    }

    fn on_model_switched(
        &mut self,
        request: ModelSwitchRequest,
        result: Result<ModelSwitchOutcome, ApiError>,
    ) {
        self.state.model_switching = false;
        match result {
            Ok(outcome) if outcome.success => {
                let current = outcome.current_model.unwrap_or(request.model_name);
                tracing::info!(model = %current, "Model switched");
                self.state
                    .transcript
                    .append(Message::system(format!("Switched to {}", current)));
                self.state.warning = None;
            }
            Ok(outcome) => {
                let reason = outcome.message.unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!(reason = %reason, "Model switch rejected");
                self.state.warning = Some(format!("Failed to switch model: {}", reason));
            }
            Err(error) => {
                tracing::warn!(error = %error, "Model switch request failed");
                self.state.warning = Some(SWITCH_FAILED_WARNING.to_string());
            }
        }
    }

    async fn shutdown(&mut self) {
        self.stream.shutdown().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(pending) = self.state.pending.take() {
            tracing::debug!(exchange = %pending.id, "Abandoning in-flight message");
        }
        self.state.model_switching = false;
        tracing::info!("Session stopped");
    }

    fn take_exchange_id(&mut self) -> ExchangeId {
        let id = self.next_exchange;
        self.next_exchange = id.next();
        id
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    fn publish(&self) {
        let pending = self.state.pending.as_ref();
        self.snapshots.send_replace(SessionSnapshot {
            conversation_id: self.identity.conversation_id(),
            connection: self.stream.connection(),
            stream_phase: self.stream.phase(),
            messages: self.state.transcript.as_slice().to_vec(),
            pending: pending.is_some(),
            pending_route: pending.map(|p| p.route),
            warning: self.state.warning.clone(),
            model_switching: self.state.model_switching,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_appends_conversation_id() {
        let id: ConversationId = "6f1c1f7e-5d55-4c43-9a39-2b8f8f0b6f10".parse().unwrap();
        let settings = SessionSettings::new("ws://localhost:8000/stream/");
        assert_eq!(
            settings.stream_url(&id),
            "ws://localhost:8000/stream/6f1c1f7e-5d55-4c43-9a39-2b8f8f0b6f10"
        );
    }

    #[test]
    fn settings_default_to_five_second_reconnect() {
        let settings = SessionSettings::new("ws://x");
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
        assert_eq!(settings.with_command_buffer(0).command_buffer, 1);
    }
}
