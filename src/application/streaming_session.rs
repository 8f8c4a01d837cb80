//! StreamingSession - Lifecycle of the persistent streaming connection.
//!
//! Owns the one live transport handle and drives the stream phase machine:
//!
//! ```text
//! Idle → Connecting → Open → Closed(retry) → Connecting → …
//!            │                     ▲
//!            └─────────────────────┘   (handshake failure)
//! any non-final phase → Closed(final)  (shutdown only)
//! ```
//!
//! The session never blocks the controller on I/O. Connecting, reading, writing
//! and the reconnect timer each run in a spawned task that reports back through
//! the event channel. Outbound frames are queued to the writer task, so a peer
//! that stops draining the socket cannot stall the caller. Every connection
//! attempt bumps the epoch, and callbacks carrying an older epoch are ignored,
//! so a replaced connection can never change state.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{CloseCause, EventSender, SessionEvent};
use crate::domain::foundation::StateMachine;
use crate::domain::session::{ConnectionState, StreamPhase};
use crate::ports::{FrameSink, FrameStream, OutboundFrame, StreamConnector, StreamLink, TransportError};

/// How long shutdown waits for the writer to flush and close the connection.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Connection-level change the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    /// Handshake succeeded.
    Opened,
    /// Handshake failed; a reconnect is scheduled.
    ConnectFailed,
    /// A live connection went away; a reconnect is scheduled.
    Dropped { clean: bool },
}

pub(crate) struct StreamingSession {
    connector: Arc<dyn StreamConnector>,
    url: String,
    reconnect_delay: Duration,
    phase: StreamPhase,
    connection: ConnectionState,
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    connect_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    events: EventSender,
}

impl StreamingSession {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        url: String,
        reconnect_delay: Duration,
        events: EventSender,
    ) -> Self {
        Self {
            connector,
            url,
            reconnect_delay,
            phase: StreamPhase::Idle,
            connection: ConnectionState::Disconnected,
            epoch: 0,
            outbound: None,
            connect_task: None,
            reader_task: None,
            writer_task: None,
            reconnect_timer: None,
            events,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether an inbound frame tagged `epoch` belongs to the live connection.
    pub fn is_live(&self, epoch: u64) -> bool {
        epoch == self.epoch && self.phase == StreamPhase::Open
    }

    /// Makes the first connection attempt.
    pub fn start(&mut self) {
        if self.phase == StreamPhase::Idle {
            self.begin_connect();
        }
    }

    pub fn on_connected(&mut self, epoch: u64, link: StreamLink) -> Option<Lifecycle> {
        if epoch != self.epoch || self.phase != StreamPhase::Connecting {
            tracing::debug!(epoch, current = self.epoch, "Discarding connection from stale attempt");
            return None;
        }
        self.connect_task = None;
        if !self.enter(StreamPhase::Open) {
            return None;
        }

        let (sink, stream) = link.into_parts();
        let (outbound, queued) = mpsc::unbounded_channel();
        self.outbound = Some(outbound);
        self.writer_task = Some(tokio::spawn(pump_outbound(sink, queued, epoch, self.events.clone())));
        self.reader_task = Some(tokio::spawn(pump_inbound(stream, epoch, self.events.clone())));
        self.connection = ConnectionState::Connected;

        tracing::info!(epoch, url = %self.url, "Streaming connection open");
        Some(Lifecycle::Opened)
    }

    pub fn on_connect_failed(&mut self, epoch: u64, error: TransportError) -> Option<Lifecycle> {
        if epoch != self.epoch || self.phase != StreamPhase::Connecting {
            return None;
        }
        self.connect_task = None;
        if !self.enter(StreamPhase::ClosedRetry) {
            return None;
        }
        self.connection = ConnectionState::Error;

        tracing::warn!(epoch, url = %self.url, error = %error, "Streaming connection failed");
        self.schedule_reconnect();
        Some(Lifecycle::ConnectFailed)
    }

    pub fn on_closed(&mut self, epoch: u64, cause: CloseCause) -> Option<Lifecycle> {
        if !self.is_live(epoch) {
            return None;
        }
        let clean = cause == CloseCause::Clean;
        match cause {
            CloseCause::Clean => tracing::info!(epoch, "Streaming connection closed"),
            CloseCause::Failure(error) => {
                tracing::warn!(epoch, error = %error, "Streaming connection lost")
            }
        }
        Some(self.drop_connection(clean))
    }

    pub fn on_reconnect_due(&mut self, epoch: u64) {
        if epoch != self.epoch || self.phase != StreamPhase::ClosedRetry {
            return;
        }
        self.reconnect_timer = None;
        tracing::debug!(epoch, "Reconnecting");
        self.begin_connect();
    }

    /// Queues one frame for the live connection's writer.
    ///
    /// Returns once the frame is queued. A write that later fails arrives as a
    /// `StreamClosed` failure event. If the writer is already gone the
    /// connection is torn down (`Closed(retry)`, error) and a reconnect is
    /// scheduled before the error is returned.
    pub fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if !self.phase.accepts_outbound() {
            return Err(TransportError::closed(format!("stream is {}", self.phase)));
        }
        let payload = frame
            .to_json()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        let Some(outbound) = self.outbound.as_ref() else {
            return Err(TransportError::closed("no live connection"));
        };

        if outbound.send(payload).is_err() {
            tracing::warn!(epoch = self.epoch, "Streaming writer is gone");
            self.drop_connection(false);
            return Err(TransportError::closed("writer stopped"));
        }
        Ok(())
    }

    /// Final teardown: cancels the reconnect timer and all I/O tasks and
    /// releases the transport handle.
    ///
    /// The writer gets [`CLOSE_GRACE`] to flush queued frames and close the
    /// connection before it is aborted.
    pub async fn shutdown(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        for task in [
            self.connect_task.take(),
            self.reader_task.take(),
            self.reconnect_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        self.outbound = None;
        if let Some(mut writer) = self.writer_task.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                tracing::debug!("Writer did not close in time, aborting");
                writer.abort();
            }
        }
        self.epoch += 1;
        self.enter(StreamPhase::ClosedFinal);
        self.connection = ConnectionState::Disconnected;
        tracing::info!(url = %self.url, "Streaming session shut down");
    }

    fn begin_connect(&mut self) {
        if !self.enter(StreamPhase::Connecting) {
            return;
        }
        self.epoch += 1;
        let epoch = self.epoch;
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let events = self.events.clone();

        tracing::debug!(epoch, url = %url, "Opening streaming connection");
        self.connect_task = Some(tokio::spawn(async move {
            let event = match connector.connect(&url).await {
                Ok(link) => SessionEvent::StreamConnected { epoch, link },
                Err(error) => SessionEvent::StreamConnectFailed { epoch, error },
            };
            let _ = events.send(event);
        }));
    }

    fn drop_connection(&mut self, clean: bool) -> Lifecycle {
        for task in [self.reader_task.take(), self.writer_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
        self.outbound = None;
        self.enter(StreamPhase::ClosedRetry);
        self.connection = if clean {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Error
        };
        self.schedule_reconnect();
        Lifecycle::Dropped { clean }
    }

    fn schedule_reconnect(&mut self) {
        if let Some(previous) = self.reconnect_timer.take() {
            previous.abort();
        }
        let epoch = self.epoch;
        let delay = self.reconnect_delay;
        let events = self.events.clone();

        tracing::debug!(epoch, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::ReconnectDue { epoch });
        }));
    }

    fn enter(&mut self, next: StreamPhase) -> bool {
        match self.phase.transition_to(next) {
            Ok(phase) => {
                self.phase = phase;
                true
            }
            Err(error) => {
                tracing::warn!(from = %self.phase, to = %next, error = %error, "Rejected stream phase change");
                false
            }
        }
    }
}

/// Writes queued frames until the queue closes or a write fails, then closes
/// the sink.
async fn pump_outbound(
    mut sink: FrameSink,
    mut queued: mpsc::UnboundedReceiver<String>,
    epoch: u64,
    events: EventSender,
) {
    while let Some(payload) = queued.recv().await {
        if let Err(error) = sink.send(payload).await {
            tracing::warn!(epoch, error = %error, "Streaming write failed");
            let _ = events.send(SessionEvent::StreamClosed {
                epoch,
                cause: CloseCause::Failure(error),
            });
            return;
        }
    }
    if let Err(error) = sink.close().await {
        tracing::debug!(epoch, error = %error, "Ignoring error while closing stream");
    }
}

/// Forwards inbound frames until the stream ends or fails.
async fn pump_inbound(mut stream: FrameStream, epoch: u64, events: EventSender) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                if events.send(SessionEvent::Inbound { epoch, text }).is_err() {
                    return;
                }
            }
            Err(error) => {
                let _ = events.send(SessionEvent::StreamClosed {
                    epoch,
                    cause: CloseCause::Failure(error),
                });
                return;
            }
        }
    }
    let _ = events.send(SessionEvent::StreamClosed {
        epoch,
        cause: CloseCause::Clean,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockStreamConnector;
    use crate::domain::foundation::ConversationId;

    fn session(
        connector: &MockStreamConnector,
    ) -> (StreamingSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = StreamingSession::new(
            Arc::new(connector.clone()),
            "ws://test/stream/abc".to_string(),
            Duration::from_secs(5),
            tx,
        );
        (session, rx)
    }

    async fn drive_connect(
        session: &mut StreamingSession,
        rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Option<Lifecycle> {
        match rx.recv().await {
            Some(SessionEvent::StreamConnected { epoch, link }) => session.on_connected(epoch, link),
            Some(SessionEvent::StreamConnectFailed { epoch, error }) => {
                session.on_connect_failed(epoch, error)
            }
            _ => panic!("expected a connect result"),
        }
    }

    #[tokio::test]
    async fn start_connects_and_opens() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);

        session.start();
        assert_eq!(session.phase(), StreamPhase::Connecting);

        let change = drive_connect(&mut session, &mut rx).await;
        assert_eq!(change, Some(Lifecycle::Opened));
        assert_eq!(session.phase(), StreamPhase::Open);
        assert_eq!(session.connection(), ConnectionState::Connected);
        assert_eq!(connector.attempts()[0].url, "ws://test/stream/abc");
    }

    #[tokio::test]
    async fn refused_handshake_moves_to_retry_with_error() {
        let connector = MockStreamConnector::new();
        connector.refuse("refused");
        let (mut session, mut rx) = session(&connector);

        session.start();
        let change = drive_connect(&mut session, &mut rx).await;

        assert_eq!(change, Some(Lifecycle::ConnectFailed));
        assert_eq!(session.phase(), StreamPhase::ClosedRetry);
        assert_eq!(session.connection(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn send_is_refused_unless_open() {
        let connector = MockStreamConnector::new();
        let (mut session, _rx) = session(&connector);
        let frame = OutboundFrame::new("hi", &ConversationId::new());

        let result = session.send(&frame);
        assert!(matches!(result, Err(TransportError::Closed(_))));
    }

    #[tokio::test]
    async fn send_writes_json_frame() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;
        let mut peer = connector.take_peer(0).unwrap();

        let id = ConversationId::new();
        session.send(&OutboundFrame::new("hello", &id)).unwrap();

        let frame: serde_json::Value = serde_json::from_str(&peer.next_frame().await.unwrap()).unwrap();
        assert_eq!(frame["message"], "hello");
        assert_eq!(frame["conversation_id"], id.to_string());
    }

    #[tokio::test]
    async fn stale_close_is_ignored() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;

        assert_eq!(session.on_closed(0, CloseCause::Clean), None);
        assert_eq!(session.phase(), StreamPhase::Open);
    }

    #[tokio::test]
    async fn clean_close_disconnects() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;
        connector.take_peer(0).unwrap().close();

        let Some(SessionEvent::StreamClosed { epoch, cause }) = rx.recv().await else {
            panic!("expected close");
        };
        assert_eq!(
            session.on_closed(epoch, cause),
            Some(Lifecycle::Dropped { clean: true })
        );
        assert_eq!(session.phase(), StreamPhase::ClosedRetry);
        assert_eq!(session.connection(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn rejected_write_is_reported_as_failure() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;
        let mut peer = connector.take_peer(0).unwrap();
        peer.stop_reading();

        session.send(&OutboundFrame::new("lost", &ConversationId::new())).unwrap();

        let Some(SessionEvent::StreamClosed { epoch, cause }) = rx.recv().await else {
            panic!("expected close");
        };
        assert!(matches!(cause, CloseCause::Failure(_)));
        assert_eq!(
            session.on_closed(epoch, cause),
            Some(Lifecycle::Dropped { clean: false })
        );
        assert_eq!(session.connection(), ConnectionState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_writer_neither_blocks_send_nor_shutdown() {
        let connector = MockStreamConnector::new();
        connector.stall_writes();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;

        let frame = OutboundFrame::new("stuck", &ConversationId::new());
        session.send(&frame).unwrap();
        session.send(&frame).unwrap();

        let started = tokio::time::Instant::now();
        session.shutdown().await;
        assert!(started.elapsed() <= CLOSE_GRACE);
        assert_eq!(session.phase(), StreamPhase::ClosedFinal);
    }

    #[tokio::test]
    async fn shutdown_is_final() {
        let connector = MockStreamConnector::new();
        let (mut session, mut rx) = session(&connector);
        session.start();
        drive_connect(&mut session, &mut rx).await;

        session.shutdown().await;
        assert_eq!(session.phase(), StreamPhase::ClosedFinal);
        assert_eq!(session.connection(), ConnectionState::Disconnected);

        session.on_reconnect_due(1);
        assert_eq!(session.phase(), StreamPhase::ClosedFinal);
    }
}
