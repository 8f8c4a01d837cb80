//! In-memory streaming connector for tests.
//!
//! Each accepted connection is backed by a pair of unbounded channels. The test
//! side of a connection is a [`MockPeer`], which can push frames to the client,
//! read what the client wrote, and end the connection cleanly or with a failure.
//!
//! # Example
//!
//! ```ignore
//! let connector = MockStreamConnector::new();
//! connector.refuse("backend down");      // first attempt fails
//!
//! let handle = SessionController::spawn(settings, Arc::new(connector.clone()), backend);
//! // ... second attempt is accepted
//! let mut peer = connector.take_peer(0).unwrap();
//! peer.push_text(r#"{"response":"hi","timestamp":"2024-01-01T00:00:00Z"}"#);
//! ```

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{FutureExt, Sink, SinkExt, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::time::Instant;

use crate::ports::{StreamConnector, StreamLink, TransportError};

/// Record of one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub url: String,
    pub at: Instant,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
enum Scripted {
    Accept,
    Refuse(String),
    /// Accepted, but the peer never drains client writes.
    Stall,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<Scripted>,
    refuse_all: Option<String>,
    attempts: Vec<ConnectAttempt>,
    peers: Vec<Option<MockPeer>>,
}

/// Mock connector with scripted handshake outcomes.
///
/// With nothing scripted every attempt is accepted.
#[derive(Clone, Default)]
pub struct MockStreamConnector {
    inner: Arc<Mutex<Inner>>,
}

impl MockStreamConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a refused handshake.
    pub fn refuse(&self, reason: impl Into<String>) {
        self.lock().script.push_back(Scripted::Refuse(reason.into()));
    }

    /// Queues an accepted handshake whose outbound side never becomes ready,
    /// like a peer that stopped reading from a full socket.
    pub fn stall_writes(&self) {
        self.lock().script.push_back(Scripted::Stall);
    }

    /// Refuses every attempt until [`Self::stop_refusing`] is called.
    pub fn refuse_all(&self, reason: impl Into<String>) {
        self.lock().refuse_all = Some(reason.into());
    }

    pub fn stop_refusing(&self) {
        self.lock().refuse_all = None;
    }

    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.lock().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }

    /// Hands the test side of the `index`-th accepted connection to the caller.
    pub fn take_peer(&self, index: usize) -> Option<MockPeer> {
        self.lock().peers.get_mut(index).and_then(Option::take)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl StreamConnector for MockStreamConnector {
    async fn connect(&self, url: &str) -> Result<StreamLink, TransportError> {
        let mut inner = self.lock();
        let outcome = match inner.refuse_all.clone() {
            Some(reason) => Scripted::Refuse(reason),
            None => inner.script.pop_front().unwrap_or(Scripted::Accept),
        };
        inner.attempts.push(ConnectAttempt {
            url: url.to_string(),
            at: Instant::now(),
            accepted: !matches!(outcome, Scripted::Refuse(_)),
        });

        let stalled = match outcome {
            Scripted::Refuse(reason) => return Err(TransportError::connect(reason)),
            Scripted::Accept => false,
            Scripted::Stall => true,
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded::<Result<String, TransportError>>();
        inner.peers.push(Some(MockPeer {
            url: url.to_string(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        }));

        let stream = Box::pin(inbound_rx);
        if stalled {
            return Ok(StreamLink::new(Box::pin(StalledSink), stream));
        }
        let sink = outbound_tx.sink_map_err(|e| TransportError::closed(e.to_string()));
        Ok(StreamLink::new(Box::pin(sink), stream))
    }
}

/// Sink that never accepts, flushes or closes.
struct StalledSink;

impl Sink<String> for StalledSink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn start_send(self: Pin<&mut Self>, _item: String) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

/// Test side of one mock connection.
pub struct MockPeer {
    url: String,
    inbound: UnboundedSender<Result<String, TransportError>>,
    outbound: UnboundedReceiver<String>,
}

impl MockPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers a text frame to the client. Returns false once the client is gone.
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.inbound.unbounded_send(Ok(text.into())).is_ok()
    }

    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push_text(value.to_string())
    }

    /// Next frame the client wrote, waiting if necessary.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.outbound.next().await
    }

    /// Next frame the client wrote, if one is already queued.
    pub fn try_next_frame(&mut self) -> Option<String> {
        self.outbound.next().now_or_never().flatten()
    }

    /// Stops accepting client writes while keeping the inbound side open.
    pub fn stop_reading(&mut self) {
        self.outbound.close();
    }

    /// Ends the connection cleanly.
    pub fn close(self) {
        self.inbound.close_channel();
    }

    /// Ends the connection with a transport failure.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.inbound.unbounded_send(Err(TransportError::io(reason)));
    }
}
