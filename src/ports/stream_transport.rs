//! Streaming transport port - Interface for the persistent bidirectional connection.
//!
//! A connector opens one connection and hands back its two halves. The sink
//! accepts serialized text frames; the stream yields inbound text frames until
//! the peer closes cleanly (stream ends) or the transport fails (an `Err` item).
//!
//! # Example
//!
//! ```ignore
//! struct LoopbackConnector;
//!
//! #[async_trait]
//! impl StreamConnector for LoopbackConnector {
//!     async fn connect(&self, url: &str) -> Result<StreamLink, TransportError> {
//!         let (tx, rx) = futures::channel::mpsc::unbounded();
//!         Ok(StreamLink::new(
//!             Box::pin(tx.sink_map_err(|e| TransportError::closed(e.to_string()))),
//!             Box::pin(rx.map(Ok)),
//!         ))
//!     }
//! }
//! ```

use async_trait::async_trait;
use futures::{Sink, Stream};
use std::pin::Pin;
use thiserror::Error;

/// Outbound half of a live connection.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a live connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Both halves of one established connection.
pub struct StreamLink {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl StreamLink {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    /// Splits the link into its sink and stream.
    pub fn into_parts(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }
}

/// Port for opening streaming connections.
///
/// Implementations: WebSocket (production), in-memory mock (tests).
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Opens a connection to `url`, completing once the handshake succeeds.
    async fn connect(&self, url: &str) -> Result<StreamLink, TransportError>;
}

/// Errors raised by a streaming transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The handshake could not be completed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection is already gone.
    #[error("connection closed: {0}")]
    Closed(String),

    /// Network-level failure on a live connection.
    #[error("transport failure: {0}")]
    Io(String),

    /// The peer violated the framing protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::Closed(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_prefixed_by_kind() {
        assert_eq!(
            TransportError::connect("refused").to_string(),
            "connection failed: refused"
        );
        assert_eq!(TransportError::io("reset").to_string(), "transport failure: reset");
    }
}
