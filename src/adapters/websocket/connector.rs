//! WebSocket implementation of the streaming transport port.
//!
//! Text frames pass through unchanged. Binary frames are accepted when they
//! hold UTF-8. Control frames are handled by tungstenite and never surface.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::ports::{StreamConnector, StreamLink, TransportError};

/// Opens streaming connections with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    handshake_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConnector {
    pub fn new() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Sets how long a handshake may take before the attempt counts as failed.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<StreamLink, TransportError> {
        let (socket, response) = tokio::time::timeout(self.handshake_timeout, connect_async(url))
            .await
            .map_err(|_| {
                TransportError::connect(format!(
                    "handshake timed out after {}s",
                    self.handshake_timeout.as_secs()
                ))
            })?
            .map_err(|e| TransportError::connect(e.to_string()))?;

        tracing::debug!(url, status = %response.status(), "WebSocket handshake complete");

        let (write, read) = socket.split();

        let sink = write
            .with(|text: String| future::ready(Ok::<_, WsError>(WsMessage::Text(text))))
            .sink_map_err(|e| TransportError::io(e.to_string()));

        let stream = read.filter_map(|item| {
            future::ready(match item {
                Ok(WsMessage::Text(text)) => Some(Ok(text)),
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        tracing::warn!("Dropping non-UTF-8 binary frame");
                        None
                    }
                },
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(?frame, "Peer sent close frame");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::io(e.to_string()))),
            })
        });

        Ok(StreamLink::new(Box::pin(sink), Box::pin(stream)))
    }
}
