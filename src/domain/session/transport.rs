//! Transport selection for outgoing messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StreamPhase;

/// The path a single send travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportRoute {
    /// Persistent streaming connection; the reply arrives asynchronously.
    Streaming,
    /// One-shot request/response exchange.
    Fallback,
}

impl fmt::Display for TransportRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportRoute::Streaming => "streaming",
            TransportRoute::Fallback => "fallback",
        };
        write!(f, "{}", s)
    }
}

/// Picks the route for a send given the streaming phase at send time.
///
/// Must be called once per send; the result is never cached because the
/// phase can change between messages.
pub fn select_transport(phase: StreamPhase) -> TransportRoute {
    if phase.accepts_outbound() {
        TransportRoute::Streaming
    } else {
        TransportRoute::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_stream_selects_streaming() {
        assert_eq!(select_transport(StreamPhase::Open), TransportRoute::Streaming);
    }

    #[test]
    fn every_other_phase_selects_fallback() {
        for phase in [
            StreamPhase::Idle,
            StreamPhase::Connecting,
            StreamPhase::ClosedRetry,
            StreamPhase::ClosedFinal,
        ] {
            assert_eq!(select_transport(phase), TransportRoute::Fallback, "{phase}");
        }
    }
}
