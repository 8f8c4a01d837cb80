//! Lifecycle phase of the streaming connection.
//!
//! ```text
//! Idle ──start──▶ Connecting ──handshake ok──▶ Open
//!                    ▲   │                       │
//!          timer(5s) │   │ handshake failed      │ closed / error
//!                    │   ▼                       ▼
//!                 ClosedRetry ◀──────────────────┘
//!
//! any non-final ──shutdown──▶ ClosedFinal (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Phase of the streaming session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Closed unsolicited; a reconnect is scheduled.
    ClosedRetry,
    /// Torn down explicitly; nothing will reopen it.
    ClosedFinal,
}

impl StreamPhase {
    /// Whether outbound frames may be written on the streaming path.
    pub fn accepts_outbound(&self) -> bool {
        matches!(self, StreamPhase::Open)
    }
}

impl StateMachine for StreamPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StreamPhase::*;
        matches!(
            (self, target),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, ClosedRetry)
                | (Open, ClosedRetry)
                | (ClosedRetry, Connecting)
                | (Idle, ClosedFinal)
                | (Connecting, ClosedFinal)
                | (Open, ClosedFinal)
                | (ClosedRetry, ClosedFinal)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use StreamPhase::*;
        match self {
            Idle => vec![Connecting, ClosedFinal],
            Connecting => vec![Open, ClosedRetry, ClosedFinal],
            Open => vec![ClosedRetry, ClosedFinal],
            ClosedRetry => vec![Connecting, ClosedFinal],
            ClosedFinal => vec![],
        }
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamPhase::Idle => "Idle",
            StreamPhase::Connecting => "Connecting",
            StreamPhase::Open => "Open",
            StreamPhase::ClosedRetry => "Closed(retry)",
            StreamPhase::ClosedFinal => "Closed(final)",
        };
        write!(f, "{}", s)
    }
}
