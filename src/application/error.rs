//! Errors returned by the session handle.

use thiserror::Error;

/// Why a session command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Another message is still awaiting its reply.
    #[error("a message is already awaiting its reply")]
    SendInProgress,

    /// The message text was empty or whitespace only.
    #[error("message text must not be empty")]
    EmptyMessage,

    /// A model switch request is already in flight.
    #[error("a model switch is already in progress")]
    SwitchInProgress,

    /// The controller has shut down.
    #[error("session is closed")]
    Closed,
}
