//! Application layer - Session orchestration.
//!
//! Coordinates the domain's stream phase machine and transport selection with
//! the ports. The [`SessionController`] actor is the only writer of session
//! state; everything else reports to it through events.

mod controller;
mod error;
mod events;
mod fallback;
pub(crate) mod reply_router;
mod snapshot;
mod state;
mod streaming_session;

pub use controller::{
    SessionController, SessionHandle, SessionSettings, REALTIME_FAILED_WARNING,
    SWITCH_FAILED_WARNING,
};
pub use error::SessionError;
pub use fallback::FallbackRequester;
pub use reply_router::SEND_FAILED_WARNING;
pub use snapshot::SessionSnapshot;
pub use state::{ExchangeId, PendingExchange};
