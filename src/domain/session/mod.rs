//! Session domain module.
//!
//! Identity, connectivity and transport-selection rules for one chat session.

mod connection_state;
mod identity;
mod stream_phase;
mod transport;

pub use connection_state::ConnectionState;
pub use identity::SessionIdentity;
pub use stream_phase::StreamPhase;
pub use transport::{select_transport, TransportRoute};
