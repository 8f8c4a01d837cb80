//! Domain layer containing the session rules and value types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine trait)
//! - `conversation` - Messages and the append-only transcript
//! - `session` - Identity, connection state, stream phase and transport selection

pub mod conversation;
pub mod foundation;
pub mod session;
