//! Conversation domain module.
//!
//! The visible conversation: immutable messages kept in an append-only transcript.

mod message;
mod transcript;

pub use message::{Message, Sender};
pub use transcript::Transcript;
