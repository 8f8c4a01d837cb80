//! In-memory adapters for tests.

mod chat_backend;
mod stream_connector;

pub use chat_backend::MockChatBackend;
pub use stream_connector::{ConnectAttempt, MockPeer, MockStreamConnector};
