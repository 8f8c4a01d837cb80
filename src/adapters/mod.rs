//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the session core to external systems:
//! - `websocket` - Streaming connector (tokio-tungstenite)
//! - `http` - Request/response backend client (reqwest)
//! - `mock` - In-memory connector and backend for tests

pub mod http;
pub mod mock;
pub mod websocket;

pub use http::HttpChatBackend;
pub use mock::{MockChatBackend, MockStreamConnector};
pub use websocket::WsConnector;
