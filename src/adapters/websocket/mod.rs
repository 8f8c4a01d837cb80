//! WebSocket adapter for the streaming endpoint.

mod connector;

pub use connector::WsConnector;
