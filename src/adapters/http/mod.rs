//! HTTP adapter for the backend's request/response API.

mod chat_client;

pub use chat_client::HttpChatBackend;
