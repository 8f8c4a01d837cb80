//! Chatlink - Realtime chat session client
//!
//! Keeps a chat conversation connected to its backend. Messages travel over a
//! persistent WebSocket when one is open and over `POST /chat` otherwise;
//! dropped connections are retried every few seconds, and every reply is
//! matched to exactly one outgoing message.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
