//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the session core and the outside world. Adapters implement these ports.
//!
//! - `StreamConnector` - Opens the persistent streaming connection
//! - `stream_protocol` - Frame types spoken over that connection
//! - `ChatBackend` - Request/response endpoints (fallback reply, models, stats)

mod chat_backend;
pub mod stream_protocol;
mod stream_transport;

pub use chat_backend::{
    ApiError, ChatBackend, ChatReply, ChatRequest, CurrentModel, ModelSwitchOutcome,
    ModelSwitchRequest,
};
pub use stream_protocol::{parse_inbound, FrameError, InboundFrame, Notice, OutboundFrame, ReplyFrame};
pub use stream_transport::{FrameSink, FrameStream, StreamConnector, StreamLink, TransportError};
