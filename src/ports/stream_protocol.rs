//! Frame types for the streaming endpoint.
//!
//! Defines the protocol between the client and the backend:
//! - Client → Server: `{message, conversation_id}`
//! - Server → Client: replies `{response, timestamp}` and typed notifications
//!   `{type: "system" | "status" | "ping", ...}`

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ConversationId;

// ============================================
// Client → Server
// ============================================

/// A user message sent over the streaming connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub message: String,
    pub conversation_id: String,
}

impl OutboundFrame {
    pub fn new(message: impl Into<String>, conversation_id: &ConversationId) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.to_string(),
        }
    }

    /// Serializes the frame to its JSON text form.
    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::from)
    }
}

// ============================================
// Server → Client
// ============================================

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Reply content for the conversation.
    Reply(ReplyFrame),
    /// Notification that is observed but never shown as a message.
    Notice(Notice),
}

/// Reply content pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFrame {
    pub response: String,
    pub timestamp: Option<String>,
    pub conversation_id: Option<String>,
}

/// Typed notifications carried by the `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// `{type: "system", message}` such as the welcome banner.
    System { message: String },
    /// `{type: "status", data}` broadcast by the backend.
    Status { data: serde_json::Value },
    /// `{type: "ping"}` connectivity check.
    Ping,
}

/// Why an inbound payload was rejected.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown frame type '{0}'")]
    UnknownType(String),

    #[error("frame of type '{kind}' is missing '{field}'")]
    MissingField { kind: &'static str, field: &'static str },

    #[error("frame has neither a type nor reply content")]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    response: Option<String>,
    timestamp: Option<String>,
    conversation_id: Option<String>,
    data: Option<serde_json::Value>,
}

/// Parses one inbound text payload.
///
/// A frame with a `type` discriminator is a notification; a frame without one
/// is a reply iff it carries a `response` field.
pub fn parse_inbound(text: &str) -> Result<InboundFrame, FrameError> {
    let raw: RawInbound = serde_json::from_str(text)?;

    match raw.kind.as_deref() {
        Some("system") => {
            let message = raw.message.ok_or(FrameError::MissingField {
                kind: "system",
                field: "message",
            })?;
            Ok(InboundFrame::Notice(Notice::System { message }))
        }
        Some("status") => Ok(InboundFrame::Notice(Notice::Status {
            data: raw.data.unwrap_or(serde_json::Value::Null),
        })),
        Some("ping") => Ok(InboundFrame::Notice(Notice::Ping)),
        Some(other) => Err(FrameError::UnknownType(other.to_string())),
        None => match raw.response {
            Some(response) => Ok(InboundFrame::Reply(ReplyFrame {
                response,
                timestamp: raw.timestamp,
                conversation_id: raw.conversation_id,
            })),
            None => Err(FrameError::Unrecognized),
        },
    }
}
