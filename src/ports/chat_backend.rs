//! Chat backend port - Interface for the request/response endpoints.
//!
//! Covers the fallback reply endpoint (`POST /chat`) used when no streaming
//! connection is live, plus the auxiliary read endpoints and model switching.
//!
//! # Example
//!
//! ```ignore
//! let reply = backend
//!     .send_chat(ChatRequest::new("ping", &conversation_id))
//!     .await?;
//! println!("{} @ {}", reply.response, reply.timestamp);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ConversationId;

/// Port for the backend's request/response API.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one message and returns the matching reply.
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError>;

    /// Returns service statistics (`GET /stats`).
    async fn fetch_stats(&self) -> Result<serde_json::Value, ApiError>;

    /// Returns the model catalogue (`GET /models`).
    async fn list_models(&self) -> Result<serde_json::Value, ApiError>;

    /// Returns the active model (`GET /models/current`).
    async fn current_model(&self) -> Result<CurrentModel, ApiError>;

    /// Switches the active model (`POST /models/switch`).
    async fn switch_model(&self, request: ModelSwitchRequest)
        -> Result<ModelSwitchOutcome, ApiError>;
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: &ConversationId) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.to_string(),
        }
    }
}

/// Successful response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response of `GET /models/current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentModel {
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub model_info: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

impl CurrentModel {
    /// Human-friendly name, preferring `model_info.display_name`.
    pub fn display_name(&self) -> &str {
        self.model_info
            .as_ref()
            .and_then(|info| info.get("display_name"))
            .and_then(|name| name.as_str())
            .unwrap_or(&self.model_name)
    }
}

/// Body of `POST /models/switch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSwitchRequest {
    pub provider: String,
    pub model_name: String,
}

impl ModelSwitchRequest {
    pub fn new(provider: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_name: model_name.into(),
        }
    }
}

/// Response of `POST /models/switch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSwitchOutcome {
    pub success: bool,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current_provider: Option<String>,
}

/// Errors from the request/response API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never reached the server or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
