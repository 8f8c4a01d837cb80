//! HTTP implementation of the chat backend port.
//!
//! Talks to the backend's request/response API with `reqwest`:
//!
//! | Method | Path               | Port method     |
//! |--------|--------------------|-----------------|
//! | POST   | `/chat`            | `send_chat`     |
//! | GET    | `/stats`           | `fetch_stats`   |
//! | GET    | `/models`          | `list_models`   |
//! | GET    | `/models/current`  | `current_model` |
//! | POST   | `/models/switch`   | `switch_model`  |

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::ports::{
    ApiError, ChatBackend, ChatReply, ChatRequest, CurrentModel, ModelSwitchOutcome,
    ModelSwitchRequest,
};

/// Backend client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpChatBackend {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            ApiError::network(format!("Connection failed: {}", e))
        } else {
            ApiError::network(e.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ApiError::status(status.as_u16(), body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::parse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError> {
        tracing::debug!(conversation_id = %request.conversation_id, "POST /chat");
        self.post_json("/chat", &request).await
    }

    async fn fetch_stats(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json("/stats").await
    }

    async fn list_models(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json("/models").await
    }

    async fn current_model(&self) -> Result<CurrentModel, ApiError> {
        self.get_json("/models/current").await
    }

    async fn switch_model(
        &self,
        request: ModelSwitchRequest,
    ) -> Result<ModelSwitchOutcome, ApiError> {
        tracing::debug!(provider = %request.provider, model = %request.model_name, "POST /models/switch");
        self.post_json("/models/switch", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpChatBackend::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/chat"), "http://localhost:8000/chat");
    }

    #[test]
    fn from_config_uses_api_url() {
        let backend = HttpChatBackend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let backend = HttpChatBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = backend.fetch_stats().await;
        assert!(matches!(
            result,
            Err(ApiError::Network(_)) | Err(ApiError::Timeout { .. })
        ));
    }
}
