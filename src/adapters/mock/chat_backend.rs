//! Mock chat backend for testing.
//!
//! Replies and model-switch outcomes are consumed in order. With nothing
//! queued, `send_chat` echoes the message and `switch_model` succeeds.
//!
//! # Example
//!
//! ```ignore
//! let backend = MockChatBackend::new()
//!     .with_reply("pong", "2024-01-01T00:00:00Z")
//!     .with_delay(Duration::from_millis(100));
//! ```

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    ApiError, ChatBackend, ChatReply, ChatRequest, CurrentModel, ModelSwitchOutcome,
    ModelSwitchRequest,
};

/// Scripted in-memory backend.
#[derive(Debug, Clone)]
pub struct MockChatBackend {
    replies: Arc<Mutex<VecDeque<Result<ChatReply, ApiError>>>>,
    switches: Arc<Mutex<VecDeque<Result<ModelSwitchOutcome, ApiError>>>>,
    current: Arc<Mutex<CurrentModel>>,
    /// Simulated latency for chat and model-switch requests.
    delay: Duration,
    chat_calls: Arc<Mutex<Vec<ChatRequest>>>,
    switch_calls: Arc<Mutex<Vec<ModelSwitchRequest>>>,
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            switches: Arc::new(Mutex::new(VecDeque::new())),
            current: Arc::new(Mutex::new(CurrentModel {
                provider: "mock".to_string(),
                model_name: "mock-model-1".to_string(),
                model_info: None,
                status: None,
            })),
            delay: Duration::ZERO,
            chat_calls: Arc::new(Mutex::new(Vec::new())),
            switch_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful reply to the queue.
    pub fn with_reply(self, response: impl Into<String>, timestamp: impl Into<String>) -> Self {
        self.push_reply(ChatReply {
            response: response.into(),
            timestamp: timestamp.into(),
            conversation_id: None,
        });
        self
    }

    /// Adds a failure to the queue.
    pub fn with_error(self, error: ApiError) -> Self {
        self.push_error(error);
        self
    }

    /// Sets simulated latency for chat and model-switch requests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_reply(&self, reply: ChatReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_error(&self, error: ApiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Queues the result of the next model switch.
    pub fn push_switch_result(&self, result: Result<ModelSwitchOutcome, ApiError>) {
        self.switches.lock().unwrap().push_back(result);
    }

    /// Chat requests received so far.
    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn switch_calls(&self) -> Vec<ModelSwitchRequest> {
        self.switch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError> {
        self.chat_calls.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let scripted = self.replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ChatReply {
                response: format!("echo: {}", request.message),
                timestamp: Timestamp::now().to_iso8601(),
                conversation_id: Some(request.conversation_id),
            })
        })
    }

    async fn fetch_stats(&self) -> Result<serde_json::Value, ApiError> {
        Ok(json!({
            "total_conversations": 1,
            "total_messages": self.chat_call_count(),
        }))
    }

    async fn list_models(&self) -> Result<serde_json::Value, ApiError> {
        let current = self.current.lock().unwrap().clone();
        Ok(json!({
            "current": {"provider": current.provider, "model_name": current.model_name},
            "available": {"mock": ["mock-model-1", "mock-model-2"]},
        }))
    }

    async fn current_model(&self) -> Result<CurrentModel, ApiError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn switch_model(
        &self,
        request: ModelSwitchRequest,
    ) -> Result<ModelSwitchOutcome, ApiError> {
        self.switch_calls.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let scripted = self.switches.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| {
            Ok(ModelSwitchOutcome {
                success: true,
                current_model: Some(request.model_name.clone()),
                message: None,
                current_provider: Some(request.provider.clone()),
            })
        });

        if matches!(&result, Ok(outcome) if outcome.success) {
            let mut current = self.current.lock().unwrap();
            current.provider = request.provider;
            current.model_name = request.model_name;
        }
        result
    }
}
