//! FallbackRequester - One request/response exchange per message.

use std::sync::Arc;

use crate::domain::conversation::Message;
use crate::domain::foundation::ConversationId;
use crate::ports::{ApiError, ChatBackend, ChatRequest};

/// Sends a message through `POST /chat` when no streaming connection is live.
#[derive(Clone)]
pub struct FallbackRequester {
    backend: Arc<dyn ChatBackend>,
}

impl FallbackRequester {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Sends `text` and builds the bot reply from the response.
    ///
    /// # Errors
    ///
    /// Any `ApiError` from the backend: network failure, timeout, non-success
    /// status or an unparseable body.
    pub async fn request_reply(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<Message, ApiError> {
        let reply = self
            .backend
            .send_chat(ChatRequest::new(text, conversation_id))
            .await?;

        if let Some(echoed) = reply.conversation_id.as_deref() {
            if echoed != conversation_id.to_string() {
                tracing::warn!(
                    expected = %conversation_id,
                    echoed,
                    "Fallback reply names a different conversation"
                );
            }
        }

        Ok(Message::bot(reply.response, reply.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockChatBackend;
    use crate::ports::ChatReply;

    #[tokio::test]
    async fn builds_bot_message_from_reply() {
        let backend = MockChatBackend::new();
        backend.push_reply(ChatReply {
            response: "pong".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            conversation_id: None,
        });
        let requester = FallbackRequester::new(Arc::new(backend.clone()));
        let id = ConversationId::new();

        let message = requester.request_reply("ping", &id).await.unwrap();

        assert!(message.is_bot());
        assert_eq!(message.text(), "pong");
        assert_eq!(message.timestamp(), "2024-01-01T00:00:00Z");
        assert_eq!(backend.chat_calls(), vec![ChatRequest::new("ping", &id)]);
    }

    #[tokio::test]
    async fn propagates_backend_error() {
        let backend = MockChatBackend::new();
        backend.push_error(ApiError::status(500, "boom"));
        let requester = FallbackRequester::new(Arc::new(backend));

        let result = requester.request_reply("x", &ConversationId::new()).await;

        assert_eq!(result, Err(ApiError::status(500, "boom")));
    }
}
