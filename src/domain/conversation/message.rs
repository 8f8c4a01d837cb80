//! Message entity for the conversation transcript.
//!
//! Messages are immutable records of what the user typed, what the bot replied
//! and what the session reported locally. Each carries an ISO-8601 timestamp
//! string exactly as it was produced (locally or by the server).

use crate::domain::foundation::{MessageId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed by the local user.
    User,
    /// Reply delivered by the backend.
    Bot,
    /// Local notification (e.g. a model switch).
    System,
}

/// An immutable message in the transcript.
///
/// # Invariants
///
/// - `id` is globally unique
/// - user messages have non-blank text (validated at construction)
/// - nothing changes after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
    timestamp: String,
}

impl Message {
    /// Creates a user message stamped with the current time.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the text is blank
    pub fn user(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("text"));
        }
        Ok(Self::build(Sender::User, text, Timestamp::now().to_iso8601()))
    }

    /// Creates a bot reply carrying the server-supplied timestamp.
    pub fn bot(text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::build(Sender::Bot, text.into(), timestamp.into())
    }

    /// Creates a local system notification stamped with the current time.
    pub fn system(text: impl Into<String>) -> Self {
        Self::build(Sender::System, text.into(), Timestamp::now().to_iso8601())
    }

    fn build(sender: Sender, text: String, timestamp: String) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender,
            timestamp,
        }
    }

    /// Returns the message ID.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns the text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the sender.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Returns the ISO-8601 timestamp string.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Parses the timestamp, if it is well-formed.
    pub fn parsed_timestamp(&self) -> Option<Timestamp> {
        Timestamp::parse_iso8601(&self.timestamp)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_user_sender_and_parseable_timestamp() {
        let msg = Message::user("hello").unwrap();
        assert_eq!(msg.sender(), Sender::User);
        assert_eq!(msg.text(), "hello");
        assert!(msg.parsed_timestamp().is_some());
    }

    #[test]
    fn blank_user_message_is_rejected() {
        assert!(Message::user("   \n").is_err());
        assert!(Message::user("").is_err());
    }

    #[test]
    fn user_text_is_kept_verbatim() {
        let msg = Message::user("  padded  ").unwrap();
        assert_eq!(msg.text(), "  padded  ");
    }

    #[test]
    fn bot_message_keeps_server_timestamp() {
        let msg = Message::bot("hi", "2024-01-01T00:00:00Z");
        assert!(msg.is_bot());
        assert_eq!(msg.timestamp(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn system_message_is_neither_user_nor_bot() {
        let msg = Message::system("Switched to llama3");
        assert_eq!(msg.sender(), Sender::System);
        assert!(!msg.is_user());
        assert!(!msg.is_bot());
    }

    #[test]
    fn sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Bot).unwrap(), "\"bot\"");
    }

    #[test]
    fn each_message_gets_distinct_id() {
        let a = Message::bot("a", "t");
        let b = Message::bot("a", "t");
        assert_ne!(a.id(), b.id());
    }
}
