//! Session identity: the one conversation id held for the session's lifetime.

use crate::domain::foundation::ConversationId;

/// Holds the conversation identifier generated at session start.
///
/// The id is only readable; there is no way to replace it once created.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    conversation_id: ConversationId,
}

impl SessionIdentity {
    /// Generates a fresh identity.
    pub fn generate() -> Self {
        Self {
            conversation_id: ConversationId::new(),
        }
    }

    /// Returns the conversation id.
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::generate()
    }
}
