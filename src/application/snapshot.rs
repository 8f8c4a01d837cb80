//! Read-only view of the session published after every change.

use crate::domain::conversation::Message;
use crate::domain::foundation::ConversationId;
use crate::domain::session::{select_transport, ConnectionState, StreamPhase, TransportRoute};

/// Immutable session state for presentation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub conversation_id: ConversationId,
    pub connection: ConnectionState,
    pub stream_phase: StreamPhase,
    pub messages: Vec<Message>,
    /// True while a user message awaits its reply.
    pub pending: bool,
    /// Transport carrying the pending message.
    pub pending_route: Option<TransportRoute>,
    /// Dismissible warning banner.
    pub warning: Option<String>,
    pub model_switching: bool,
}

impl SessionSnapshot {
    pub(crate) fn initial(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            connection: ConnectionState::Disconnected,
            stream_phase: StreamPhase::Idle,
            messages: Vec::new(),
            pending: false,
            pending_route: None,
            warning: None,
            model_switching: false,
        }
    }

    /// Transport a send issued now would use.
    pub fn active_route(&self) -> TransportRoute {
        select_transport(self.stream_phase)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether the send control should be enabled.
    pub fn can_send(&self) -> bool {
        !self.pending && self.stream_phase != StreamPhase::ClosedFinal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_is_idle_and_sendable() {
        let snapshot = SessionSnapshot::initial(ConversationId::new());
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
        assert_eq!(snapshot.active_route(), TransportRoute::Fallback);
        assert!(snapshot.can_send());
        assert!(snapshot.last_message().is_none());
    }

    #[test]
    fn pending_disables_send() {
        let mut snapshot = SessionSnapshot::initial(ConversationId::new());
        snapshot.pending = true;
        assert!(!snapshot.can_send());
    }
}
