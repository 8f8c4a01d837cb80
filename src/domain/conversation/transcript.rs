//! Append-only message transcript.

use super::message::Message;

/// Ordered, append-only sequence of messages.
///
/// Insertion order is display order. Entries are never removed, replaced
/// or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Sender;
    use proptest::prelude::*;

    #[test]
    fn starts_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
    }

    #[test]
    fn append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("hello").unwrap());
        transcript.append(Message::bot("hi", "2024-01-01T00:00:00Z"));

        let senders: Vec<_> = transcript.iter().map(|m| m.sender()).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
        assert_eq!(transcript.last().unwrap().text(), "hi");
    }

    proptest! {
        #[test]
        fn appending_never_disturbs_existing_entries(texts in prop::collection::vec("[a-z]{1,8}", 1..20)) {
            let mut transcript = Transcript::new();
            let mut seen = Vec::new();
            for text in &texts {
                let before: Vec<_> = transcript.iter().map(|m| *m.id()).collect();
                let msg = Message::bot(text.clone(), "t");
                seen.push(*msg.id());
                transcript.append(msg);
                let after: Vec<_> = transcript.iter().map(|m| *m.id()).collect();
                prop_assert_eq!(&after[..before.len()], &before[..]);
            }
            let ids: Vec<_> = transcript.iter().map(|m| *m.id()).collect();
            prop_assert_eq!(ids, seen);
        }
    }
}
