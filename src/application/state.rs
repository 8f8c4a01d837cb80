//! Mutable conversation state owned by the session controller.

use std::fmt;

use crate::domain::conversation::Transcript;
use crate::domain::session::TransportRoute;

/// Correlates one outbound user message with the transport carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(u64);

impl ExchangeId {
    pub(crate) fn first() -> Self {
        Self(1)
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The single outstanding send, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub id: ExchangeId,
    pub route: TransportRoute,
    pub text: String,
}

impl PendingExchange {
    pub fn new(id: ExchangeId, route: TransportRoute, text: impl Into<String>) -> Self {
        Self {
            id,
            route,
            text: text.into(),
        }
    }
}

/// Everything the reply router is allowed to touch.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConversationState {
    pub transcript: Transcript,
    pub pending: Option<PendingExchange>,
    pub warning: Option<String>,
    pub model_switching: bool,
}

impl ConversationState {
    pub fn is_awaiting(&self, route: TransportRoute) -> bool {
        self.pending.as_ref().is_some_and(|p| p.route == route)
    }
}
