//! ReplyRouter - The single place where replies become visible state.
//!
//! A reply is accepted only from the transport that currently carries the
//! pending exchange. Because a send is only ever in flight on one transport,
//! this is enough to guarantee one bot message per user message without a
//! deduplication key:
//!
//! | Source    | Pending exchange         | Outcome                  |
//! |-----------|--------------------------|--------------------------|
//! | streaming | streaming                | append, clear pending    |
//! | streaming | none                     | append (server push)     |
//! | streaming | fallback                 | drop as stale            |
//! | fallback  | fallback, same exchange  | append, clear pending    |
//! | fallback  | anything else            | drop as stale            |

use super::state::{ConversationState, ExchangeId};
use crate::domain::conversation::Message;
use crate::domain::foundation::Timestamp;
use crate::domain::session::TransportRoute;
use crate::ports::{ApiError, Notice, ReplyFrame};

/// Warning shown when a fallback send fails.
pub const SEND_FAILED_WARNING: &str = "Failed to send message. Please try again.";

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplySource {
    Streaming,
    Fallback(ExchangeId),
}

/// What the router did with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteOutcome {
    /// Answered the pending exchange.
    Answered(ExchangeId),
    /// Appended with nothing pending.
    Pushed,
    /// Dropped.
    Stale,
}

/// Builds the bot message for a streamed reply.
///
/// Frames without a timestamp are stamped with the local clock.
pub(crate) fn streamed_message(frame: ReplyFrame) -> Message {
    let timestamp = frame
        .timestamp
        .unwrap_or_else(|| Timestamp::now().to_iso8601());
    Message::bot(frame.response, timestamp)
}

pub(crate) fn route_reply(
    state: &mut ConversationState,
    source: ReplySource,
    reply: Message,
) -> RouteOutcome {
    let outcome = match (source, state.pending.as_ref()) {
        (ReplySource::Streaming, None) => RouteOutcome::Pushed,
        (ReplySource::Streaming, Some(pending)) if pending.route == TransportRoute::Streaming => {
            RouteOutcome::Answered(pending.id)
        }
        (ReplySource::Fallback(exchange), Some(pending))
            if pending.route == TransportRoute::Fallback && pending.id == exchange =>
        {
            RouteOutcome::Answered(exchange)
        }
        _ => RouteOutcome::Stale,
    };

    match outcome {
        RouteOutcome::Answered(exchange) => {
            tracing::debug!(exchange = %exchange, ?source, "Reply received");
            state.pending = None;
            state.transcript.append(reply);
        }
        RouteOutcome::Pushed => {
            tracing::debug!("Unsolicited reply appended");
            state.transcript.append(reply);
        }
        RouteOutcome::Stale => {
            tracing::warn!(
                ?source,
                pending = ?state.pending.as_ref().map(|p| (p.id, p.route)),
                "Dropping reply that does not match the pending exchange"
            );
        }
    }
    outcome
}

/// Records a failed fallback exchange. Returns false if it was stale.
pub(crate) fn route_fallback_failure(
    state: &mut ConversationState,
    exchange: ExchangeId,
    error: &ApiError,
) -> bool {
    let matches = state
        .pending
        .as_ref()
        .is_some_and(|p| p.route == TransportRoute::Fallback && p.id == exchange);
    if !matches {
        tracing::debug!(exchange = %exchange, error = %error, "Ignoring failure of stale exchange");
        return false;
    }

    tracing::warn!(exchange = %exchange, error = %error, "Fallback send failed");
    state.pending = None;
    state.warning = Some(SEND_FAILED_WARNING.to_string());
    true
}

/// Notifications are observed, never shown.
pub(crate) fn observe_notice(notice: &Notice) {
    match notice {
        Notice::System { message } => tracing::info!(message = %message, "System notification"),
        Notice::Status { data } => tracing::debug!(%data, "Status broadcast"),
        Notice::Ping => tracing::trace!("Ping"),
    }
}
