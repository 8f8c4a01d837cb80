//! Events posted to the controller by spawned I/O tasks.
//!
//! Tasks never touch session state. Each result is tagged with the connection
//! epoch or exchange id it belongs to so the controller can discard anything
//! produced by a connection or request that has since been replaced.

use tokio::sync::mpsc;

use super::state::ExchangeId;
use crate::domain::conversation::Message;
use crate::ports::{ApiError, ModelSwitchOutcome, ModelSwitchRequest, StreamLink, TransportError};

pub(crate) type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub(crate) type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub(crate) enum SessionEvent {
    StreamConnected {
        epoch: u64,
        link: StreamLink,
    },
    StreamConnectFailed {
        epoch: u64,
        error: TransportError,
    },
    Inbound {
        epoch: u64,
        text: String,
    },
    StreamClosed {
        epoch: u64,
        cause: CloseCause,
    },
    ReconnectDue {
        epoch: u64,
    },
    FallbackCompleted {
        exchange: ExchangeId,
        result: Result<Message, ApiError>,
    },
    ModelSwitchCompleted {
        request: ModelSwitchRequest,
        result: Result<ModelSwitchOutcome, ApiError>,
    },
}

/// How a live connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CloseCause {
    /// The peer closed the stream.
    Clean,
    /// The transport failed.
    Failure(TransportError),
}
