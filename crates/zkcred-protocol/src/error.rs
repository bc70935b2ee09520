//! Protocol-layer errors.

use std::time::Duration;

use thiserror::Error;
use zkcred_core::ZkcredError;
use zkcred_state::StateError;
use zkcred_zkp::EngineError;

/// Why a session did not complete.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The peer did not answer in time.
    #[error("timed out after {waited:?} waiting for {expecting}")]
    Timeout {
        waited: Duration,
        expecting: &'static str,
    },

    /// The peer's end of the channel is gone.
    #[error("session channel closed")]
    ChannelClosed,

    /// The peer sent a message that does not fit the exchange state.
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// The peer aborted the session.
    #[error("peer aborted the session: {0}")]
    Aborted(String),

    /// The exchange state machine rejected a transition.
    #[error(transparent)]
    State(#[from] StateError),

    /// A lifecycle operation failed.
    #[error(transparent)]
    Core(#[from] ZkcredError),
}

impl From<EngineError> for ProtocolError {
    fn from(err: EngineError) -> Self {
        Self::Core(err.into())
    }
}

impl ProtocolError {
    /// Whether the failure is in the transport rather than the exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ChannelClosed)
    }
}
