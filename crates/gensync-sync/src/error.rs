//! Error types for the sync module.

use gensync_core::ProtocolParams;
use thiserror::Error;

use crate::messages::SyncErrorCode;
use crate::session::{FailureKind, SessionState};

/// Errors that can occur during a sync session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Session API misuse, e.g. calling `begin` twice.
    #[error("invalid session state: begin() requires Configured, found {state:?}")]
    InvalidState { state: SessionState },

    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// The peer runs a different protocol or different derived parameters.
    #[error("parameter mismatch: local={local:?}, peer={peer:?}")]
    ParameterMismatch {
        local: ProtocolParams,
        peer: ProtocolParams,
    },

    /// Message was unexpected or failed validation.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Transport-level error: refused, reset, listen failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Peer sent an error message.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: SyncErrorCode, message: String },

    /// Timeout waiting for peer.
    #[error("timeout: {0}")]
    Timeout(String),
}

impl SyncError {
    /// Classify this error for a failed [`SessionOutcome`](crate::SessionOutcome).
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SyncError::Transport(_) | SyncError::Timeout(_) => FailureKind::Transport,
            _ => FailureKind::Reconciliation,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
