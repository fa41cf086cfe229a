//! Error types for the harness.

use gensync_core::CoreError;
use gensync_sync::SyncError;
use thiserror::Error;

use crate::harness::EXIT_INVALID;

/// Errors that abort the bootstrap sequence.
///
/// Session failures are not errors at this level: they arrive as a failed
/// [`SessionOutcome`](gensync_sync::SessionOutcome).
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The protocol name is not in the catalog.
    #[error("invalid sync type: {0}")]
    UnknownProtocol(String),

    /// Configuration could not be built.
    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    /// Session API misuse.
    #[error("session error: {0}")]
    Sync(#[from] SyncError),
}

impl HarnessError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_INVALID
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
