//! Error types for GenSync Core.

use thiserror::Error;

/// Errors raised while resolving protocols and building configurations.
///
/// All of these are configuration-time errors: none of them is recoverable
/// locally, and each one aborts the bootstrap sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("incomplete configuration: {field} was never set")]
    IncompleteConfiguration { field: &'static str },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl CoreError {
    /// Shorthand for a non-positive numeric field.
    pub(crate) fn not_positive(name: &'static str) -> Self {
        CoreError::InvalidParameter {
            name,
            reason: "must be positive".into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
