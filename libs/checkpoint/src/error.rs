//! Error types for checkpoint storage.

use std::io;

use thiserror::Error;

/// Errors from checkpoint backends.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint has never been written (or was removed).
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    /// The checkpoint exists but its contents failed verification.
    #[error("checkpoint is corrupted: {0}")]
    Corrupt(String),

    /// The checkpoint name is not usable as a storage key.
    #[error("invalid checkpoint name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Failure injected by a test backend.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl CheckpointError {
    /// Returns true if the checkpoint does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckpointError::NotFound(_))
    }

    /// Returns true if the checkpoint exists but is unreadable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CheckpointError::Corrupt(_))
    }
}
