//! Errors from allocation state operations.

use std::path::PathBuf;

use podalloc_checkpoint::CheckpointError;
use thiserror::Error;

/// Errors from allocation state stores.
#[derive(Debug, Error)]
pub enum AllocationStateError {
    /// The checkpoint backend could not be opened.
    #[error("failed to initialize checkpoint manager for pod allocation tracking: {0}")]
    BackendUnavailable(#[source] CheckpointError),

    /// The configured checkpoint name is not usable.
    #[error("invalid pod allocation checkpoint name: {0}")]
    InvalidCheckpointName(#[source] CheckpointError),

    /// An existing checkpoint could not be restored.
    #[error(
        "could not restore state from checkpoint: {}, please drain this node and delete \
         pod allocation checkpoint file {} before restarting",
        .source,
        .path.display()
    )]
    Restore {
        path: PathBuf,
        #[source]
        source: Box<AllocationStateError>,
    },

    /// A checkpoint could not be read from the backend.
    #[error("failed to read checkpoint: {0}")]
    ReadFailed(#[source] CheckpointError),

    /// Checkpoint bytes did not decode into an allocation table.
    #[error("corrupt allocation checkpoint: {0}")]
    CorruptRecord(String),

    /// The allocation table could not be serialized.
    #[error("failed to create checkpoint: {0}")]
    Encode(#[source] serde_json::Error),

    /// The checkpoint write failed; the in-memory allocation was kept.
    #[error("failed to save pod allocation checkpoint: {0}")]
    WriteFailed(#[source] CheckpointError),
}

impl AllocationStateError {
    /// Returns true if the error came from decoding a checkpoint.
    pub fn is_corrupt(&self) -> bool {
        match self {
            Self::CorruptRecord(_) => true,
            Self::Restore { source, .. } => source.is_corrupt(),
            _ => false,
        }
    }
}
