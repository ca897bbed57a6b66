//! # podalloc-checkpoint
//!
//! Durable storage for named checkpoint blobs.
//!
//! A checkpoint is an opaque byte payload stored under a short name inside a
//! state directory. Writers replace a checkpoint atomically, so a reader sees
//! either the previous payload or the new one, never a partial write.
//!
//! ## Backends
//!
//! - [`FileCheckpointManager`]: one file per checkpoint, written with
//!   write-to-temp + fsync + rename.
//! - [`MemoryCheckpointManager`]: in-process map with call counters and
//!   failure injection, for tests and development.
//!
//! A missing checkpoint is reported as [`CheckpointError::NotFound`], which
//! callers can tell apart from every other failure.

mod checksum;
mod error;
mod file;
mod memory;

pub use checksum::Checksum;
pub use error::CheckpointError;
pub use file::FileCheckpointManager;
pub use memory::MemoryCheckpointManager;

/// Storage backend for named checkpoints.
pub trait CheckpointManager: Send + Sync {
    /// Atomically create or replace the checkpoint `name`.
    fn create_checkpoint(&self, name: &str, data: &[u8]) -> Result<(), CheckpointError>;

    /// Read the checkpoint `name`.
    ///
    /// Returns [`CheckpointError::NotFound`] if it has never been written.
    fn get_checkpoint(&self, name: &str) -> Result<Vec<u8>, CheckpointError>;

    /// Remove the checkpoint `name`. Removing a missing checkpoint succeeds.
    fn remove_checkpoint(&self, name: &str) -> Result<(), CheckpointError>;

    /// List stored checkpoint names in sorted order.
    fn list_checkpoints(&self) -> Result<Vec<String>, CheckpointError>;
}

/// Validate a checkpoint name.
///
/// Names must be a single, non-hidden path component. Backends check this on
/// every call; callers can check it up front to reject bad configuration.
pub fn validate_name(name: &str) -> Result<(), CheckpointError> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("name cannot contain path separators")
    } else if name.starts_with('.') {
        Some("name cannot start with '.'")
    } else if name.contains('\0') {
        Some("name cannot contain NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CheckpointError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
