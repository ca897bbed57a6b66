//! In-process checkpoint storage for tests and development.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{validate_name, CheckpointError, CheckpointManager};

/// Checkpoint manager that keeps checkpoints in memory.
///
/// Counts successful writes and can be told to fail reads or writes.
#[derive(Debug, Default)]
pub struct MemoryCheckpointManager {
    checkpoints: Mutex<BTreeMap<String, Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryCheckpointManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `create_checkpoint` calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail with a non-not-found error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Store raw bytes without counting a write, e.g. to plant a corrupt
    /// checkpoint.
    pub fn insert_raw(&self, name: &str, data: impl Into<Vec<u8>>) {
        self.checkpoints.lock().insert(name.to_string(), data.into());
    }
}

impl CheckpointManager for MemoryCheckpointManager {
    fn create_checkpoint(&self, name: &str, data: &[u8]) -> Result<(), CheckpointError> {
        validate_name(name)?;

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CheckpointError::Injected(format!("write of {name}")));
        }

        self.checkpoints
            .lock()
            .insert(name.to_string(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_checkpoint(&self, name: &str) -> Result<Vec<u8>, CheckpointError> {
        validate_name(name)?;

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CheckpointError::Injected(format!("read of {name}")));
        }

        self.checkpoints
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| CheckpointError::NotFound(name.to_string()))
    }

    fn remove_checkpoint(&self, name: &str) -> Result<(), CheckpointError> {
        validate_name(name)?;
        self.checkpoints.lock().remove(name);
        Ok(())
    }

    fn list_checkpoints(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self.checkpoints.lock().keys().cloned().collect())
    }
}
