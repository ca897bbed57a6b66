//! Checkpoint-backed allocation state.
//!
//! Allocations live in an in-memory table that is the source of truth for
//! reads. Every `set_*` call re-encodes the full table and writes it through
//! the checkpoint manager, unless the encoded checksum matches the last one
//! written. Deletions and orphan removal only touch the table; they reach disk
//! with the next write that changes content.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use podalloc_checkpoint::{validate_name, CheckpointManager, Checksum, FileCheckpointManager};
use tracing::{error, info};

use super::checkpoint::AllocationCheckpoint;
use super::memory::PodAllocationTable;
use super::types::{ContainerAllocation, PodResourceAllocation, PodUid, ResourceRequirements};
use super::{AllocationState, AllocationStateError};

/// Table and last-written checksum, guarded together.
#[derive(Debug)]
struct Inner {
    cache: PodAllocationTable,
    /// `None` until a checkpoint has been restored or written.
    last_checksum: Option<Checksum>,
}

/// Allocation state persisted to a named checkpoint.
pub struct CheckpointState {
    inner: RwLock<Inner>,
    manager: Arc<dyn CheckpointManager>,
    checkpoint_name: String,
}

impl std::fmt::Debug for CheckpointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointState")
            .field("checkpoint_name", &self.checkpoint_name)
            .finish_non_exhaustive()
    }
}

impl CheckpointState {
    /// Open file-backed allocation state in `state_dir`, restoring
    /// `checkpoint_name` if it exists.
    pub fn new<P: AsRef<Path>>(
        state_dir: P,
        checkpoint_name: &str,
    ) -> Result<Self, AllocationStateError> {
        validate_name(checkpoint_name).map_err(AllocationStateError::InvalidCheckpointName)?;

        let state_dir = state_dir.as_ref();
        let manager = FileCheckpointManager::new(state_dir)
            .map_err(AllocationStateError::BackendUnavailable)?;

        Self::restore(Arc::new(manager), checkpoint_name, &state_dir.join(checkpoint_name))
    }

    /// Build allocation state on an existing checkpoint manager.
    pub fn with_manager(
        manager: Arc<dyn CheckpointManager>,
        checkpoint_name: &str,
    ) -> Result<Self, AllocationStateError> {
        validate_name(checkpoint_name).map_err(AllocationStateError::InvalidCheckpointName)?;
        Self::restore(manager, checkpoint_name, Path::new(checkpoint_name))
    }

    fn restore(
        manager: Arc<dyn CheckpointManager>,
        checkpoint_name: &str,
        display_path: &Path,
    ) -> Result<Self, AllocationStateError> {
        let (pods, last_checksum) =
            restore_state(manager.as_ref(), checkpoint_name).map_err(|e| {
                AllocationStateError::Restore {
                    path: display_path.to_path_buf(),
                    source: Box::new(e),
                }
            })?;

        Ok(Self {
            inner: RwLock::new(Inner {
                cache: PodAllocationTable::from_allocation(pods),
                last_checksum,
            }),
            manager,
            checkpoint_name: checkpoint_name.to_string(),
        })
    }
}

/// Read and decode the checkpoint. A missing checkpoint yields an empty table.
fn restore_state(
    manager: &dyn CheckpointManager,
    checkpoint_name: &str,
) -> Result<(PodResourceAllocation, Option<Checksum>), AllocationStateError> {
    let bytes = match manager.get_checkpoint(checkpoint_name) {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => {
            info!(
                checkpoint = %checkpoint_name,
                "No pod allocation checkpoint found, starting with empty state"
            );
            return Ok((PodResourceAllocation::new(), None));
        }
        Err(e) => return Err(AllocationStateError::ReadFailed(e)),
    };

    let (pods, checksum) = AllocationCheckpoint::decode(&bytes)?;
    info!(
        checkpoint = %checkpoint_name,
        pod_count = pods.len(),
        checksum = %checksum,
        "Restored pod resource allocation state from checkpoint"
    );
    Ok((pods, Some(checksum)))
}

impl Inner {
    /// Persist the table if it changed since the last successful write.
    /// Caller holds the write lock.
    fn store_state(
        &mut self,
        manager: &dyn CheckpointManager,
        checkpoint_name: &str,
    ) -> Result<(), AllocationStateError> {
        let checkpoint = AllocationCheckpoint::encode(self.cache.pods())?;
        let checksum = checkpoint.checksum();

        if self.last_checksum == Some(checksum) {
            // No changes to the checkpoint => no need to re-write it.
            return Ok(());
        }

        let bytes = checkpoint.marshal()?;
        if let Err(e) = manager.create_checkpoint(checkpoint_name, &bytes) {
            error!(
                error = %e,
                checkpoint = %checkpoint_name,
                "Failed to save pod allocation checkpoint"
            );
            return Err(AllocationStateError::WriteFailed(e));
        }

        self.last_checksum = Some(checksum);
        Ok(())
    }
}

impl AllocationState for CheckpointState {
    fn get_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
    ) -> Option<ResourceRequirements> {
        self.inner
            .read()
            .cache
            .get_container_allocation(pod_uid, container_name)
    }

    fn get_pod_allocation(&self) -> PodResourceAllocation {
        self.inner.read().cache.get_pod_allocation()
    }

    fn set_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
        alloc: ResourceRequirements,
    ) -> Result<(), AllocationStateError> {
        let mut inner = self.inner.write();
        inner
            .cache
            .set_container_allocation(pod_uid, container_name, alloc);
        inner.store_state(self.manager.as_ref(), &self.checkpoint_name)
    }

    fn set_pod_allocation(
        &self,
        pod_uid: &PodUid,
        alloc: ContainerAllocation,
    ) -> Result<(), AllocationStateError> {
        let mut inner = self.inner.write();
        inner.cache.set_pod_allocation(pod_uid, alloc)?;
        inner.store_state(self.manager.as_ref(), &self.checkpoint_name)
    }

    fn delete(&self, pod_uid: &PodUid, container_name: &str) -> Result<(), AllocationStateError> {
        // Not persisted: a deleted pod left in the checkpoint is harmless and is
        // dropped by the next write or by remove_orphaned_pods after restart.
        self.inner.write().cache.delete(pod_uid, container_name);
        Ok(())
    }

    fn remove_orphaned_pods(&self, remaining_pods: &HashSet<PodUid>) {
        // Not persisted: after a restart the orphans are removed again.
        self.inner
            .write()
            .cache
            .remove_orphaned_pods(remaining_pods);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podalloc_checkpoint::MemoryCheckpointManager;

    const NAME: &str = "allocated_pods_state";

    fn req(cpu: &str) -> ResourceRequirements {
        ResourceRequirements::new().with_request("cpu", cpu)
    }

    fn open(manager: &Arc<MemoryCheckpointManager>) -> CheckpointState {
        CheckpointState::with_manager(manager.clone(), NAME).unwrap()
    }

    #[test]
    fn test_restore_not_found_starts_empty() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);

        assert!(state.get_pod_allocation().is_empty());
        assert!(state.inner.read().last_checksum.is_none());
        assert_eq!(manager.write_count(), 0);
    }

    #[test]
    fn test_restore_read_error_fails() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        manager.set_fail_reads(true);

        let err = CheckpointState::with_manager(manager, NAME).unwrap_err();
        assert!(matches!(err, AllocationStateError::Restore { .. }));
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_invalid_name_rejected_before_restore() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        manager.set_fail_reads(true);

        for name in ["", "../escape", ".hidden"] {
            let err = CheckpointState::with_manager(manager.clone(), name).unwrap_err();
            assert!(
                matches!(err, AllocationStateError::InvalidCheckpointName(_)),
                "{name:?}: {err}"
            );
            assert!(!err.to_string().contains("delete"));
        }
    }

    #[test]
    fn test_restore_corrupt_fails_with_operator_message() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        manager.insert_raw(NAME, "{garbage");

        let err = CheckpointState::with_manager(manager.clone(), NAME).unwrap_err();
        assert!(err.is_corrupt());

        let message = err.to_string();
        assert!(message.contains("delete pod allocation checkpoint file"));
        assert!(message.contains(NAME));

        // Never repaired behind the operator's back
        assert_eq!(manager.get_checkpoint(NAME).unwrap(), b"{garbage");
    }

    #[test]
    fn test_restore_seeds_checksum() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        open(&manager)
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();
        assert_eq!(manager.write_count(), 1);

        // Rewriting identical content after restart is skipped
        let state = open(&manager);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();
        assert_eq!(manager.write_count(), 1);
    }

    #[test]
    fn test_store_state_skips_unchanged() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();

        let mut inner = state.inner.write();
        inner.store_state(&*manager, NAME).unwrap();
        inner.store_state(&*manager, NAME).unwrap();
        assert_eq!(manager.write_count(), 1);
    }

    #[test]
    fn test_first_store_of_empty_table_writes() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);

        let mut inner = state.inner.write();
        inner.store_state(&*manager, NAME).unwrap();
        inner.store_state(&*manager, NAME).unwrap();
        assert_eq!(manager.write_count(), 1);
        assert!(inner.last_checksum.is_some());
    }

    #[test]
    fn test_failed_write_keeps_cache_and_retries() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);

        manager.set_fail_writes(true);
        let err = state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap_err();
        assert!(matches!(err, AllocationStateError::WriteFailed(_)));
        assert_eq!(
            state.get_container_allocation(&"pod-a".into(), "c1"),
            Some(req("1"))
        );
        assert!(state.inner.read().last_checksum.is_none());

        // Same content again: checksum still differs from the last write
        manager.set_fail_writes(false);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();
        assert_eq!(manager.write_count(), 1);
    }

    #[test]
    fn test_delete_is_not_persisted() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();

        state.delete(&"pod-a".into(), "").unwrap();
        assert!(state.get_pod_allocation().is_empty());
        assert_eq!(manager.write_count(), 1);

        let restored = open(&manager);
        assert_eq!(
            restored.get_container_allocation(&"pod-a".into(), "c1"),
            Some(req("1"))
        );
    }

    #[test]
    fn test_delete_single_container() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();
        state
            .set_container_allocation(&"pod-a".into(), "c2", req("2"))
            .unwrap();

        state.delete(&"pod-a".into(), "c1").unwrap();
        assert!(state
            .get_container_allocation(&"pod-a".into(), "c1")
            .is_none());
        assert_eq!(
            state.get_container_allocation(&"pod-a".into(), "c2"),
            Some(req("2"))
        );
    }

    #[test]
    fn test_deletion_persisted_by_next_write() {
        let manager = Arc::new(MemoryCheckpointManager::new());
        let state = open(&manager);
        state
            .set_container_allocation(&"pod-a".into(), "c1", req("1"))
            .unwrap();
        state.delete(&"pod-a".into(), "").unwrap();
        state
            .set_container_allocation(&"pod-b".into(), "c1", req("2"))
            .unwrap();
        assert_eq!(manager.write_count(), 2);

        let restored = open(&manager);
        let pods = restored.get_pod_allocation();
        assert!(!pods.contains_key(&PodUid::from("pod-a")));
        assert!(pods.contains_key(&PodUid::from("pod-b")));
    }
}
