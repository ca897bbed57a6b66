//! In-memory allocation state.

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;

use super::types::{ContainerAllocation, PodResourceAllocation, PodUid, ResourceRequirements};
use super::{AllocationState, AllocationStateError};

/// Unlocked allocation table.
///
/// A pod present in the table always has at least one container entry,
/// except when it was stored through [`set_pod_allocation`] with an empty
/// map.
///
/// [`set_pod_allocation`]: PodAllocationTable::set_pod_allocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodAllocationTable {
    pods: PodResourceAllocation,
}

impl PodAllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded with `pods`.
    pub fn from_allocation(pods: PodResourceAllocation) -> Self {
        Self { pods }
    }

    pub fn get_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
    ) -> Option<ResourceRequirements> {
        self.pods.get(pod_uid)?.get(container_name).cloned()
    }

    /// Snapshot of the whole table.
    pub fn get_pod_allocation(&self) -> PodResourceAllocation {
        self.pods.clone()
    }

    /// Borrow the table without copying.
    pub fn pods(&self) -> &PodResourceAllocation {
        &self.pods
    }

    pub fn set_container_allocation(
        &mut self,
        pod_uid: &PodUid,
        container_name: &str,
        alloc: ResourceRequirements,
    ) {
        debug!(
            pod_uid = %pod_uid,
            container = %container_name,
            allocation = ?alloc,
            "Updated container resource allocation"
        );
        self.pods
            .entry(pod_uid.clone())
            .or_default()
            .insert(container_name.to_string(), alloc);
    }

    pub fn set_pod_allocation(
        &mut self,
        pod_uid: &PodUid,
        alloc: ContainerAllocation,
    ) -> Result<(), AllocationStateError> {
        debug!(pod_uid = %pod_uid, allocation = ?alloc, "Updated pod resource allocation");
        self.pods.insert(pod_uid.clone(), alloc);
        Ok(())
    }

    /// Remove a container's allocation, or the whole pod when
    /// `container_name` is empty.
    pub fn delete(&mut self, pod_uid: &PodUid, container_name: &str) {
        if container_name.is_empty() {
            if self.pods.remove(pod_uid).is_some() {
                debug!(pod_uid = %pod_uid, "Deleted pod resource allocation");
            }
            return;
        }

        let Some(containers) = self.pods.get_mut(pod_uid) else {
            return;
        };
        if containers.remove(container_name).is_none() {
            return;
        }
        if containers.is_empty() {
            self.pods.remove(pod_uid);
        }
        debug!(
            pod_uid = %pod_uid,
            container = %container_name,
            "Deleted container resource allocation"
        );
    }

    /// Drop every pod not in `remaining_pods`.
    pub fn remove_orphaned_pods(&mut self, remaining_pods: &HashSet<PodUid>) {
        let before = self.pods.len();
        self.pods.retain(|uid, _| remaining_pods.contains(uid));

        let removed = before - self.pods.len();
        if removed > 0 {
            debug!(removed, "Removed orphaned pod resource allocations");
        }
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

/// Thread-safe, non-durable allocation state.
#[derive(Debug, Default)]
pub struct MemoryState {
    table: RwLock<PodAllocationTable>,
}

impl MemoryState {
    pub fn new(pods: PodResourceAllocation) -> Self {
        Self {
            table: RwLock::new(PodAllocationTable::from_allocation(pods)),
        }
    }
}

impl AllocationState for MemoryState {
    fn get_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
    ) -> Option<ResourceRequirements> {
        self.table
            .read()
            .get_container_allocation(pod_uid, container_name)
    }

    fn get_pod_allocation(&self) -> PodResourceAllocation {
        self.table.read().get_pod_allocation()
    }

    fn set_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
        alloc: ResourceRequirements,
    ) -> Result<(), AllocationStateError> {
        self.table
            .write()
            .set_container_allocation(pod_uid, container_name, alloc);
        Ok(())
    }

    fn set_pod_allocation(
        &self,
        pod_uid: &PodUid,
        alloc: ContainerAllocation,
    ) -> Result<(), AllocationStateError> {
        self.table.write().set_pod_allocation(pod_uid, alloc)
    }

    fn delete(&self, pod_uid: &PodUid, container_name: &str) -> Result<(), AllocationStateError> {
        self.table.write().delete(pod_uid, container_name);
        Ok(())
    }

    fn remove_orphaned_pods(&self, remaining_pods: &HashSet<PodUid>) {
        self.table.write().remove_orphaned_pods(remaining_pods);
    }
}
