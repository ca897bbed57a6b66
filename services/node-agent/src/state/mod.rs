//! Pod resource allocation state.
//!
//! Tracks the CPU/memory requests and limits the agent has committed to for
//! each pod and container. Three interchangeable implementations share the
//! [`AllocationState`] trait:
//!
//! - [`MemoryState`]: in-memory only
//! - [`CheckpointState`]: in-memory cache persisted to a checkpoint file
//! - [`NoopState`]: tracking disabled
//!
//! The checkpointed variant restores its table on construction and refuses to
//! start from a checkpoint it cannot read.

mod checkpoint;
mod error;
mod memory;
mod noop;
mod store;
mod types;

use std::collections::HashSet;
use std::sync::Arc;

pub use checkpoint::AllocationCheckpoint;
pub use error::AllocationStateError;
pub use memory::{MemoryState, PodAllocationTable};
pub use noop::NoopState;
pub use store::CheckpointState;
pub use types::{
    ContainerAllocation, PodResourceAllocation, PodUid, Quantity, ResourceList, ResourceName,
    ResourceRequirements,
};

use crate::config::AllocationStateConfig;

/// Read/write access to pod resource allocations.
pub trait AllocationState: Send + Sync {
    /// Resources allocated to one container, if tracked.
    fn get_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
    ) -> Option<ResourceRequirements>;

    /// Snapshot of all tracked allocations.
    fn get_pod_allocation(&self) -> PodResourceAllocation;

    /// Set the resources allocated to one container.
    fn set_container_allocation(
        &self,
        pod_uid: &PodUid,
        container_name: &str,
        alloc: ResourceRequirements,
    ) -> Result<(), AllocationStateError>;

    /// Replace the allocation of every container in a pod.
    fn set_pod_allocation(
        &self,
        pod_uid: &PodUid,
        alloc: ContainerAllocation,
    ) -> Result<(), AllocationStateError>;

    /// Delete a container's allocation, or the whole pod's when
    /// `container_name` is empty. Deleting something untracked is a no-op.
    fn delete(&self, pod_uid: &PodUid, container_name: &str) -> Result<(), AllocationStateError>;

    /// Delete allocations of every pod not in `remaining_pods`.
    fn remove_orphaned_pods(&self, remaining_pods: &HashSet<PodUid>);
}

/// Build the allocation state selected by `config`.
pub fn new_allocation_state(
    config: &AllocationStateConfig,
) -> Result<Arc<dyn AllocationState>, AllocationStateError> {
    if !config.tracking_enabled {
        return Ok(Arc::new(NoopState));
    }

    let state = CheckpointState::new(&config.state_dir, &config.checkpoint_name)?;
    Ok(Arc::new(state))
}
