//! Allocation state used when tracking is disabled.

use std::collections::HashSet;

use super::types::{ContainerAllocation, PodResourceAllocation, PodUid, ResourceRequirements};
use super::{AllocationState, AllocationStateError};

/// Discards writes and reports nothing allocated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopState;

impl AllocationState for NoopState {
    fn get_container_allocation(&self, _: &PodUid, _: &str) -> Option<ResourceRequirements> {
        None
    }

    fn get_pod_allocation(&self) -> PodResourceAllocation {
        PodResourceAllocation::new()
    }

    fn set_container_allocation(
        &self,
        _: &PodUid,
        _: &str,
        _: ResourceRequirements,
    ) -> Result<(), AllocationStateError> {
        Ok(())
    }

    fn set_pod_allocation(
        &self,
        _: &PodUid,
        _: ContainerAllocation,
    ) -> Result<(), AllocationStateError> {
        Ok(())
    }

    fn delete(&self, _: &PodUid, _: &str) -> Result<(), AllocationStateError> {
        Ok(())
    }

    fn remove_orphaned_pods(&self, _: &HashSet<PodUid>) {}
}
