//! Checkpoint codec for pod resource allocations.
//!
//! A checkpoint is a JSON envelope:
//!
//! ```text
//! {"data":"{\"allocationEntries\":{...}}","checksum":"sha256:<hex>"}
//! ```
//!
//! `data` holds the canonical serialization of the allocation table and
//! `checksum` is computed over exactly those bytes. Maps are ordered, so the
//! same logical table always produces the same `data` and checksum.

use podalloc_checkpoint::Checksum;
use serde::{Deserialize, Serialize};

use super::types::PodResourceAllocation;
use super::AllocationStateError;

/// Payload stored inside the checkpoint's `data` field.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodResourceAllocationInfo {
    #[serde(default, skip_serializing_if = "PodResourceAllocation::is_empty")]
    allocation_entries: PodResourceAllocation,
}

/// Durable envelope for an allocation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationCheckpoint {
    data: String,
    checksum: Checksum,
}

impl AllocationCheckpoint {
    /// Serialize `pods` and compute its checksum.
    pub fn encode(pods: &PodResourceAllocation) -> Result<Self, AllocationStateError> {
        let info = PodResourceAllocationInfo {
            allocation_entries: pods.clone(),
        };
        let data = serde_json::to_string(&info).map_err(AllocationStateError::Encode)?;
        let checksum = Checksum::new(&data);
        Ok(Self { data, checksum })
    }

    /// Parse checkpoint bytes, verify the checksum and extract the table.
    pub fn decode(bytes: &[u8]) -> Result<(PodResourceAllocation, Checksum), AllocationStateError> {
        let checkpoint: Self = serde_json::from_slice(bytes).map_err(|e| {
            AllocationStateError::CorruptRecord(format!("failed to parse checkpoint: {e}"))
        })?;

        checkpoint
            .checksum
            .verify(&checkpoint.data)
            .map_err(|e| AllocationStateError::CorruptRecord(e.to_string()))?;

        let info: PodResourceAllocationInfo =
            serde_json::from_str(&checkpoint.data).map_err(|e| {
                AllocationStateError::CorruptRecord(format!(
                    "failed to get pod resource allocation info: {e}"
                ))
            })?;

        Ok((info.allocation_entries, checkpoint.checksum))
    }

    /// Bytes to hand to the checkpoint backend.
    pub fn marshal(&self) -> Result<Vec<u8>, AllocationStateError> {
        serde_json::to_vec(self).map_err(AllocationStateError::Encode)
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }
}
