//! podalloc Node Agent Library
//!
//! Tracks the compute resources (CPU/memory requests and limits) the node
//! agent has committed to for each pod and container, and persists them to a
//! checkpoint so admitted workloads survive an agent restart.
//!
//! ## Modules
//!
//! - `state`: allocation table, checkpoint codec and the state stores
//! - `config`: environment-driven configuration

pub mod config;
pub mod state;

// Re-export commonly used types
pub use config::AllocationStateConfig;
pub use state::{
    new_allocation_state, AllocationState, AllocationStateError, CheckpointState, MemoryState,
    NoopState, PodUid, ResourceRequirements,
};
