//! podalloc Node Agent
//!
//! Restores the pod resource allocation checkpoint and reports what the node
//! has committed to. Startup fails loudly if the checkpoint is unreadable.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podalloc_node_agent::config::AllocationStateConfig;
use podalloc_node_agent::state::new_allocation_state;

fn main() -> Result<()> {
    let config = AllocationStateConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        checkpoint_path = %config.checkpoint_path().display(),
        tracking_enabled = config.tracking_enabled,
        "Configuration loaded"
    );

    if !config.tracking_enabled {
        warn!("Pod allocation tracking disabled");
    }

    let state = new_allocation_state(&config).context("failed to initialize allocation state")?;

    let pods = state.get_pod_allocation();
    let container_count: usize = pods.values().map(|containers| containers.len()).sum();
    info!(
        pod_count = pods.len(),
        container_count,
        "Pod allocation state ready"
    );

    let rendered = serde_json::to_string_pretty(&pods).context("failed to render allocations")?;
    println!("{rendered}");

    Ok(())
}
