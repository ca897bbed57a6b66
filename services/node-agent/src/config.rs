//! Configuration for pod allocation tracking.

use std::path::PathBuf;

use anyhow::{Context, Result};
use podalloc_checkpoint::validate_name;

/// Default checkpoint name inside the state directory.
pub const DEFAULT_CHECKPOINT_NAME: &str = "allocated_pods_state";

/// Allocation state configuration.
#[derive(Debug, Clone)]
pub struct AllocationStateConfig {
    /// Directory holding the checkpoint file.
    pub state_dir: PathBuf,

    /// Checkpoint name (file name inside `state_dir`).
    pub checkpoint_name: String,

    /// When false, allocations are not tracked at all.
    pub tracking_enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for AllocationStateConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/podalloc"),
            checkpoint_name: DEFAULT_CHECKPOINT_NAME.to_string(),
            tracking_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl AllocationStateConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let state_dir = lookup("PODALLOC_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_dir);

        let checkpoint_name =
            lookup("PODALLOC_CHECKPOINT_NAME").unwrap_or(defaults.checkpoint_name);
        if let Err(e) = validate_name(&checkpoint_name) {
            anyhow::bail!("invalid PODALLOC_CHECKPOINT_NAME: {e}");
        }

        let tracking_enabled = match lookup("PODALLOC_TRACKING_ENABLED") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("invalid PODALLOC_TRACKING_ENABLED: {value:?}"))?,
            None => defaults.tracking_enabled,
        };

        let log_level = lookup("PODALLOC_LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            state_dir,
            checkpoint_name,
            tracking_enabled,
            log_level,
        })
    }

    /// Full path of the checkpoint file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join(&self.checkpoint_name)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AllocationStateConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AllocationStateConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/podalloc"));
        assert_eq!(config.checkpoint_name, DEFAULT_CHECKPOINT_NAME);
        assert!(config.tracking_enabled);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("/var/lib/podalloc/allocated_pods_state")
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PODALLOC_STATE_DIR", "/tmp/state"),
            ("PODALLOC_CHECKPOINT_NAME", "pods"),
            ("PODALLOC_TRACKING_ENABLED", "off"),
            ("PODALLOC_LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert_eq!(config.checkpoint_path(), PathBuf::from("/tmp/state/pods"));
        assert!(!config.tracking_enabled);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_checkpoint_name() {
        for name in ["", "../x", "a/b", ".state"] {
            let err = load(&[("PODALLOC_CHECKPOINT_NAME", name)]).unwrap_err();
            assert!(err.to_string().contains("PODALLOC_CHECKPOINT_NAME"), "{name:?}");
        }
    }

    #[test]
    fn test_invalid_bool() {
        assert!(load(&[("PODALLOC_TRACKING_ENABLED", "maybe")]).is_err());
    }
}
