//! Allocation data model.
//!
//! All maps are ordered so that serializing the same logical content always
//! yields the same bytes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque unique identifier of a pod.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodUid(String);

impl PodUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PodUid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PodUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a compute resource (`cpu`, `memory`, ...).
pub type ResourceName = String;

/// Canonical resource quantity (`500m`, `128Mi`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    pub fn new(quantity: impl Into<String>) -> Self {
        Self(quantity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resource quantities keyed by resource name.
pub type ResourceList = BTreeMap<ResourceName, Quantity>;

/// Requested and limited resources for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Maximum amount of each resource the container may use.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: ResourceList,

    /// Amount of each resource reserved for the container.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: ResourceList,
}

impl ResourceRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style request setter.
    pub fn with_request(mut self, name: &str, quantity: impl Into<Quantity>) -> Self {
        self.requests.insert(name.to_string(), quantity.into());
        self
    }

    /// Builder-style limit setter.
    pub fn with_limit(mut self, name: &str, quantity: impl Into<Quantity>) -> Self {
        self.limits.insert(name.to_string(), quantity.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

/// Resource requirements keyed by container name.
pub type ContainerAllocation = BTreeMap<String, ResourceRequirements>;

/// Resource requirements keyed by pod, then container.
pub type PodResourceAllocation = BTreeMap<PodUid, ContainerAllocation>;
