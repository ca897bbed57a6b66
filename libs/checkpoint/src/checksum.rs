//! Content checksums for checkpoint payloads.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::CheckpointError;

const PREFIX: &str = "sha256:";

/// SHA-256 checksum of a checkpoint payload.
///
/// Rendered as `sha256:<hex>` in text and serde forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Compute the checksum of `data`.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data.as_ref());
        Self(hasher.finalize().into())
    }

    /// Check that `data` hashes to this checksum.
    pub fn verify(&self, data: impl AsRef<[u8]>) -> Result<(), CheckpointError> {
        let actual = Self::new(data);
        if actual != *self {
            return Err(CheckpointError::Corrupt(format!(
                "checksum mismatch: expected {self}, computed {actual}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| CheckpointError::Corrupt(format!("checksum missing prefix: {s}")))?;

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digest, &mut bytes)
            .map_err(|e| CheckpointError::Corrupt(format!("invalid checksum '{s}': {e}")))?;

        Ok(Self(bytes))
    }
}

impl serde::Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
