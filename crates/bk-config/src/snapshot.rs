//! State snapshots for audit output and reproducibility.
//!
//! A snapshot records which state a verdict was computed against, so a
//! reported safe sequence or denial can be traced back to its exact inputs.

use std::path::Path;

use bk_common::Shape;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::StateSource;
use crate::state::StateFile;

/// A frozen description of the state an operation ran against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the state.
    pub schema_version: String,

    /// Where the state came from.
    pub source: String,

    /// Path the state was loaded from, if it came from a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the canonical JSON encoding of the state.
    pub state_hash: String,

    /// Processes by resource types.
    pub shape: Shape,
}

impl StateSnapshot {
    /// Capture a snapshot of `state`.
    pub fn capture(state: &StateFile, source: StateSource, path: Option<&Path>) -> Self {
        StateSnapshot {
            timestamp: Utc::now(),
            schema_version: state.schema_version.clone(),
            source: source.to_string(),
            path: path.map(|p| p.display().to_string()),
            state_hash: hash_state(state),
            shape: state.shape(),
        }
    }

    /// Short identifier derived from the hash, for log correlation.
    pub fn state_id(&self) -> String {
        format!("state-{}", &self.state_hash[..12.min(self.state_hash.len())])
    }

    /// Check if two snapshots describe the same state contents.
    pub fn same_state(&self, other: &StateSnapshot) -> bool {
        self.state_hash == other.state_hash
    }
}

/// Hex SHA-256 of the state's canonical JSON form.
///
/// Field order is fixed by the struct definition, so equal states always
/// hash equally regardless of how the source file was formatted.
pub fn hash_state(state: &StateFile) -> String {
    let bytes = serde_json::to_vec(state).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}
