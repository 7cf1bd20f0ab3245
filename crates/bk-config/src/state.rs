//! State files: the `(available, allocation, max)` triple on disk.
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "available": [3, 3, 2],
//!   "allocation": [[0, 1, 0], [2, 0, 0]],
//!   "max": [[7, 5, 3], [3, 2, 2]],
//!   "total": [5, 4, 2]
//! }
//! ```
//!
//! Need is deliberately absent: it is always derived from `max` and
//! `allocation` right before it is used.

use std::path::Path;

use bk_common::{ProcessMatrix, ResourceVector, Shape};
use serde::{Deserialize, Serialize};

use crate::validate::{validate_state, ValidationError, ValidationResult};
use crate::STATE_SCHEMA_VERSION;

fn default_schema_version() -> String {
    STATE_SCHEMA_VERSION.to_string()
}

/// A full resource-accounting snapshot as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    /// Schema version for compatibility checking.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Free-form note about what this state models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Units of each resource type not held by any process.
    pub available: ResourceVector,

    /// Units currently held, one row per process.
    pub allocation: ProcessMatrix,

    /// Maximum units each process may ever claim.
    pub max: ProcessMatrix,

    /// Total instances per resource type. When present, validation checks
    /// that `available + Σ allocation` adds up to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<ResourceVector>,
}

impl StateFile {
    pub fn new(available: ResourceVector, allocation: ProcessMatrix, max: ProcessMatrix) -> Self {
        StateFile {
            schema_version: default_schema_version(),
            description: None,
            available,
            allocation,
            max,
            total: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_total(mut self, total: ResourceVector) -> Self {
        self.total = Some(total);
        self
    }

    /// The shape implied by this state: rows of `allocation` by length of
    /// `available`. Whether the other operands agree is a validation concern.
    pub fn shape(&self) -> Shape {
        Shape::new(self.allocation.process_count(), self.available.len())
    }

    /// Parse a state from JSON text without semantic validation.
    pub fn from_json(content: &str) -> ValidationResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a state file without semantic validation.
    pub fn load(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Read, parse, and validate a state file.
    pub fn load_validated(path: &Path) -> ValidationResult<Self> {
        let state = Self::load(path)?;
        validate_state(&state)?;
        Ok(state)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
