//! Banker's algorithm state loading and validation.
//!
//! This crate is the input-provisioning side of the engine:
//! - Typed Rust structs for state files and the system shape
//! - State path resolution (CLI → env → XDG → none)
//! - Shape and semantic validation (non-negative, max ≥ allocation, conservation)
//! - Built-in preset states
//! - State snapshots for audit output

pub mod preset;
pub mod resolve;
pub mod shape;
pub mod snapshot;
pub mod state;
pub mod validate;

pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use resolve::{resolve_state_path, ResolvedStatePath, StateSource};
pub use shape::SystemShape;
pub use snapshot::StateSnapshot;
pub use state::StateFile;
pub use validate::{validate_state, ValidationError, ValidationResult};

/// Schema version for state files.
pub const STATE_SCHEMA_VERSION: &str = "1.0.0";

/// Upper bound on either matrix dimension accepted from configuration.
pub const MAX_DIMENSION: usize = 4096;
