//! State validation errors and semantic validation.
//!
//! The engine assumes well-formed input and does not re-check these
//! properties; this is where malformed states are turned away.

use std::path::PathBuf;

use bk_common::{ProcessMatrix, ResourceVector, Units};
use thiserror::Error;

use crate::state::StateFile;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// State validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Negative value at {field}: {value}")]
    Negative { field: String, value: Units },

    #[error("Max below allocation for process {process}, resource {resource}: max={max}, allocation={allocation}")]
    MaxBelowAllocation {
        process: usize,
        resource: usize,
        max: Units,
        allocation: Units,
    },

    #[error("Resource {resource} does not add up: available={available} + allocated={allocated} != total={total}")]
    Conservation {
        resource: usize,
        available: Units,
        allocated: Units,
        total: Units,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::Io { .. } => 60,
            ValidationError::Parse(_) => 61,
            ValidationError::VersionMismatch { .. } => 62,
            ValidationError::Shape(_) => 63,
            ValidationError::Negative { .. } => 64,
            ValidationError::MaxBelowAllocation { .. } => 65,
            ValidationError::Conservation { .. } => 66,
            ValidationError::InvalidValue { .. } => 67,
        }
    }
}

impl From<ValidationError> for bk_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Io { source, .. } => bk_common::Error::Io(source),
            ValidationError::Parse(source) => bk_common::Error::Json(source),
            other => bk_common::Error::InvalidState(other.to_string()),
        }
    }
}

/// Validate a state: version, shapes, signs, claims, and conservation.
///
/// Checks run in that order and the first failure is reported.
pub fn validate_state(state: &StateFile) -> ValidationResult<()> {
    if state.schema_version != crate::STATE_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::STATE_SCHEMA_VERSION.to_string(),
            actual: state.schema_version.clone(),
        });
    }

    let shape = state.shape();
    let shape_err = |e: bk_common::Error| ValidationError::Shape(e.to_string());
    state.allocation.ensure_shape(shape, "allocation").map_err(shape_err)?;
    state.max.ensure_shape(shape, "max").map_err(shape_err)?;
    if let Some(total) = &state.total {
        total.ensure_len(shape.resources, "total").map_err(shape_err)?;
    }

    check_vector_signs("available", &state.available)?;
    check_matrix_signs("allocation", &state.allocation)?;
    check_matrix_signs("max", &state.max)?;
    if let Some(total) = &state.total {
        check_vector_signs("total", total)?;
    }

    for (i, (alloc_row, max_row)) in state.allocation.iter().zip(state.max.iter()).enumerate() {
        if let Some(j) = alloc_row.first_exceeding(max_row) {
            return Err(ValidationError::MaxBelowAllocation {
                process: i,
                resource: j,
                max: max_row[j],
                allocation: alloc_row[j],
            });
        }
    }

    if let Some(total) = &state.total {
        let allocated = state.allocation.column_sums(shape.resources);
        for j in 0..shape.resources {
            if state.available[j].saturating_add(allocated[j]) != total[j] {
                return Err(ValidationError::Conservation {
                    resource: j,
                    available: state.available[j],
                    allocated: allocated[j],
                    total: total[j],
                });
            }
        }
    }

    Ok(())
}

fn check_vector_signs(field: &str, vector: &ResourceVector) -> ValidationResult<()> {
    if let Some(j) = vector.first_negative() {
        return Err(ValidationError::Negative {
            field: format!("{}[{}]", field, j),
            value: vector[j],
        });
    }
    Ok(())
}

fn check_matrix_signs(field: &str, matrix: &ProcessMatrix) -> ValidationResult<()> {
    for (i, row) in matrix.iter().enumerate() {
        check_vector_signs(&format!("{}[{}]", field, i), row)?;
    }
    Ok(())
}
