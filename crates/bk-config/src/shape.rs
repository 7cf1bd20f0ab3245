//! The `{process_count, resource_count}` configuration surface.

use bk_common::{ProcessMatrix, ResourceVector, Shape};
use serde::{Deserialize, Serialize};

use crate::state::StateFile;
use crate::validate::{ValidationError, ValidationResult};
use crate::MAX_DIMENSION;

/// How many processes and resource types the system tracks.
///
/// Changing either count means starting over: `zeroed_state` builds the
/// zero-filled matrices for the new shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemShape {
    /// Matrix row count (P).
    pub process_count: usize,
    /// Matrix column count and vector length (R).
    pub resource_count: usize,
}

impl SystemShape {
    pub fn new(process_count: usize, resource_count: usize) -> Self {
        SystemShape {
            process_count,
            resource_count,
        }
    }

    pub fn as_shape(&self) -> Shape {
        Shape::new(self.process_count, self.resource_count)
    }

    /// Reject dimensions beyond `MAX_DIMENSION`.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.process_count > MAX_DIMENSION {
            return Err(ValidationError::InvalidValue {
                field: "process_count".to_string(),
                message: format!("Must be at most {}, got {}", MAX_DIMENSION, self.process_count),
            });
        }
        if self.resource_count > MAX_DIMENSION {
            return Err(ValidationError::InvalidValue {
                field: "resource_count".to_string(),
                message: format!("Must be at most {}, got {}", MAX_DIMENSION, self.resource_count),
            });
        }
        Ok(())
    }

    /// A state with every matrix and vector zero-filled to this shape.
    pub fn zeroed_state(&self) -> StateFile {
        StateFile::new(
            ResourceVector::zeroed(self.resource_count),
            ProcessMatrix::zeroed(self.process_count, self.resource_count),
            ProcessMatrix::zeroed(self.process_count, self.resource_count),
        )
    }
}

impl From<Shape> for SystemShape {
    fn from(shape: Shape) -> Self {
        SystemShape::new(shape.processes, shape.resources)
    }
}
