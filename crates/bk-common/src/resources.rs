//! Resource vectors, per-process matrices, and requests.
//!
//! Every type here is a plain value. Operations that would edit a vector or
//! matrix in place instead return a new one, so a snapshot handed to the
//! engine can never be aliased by a later edit on the caller's side.
//!
//! Units are signed: a derived need (`max - allocation`) may legitimately go
//! negative when a caller breaks the `max >= allocation` invariant, and that
//! must not wrap around. Inputs coming from the provisioning layer are
//! validated non-negative before they reach the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};

/// Count of instances of a single resource type.
pub type Units = i64;

/// Matrix dimensions: processes (rows) by resource types (columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    pub processes: usize,
    pub resources: usize,
}

impl Shape {
    pub fn new(processes: usize, resources: usize) -> Self {
        Shape {
            processes,
            resources,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.processes, self.resources)
    }
}

/// Quantities of each resource type; the index is the resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector(Vec<Units>);

impl ResourceVector {
    pub fn new(values: Vec<Units>) -> Self {
        ResourceVector(values)
    }

    /// A vector of `resource_count` zeros.
    pub fn zeroed(resource_count: usize) -> Self {
        ResourceVector(vec![0; resource_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Units] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Units> + '_ {
        self.0.iter().copied()
    }

    pub fn get(&self, resource: usize) -> Option<Units> {
        self.0.get(resource).copied()
    }

    pub fn into_inner(self) -> Vec<Units> {
        self.0
    }

    /// First resource index where `self` is strictly greater than `bound`.
    ///
    /// Both vectors are expected to have the same length; extra entries on
    /// either side are ignored.
    pub fn first_exceeding(&self, bound: &ResourceVector) -> Option<usize> {
        self.0
            .iter()
            .zip(bound.0.iter())
            .position(|(value, limit)| value > limit)
    }

    /// True when every entry is `<=` the matching entry of `bound`.
    pub fn fits_within(&self, bound: &ResourceVector) -> bool {
        self.first_exceeding(bound).is_none()
    }

    /// Elementwise sum as a new vector.
    pub fn plus(&self, other: &ResourceVector) -> ResourceVector {
        debug_assert_eq!(self.len(), other.len());
        ResourceVector(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a.saturating_add(*b))
                .collect(),
        )
    }

    /// Elementwise difference as a new vector.
    pub fn minus(&self, other: &ResourceVector) -> ResourceVector {
        debug_assert_eq!(self.len(), other.len());
        ResourceVector(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a.saturating_sub(*b))
                .collect(),
        )
    }

    /// Copy of this vector with one entry replaced, or `None` if out of range.
    pub fn with_value(&self, resource: usize, value: Units) -> Option<ResourceVector> {
        if resource >= self.len() {
            return None;
        }
        let mut values = self.0.clone();
        values[resource] = value;
        Some(ResourceVector(values))
    }

    /// Index of the first negative entry, if any.
    pub fn first_negative(&self) -> Option<usize> {
        self.0.iter().position(|v| *v < 0)
    }

    /// Fail with `DimensionMismatch` unless the vector has `expected` entries.
    pub fn ensure_len(&self, expected: usize, operand: &str) -> Result<()> {
        if self.len() != expected {
            return Err(Error::DimensionMismatch {
                operand: operand.to_string(),
                expected: format!("length {}", expected),
                found: format!("length {}", self.len()),
            });
        }
        Ok(())
    }
}

impl From<Vec<Units>> for ResourceVector {
    fn from(values: Vec<Units>) -> Self {
        ResourceVector(values)
    }
}

impl<const N: usize> From<[Units; N]> for ResourceVector {
    fn from(values: [Units; N]) -> Self {
        ResourceVector(values.to_vec())
    }
}

impl Index<usize> for ResourceVector {
    type Output = Units;

    fn index(&self, resource: usize) -> &Units {
        &self.0[resource]
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (j, value) in self.0.iter().enumerate() {
            if j > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

/// One `ResourceVector` per process, indexed by process identity.
///
/// Used for both the allocation and the max-claim matrices, and for the
/// derived need matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessMatrix(Vec<ResourceVector>);

impl ProcessMatrix {
    pub fn new(rows: Vec<ResourceVector>) -> Self {
        ProcessMatrix(rows)
    }

    /// A `processes x resources` matrix of zeros.
    pub fn zeroed(processes: usize, resources: usize) -> Self {
        ProcessMatrix(vec![ResourceVector::zeroed(resources); processes])
    }

    /// Build from nested rows, e.g. literal test fixtures.
    pub fn from_rows<R: Into<ResourceVector>>(rows: Vec<R>) -> Self {
        ProcessMatrix(rows.into_iter().map(Into::into).collect())
    }

    pub fn process_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn row(&self, process: usize) -> Option<&ResourceVector> {
        self.0.get(process)
    }

    pub fn rows(&self) -> &[ResourceVector] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceVector> + '_ {
        self.0.iter()
    }

    /// Copy of this matrix with one row replaced, or `None` if out of range.
    pub fn with_row(&self, process: usize, row: ResourceVector) -> Option<ProcessMatrix> {
        if process >= self.process_count() {
            return None;
        }
        let mut rows = self.0.clone();
        rows[process] = row;
        Some(ProcessMatrix(rows))
    }

    /// Elementwise column sums. Rows shorter than `resources` contribute zero.
    pub fn column_sums(&self, resources: usize) -> ResourceVector {
        let mut sums = vec![0 as Units; resources];
        for row in &self.0 {
            for (sum, value) in sums.iter_mut().zip(row.iter()) {
                *sum = sum.saturating_add(value);
            }
        }
        ResourceVector(sums)
    }

    /// Fail with `DimensionMismatch` unless this is exactly `shape`.
    ///
    /// Checks the row count first, then every row's length in index order.
    pub fn ensure_shape(&self, shape: Shape, operand: &str) -> Result<()> {
        if self.process_count() != shape.processes {
            return Err(Error::DimensionMismatch {
                operand: operand.to_string(),
                expected: format!("{} matrix", shape),
                found: format!("{} rows", self.process_count()),
            });
        }
        for (i, row) in self.0.iter().enumerate() {
            if row.len() != shape.resources {
                return Err(Error::DimensionMismatch {
                    operand: operand.to_string(),
                    expected: format!("{} matrix", shape),
                    found: format!("row {} has {} columns", i, row.len()),
                });
            }
        }
        Ok(())
    }
}

impl Index<usize> for ProcessMatrix {
    type Output = ResourceVector;

    fn index(&self, process: usize) -> &ResourceVector {
        &self.0[process]
    }
}

impl fmt::Display for ProcessMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", row)?;
        }
        write!(f, "]")
    }
}

/// One process asking for additional resources right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Index of the requesting process.
    pub process: usize,
    /// Additional units asked for, per resource type.
    pub resources: ResourceVector,
}

impl Request {
    pub fn new(process: usize, resources: impl Into<ResourceVector>) -> Self {
        Request {
            process,
            resources: resources.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_exceeding() {
        let request = ResourceVector::from([1, 3, 0]);
        let bound = ResourceVector::from([2, 2, 2]);
        assert_eq!(request.first_exceeding(&bound), Some(1));
        assert!(!request.fits_within(&bound));
        assert!(ResourceVector::from([2, 2, 2]).fits_within(&bound));
    }

    #[test]
    fn test_plus_minus() {
        let a = ResourceVector::from([3, 3, 2]);
        let b = ResourceVector::from([1, 0, 2]);
        assert_eq!(a.plus(&b), ResourceVector::from([4, 3, 4]));
        assert_eq!(a.minus(&b), ResourceVector::from([2, 3, 0]));
        // Inputs are untouched.
        assert_eq!(a, ResourceVector::from([3, 3, 2]));
    }

    #[test]
    fn test_with_value_is_a_copy() {
        let a = ResourceVector::from([1, 2]);
        let b = a.with_value(1, 9).unwrap();
        assert_eq!(a, ResourceVector::from([1, 2]));
        assert_eq!(b, ResourceVector::from([1, 9]));
        assert!(a.with_value(2, 0).is_none());
    }

    #[test]
    fn test_first_negative() {
        assert_eq!(ResourceVector::from([0, -1, 2]).first_negative(), Some(1));
        assert_eq!(ResourceVector::from([0, 1]).first_negative(), None);
    }

    #[test]
    fn test_ensure_len() {
        let v = ResourceVector::from([1, 2, 3]);
        assert!(v.ensure_len(3, "available").is_ok());
        let err = v.ensure_len(2, "available").unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(err.to_string().contains("available"));
    }

    #[test]
    fn test_zeroed_matrix_shape() {
        let m = ProcessMatrix::zeroed(4, 2);
        assert_eq!(m.process_count(), 4);
        assert!(m.ensure_shape(Shape::new(4, 2), "allocation").is_ok());
        assert!(m.iter().all(|row| row.iter().all(|v| v == 0)));
    }

    #[test]
    fn test_ensure_shape_reports_ragged_row() {
        let m = ProcessMatrix::from_rows(vec![vec![1, 2], vec![3]]);
        let err = m.ensure_shape(Shape::new(2, 2), "max").unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 columns"));
    }

    #[test]
    fn test_ensure_shape_reports_row_count() {
        let m = ProcessMatrix::zeroed(3, 2);
        let err = m.ensure_shape(Shape::new(2, 2), "need").unwrap_err();
        assert!(err.to_string().contains("3 rows"));
    }

    #[test]
    fn test_column_sums() {
        let m = ProcessMatrix::from_rows(vec![[0, 1, 0], [2, 0, 0], [3, 0, 2]]);
        assert_eq!(m.column_sums(3), ResourceVector::from([5, 1, 2]));
        assert_eq!(ProcessMatrix::default().column_sums(2), ResourceVector::zeroed(2));
    }

    #[test]
    fn test_with_row() {
        let m = ProcessMatrix::zeroed(2, 2);
        let edited = m.with_row(1, ResourceVector::from([4, 5])).unwrap();
        assert_eq!(m, ProcessMatrix::zeroed(2, 2));
        assert_eq!(edited[1], ResourceVector::from([4, 5]));
        assert!(m.with_row(2, ResourceVector::zeroed(2)).is_none());
    }

    #[test]
    fn test_display() {
        let m = ProcessMatrix::from_rows(vec![[1, 2], [3, 4]]);
        assert_eq!(m.to_string(), "[[1, 2], [3, 4]]");
        assert_eq!(Shape::new(5, 3).to_string(), "5x3");
    }

    #[test]
    fn test_serde_transparent() {
        let m = ProcessMatrix::from_rows(vec![[1, 2], [3, 4]]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1,2],[3,4]]");
        let back: ProcessMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
