//! Safety analysis: does some completion order avoid deadlock?
//!
//! The scan is the classical one. Starting from `work = available`, repeat
//! passes over the unfinished processes in ascending index order; any process
//! whose whole need row fits in `work` is assumed to run to completion and
//! hand its allocation back, which grows `work` immediately (so later indices
//! in the same pass see it). A pass that finishes nobody while processes
//! remain means the state is unsafe.
//!
//! The order processes finish in is the reported safe sequence. Because the
//! scan always walks indices in ascending order, the sequence for a given
//! input is fixed, and callers may rely on it.

use bk_common::{ProcessMatrix, ResourceVector, Result, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use super::need::derive_need;

/// Process indices in an order they can all run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeSequence(Vec<usize>);

impl SafeSequence {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl fmt::Display for SafeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Verdict of a safety analysis.
///
/// `Unsafe` is an ordinary outcome, not an error, and carries no partial
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SafetyResult {
    Safe { sequence: SafeSequence },
    Unsafe,
}

impl SafetyResult {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyResult::Safe { .. })
    }

    pub fn sequence(&self) -> Option<&SafeSequence> {
        match self {
            SafetyResult::Safe { sequence } => Some(sequence),
            SafetyResult::Unsafe => None,
        }
    }
}

/// Check that `allocation` and `need` are P×R, where P is the allocation row
/// count and R the length of `available`.
pub(crate) fn ensure_operands(
    available: &ResourceVector,
    allocation: &ProcessMatrix,
    need: &ProcessMatrix,
) -> Result<Shape> {
    let shape = Shape::new(allocation.process_count(), available.len());
    allocation.ensure_shape(shape, "allocation")?;
    need.ensure_shape(shape, "need")?;
    Ok(shape)
}

/// Run the safety analysis against an explicit need matrix.
///
/// `need` must have been derived from the current allocation and max; use
/// [`check_state`] to derive and analyze in one step.
///
/// Fails only with `DimensionMismatch`. With no processes, or no resource
/// types, the state is trivially safe.
pub fn analyze_safety(
    available: &ResourceVector,
    allocation: &ProcessMatrix,
    need: &ProcessMatrix,
) -> Result<SafetyResult> {
    let shape = ensure_operands(available, allocation, need)?;
    Ok(scan(available, allocation, need, shape.processes))
}

/// Derive need from `max` and `allocation`, then analyze.
///
/// This is the preferred entry point: need is never taken from anywhere but
/// a fresh derivation, so it cannot be stale.
pub fn check_state(
    available: &ResourceVector,
    allocation: &ProcessMatrix,
    max: &ProcessMatrix,
) -> Result<SafetyResult> {
    let need = derive_need(allocation, max)?;
    analyze_safety(available, allocation, &need)
}

/// The scan itself. Operands must already be shape-checked.
pub(crate) fn scan(
    available: &ResourceVector,
    allocation: &ProcessMatrix,
    need: &ProcessMatrix,
    processes: usize,
) -> SafetyResult {
    let mut work = available.clone();
    let mut finished = vec![false; processes];
    let mut sequence = Vec::with_capacity(processes);

    // Each productive pass finishes at least one process, so P passes suffice.
    for pass in 0..processes {
        let mut progressed = false;

        for i in 0..processes {
            if finished[i] || !need[i].fits_within(&work) {
                continue;
            }
            work = work.plus(&allocation[i]);
            finished[i] = true;
            sequence.push(i);
            progressed = true;
            trace!(pass, process = i, work = %work, "process can run to completion");
        }

        if sequence.len() == processes {
            break;
        }
        if !progressed {
            let blocked: Vec<usize> = (0..processes).filter(|i| !finished[*i]).collect();
            debug!(
                pass,
                finished = sequence.len(),
                blocked = ?blocked,
                "no remaining process fits in work; state is unsafe"
            );
            return SafetyResult::Unsafe;
        }
    }

    debug!(sequence = ?sequence, "state is safe");
    SafetyResult::Safe {
        sequence: SafeSequence(sequence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_common::Error;

    fn textbook() -> (ResourceVector, ProcessMatrix, ProcessMatrix) {
        (
            ResourceVector::from([3, 3, 2]),
            ProcessMatrix::from_rows(vec![[0, 1, 0], [2, 0, 0], [3, 0, 2], [2, 1, 1], [0, 0, 2]]),
            ProcessMatrix::from_rows(vec![[7, 5, 3], [3, 2, 2], [9, 0, 2], [2, 2, 2], [4, 3, 3]]),
        )
    }

    #[test]
    fn test_textbook_sequence() {
        let (available, allocation, max) = textbook();
        let result = check_state(&available, &allocation, &max).unwrap();
        assert_eq!(
            result.sequence().map(|s| s.as_slice().to_vec()),
            Some(vec![1, 3, 4, 0, 2])
        );
    }

    #[test]
    fn test_grants_visible_within_a_pass() {
        // P1 only fits once P0 has returned its allocation in the same pass.
        let available = ResourceVector::from([1]);
        let allocation = ProcessMatrix::from_rows(vec![[1], [0]]);
        let need = ProcessMatrix::from_rows(vec![[1], [2]]);
        let result = analyze_safety(&available, &allocation, &need).unwrap();
        assert_eq!(result.sequence().unwrap().as_slice(), &[0, 1]);
    }

    #[test]
    fn test_lower_index_waits_for_next_pass() {
        // P0 is blocked until P1 finishes, so P0 lands after P1 and P2.
        let available = ResourceVector::from([1]);
        let allocation = ProcessMatrix::from_rows(vec![[0], [2], [0]]);
        let need = ProcessMatrix::from_rows(vec![[3], [1], [1]]);
        let result = analyze_safety(&available, &allocation, &need).unwrap();
        assert_eq!(result.sequence().unwrap().as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn test_unsafe_circular_wait() {
        let available = ResourceVector::from([0, 0, 0]);
        let allocation = ProcessMatrix::from_rows(vec![[1, 0, 0], [0, 1, 0], [0, 0, 1]]);
        let need = ProcessMatrix::from_rows(vec![[0, 1, 0], [0, 0, 1], [1, 0, 0]]);
        let result = analyze_safety(&available, &allocation, &need).unwrap();
        assert_eq!(result, SafetyResult::Unsafe);
        assert!(result.sequence().is_none());
    }

    #[test]
    fn test_unsafe_after_partial_progress() {
        // P0 can finish, but what it returns does not unblock P1.
        let available = ResourceVector::from([1, 0]);
        let allocation = ProcessMatrix::from_rows(vec![[1, 0], [0, 0]]);
        let need = ProcessMatrix::from_rows(vec![[1, 0], [0, 1]]);
        assert_eq!(
            analyze_safety(&available, &allocation, &need).unwrap(),
            SafetyResult::Unsafe
        );
    }

    #[test]
    fn test_no_processes_is_safe() {
        let result = analyze_safety(
            &ResourceVector::from([1, 2]),
            &ProcessMatrix::default(),
            &ProcessMatrix::default(),
        )
        .unwrap();
        assert_eq!(
            result,
            SafetyResult::Safe {
                sequence: SafeSequence::default()
            }
        );
    }

    #[test]
    fn test_no_resource_types_is_safe() {
        let result = analyze_safety(
            &ResourceVector::zeroed(0),
            &ProcessMatrix::zeroed(3, 0),
            &ProcessMatrix::zeroed(3, 0),
        )
        .unwrap();
        assert_eq!(result.sequence().unwrap().as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_negative_need_does_not_panic() {
        let available = ResourceVector::from([0]);
        let allocation = ProcessMatrix::from_rows(vec![[5], [0]]);
        let max = ProcessMatrix::from_rows(vec![[2], [4]]);
        let result = check_state(&available, &allocation, &max).unwrap();
        assert_eq!(result.sequence().unwrap().as_slice(), &[0, 1]);
    }

    #[test]
    fn test_need_shape_mismatch() {
        let (available, allocation, _) = textbook();
        let err = analyze_safety(&available, &allocation, &ProcessMatrix::zeroed(4, 3)).unwrap_err();
        match err {
            Error::DimensionMismatch { operand, .. } => assert_eq!(operand, "need"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_available_length_mismatch() {
        let (_, allocation, max) = textbook();
        let err = check_state(&ResourceVector::from([3, 3]), &allocation, &max).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_idempotent() {
        let (available, allocation, max) = textbook();
        let first = check_state(&available, &allocation, &max).unwrap();
        let second = check_state(&available, &allocation, &max).unwrap();
        assert_eq!(first, second);
        assert_eq!(available, ResourceVector::from([3, 3, 2]));
    }

    #[test]
    fn test_serialization() {
        let safe = SafetyResult::Safe {
            sequence: SafeSequence(vec![1, 0]),
        };
        assert_eq!(
            serde_json::to_string(&safe).unwrap(),
            r#"{"verdict":"safe","sequence":[1,0]}"#
        );
        assert_eq!(
            serde_json::to_string(&SafetyResult::Unsafe).unwrap(),
            r#"{"verdict":"unsafe"}"#
        );
    }

    #[test]
    fn test_sequence_display() {
        assert_eq!(SafeSequence(vec![1, 3, 4, 0, 2]).to_string(), "[1, 3, 4, 0, 2]");
        assert_eq!(SafeSequence::default().to_string(), "[]");
    }
}
