//! Request evaluation: can process i be given these units without losing safety?
//!
//! Evaluation never touches the caller's state. Bounds are checked first
//! (need, then availability), a provisional state is built from copies, and the
//! safety scan runs against it. Only a granted result carries the new state
//! back; the caller decides whether to adopt it.

use bk_common::{Error, ProcessMatrix, Request, ResourceVector, Result, Units};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::safety::{ensure_operands, scan, SafeSequence, SafetyResult};

/// The provisional state a granted request leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedState {
    pub available: ResourceVector,
    pub allocation: ProcessMatrix,
    pub need: ProcessMatrix,
    /// Safe sequence of the new state.
    pub sequence: SafeSequence,
}

/// Outcome of evaluating one request.
///
/// Denials are ordinary results. Each bound denial names the first offending
/// resource index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestResult {
    Granted(GrantedState),
    DeniedExceedsNeed {
        resource: usize,
        requested: Units,
        need: Units,
    },
    DeniedExceedsAvailable {
        resource: usize,
        requested: Units,
        available: Units,
    },
    DeniedUnsafe,
}

impl RequestResult {
    pub fn is_granted(&self) -> bool {
        matches!(self, RequestResult::Granted(_))
    }

    pub fn granted(&self) -> Option<&GrantedState> {
        match self {
            RequestResult::Granted(state) => Some(state),
            _ => None,
        }
    }

    /// Human-readable reason for a denial, `None` when granted.
    pub fn denial_reason(&self) -> Option<String> {
        match self {
            RequestResult::Granted(_) => None,
            RequestResult::DeniedExceedsNeed {
                resource,
                requested,
                need,
            } => Some(format!(
                "request exceeds need for resource {}: requested {}, need {}",
                resource, requested, need
            )),
            RequestResult::DeniedExceedsAvailable {
                resource,
                requested,
                available,
            } => Some(format!(
                "request exceeds available for resource {}: requested {}, available {}",
                resource, requested, available
            )),
            RequestResult::DeniedUnsafe => {
                Some("granting the request would leave the system unsafe".to_string())
            }
        }
    }

    /// Short machine-friendly label.
    pub fn outcome_name(&self) -> &'static str {
        match self {
            RequestResult::Granted(_) => "granted",
            RequestResult::DeniedExceedsNeed { .. } => "denied_exceeds_need",
            RequestResult::DeniedExceedsAvailable { .. } => "denied_exceeds_available",
            RequestResult::DeniedUnsafe => "denied_unsafe",
        }
    }
}

/// Decide whether `request` can be granted against the given state.
///
/// `need` must be consistent with `allocation`; it is the caller's job to
/// derive it fresh. Errors are reserved for malformed input: operands that
/// disagree in shape, a request of the wrong length, or a process index out
/// of range.
///
/// The need bound is checked across every resource before availability is
/// looked at, so a request that exceeds both is reported as exceeding need.
pub fn evaluate_request(
    request: &Request,
    available: &ResourceVector,
    allocation: &ProcessMatrix,
    need: &ProcessMatrix,
) -> Result<RequestResult> {
    let shape = ensure_operands(available, allocation, need)?;
    let process = request.process;
    if process >= shape.processes {
        return Err(Error::InvalidProcessIndex {
            index: process,
            process_count: shape.processes,
        });
    }
    request.resources.ensure_len(shape.resources, "request")?;

    let asked = &request.resources;
    let need_row = &need[process];
    let alloc_row = &allocation[process];

    if let Some(j) = asked.first_exceeding(need_row) {
        debug!(process, resource = j, "request exceeds declared need");
        return Ok(RequestResult::DeniedExceedsNeed {
            resource: j,
            requested: asked[j],
            need: need_row[j],
        });
    }

    if let Some(j) = asked.first_exceeding(available) {
        debug!(process, resource = j, "request exceeds available units");
        return Ok(RequestResult::DeniedExceedsAvailable {
            resource: j,
            requested: asked[j],
            available: available[j],
        });
    }

    let new_available = available.minus(asked);
    let new_allocation = allocation
        .with_row(process, alloc_row.plus(asked))
        .ok_or(Error::InvalidProcessIndex {
            index: process,
            process_count: shape.processes,
        })?;
    let new_need = need
        .with_row(process, need_row.minus(asked))
        .ok_or(Error::InvalidProcessIndex {
            index: process,
            process_count: shape.processes,
        })?;

    match scan(&new_available, &new_allocation, &new_need, shape.processes) {
        SafetyResult::Safe { sequence } => {
            debug!(process, sequence = %sequence, "request granted");
            Ok(RequestResult::Granted(GrantedState {
                available: new_available,
                allocation: new_allocation,
                need: new_need,
                sequence,
            }))
        }
        SafetyResult::Unsafe => {
            debug!(process, "request would leave the system unsafe");
            Ok(RequestResult::DeniedUnsafe)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banker::need::derive_need;

    struct Fixture {
        available: ResourceVector,
        allocation: ProcessMatrix,
        need: ProcessMatrix,
    }

    fn textbook() -> Fixture {
        let allocation =
            ProcessMatrix::from_rows(vec![[0, 1, 0], [2, 0, 0], [3, 0, 2], [2, 1, 1], [0, 0, 2]]);
        let max =
            ProcessMatrix::from_rows(vec![[7, 5, 3], [3, 2, 2], [9, 0, 2], [2, 2, 2], [4, 3, 3]]);
        let need = derive_need(&allocation, &max).unwrap();
        Fixture {
            available: ResourceVector::from([3, 3, 2]),
            allocation,
            need,
        }
    }

    fn eval(f: &Fixture, request: Request) -> Result<RequestResult> {
        evaluate_request(&request, &f.available, &f.allocation, &f.need)
    }

    #[test]
    fn test_grant_textbook_request() {
        let f = textbook();
        let result = eval(&f, Request::new(1, [1, 0, 2])).unwrap();
        let granted = result.granted().expect("granted");
        assert_eq!(granted.available, ResourceVector::from([2, 3, 0]));
        assert_eq!(granted.allocation[1], ResourceVector::from([3, 0, 2]));
        assert_eq!(granted.need[1], ResourceVector::from([0, 2, 0]));
        assert_eq!(granted.sequence.as_slice(), &[1, 3, 4, 0, 2]);
    }

    #[test]
    fn test_caller_state_untouched() {
        let f = textbook();
        let before = (f.available.clone(), f.allocation.clone(), f.need.clone());
        let _ = eval(&f, Request::new(1, [1, 0, 2])).unwrap();
        let _ = eval(&f, Request::new(0, [0, 2, 0])).unwrap();
        assert_eq!((f.available, f.allocation, f.need), before);
    }

    #[test]
    fn test_exceeds_available() {
        let f = textbook();
        let result = eval(&f, Request::new(0, [4, 0, 0])).unwrap();
        assert_eq!(
            result,
            RequestResult::DeniedExceedsAvailable {
                resource: 0,
                requested: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_exceeds_need() {
        let f = textbook();
        let result = eval(&f, Request::new(1, [2, 0, 0])).unwrap();
        assert_eq!(
            result,
            RequestResult::DeniedExceedsNeed {
                resource: 0,
                requested: 2,
                need: 1
            }
        );
    }

    #[test]
    fn test_need_bound_wins_over_available_bound() {
        // Resource 0 exceeds available only; resource 2 exceeds need only.
        let f = textbook();
        let result = eval(&f, Request::new(0, [4, 0, 4])).unwrap();
        assert!(matches!(
            result,
            RequestResult::DeniedExceedsNeed { resource: 2, .. }
        ));
    }

    #[test]
    fn test_denied_unsafe() {
        // After P1 takes (1, 0, 2), P0 asking for (0, 2, 0) strands everyone.
        let f = textbook();
        let granted = eval(&f, Request::new(1, [1, 0, 2]))
            .unwrap()
            .granted()
            .cloned()
            .unwrap();
        let result = evaluate_request(
            &Request::new(0, [0, 2, 0]),
            &granted.available,
            &granted.allocation,
            &granted.need,
        )
        .unwrap();
        assert_eq!(result, RequestResult::DeniedUnsafe);
        assert!(result.denial_reason().unwrap().contains("unsafe"));
    }

    #[test]
    fn test_zero_request_on_safe_state_is_granted() {
        let f = textbook();
        let result = eval(&f, Request::new(2, [0, 0, 0])).unwrap();
        let granted = result.granted().unwrap();
        assert_eq!(granted.available, f.available);
        assert_eq!(granted.allocation, f.allocation);
    }

    #[test]
    fn test_invalid_process_index() {
        let f = textbook();
        let err = eval(&f, Request::new(5, [0, 0, 0])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidProcessIndex {
                index: 5,
                process_count: 5
            }
        ));
    }

    #[test]
    fn test_request_length_mismatch() {
        let f = textbook();
        let err = eval(&f, Request::new(1, [1, 0])).unwrap_err();
        match err {
            Error::DimensionMismatch { operand, .. } => assert_eq!(operand, "request"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        let denied = RequestResult::DeniedExceedsNeed {
            resource: 0,
            requested: 2,
            need: 1,
        };
        let json = serde_json::to_value(&denied).unwrap();
        assert_eq!(json["outcome"], "denied_exceeds_need");
        assert_eq!(json["need"], 1);
        assert_eq!(denied.outcome_name(), "denied_exceeds_need");
    }
}
