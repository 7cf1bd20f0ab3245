//! Authoritative resource ledger.
//!
//! The engine functions are pure; a host that actually hands out resources
//! needs somewhere to keep the current `(available, allocation, max)` triple
//! and adopt grants into it. That is the `Ledger`.
//!
//! Cell editors return a new ledger and leave `self` alone. Only
//! [`Ledger::request`] mutates, and only when the request is granted.

use bk_common::{Error, ProcessMatrix, Request, ResourceVector, Result, Shape, Units};
use bk_config::{validate_state, StateFile, SystemShape};
use tracing::{debug, info};

use crate::banker::{check_state, derive_need, evaluate_request, RequestResult, SafetyResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    available: ResourceVector,
    allocation: ProcessMatrix,
    max: ProcessMatrix,
}

impl Ledger {
    /// A zero-filled ledger of the given shape.
    pub fn new(shape: Shape) -> Self {
        Ledger {
            available: ResourceVector::zeroed(shape.resources),
            allocation: ProcessMatrix::zeroed(shape.processes, shape.resources),
            max: ProcessMatrix::zeroed(shape.processes, shape.resources),
        }
    }

    /// Build a ledger from a state file, validating it first.
    pub fn from_state(state: StateFile) -> Result<Self> {
        validate_state(&state)?;
        Ok(Ledger {
            available: state.available,
            allocation: state.allocation,
            max: state.max,
        })
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.allocation.process_count(), self.available.len())
    }

    pub fn available(&self) -> &ResourceVector {
        &self.available
    }

    pub fn allocation(&self) -> &ProcessMatrix {
        &self.allocation
    }

    pub fn max(&self) -> &ProcessMatrix {
        &self.max
    }

    /// Need, freshly derived from the current max and allocation.
    pub fn need(&self) -> Result<ProcessMatrix> {
        derive_need(&self.allocation, &self.max)
    }

    pub fn check_safety(&self) -> Result<SafetyResult> {
        check_state(&self.available, &self.allocation, &self.max)
    }

    /// Evaluate `request` and, if granted, adopt the resulting state.
    ///
    /// On denial or error the ledger is left exactly as it was.
    pub fn request(&mut self, request: &Request) -> Result<RequestResult> {
        let need = self.need()?;
        let result = evaluate_request(request, &self.available, &self.allocation, &need)?;
        match &result {
            RequestResult::Granted(granted) => {
                self.available = granted.available.clone();
                self.allocation = granted.allocation.clone();
                info!(
                    process = request.process,
                    available = %self.available,
                    "request adopted into ledger"
                );
            }
            denied => {
                debug!(
                    process = request.process,
                    outcome = denied.outcome_name(),
                    "ledger unchanged"
                );
            }
        }
        Ok(result)
    }

    /// Copy with `available[resource]` set to `value`.
    pub fn with_available(&self, resource: usize, value: Units) -> Result<Self> {
        ensure_non_negative("available", value)?;
        let available = self
            .available
            .with_value(resource, value)
            .ok_or_else(|| self.resource_out_of_range("available", resource))?;
        Ok(Ledger {
            available,
            ..self.clone()
        })
    }

    /// Copy with `allocation[process][resource]` set to `value`.
    pub fn with_allocation(&self, process: usize, resource: usize, value: Units) -> Result<Self> {
        ensure_non_negative("allocation", value)?;
        let allocation = self.edit_cell(&self.allocation, "allocation", process, resource, value)?;
        Ok(Ledger {
            allocation,
            ..self.clone()
        })
    }

    /// Copy with `max[process][resource]` set to `value`.
    pub fn with_max(&self, process: usize, resource: usize, value: Units) -> Result<Self> {
        ensure_non_negative("max", value)?;
        let max = self.edit_cell(&self.max, "max", process, resource, value)?;
        Ok(Ledger { max, ..self.clone() })
    }

    /// Discard all contents and start over zero-filled at a new shape.
    pub fn reshape(&self, shape: Shape) -> Result<Self> {
        SystemShape::from(shape)
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Ledger::new(shape))
    }

    pub fn to_state_file(&self) -> StateFile {
        StateFile::new(
            self.available.clone(),
            self.allocation.clone(),
            self.max.clone(),
        )
    }

    fn edit_cell(
        &self,
        matrix: &ProcessMatrix,
        operand: &str,
        process: usize,
        resource: usize,
        value: Units,
    ) -> Result<ProcessMatrix> {
        let row = matrix.row(process).ok_or(Error::InvalidProcessIndex {
            index: process,
            process_count: matrix.process_count(),
        })?;
        let row = row
            .with_value(resource, value)
            .ok_or_else(|| self.resource_out_of_range(operand, resource))?;
        matrix.with_row(process, row).ok_or(Error::InvalidProcessIndex {
            index: process,
            process_count: matrix.process_count(),
        })
    }

    fn resource_out_of_range(&self, operand: &str, resource: usize) -> Error {
        Error::DimensionMismatch {
            operand: operand.to_string(),
            expected: format!("resource index below {}", self.available.len()),
            found: format!("resource index {}", resource),
        }
    }
}

fn ensure_non_negative(field: &str, value: Units) -> Result<()> {
    if value < 0 {
        return Err(Error::InvalidState(format!(
            "{} cannot be negative (got {})",
            field, value
        )));
    }
    Ok(())
}

impl From<Ledger> for StateFile {
    fn from(ledger: Ledger) -> Self {
        StateFile::new(ledger.available, ledger.allocation, ledger.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_config::{get_preset, PresetName};

    fn textbook() -> Ledger {
        Ledger::from_state(get_preset(PresetName::Textbook)).unwrap()
    }

    #[test]
    fn test_new_is_zero_filled() {
        let ledger = Ledger::new(Shape::new(2, 3));
        assert_eq!(ledger.available(), &ResourceVector::zeroed(3));
        assert_eq!(ledger.allocation(), &ProcessMatrix::zeroed(2, 3));
        assert_eq!(ledger.max(), &ProcessMatrix::zeroed(2, 3));
        assert!(ledger.check_safety().unwrap().is_safe());
    }

    #[test]
    fn test_from_state_rejects_invalid() {
        let mut state = get_preset(PresetName::Textbook);
        state.max = ProcessMatrix::zeroed(5, 3);
        let err = Ledger::from_state(state).unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn test_request_adopts_on_grant() {
        let mut ledger = textbook();
        let result = ledger.request(&Request::new(1, [1, 0, 2])).unwrap();
        assert!(result.is_granted());
        assert_eq!(ledger.available(), &ResourceVector::from([2, 3, 0]));
        assert_eq!(ledger.allocation()[1], ResourceVector::from([3, 0, 2]));
        assert_eq!(ledger.need().unwrap()[1], ResourceVector::from([0, 2, 0]));
    }

    #[test]
    fn test_request_leaves_ledger_on_denial() {
        let mut ledger = textbook();
        let before = ledger.clone();
        let result = ledger.request(&Request::new(1, [2, 0, 0])).unwrap();
        assert!(!result.is_granted());
        assert_eq!(ledger, before);

        assert!(ledger.request(&Request::new(9, [0, 0, 0])).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_editors_return_new_ledger() {
        let ledger = textbook();
        let edited = ledger.with_available(0, 10).unwrap();
        assert_eq!(edited.available()[0], 10);
        assert_eq!(ledger.available()[0], 3);

        let edited = ledger.with_max(4, 2, 5).unwrap();
        assert_eq!(edited.max()[4][2], 5);
        assert_eq!(ledger.max()[4][2], 3);

        let edited = ledger.with_allocation(0, 0, 1).unwrap();
        assert_eq!(edited.allocation()[0][0], 1);
    }

    #[test]
    fn test_editor_errors() {
        let ledger = textbook();
        assert!(matches!(
            ledger.with_max(7, 0, 1).unwrap_err(),
            Error::InvalidProcessIndex { index: 7, .. }
        ));
        assert!(matches!(
            ledger.with_allocation(0, 3, 1).unwrap_err(),
            Error::DimensionMismatch { .. }
        ));
        assert!(matches!(
            ledger.with_available(0, -1).unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[test]
    fn test_reshape_zero_fills() {
        let ledger = textbook().reshape(Shape::new(2, 2)).unwrap();
        assert_eq!(ledger, Ledger::new(Shape::new(2, 2)));
    }

    #[test]
    fn test_to_state_file_round_trip() {
        let ledger = textbook();
        let state = ledger.to_state_file();
        assert_eq!(Ledger::from_state(state).unwrap(), ledger);
    }
}
