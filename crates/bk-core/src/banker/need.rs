//! Need matrix derivation.

use bk_common::{ProcessMatrix, Result, Shape};

/// Remaining demand per process: `need[i][j] = max[i][j] - allocation[i][j]`.
///
/// Both matrices must be the same rectangular P×R shape; the shape is taken
/// from `allocation` (its row count, and the length of its first row).
///
/// Entries go negative when a process holds more than its declared maximum.
/// That is a caller error, but it is passed through rather than rejected;
/// the safety analysis treats such a process as trivially satisfiable.
pub fn derive_need(allocation: &ProcessMatrix, max: &ProcessMatrix) -> Result<ProcessMatrix> {
    let shape = Shape::new(
        allocation.process_count(),
        allocation.row(0).map_or(0, |row| row.len()),
    );
    allocation.ensure_shape(shape, "allocation")?;
    max.ensure_shape(shape, "max")?;

    Ok(ProcessMatrix::new(
        max.iter()
            .zip(allocation.iter())
            .map(|(max_row, alloc_row)| max_row.minus(alloc_row))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_common::Error;

    #[test]
    fn test_textbook_need() {
        let allocation =
            ProcessMatrix::from_rows(vec![[0, 1, 0], [2, 0, 0], [3, 0, 2], [2, 1, 1], [0, 0, 2]]);
        let max =
            ProcessMatrix::from_rows(vec![[7, 5, 3], [3, 2, 2], [9, 0, 2], [2, 2, 2], [4, 3, 3]]);

        let need = derive_need(&allocation, &max).unwrap();
        assert_eq!(
            need,
            ProcessMatrix::from_rows(vec![[7, 4, 3], [1, 2, 2], [6, 0, 0], [0, 1, 1], [4, 3, 1]])
        );
    }

    #[test]
    fn test_negative_need_passes_through() {
        let allocation = ProcessMatrix::from_rows(vec![[3, 1]]);
        let max = ProcessMatrix::from_rows(vec![[1, 1]]);
        let need = derive_need(&allocation, &max).unwrap();
        assert_eq!(need, ProcessMatrix::from_rows(vec![[-2, 0]]));
    }

    #[test]
    fn test_row_count_mismatch() {
        let allocation = ProcessMatrix::zeroed(2, 3);
        let max = ProcessMatrix::zeroed(3, 3);
        let err = derive_need(&allocation, &max).unwrap_err();
        match err {
            Error::DimensionMismatch { operand, .. } => assert_eq!(operand, "max"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_mismatch() {
        let allocation = ProcessMatrix::zeroed(2, 3);
        let max = ProcessMatrix::zeroed(2, 2);
        assert!(matches!(
            derive_need(&allocation, &max),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ragged_allocation() {
        let allocation = ProcessMatrix::from_rows(vec![vec![1, 0], vec![0]]);
        let max = ProcessMatrix::from_rows(vec![vec![1, 0], vec![0, 0]]);
        let err = derive_need(&allocation, &max).unwrap_err();
        assert!(err.to_string().contains("allocation"));
    }

    #[test]
    fn test_empty_matrices() {
        let need = derive_need(&ProcessMatrix::default(), &ProcessMatrix::default()).unwrap();
        assert!(need.is_empty());
    }

    #[test]
    fn test_inputs_untouched() {
        let allocation = ProcessMatrix::from_rows(vec![[1, 2]]);
        let max = ProcessMatrix::from_rows(vec![[3, 4]]);
        let _ = derive_need(&allocation, &max).unwrap();
        assert_eq!(allocation, ProcessMatrix::from_rows(vec![[1, 2]]));
        assert_eq!(max, ProcessMatrix::from_rows(vec![[3, 4]]));
    }
}
