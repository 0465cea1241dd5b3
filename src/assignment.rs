//! Rectangular minimum-cost assignment on top of the Jonker-Volgenant
//! solver from `lapjv`, which only accepts square matrices.

use lapjv::{lapjv, Matrix};
use nalgebra::DMatrix;

use crate::error::{FootfallError, Result};

/// Cost of pairing a real row or column with padding.
const PAD_COST: f32 = 0.0;

/// Solve the rectangular linear assignment problem, minimizing total
/// cost. Returns `(row, col)` pairs sorted by row; exactly
/// `min(rows, cols)` pairs are produced.
pub fn linear_sum_assignment(costs: &DMatrix<f32>) -> Result<Vec<(usize, usize)>> {
    let (rows, cols) = costs.shape();
    if rows == 0 || cols == 0 {
        return Ok(Vec::new());
    }
    if rows == 1 {
        return Ok(vec![(0, argmin(costs.row(0).iter().copied()))]);
    }
    if cols == 1 {
        return Ok(vec![(argmin(costs.column(0).iter().copied()), 0)]);
    }

    // costs matrix must be square
    let dims = rows.max(cols);
    let square = Matrix::from_shape_fn((dims, dims), |(r, c)| {
        if r < rows && c < cols {
            costs[(r, c)]
        } else {
            PAD_COST
        }
    });
    let (row_to_col, _) =
        lapjv(&square).map_err(|e| FootfallError::Assignment(format!("{:?}", e)))?;

    Ok(row_to_col
        .into_iter()
        .take(rows)
        .enumerate()
        .filter(|&(_, c)| c < cols)
        .collect())
}

/// Index of the smallest value, first one on ties.
fn argmin(values: impl Iterator<Item = f32>) -> usize {
    let mut best = 0;
    let mut best_cost = f32::INFINITY;
    for (i, v) in values.enumerate() {
        if v < best_cost {
            best = i;
            best_cost = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(costs: &DMatrix<f32>, pairs: &[(usize, usize)]) -> f32 {
        pairs.iter().map(|&(r, c)| costs[(r, c)]).sum()
    }

    #[test]
    fn test_empty_matrix() {
        assert!(linear_sum_assignment(&DMatrix::zeros(0, 3)).unwrap().is_empty());
        assert!(linear_sum_assignment(&DMatrix::zeros(2, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_beats_greedy_matching() {
        // greedy takes (0,0) first and is left with (1,1): total 1.0
        let costs = DMatrix::from_row_slice(2, 2, &[0.1, 0.2, 0.15, 0.9]);
        let pairs = linear_sum_assignment(&costs).unwrap();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
        assert!((total(&costs, &pairs) - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let costs = DMatrix::from_row_slice(3, 2, &[0.9, 0.8, 0.1, 0.7, 0.6, 0.2]);
        let pairs = linear_sum_assignment(&costs).unwrap();
        assert_eq!(pairs, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_more_columns_than_rows() {
        let costs = DMatrix::from_row_slice(2, 4, &[1.0, 1.0, 0.0, 1.0, 0.3, 1.0, 0.2, 1.0]);
        let pairs = linear_sum_assignment(&costs).unwrap();
        assert_eq!(pairs, vec![(0, 2), (1, 0)]);
    }

    #[test]
    fn test_single_row_and_column() {
        let row = DMatrix::from_row_slice(1, 3, &[0.5, 0.1, 0.1]);
        assert_eq!(linear_sum_assignment(&row).unwrap(), vec![(0, 1)]);

        let col = DMatrix::from_row_slice(3, 1, &[0.5, 0.4, 0.9]);
        assert_eq!(linear_sum_assignment(&col).unwrap(), vec![(1, 0)]);
    }

    #[test]
    fn test_one_to_one() {
        let costs = DMatrix::from_fn(5, 5, |r, c| ((r * 7 + c * 3) % 5) as f32 / 5.0);
        let pairs = linear_sum_assignment(&costs).unwrap();
        assert_eq!(pairs.len(), 5);
        let mut cols: Vec<usize> = pairs.iter().map(|&(_, c)| c).collect();
        cols.sort_unstable();
        cols.dedup();
        assert_eq!(cols.len(), 5);
    }
}
