//! Sparse storage for the least-squares system and a conjugate gradient solver.
//!
//! Equations are collected as `(row, col, value)` triplets, compressed into a
//! CSR matrix, and reduced to the weighted normal equations `A^T W^2 A`.
//! The normal matrix is symmetric, so its CSR arrays double as CSC arrays for
//! the sparse Cholesky factorization.

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

use crate::error::{ParamError, Result, SolveFailure};

/// A sparse matrix entry: `(row, col, value)`.
pub type Triplet = (usize, usize, f64);

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone, Default)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// row_ptr[i] is where row i starts in col_idx/values; row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets.
    ///
    /// The triplets are sorted in place. Duplicate entries at the same
    /// (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &mut [Triplet]) -> Self {
        let mut matrix = Self::default();
        matrix.refill(rows, cols, triplets);
        matrix
    }

    /// Rebuild this matrix from triplets, reusing its allocations.
    pub fn refill(&mut self, rows: usize, cols: usize, triplets: &mut [Triplet]) {
        self.rows = rows;
        self.cols = cols;
        self.row_ptr.clear();
        self.row_ptr.resize(rows + 1, 0);
        self.col_idx.clear();
        self.values.clear();

        triplets.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut prev: Option<(usize, usize)> = None;
        for &(row, col, val) in triplets.iter() {
            if prev == Some((row, col)) {
                if let Some(last) = self.values.last_mut() {
                    *last += val;
                }
                continue;
            }
            self.col_idx.push(col);
            self.values.push(val);
            // Count entries per row; prefix-summed below
            self.row_ptr[row + 1] += 1;
            prev = Some((row, col));
        }

        for r in 0..rows {
            self.row_ptr[r + 1] += self.row_ptr[r];
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `i` as `(col, value)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Diagonal entry of row `i` (zero if not stored).
    pub fn diagonal(&self, i: usize) -> f64 {
        self.row(i)
            .find(|&(col, _)| col == i)
            .map_or(0.0, |(_, v)| v)
    }

    /// True if every stored value is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| self.row(i).map(|(col, v)| v * x[col]).sum::<f64>()),
        )
    }

    /// Convert a symmetric matrix to CSC form.
    ///
    /// For a symmetric matrix the CSR row pointers and column indices are the
    /// CSC column offsets and row indices, so no transposition is needed.
    pub fn symmetric_to_csc(&self) -> Result<CscMatrix<f64>> {
        if self.rows != self.cols {
            return Err(ParamError::DimensionMismatch {
                what: "symmetric matrix columns",
                expected: self.rows,
                actual: self.cols,
            });
        }
        CscMatrix::try_from_csc_data(
            self.rows,
            self.cols,
            self.row_ptr.clone(),
            self.col_idx.clone(),
            self.values.clone(),
        )
        .map_err(|e| {
            log::error!("normal matrix rejected by sparse format check: {e}");
            ParamError::Solve {
                kind: SolveFailure::InvalidInput,
            }
        })
    }
}

/// Accumulate the weighted normal equations of `A x = b` with row weights `W`.
///
/// Fills `normal` with the triplets of `A^T W^2 A` and returns `A^T W^2 b`.
/// Rows with zero weight contribute nothing.
pub fn accumulate_normal_equations(
    a: &CsrMatrix,
    weights: &[f64],
    b: &[f64],
    normal: &mut Vec<Triplet>,
) -> Result<DVector<f64>> {
    if weights.len() != a.nrows() || b.len() != a.nrows() {
        return Err(ParamError::DimensionMismatch {
            what: "weighted system rows",
            expected: a.nrows(),
            actual: weights.len().min(b.len()),
        });
    }

    normal.clear();
    let mut rhs = DVector::zeros(a.ncols());

    for (i, (&w, &bi)) in weights.iter().zip(b.iter()).enumerate() {
        if w == 0.0 {
            continue;
        }
        let w2 = w * w;
        for (j, aij) in a.row(i) {
            rhs[j] += w2 * aij * bi;
            for (k, aik) in a.row(i) {
                normal.push((j, k, w2 * aij * aik));
            }
        }
    }

    Ok(rhs)
}

/// Solve A*x = b using the Conjugate Gradient method.
///
/// Requires A to be symmetric positive definite.
///
/// # Arguments
///
/// * `a` - The system matrix (must be symmetric positive definite)
/// * `b` - The right-hand side vector
/// * `x0` - Optional initial guess (zeros if None)
/// * `max_iter` - Maximum number of iterations
/// * `tolerance` - Convergence tolerance (relative residual norm)
///
/// # Errors
///
/// Returns [`SolveFailure::NoConvergence`] if the residual is still above
/// tolerance after `max_iter` iterations.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    if a.nrows() != n || a.ncols() != n {
        return Err(ParamError::DimensionMismatch {
            what: "conjugate gradient system",
            expected: n,
            actual: a.nrows(),
        });
    }

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    // r = b - A*x
    let mut r = b - a.mul_vec(&x);

    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(DVector::zeros(n));
    }

    let mut r_norm_sq = r.dot(&r);
    if r_norm_sq.sqrt() / b_norm < tolerance {
        return Ok(x);
    }

    let mut p = r.clone();

    for _iter in 0..max_iter {
        let ap = a.mul_vec(&p);

        let p_ap = p.dot(&ap);
        if p_ap.abs() < 1e-15 {
            // Singular or nearly so
            break;
        }
        let alpha = r_norm_sq / p_ap;

        x += alpha * &p;
        r -= alpha * &ap;

        let new_r_norm_sq = r.dot(&r);
        if new_r_norm_sq.sqrt() / b_norm < tolerance {
            return Ok(x);
        }

        let beta = new_r_norm_sq / r_norm_sq;
        p = &r + beta * &p;

        r_norm_sq = new_r_norm_sq;
    }

    log::error!("conjugate gradient did not converge in {max_iter} iterations");
    Err(ParamError::Solve {
        kind: SolveFailure::NoConvergence {
            iterations: max_iter,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd_2x2() -> CsrMatrix {
        // [ 4  1 ]
        // [ 1  3 ]
        let mut triplets = vec![(1, 1, 3.0), (0, 1, 1.0), (0, 0, 4.0), (1, 0, 1.0)];
        CsrMatrix::from_triplets(2, 2, &mut triplets)
    }

    #[test]
    fn test_csr_from_triplets() {
        let a = spd_2x2();
        assert_eq!(a.nrows(), 2);
        assert_eq!(a.ncols(), 2);
        assert_eq!(a.nnz(), 4);
        assert_eq!(a.diagonal(0), 4.0);
        assert_eq!(a.diagonal(1), 3.0);
    }

    #[test]
    fn test_csr_from_triplets_with_duplicates() {
        let mut triplets = vec![
            (0, 0, 2.0),
            (0, 0, 2.0), // Duplicate: should sum to 4.0
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
        ];
        let a = CsrMatrix::from_triplets(2, 2, &mut triplets);
        assert_eq!(a.nnz(), 4);

        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 0.0]));
        assert!((y[0] - 4.0).abs() < 1e-10);
        assert!((y[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_csr_empty_rows() {
        // Rows 0 and 2 empty
        let mut triplets = vec![(1, 2, 5.0), (3, 0, -1.0)];
        let a = CsrMatrix::from_triplets(4, 3, &mut triplets);
        assert_eq!(a.row(0).count(), 0);
        assert_eq!(a.row(2).count(), 0);
        assert_eq!(a.row(1).collect::<Vec<_>>(), vec![(2, 5.0)]);

        let y = a.mul_vec(&DVector::from_vec(vec![2.0, 0.0, 1.0]));
        assert_eq!(y.as_slice(), &[0.0, 5.0, 0.0, -2.0]);
    }

    #[test]
    fn test_refill_reuses_matrix() {
        let mut a = spd_2x2();
        let mut triplets = vec![(0, 0, 1.0)];
        a.refill(1, 1, &mut triplets);
        assert_eq!(a.nrows(), 1);
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.diagonal(0), 1.0);
    }

    #[test]
    fn test_csr_mul_vec() {
        // [ 4  1 ]   [ 1 ]   [ 5 ]
        // [ 1  3 ] * [ 1 ] = [ 4 ]
        let y = spd_2x2().mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert!((y[0] - 5.0).abs() < 1e-10);
        assert!((y[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_normal_equations_weighting() {
        // x0 = 1 (w = 2), x0 - x1 = 0 (w = 1), x1 = 3 (w = 0, ignored)
        let mut triplets = vec![(0, 0, 1.0), (1, 0, 1.0), (1, 1, -1.0), (2, 1, 1.0)];
        let a = CsrMatrix::from_triplets(3, 2, &mut triplets);
        let weights = [2.0, 1.0, 0.0];
        let b = [1.0, 0.0, 3.0];

        let mut normal = Vec::new();
        let rhs = accumulate_normal_equations(&a, &weights, &b, &mut normal).unwrap();
        let n = CsrMatrix::from_triplets(2, 2, &mut normal);

        // N = [[4 + 1, -1], [-1, 1]], r = [4, 0]
        assert!((n.diagonal(0) - 5.0).abs() < 1e-12);
        assert!((n.diagonal(1) - 1.0).abs() < 1e-12);
        let y = n.mul_vec(&DVector::from_vec(vec![0.0, 1.0]));
        assert!((y[0] + 1.0).abs() < 1e-12);
        assert!((rhs[0] - 4.0).abs() < 1e-12);
        assert!(rhs[1].abs() < 1e-12);

        assert!(matches!(
            accumulate_normal_equations(&a, &weights[..2], &b, &mut normal),
            Err(ParamError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_symmetric_to_csc() {
        let csc = spd_2x2().symmetric_to_csc().unwrap();
        assert_eq!(csc.nrows(), 2);
        assert_eq!(csc.nnz(), 4);

        let mut triplets = vec![(0, 0, 1.0)];
        let rect = CsrMatrix::from_triplets(1, 2, &mut triplets);
        assert!(rect.symmetric_to_csc().is_err());
    }

    #[test]
    fn test_cg_simple() {
        // Solution: x = 1/11, y = 7/11
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);

        let x = conjugate_gradient(&a, &b, None, 100, 1e-10).unwrap();

        let residual = a.mul_vec(&x) - b;
        assert!(residual.norm() < 1e-8);
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-8);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-8);
    }

    #[test]
    fn test_cg_larger_system() {
        // 4x4 symmetric positive definite matrix (diagonally dominant)
        let mut triplets = vec![
            (0, 0, 10.0),
            (0, 1, 1.0),
            (0, 2, 2.0),
            (1, 0, 1.0),
            (1, 1, 10.0),
            (1, 2, 1.0),
            (2, 0, 2.0),
            (2, 1, 1.0),
            (2, 2, 10.0),
            (2, 3, 1.0),
            (3, 2, 1.0),
            (3, 3, 10.0),
        ];
        let a = CsrMatrix::from_triplets(4, 4, &mut triplets);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);

        let x = conjugate_gradient(&a, &b, None, 100, 1e-10).unwrap();
        let residual = a.mul_vec(&x) - &b;
        assert!(residual.norm() < 1e-8);
    }

    #[test]
    fn test_cg_with_initial_guess() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);

        let x0 = DVector::from_vec(vec![0.1, 0.6]);
        let x = conjugate_gradient(&a, &b, Some(&x0), 100, 1e-10).unwrap();

        let residual = a.mul_vec(&x) - b;
        assert!(residual.norm() < 1e-8);
    }

    #[test]
    fn test_cg_reports_no_convergence() {
        let mut triplets = vec![
            (0, 0, 10.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 1.0),
            (2, 2, 5.0),
        ];
        let a = CsrMatrix::from_triplets(3, 3, &mut triplets);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_eq!(
            conjugate_gradient(&a, &b, None, 1, 1e-14).unwrap_err(),
            ParamError::Solve {
                kind: SolveFailure::NoConvergence { iterations: 1 }
            }
        );
    }
}
