//! Solver for the weighted normal equations.
//!
//! Minimizes `|W (A x - b)|^2` by solving `A^T W^2 A x = A^T W^2 b`, either
//! with a sparse Cholesky factorization or with conjugate gradients
//! warm-started from the current layout.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;

use crate::error::{FactorizationFailure, ParamError, Result, SolveFailure};

use super::assembler::EquationSystem;
use super::options::LinearSolver;
use super::sparse::{accumulate_normal_equations, conjugate_gradient, CsrMatrix, Triplet};

/// Largest accepted relative residual of a Cholesky solution.
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Weighted linear least-squares solver with reusable buffers.
#[derive(Debug, Clone)]
pub struct WeightedLeastSquaresSolver {
    n_unknowns: usize,
    kind: LinearSolver,
    proximal_weight: f64,
    a_triplets: Vec<Triplet>,
    normal_triplets: Vec<Triplet>,
    a: CsrMatrix,
    normal: CsrMatrix,
}

impl WeightedLeastSquaresSolver {
    /// Create a solver for `n_unknowns` unknowns.
    pub fn new(n_unknowns: usize, kind: LinearSolver) -> Self {
        Self {
            n_unknowns,
            kind,
            proximal_weight: 0.0,
            a_triplets: Vec::new(),
            normal_triplets: Vec::new(),
            a: CsrMatrix::default(),
            normal: CsrMatrix::default(),
        }
    }

    /// Add `weight * |x - warm_start|^2` to the objective.
    pub fn with_proximal_weight(mut self, weight: f64) -> Self {
        self.proximal_weight = weight;
        self
    }

    /// Number of unknowns.
    #[inline]
    pub fn n_unknowns(&self) -> usize {
        self.n_unknowns
    }

    /// The normal matrix of the last call, for inspection.
    pub fn normal_matrix(&self) -> &CsrMatrix {
        &self.normal
    }

    /// Solve the least-squares problem of `system`.
    ///
    /// `warm_start` is the current unknown vector. It seeds conjugate
    /// gradients and anchors the proximal term.
    ///
    /// # Errors
    ///
    /// - [`ParamError::DimensionMismatch`] if sizes disagree
    /// - [`ParamError::Factorization`] if the normal matrix cannot be factorized
    /// - [`ParamError::Solve`] for non-finite input, a non-finite or
    ///   inaccurate solution, or conjugate gradients not converging
    pub fn solve(
        &mut self,
        system: &EquationSystem,
        warm_start: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        let n = self.n_unknowns;
        if system.n_cols() != n {
            return Err(ParamError::DimensionMismatch {
                what: "system unknowns",
                expected: n,
                actual: system.n_cols(),
            });
        }
        if warm_start.len() != n {
            return Err(ParamError::DimensionMismatch {
                what: "warm start",
                expected: n,
                actual: warm_start.len(),
            });
        }

        let finite_input = system
            .rhs()
            .iter()
            .chain(system.weights())
            .chain(warm_start.iter())
            .all(|v| v.is_finite());
        if !finite_input {
            log::error!("least-squares input contains non-finite values");
            return Err(ParamError::Solve {
                kind: SolveFailure::InvalidInput,
            });
        }

        self.a_triplets.clear();
        self.a_triplets.extend_from_slice(system.triplets());
        self.a.refill(system.n_rows(), n, &mut self.a_triplets);

        let mut rhs = accumulate_normal_equations(
            &self.a,
            system.weights(),
            system.rhs(),
            &mut self.normal_triplets,
        )?;

        if self.proximal_weight > 0.0 {
            for j in 0..n {
                self.normal_triplets.push((j, j, self.proximal_weight));
                rhs[j] += self.proximal_weight * warm_start[j];
            }
        }

        self.normal.refill(n, n, &mut self.normal_triplets);
        log::debug!(
            "normal equations: {n} unknowns, {} non-zeros",
            self.normal.nnz()
        );

        self.check_normal_matrix()?;

        let x = match self.kind {
            LinearSolver::Cholesky => self.solve_cholesky(&rhs)?,
            LinearSolver::ConjugateGradient {
                max_iterations,
                tolerance,
            } => conjugate_gradient(&self.normal, &rhs, Some(warm_start), max_iterations, tolerance)?,
        };

        if !x.iter().all(|v| v.is_finite()) {
            log::error!("least-squares solution contains non-finite values");
            return Err(ParamError::Solve {
                kind: SolveFailure::NumericalIssue,
            });
        }

        Ok(x)
    }

    fn check_normal_matrix(&self) -> Result<()> {
        if !self.normal.is_finite() {
            log::error!("normal matrix contains non-finite entries");
            return Err(ParamError::Factorization {
                kind: FactorizationFailure::NonFiniteEntry,
            });
        }

        if let Some(column) = (0..self.n_unknowns).find(|&j| !(self.normal.diagonal(j) > 0.0)) {
            log::error!("unknown {column} is not constrained by any weighted equation");
            return Err(ParamError::Factorization {
                kind: FactorizationFailure::RankDeficient { column },
            });
        }

        Ok(())
    }

    fn solve_cholesky(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let n = self.n_unknowns;
        let csc = self.normal.symmetric_to_csc()?;
        let cholesky = CscCholesky::factor(&csc).map_err(|e| {
            log::error!("sparse Cholesky failed: {e}");
            ParamError::Factorization {
                kind: FactorizationFailure::NotPositiveDefinite,
            }
        })?;

        let b = DMatrix::from_column_slice(n, 1, rhs.as_slice());
        let solution = cholesky.solve(&b);
        let x: DVector<f64> = solution.column(0).into_owned();

        let residual = (self.normal.mul_vec(&x) - rhs).norm();
        if !(residual <= RESIDUAL_TOLERANCE * rhs.norm()) {
            log::error!(
                "Cholesky solution residual {residual:e} exceeds tolerance (rhs norm {:e})",
                rhs.norm()
            );
            return Err(ParamError::Solve {
                kind: SolveFailure::NumericalIssue,
            });
        }

        Ok(x)
    }
}
