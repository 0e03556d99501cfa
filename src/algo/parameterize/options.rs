//! Configuration of the barycentric optimizer.

use crate::error::{ParamError, Result};

use super::procrustes::DEFAULT_FLATTEN_TOLERANCE;

/// Linear solver used for the normal equations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinearSolver {
    /// Sparse Cholesky factorization, recomputed every solve.
    Cholesky,

    /// Conjugate gradient warm-started from the current layout.
    ConjugateGradient {
        /// Maximum number of CG iterations.
        max_iterations: usize,
        /// Convergence tolerance (relative residual norm).
        tolerance: f64,
    },
}

impl Default for LinearSolver {
    fn default() -> Self {
        LinearSolver::Cholesky
    }
}

/// Options for the barycentric least-squares optimizer.
///
/// Every equation family can be switched on or off and carries its own
/// weight. Options are fixed when an optimizer is built: the number of
/// equations is derived from them once.
#[derive(Debug, Clone, PartialEq)]
pub struct BaryOptions {
    /// Emit two stretch equations per triangle.
    pub enable_stretch_eqs: bool,
    /// Emit two angle (shear) equations per triangle.
    pub enable_angle_eqs: bool,
    /// Emit six edge equations per triangle.
    pub enable_edges_eqs: bool,
    /// Pin vertex 0 to its current position.
    pub enable_set_seed_eqs: bool,
    /// Emit the selected-pair equation.
    pub enable_selected_eqs: bool,
    /// Emit dart symmetry equations.
    pub enable_dart_sym_eqs: bool,

    /// Weight of stretch equations.
    pub stretch_coeff: f64,
    /// Weight of angle equations.
    pub angle_coeff: f64,
    /// Weight of edge equations.
    pub edges_coeff: f64,
    /// Weight of the two seed equations.
    pub seed_coeff: f64,
    /// Weight of the selected-pair equation.
    pub selected_coeff: f64,
    /// Weight of dart symmetry equations.
    pub dart_sym_coeff: f64,

    /// Largest out-of-plane coordinate accepted when flattening a 3D triangle.
    pub flatten_tolerance: f64,

    /// Solver for the normal equations.
    pub solver: LinearSolver,

    /// Weight of a pull towards the current layout, added to every unknown.
    ///
    /// Zero keeps the system exactly as assembled; a small positive value
    /// makes under-anchored systems solvable.
    pub proximal_weight: f64,

    /// Compute per-triangle equations on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BaryOptions {
    fn default() -> Self {
        Self {
            enable_stretch_eqs: true,
            enable_angle_eqs: true,
            enable_edges_eqs: true,
            enable_set_seed_eqs: true,
            enable_selected_eqs: false,
            enable_dart_sym_eqs: true,
            stretch_coeff: 1.0,
            angle_coeff: 1.0,
            edges_coeff: 1.0,
            seed_coeff: 1.0,
            selected_coeff: 1.0,
            dart_sym_coeff: 1.0,
            flatten_tolerance: DEFAULT_FLATTEN_TOLERANCE,
            solver: LinearSolver::Cholesky,
            proximal_weight: 0.0,
            parallel: false,
        }
    }
}

impl BaryOptions {
    /// Options with every equation family disabled.
    ///
    /// Useful as a starting point for enabling families one by one.
    pub fn none() -> Self {
        Self {
            enable_stretch_eqs: false,
            enable_angle_eqs: false,
            enable_edges_eqs: false,
            enable_set_seed_eqs: false,
            enable_selected_eqs: false,
            enable_dart_sym_eqs: false,
            ..Default::default()
        }
    }

    /// Enable or disable stretch equations with the given weight.
    pub fn with_stretch(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_stretch_eqs = enabled;
        self.stretch_coeff = coeff;
        self
    }

    /// Enable or disable angle equations with the given weight.
    pub fn with_angle(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_angle_eqs = enabled;
        self.angle_coeff = coeff;
        self
    }

    /// Enable or disable edge equations with the given weight.
    pub fn with_edges(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_edges_eqs = enabled;
        self.edges_coeff = coeff;
        self
    }

    /// Enable or disable seed equations with the given weight.
    pub fn with_seed(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_set_seed_eqs = enabled;
        self.seed_coeff = coeff;
        self
    }

    /// Enable or disable the selected-pair equation with the given weight.
    pub fn with_selected(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_selected_eqs = enabled;
        self.selected_coeff = coeff;
        self
    }

    /// Enable or disable dart symmetry equations with the given weight.
    pub fn with_dart_sym(mut self, enabled: bool, coeff: f64) -> Self {
        self.enable_dart_sym_eqs = enabled;
        self.dart_sym_coeff = coeff;
        self
    }

    /// Set the linear solver.
    pub fn with_solver(mut self, solver: LinearSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Set the proximal weight.
    pub fn with_proximal_weight(mut self, weight: f64) -> Self {
        self.proximal_weight = weight;
        self
    }

    /// Set the flattening tolerance.
    pub fn with_flatten_tolerance(mut self, tol: f64) -> Self {
        self.flatten_tolerance = tol;
        self
    }

    /// Set whether per-triangle equations are computed in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Multiply every family weight (and the proximal weight) by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.stretch_coeff *= factor;
        self.angle_coeff *= factor;
        self.edges_coeff *= factor;
        self.seed_coeff *= factor;
        self.selected_coeff *= factor;
        self.dart_sym_coeff *= factor;
        self.proximal_weight *= factor;
        self
    }

    /// Check that weights and tolerances are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidParameter`] for negative or non-finite
    /// weights, a non-positive flattening tolerance, or an unusable CG setup.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("stretch_coeff", self.stretch_coeff),
            ("angle_coeff", self.angle_coeff),
            ("edges_coeff", self.edges_coeff),
            ("seed_coeff", self.seed_coeff),
            ("selected_coeff", self.selected_coeff),
            ("dart_sym_coeff", self.dart_sym_coeff),
            ("proximal_weight", self.proximal_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamError::invalid_param(
                    name,
                    value,
                    "must be finite and non-negative",
                ));
            }
        }

        if !(self.flatten_tolerance > 0.0) {
            return Err(ParamError::invalid_param(
                "flatten_tolerance",
                self.flatten_tolerance,
                "must be positive",
            ));
        }

        if let LinearSolver::ConjugateGradient {
            max_iterations,
            tolerance,
        } = self.solver
        {
            if max_iterations == 0 {
                return Err(ParamError::invalid_param(
                    "max_iterations",
                    max_iterations,
                    "must be at least 1",
                ));
            }
            if !(tolerance > 0.0) {
                return Err(ParamError::invalid_param(
                    "tolerance",
                    tolerance,
                    "must be positive",
                ));
            }
        }

        Ok(())
    }
}
