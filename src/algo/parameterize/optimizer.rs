//! One global step of barycentric least-squares flattening.
//!
//! [`BaryOptimizer`] is built once per patch, dart set and option set. Each
//! [`BaryOptimizer::solve`] call linearizes every equation around the given
//! layout, solves the weighted least-squares system once and returns the
//! new layout. Iterating until the layout settles is left to the caller.
//!
//! # Example
//!
//! ```
//! use pleat::algo::parameterize::{BaryOptimizer, BaryOptions};
//! use pleat::mesh::{Layout, PatchMesh};
//! use nalgebra::{Point2, Point3};
//!
//! let patch = PatchMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.5),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//! let mut layout = Layout::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.0, 1.0),
//! ]);
//!
//! let mut optimizer = BaryOptimizer::new(patch, Vec::new(), BaryOptions::default()).unwrap();
//! let before = optimizer.score(&layout).unwrap();
//! for _ in 0..5 {
//!     layout = optimizer.solve(&layout).unwrap();
//! }
//! let after = optimizer.score(&layout).unwrap();
//! assert!(after.edges < before.edges);
//! ```

use nalgebra::DVector;

use crate::error::{ParamError, Result};
use crate::mesh::{Layout, PatchMesh};

use super::assembler::{EquationAssembler, EquationSystem};
use super::dart::SimpleDart;
use super::options::BaryOptions;
use super::procrustes::flatten_triangle;
use super::score::{evaluate, Score};
use super::solver::WeightedLeastSquaresSolver;

/// Barycentric least-squares optimizer for one patch.
#[derive(Debug, Clone)]
pub struct BaryOptimizer {
    patch: PatchMesh,
    options: BaryOptions,
    darts: Vec<SimpleDart>,
    active: Vec<usize>,
    excluded: Vec<usize>,
    selection: Option<(usize, usize)>,
    assembler: EquationAssembler,
    solver: WeightedLeastSquaresSolver,
    solution: Option<DVector<f64>>,
}

impl BaryOptimizer {
    /// Create an optimizer and size all of its buffers.
    ///
    /// Triangles whose 3D shape cannot be flattened are excluded from every
    /// per-triangle equation family.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidParameter`] for invalid options or a dart
    /// vertex outside the patch.
    pub fn new(patch: PatchMesh, darts: Vec<SimpleDart>, options: BaryOptions) -> Result<Self> {
        options.validate()?;

        let n_vertices = patch.num_vertices();
        let mut active = Vec::with_capacity(patch.num_triangles());
        let mut excluded = Vec::new();
        for t in 0..patch.num_triangles() {
            match flatten_triangle(&patch.triangle_points(t), options.flatten_tolerance) {
                Ok(_) => active.push(t),
                Err(ParamError::Flattening { deviation, .. }) => {
                    log::warn!(
                        "triangle {t} cannot be flattened (deviation {deviation}); excluded"
                    );
                    excluded.push(t);
                }
                Err(e) => return Err(e),
            }
        }

        let assembler =
            EquationAssembler::new(options.clone(), &patch, active.clone(), darts.clone())?;
        let solver = WeightedLeastSquaresSolver::new(2 * n_vertices, options.solver)
            .with_proximal_weight(options.proximal_weight);

        log::debug!(
            "optimizer: {} vertices, {} active triangles, {} excluded, {} darts, {} equations",
            n_vertices,
            active.len(),
            excluded.len(),
            darts.len(),
            assembler.equation_count()
        );

        Ok(Self {
            patch,
            options,
            darts,
            active,
            excluded,
            selection: None,
            assembler,
            solver,
            solution: None,
        })
    }

    /// Set or clear the selected vertex pair.
    ///
    /// Invalid pairs are accepted here and turn into a disabled equation.
    pub fn set_selection(&mut self, selection: Option<(usize, usize)>) {
        self.selection = selection;
    }

    /// The selected vertex pair.
    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// The fixed number of equations per solve.
    #[inline]
    pub fn equation_count(&self) -> usize {
        self.assembler.equation_count()
    }

    /// Triangles that receive per-triangle equations.
    pub fn active_triangles(&self) -> &[usize] {
        &self.active
    }

    /// Triangles dropped at construction because they cannot be flattened.
    pub fn excluded_triangles(&self) -> &[usize] {
        &self.excluded
    }

    /// Triangles that were degenerate in the layout of the last solve.
    pub fn skipped_triangles(&self) -> &[usize] {
        self.assembler.skipped_triangles()
    }

    /// The system assembled by the last solve.
    pub fn system(&self) -> &EquationSystem {
        self.assembler.system()
    }

    /// The options this optimizer was built with.
    pub fn options(&self) -> &BaryOptions {
        &self.options
    }

    /// The patch being flattened.
    pub fn patch(&self) -> &PatchMesh {
        &self.patch
    }

    /// Darts constrained by this optimizer.
    pub fn darts(&self) -> &[SimpleDart] {
        &self.darts
    }

    /// Unknown vector of the last successful solve.
    pub fn last_solution(&self) -> Option<&DVector<f64>> {
        self.solution.as_ref()
    }

    /// Run one assembly and one solve around `layout`.
    ///
    /// On failure the last solution is left unchanged.
    ///
    /// # Errors
    ///
    /// Propagates assembly errors ([`ParamError::DimensionMismatch`] and the
    /// internal consistency errors) and solver errors
    /// ([`ParamError::Factorization`], [`ParamError::Solve`]).
    pub fn solve(&mut self, layout: &Layout) -> Result<Layout> {
        let warm_start = layout.to_unknowns();
        let system = self
            .assembler
            .assemble(&self.patch, layout, self.selection)?;
        let x = self.solver.solve(system, &warm_start)?;

        let result = Layout::from_unknowns(&x)?;
        self.solution = Some(x);
        Ok(result)
    }

    /// Residuals of `layout` for this patch, selection and darts.
    pub fn score(&self, layout: &Layout) -> Result<Score> {
        evaluate(
            &self.patch,
            layout,
            &self.active,
            self.selection,
            &self.darts,
            self.options.flatten_tolerance,
        )
    }
}
