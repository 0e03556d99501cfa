//! # Pleat
//!
//! Flattening of 3D triangle patches into 2D layouts by barycentric
//! least squares.
//!
//! Pleat targets garment-style patches: each solve pulls a 2D layout towards
//! the local stretch, shear and edge lengths of the 3D surface while keeping
//! darts (folded boundary chains) mirror-symmetric.
//!
//! ## Features
//!
//! - **Per-triangle equations**: stretch, angle and rigidly aligned edge targets
//! - **Constraints**: seed pinning, a selected vertex pair, dart symmetry
//! - **Sparse solvers**: Cholesky via `nalgebra-sparse` or conjugate gradients
//! - **Diagnostics**: per-family residuals, per-triangle stretch ratios and
//!   Jacobians
//!
//! ## Quick Start
//!
//! ```
//! use pleat::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! let patch = PatchMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 0.8, 0.4),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//! let mut layout = Layout::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(2.0, 0.0),
//!     Point2::new(1.0, 2.0),
//! ]);
//!
//! let mut optimizer = BaryOptimizer::new(patch, Vec::new(), BaryOptions::default()).unwrap();
//! for _ in 0..10 {
//!     layout = optimizer.solve(&layout).unwrap();
//! }
//! println!("{:?}", optimizer.score(&layout).unwrap());
//! ```
//!
//! ## Logging
//!
//! Pleat reports through the [`log`](https://docs.rs/log) facade and installs
//! no logger of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use pleat::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::parameterize::{
        darts_from_ordered_cuts, BaryOptimizer, BaryOptions, LinearSolver, Score, SimpleDart,
    };
    pub use crate::error::{ParamError, Result};
    pub use crate::mesh::{Layout, PatchMesh};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point2, Point3};

    #[test]
    fn test_flatten_tilted_square() {
        // Unit square folded along its diagonal
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.3),
        ];
        let patch = PatchMesh::new(positions, vec![[0, 1, 2], [0, 2, 3]]).unwrap();
        let mut layout = Layout::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.2, 0.1),
            Point2::new(1.1, 1.3),
            Point2::new(-0.1, 0.9),
        ]);

        let mut optimizer = BaryOptimizer::new(patch, Vec::new(), BaryOptions::default()).unwrap();
        let before = optimizer.score(&layout).unwrap();
        for _ in 0..10 {
            layout = optimizer.solve(&layout).unwrap();
        }
        let after = optimizer.score(&layout).unwrap();

        assert_eq!(optimizer.equation_count(), 2 * 10 + 2);
        assert!(after.edges < before.edges);
        assert!((layout.get(0) - Point2::origin()).norm() < 1e-6);
    }
}
