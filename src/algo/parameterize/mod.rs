//! Barycentric least-squares flattening.
//!
//! This module flattens a 3D triangle patch into the plane by repeatedly
//! solving one weighted linear least-squares problem. Each solve relates the
//! current 2D layout to the 3D surface through several equation families:
//!
//! - **Stretch**: a unit step along U (or V) in a triangle covers the 3D
//!   length it maps onto
//! - **Angle**: a diagonal step projects onto U and V as it does in 3D
//! - **Edges**: edge vectors match the 3D triangle rigidly aligned onto the
//!   layout
//! - **Seed**: vertex 0 keeps its position
//! - **Selected**: two chosen vertices share the same V
//! - **Darts**: the two arms of each dart mirror each other
//!
//! Each family can be toggled and weighted through [`BaryOptions`].
//!
//! # Example
//!
//! ```
//! use pleat::algo::parameterize::{darts_from_ordered_cuts, BaryOptimizer, BaryOptions};
//! use pleat::mesh::{Layout, PatchMesh};
//! use nalgebra::{Point2, Point3};
//!
//! let patch = PatchMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.2),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.2),
//!     ],
//!     vec![[0, 1, 2], [0, 2, 3]],
//! )
//! .unwrap();
//! let layout = Layout::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//! ]);
//!
//! // Even-length cuts are skipped
//! let darts = darts_from_ordered_cuts(&[vec![1, 0, 3], vec![1, 2]]);
//! assert_eq!(darts.len(), 1);
//!
//! let mut optimizer = BaryOptimizer::new(patch, darts, BaryOptions::default()).unwrap();
//! let next = optimizer.solve(&layout).unwrap();
//! assert_eq!(next.len(), 4);
//! ```
//!
//! # References
//!
//! - Liu, L., Zhang, L., Xu, Y., Gotsman, C., & Gortler, S. J. (2008). "A
//!   local/global approach to mesh parameterization." Computer Graphics Forum.

mod assembler;
mod barycentric;
mod dart;
mod optimizer;
mod options;
mod procrustes;
mod score;
mod solver;
mod sparse;

pub use assembler::{
    predict_equation_count, predict_triplet_count, rows_per_triangle, EquationAssembler,
    EquationSystem,
};
pub use barycentric::{barycentric_coords, interpolate, signed_area, ProbeFrame};
pub use dart::{darts_from_ordered_cuts, SimpleDart, SymmetryAxis};
pub use optimizer::BaryOptimizer;
pub use options::{BaryOptions, LinearSolver};
pub use procrustes::{
    align, aligned_edge_targets, flatten_triangle, RigidTransform2, DEFAULT_FLATTEN_TOLERANCE,
    TRIANGLE_EDGES,
};
pub use score::{
    evaluate, jacobian_stretch, percentile, stretch_compression, triangle_jacobian, FaceStretch,
    Score,
};
pub use solver::WeightedLeastSquaresSolver;
pub use sparse::{conjugate_gradient, CsrMatrix, Triplet};
