//! Patch geometry and working layout.
//!
//! The optimizer consumes two pieces of state:
//! - [`PatchMesh`]: the triangle list and the 3D source positions, immutable
//!   for the lifetime of an optimizer
//! - [`Layout`]: the working 2D position of every vertex, read and replaced
//!   on every solve
//!
//! ```
//! use pleat::mesh::{Layout, PatchMesh};
//! use nalgebra::{Point2, Point3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let patch = PatchMesh::new(positions, vec![[0, 1, 2]]).unwrap();
//!
//! let layout = Layout::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.5, 1.0),
//! ]);
//! assert_eq!(layout.len(), patch.num_vertices());
//! ```

mod layout;
mod patch;

pub use layout::{u_col, v_col, Layout};
pub use patch::PatchMesh;
