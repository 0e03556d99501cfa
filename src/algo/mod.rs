//! Flattening algorithms.
//!
//! - **Parameterization**: barycentric least-squares flattening with dart
//!   symmetry constraints

pub mod parameterize;
