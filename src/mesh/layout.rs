//! Working 2D layout storage.
//!
//! This module provides the [`Layout`] type holding one 2D position per
//! vertex, and the mapping between a layout and the flat unknown vector
//! solved for by the optimizer.
//!
//! # Unknown ordering
//!
//! Vertex `i` owns two consecutive unknowns: its U coordinate at slot `2i`
//! and its V coordinate at slot `2i + 1`. Every equation addresses unknowns
//! through [`u_col`] and [`v_col`].

use nalgebra::{DVector, Point2};

use crate::error::{ParamError, Result};

/// Column of vertex `v`'s U coordinate in the unknown vector.
#[inline]
pub const fn u_col(v: usize) -> usize {
    2 * v
}

/// Column of vertex `v`'s V coordinate in the unknown vector.
#[inline]
pub const fn v_col(v: usize) -> usize {
    2 * v + 1
}

/// 2D positions for patch vertices.
///
/// Positions are indexed by vertex (index 0 corresponds to vertex 0, etc.).
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    coords: Vec<Point2<f64>>,
}

impl Layout {
    /// Create a layout from per-vertex positions.
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self { coords }
    }

    /// Create a layout with every vertex at the origin.
    pub fn zeros(n: usize) -> Self {
        Self {
            coords: vec![Point2::origin(); n],
        }
    }

    /// Rebuild a layout from a flat unknown vector.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::DimensionMismatch`] if the vector length is odd.
    pub fn from_unknowns(x: &DVector<f64>) -> Result<Self> {
        if x.len() % 2 != 0 {
            return Err(ParamError::DimensionMismatch {
                what: "unknown vector",
                expected: x.len() + 1,
                actual: x.len(),
            });
        }
        let coords = (0..x.len() / 2)
            .map(|i| Point2::new(x[u_col(i)], x[v_col(i)]))
            .collect();
        Ok(Self { coords })
    }

    /// Flatten into the unknown vector (`[u0, v0, u1, v1, ...]`).
    pub fn to_unknowns(&self) -> DVector<f64> {
        let mut x = DVector::zeros(2 * self.coords.len());
        for (i, p) in self.coords.iter().enumerate() {
            x[u_col(i)] = p.x;
            x[v_col(i)] = p.y;
        }
        x
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn get(&self, v: usize) -> Point2<f64> {
        self.coords[v]
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set(&mut self, v: usize, p: Point2<f64>) {
        self.coords[v] = p;
    }

    /// Get the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Positions of a triangle's corners.
    #[inline]
    pub fn triangle(&self, tri: [usize; 3]) -> [Point2<f64>; 3] {
        [self.coords[tri[0]], self.coords[tri[1]], self.coords[tri[2]]]
    }

    /// Iterate over all positions with their vertex indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Point2<f64>)> + '_ {
        self.coords.iter().copied().enumerate()
    }

    /// Get the raw coordinates slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_convention() {
        assert_eq!(u_col(0), 0);
        assert_eq!(v_col(0), 1);
        assert_eq!(u_col(7), 14);
        assert_eq!(v_col(7), 15);
    }

    #[test]
    fn test_unknown_round_trip() {
        let layout = Layout::new(vec![
            Point2::new(0.0, 1.0),
            Point2::new(2.0, 3.0),
            Point2::new(4.0, 5.0),
        ]);
        let x = layout.to_unknowns();
        assert_eq!(x.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(Layout::from_unknowns(&x).unwrap(), layout);
    }

    #[test]
    fn test_odd_unknown_vector_rejected() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            Layout::from_unknowns(&x),
            Err(ParamError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_layout_triangle_and_set() {
        let mut layout = Layout::zeros(3);
        layout.set(2, Point2::new(0.5, 1.0));
        assert_eq!(layout.len(), 3);
        assert!(!layout.is_empty());
        assert_eq!(layout.triangle([2, 0, 1])[0], Point2::new(0.5, 1.0));
        assert_eq!(layout.iter().count(), 3);
    }
}
