//! Dart symmetry constraints.
//!
//! A dart is an ordered chain of boundary vertices `[a_0, ..., a_k, ..., a_2k]`
//! folding around its middle vertex `a_k` (the tip). In a well-formed layout
//! the two arms mirror each other across an axis through the tip, so vertex
//! `a_i` pairs with its counterpart `a_{2k-i}`.

use nalgebra::{Point2, Unit, Vector2};

use crate::error::{ParamError, Result};
use crate::mesh::Layout;

/// Squared length below which axis candidates are rejected.
const AXIS_EPS: f64 = 1e-24;

/// An odd-length vertex chain with a central tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleDart {
    vertices: Vec<usize>,
}

impl SimpleDart {
    /// Create a dart from an ordered vertex chain.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidDart`] if the chain is even or shorter than 3.
    pub fn new(vertices: Vec<usize>) -> Result<Self> {
        if vertices.len() < 3 || vertices.len() % 2 == 0 {
            return Err(ParamError::InvalidDart {
                len: vertices.len(),
            });
        }
        Ok(Self { vertices })
    }

    /// Number of vertices including the tip.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false: a dart has at least three vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All vertices in chain order.
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Position of the tip in the chain.
    #[inline]
    pub fn tip_position(&self) -> usize {
        self.vertices.len() / 2
    }

    /// The tip vertex.
    #[inline]
    pub fn tip(&self) -> usize {
        self.vertices[self.tip_position()]
    }

    /// Number of non-tip vertices; each receives one symmetry target.
    #[inline]
    pub fn arm_len(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Non-tip vertices in chain order.
    pub fn arm_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        let tip = self.tip_position();
        self.vertices
            .iter()
            .enumerate()
            .filter(move |&(pos, _)| pos != tip)
            .map(|(_, &v)| v)
    }

    /// Chain position mirroring `pos` across the tip.
    #[inline]
    pub fn counterpart(&self, pos: usize) -> usize {
        self.vertices.len() - 1 - pos
    }

    /// Axis the two arms should mirror across in the current layout.
    ///
    /// The axis passes through the tip towards the midpoint of the dart's
    /// opening (first and last vertices). When that midpoint sits on the tip
    /// the axis is taken perpendicular to the opening instead.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::DegenerateDart`] if the tip and both endpoints coincide.
    pub fn symmetry_axis(&self, layout: &Layout) -> Result<SymmetryAxis> {
        let tip = layout.get(self.tip());
        let first = layout.get(self.vertices[0]);
        let last = layout.get(self.vertices[self.vertices.len() - 1]);

        let opening_mid = Point2::from((first.coords + last.coords) * 0.5);
        let towards_opening = opening_mid - tip;
        if towards_opening.norm_squared() > AXIS_EPS {
            return Ok(SymmetryAxis::new(tip, Unit::new_normalize(towards_opening)));
        }

        let across = last - first;
        if across.norm_squared() > AXIS_EPS {
            let perpendicular = Vector2::new(-across.y, across.x);
            return Ok(SymmetryAxis::new(tip, Unit::new_normalize(perpendicular)));
        }

        Err(ParamError::DegenerateDart { tip: self.tip() })
    }

    /// Symmetric target position of every non-tip vertex, in chain order.
    ///
    /// The target of vertex `p_i` with counterpart `p_j` is
    /// `(p_i + reflect(p_j)) / 2`, the closest mirror-symmetric placement of
    /// the pair. Paired targets are exact reflections of each other, and a
    /// layout that is already symmetric maps onto itself. Targeting the bare
    /// reflection of the counterpart would only swap the two sides of each
    /// pair on every solve.
    pub fn symmetry_targets(&self, layout: &Layout, axis: &SymmetryAxis) -> Vec<Point2<f64>> {
        let tip = self.tip_position();
        (0..self.vertices.len())
            .filter(|&pos| pos != tip)
            .map(|pos| {
                let own = layout.get(self.vertices[pos]);
                let mirrored = axis.reflect(&layout.get(self.vertices[self.counterpart(pos)]));
                Point2::from((own.coords + mirrored.coords) * 0.5)
            })
            .collect()
    }
}

/// Build darts from ordered boundary cuts, skipping unusable ones.
///
/// Cuts of even length (or shorter than 3) have no tip and are dropped with
/// a warning.
pub fn darts_from_ordered_cuts(cuts: &[Vec<usize>]) -> Vec<SimpleDart> {
    cuts.iter()
        .enumerate()
        .filter_map(|(i, cut)| match SimpleDart::new(cut.clone()) {
            Ok(dart) => Some(dart),
            Err(e) => {
                log::warn!("skipping cut {i}: {e}");
                None
            }
        })
        .collect()
}

/// A line in the plane used as a mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryAxis {
    /// A point on the axis.
    pub origin: Point2<f64>,
    /// Unit direction of the axis.
    pub direction: Unit<Vector2<f64>>,
}

impl SymmetryAxis {
    /// Create an axis through `origin` along `direction`.
    pub fn new(origin: Point2<f64>, direction: Unit<Vector2<f64>>) -> Self {
        Self { origin, direction }
    }

    /// Mirror image of `p` across the axis.
    pub fn reflect(&self, p: &Point2<f64>) -> Point2<f64> {
        let offset = p - self.origin;
        let along = self.direction.into_inner() * self.direction.dot(&offset);
        self.origin + along * 2.0 - offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tip at the origin, opening centred on the Y axis, lower arm pair asymmetric.
    fn five_vertex_layout() -> Layout {
        Layout::new(vec![
            Point2::new(0.0, 0.0),  // 0: tip
            Point2::new(-2.0, 2.0), // 1: first
            Point2::new(-1.0, 1.0), // 2
            Point2::new(1.2, 0.8),  // 3
            Point2::new(2.0, 2.0),  // 4: last
        ])
    }

    #[test]
    fn test_dart_rejects_even_and_short() {
        assert!(matches!(
            SimpleDart::new(vec![0, 1, 2, 3]),
            Err(ParamError::InvalidDart { len: 4 })
        ));
        assert!(matches!(
            SimpleDart::new(vec![0]),
            Err(ParamError::InvalidDart { len: 1 })
        ));
        assert!(SimpleDart::new(vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn test_dart_structure() {
        let dart = SimpleDart::new(vec![1, 2, 0, 3, 4]).unwrap();
        assert_eq!(dart.len(), 5);
        assert!(!dart.is_empty());
        assert_eq!(dart.tip(), 0);
        assert_eq!(dart.arm_len(), 4);
        assert_eq!(dart.arm_vertices().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(dart.counterpart(0), 4);
        assert_eq!(dart.counterpart(1), 3);
        assert_eq!(dart.vertices(), &[1, 2, 0, 3, 4]);
    }

    #[test]
    fn test_axis_aligned_symmetry_axis() {
        let dart = SimpleDart::new(vec![1, 2, 0, 3, 4]).unwrap();
        let axis = dart.symmetry_axis(&five_vertex_layout()).unwrap();

        assert!((axis.origin - Point2::origin()).norm() < 1e-12);
        assert!((axis.direction.into_inner() - Vector2::new(0.0, 1.0)).norm() < 1e-12);
        assert!((axis.reflect(&Point2::new(3.0, 5.0)) - Point2::new(-3.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_targets_are_exact_mirrors() {
        let layout = five_vertex_layout();
        let dart = SimpleDart::new(vec![1, 2, 0, 3, 4]).unwrap();
        let axis = dart.symmetry_axis(&layout).unwrap();
        let targets = dart.symmetry_targets(&layout, &axis);

        assert_eq!(targets.len(), dart.arm_len());
        // targets are in arm order: vertices 1, 2, 3, 4
        assert!((targets[1] - Point2::new(-1.1, 0.9)).norm() < 1e-12);
        assert!((targets[2] - Point2::new(1.1, 0.9)).norm() < 1e-12);
        // Already symmetric outer pair stays put
        assert!((targets[0] - Point2::new(-2.0, 2.0)).norm() < 1e-12);
        assert!((targets[3] - Point2::new(2.0, 2.0)).norm() < 1e-12);

        for i in 0..targets.len() {
            let j = targets.len() - 1 - i;
            assert!((axis.reflect(&targets[j]) - targets[i]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_axis_falls_back_to_perpendicular() {
        // Opening midpoint coincides with the tip
        let layout = Layout::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(2.0, 1.0),
        ]);
        let dart = SimpleDart::new(vec![1, 0, 2]).unwrap();
        let axis = dart.symmetry_axis(&layout).unwrap();
        assert!(axis.direction.x.abs() < 1e-12);
        assert!((axis.reflect(&Point2::new(0.0, 1.0)) - Point2::new(2.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_degenerate_dart_axis() {
        let layout = Layout::new(vec![Point2::new(1.0, 1.0); 3]);
        let dart = SimpleDart::new(vec![1, 0, 2]).unwrap();
        assert_eq!(
            dart.symmetry_axis(&layout).unwrap_err(),
            ParamError::DegenerateDart { tip: 0 }
        );
    }

    #[test]
    fn test_darts_from_ordered_cuts_filters_even() {
        let cuts = vec![vec![0, 1, 2], vec![3, 4], vec![5, 6, 7, 8, 9], vec![]];
        let darts = darts_from_ordered_cuts(&cuts);
        assert_eq!(darts.len(), 2);
        assert_eq!(darts[0].tip(), 1);
        assert_eq!(darts[1].tip(), 7);
    }
}
