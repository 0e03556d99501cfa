//! Rigid alignment of flattened 3D triangles onto the working layout.
//!
//! The edge equations compare 2D edge vectors with the edges of the 3D
//! triangle. To make them comparable the 3D triangle is first rotated into
//! its own plane ([`flatten_triangle`]) and then rigidly aligned onto the
//! current 2D triangle with a 2D Procrustes fit ([`align`]).
//!
//! # References
//!
//! - Kabsch, W. (1976). "A solution for the best rotation to relate two sets
//!   of vectors." Acta Crystallographica.

use std::f64::consts::PI;

use nalgebra::{Matrix2, Point2, Point3, Rotation2, Rotation3, Vector2, Vector3};

use crate::error::{ParamError, Result};

/// Undirected triangle edges, as (from, to) corner pairs, in equation order.
pub const TRIANGLE_EDGES: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Default tolerance on the out-of-plane coordinate after flattening.
pub const DEFAULT_FLATTEN_TOLERANCE: f64 = 1e-4;

/// Relative normal length below which a 3D triangle counts as collinear.
const COLLINEAR_EPS: f64 = 1e-12;

/// Rotation plus translation in the plane (no scaling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform2 {
    /// Rotation part.
    pub rotation: Rotation2<f64>,
    /// Translation applied after the rotation.
    pub translation: Vector2<f64>,
}

impl RigidTransform2 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Rotation2::identity(),
            translation: Vector2::zeros(),
        }
    }

    /// Map a point forward: `R * p + t`.
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        self.rotation * p + self.translation
    }

    /// Map a point backward: `R^T * (q - t)`.
    #[inline]
    pub fn apply_inverse(&self, q: &Point2<f64>) -> Point2<f64> {
        self.rotation.inverse() * (q - self.translation)
    }
}

/// Rotate a 3D triangle into the XY plane about its centroid.
///
/// The triangle normal is rotated onto `+Z`, so a counter-clockwise 2D
/// layout and the flattened triangle share orientation.
///
/// # Errors
///
/// Returns [`ParamError::Flattening`] if the points are collinear (infinite
/// deviation) or if any rotated point leaves the plane by more than
/// `tolerance`. The `triangle` field is `usize::MAX`; callers that know the
/// triangle index replace it.
pub fn flatten_triangle(tri: &[Point3<f64>; 3], tolerance: f64) -> Result<[Point2<f64>; 3]> {
    let centroid = (tri[0].coords + tri[1].coords + tri[2].coords) / 3.0;
    let centered: [Vector3<f64>; 3] = [
        tri[0].coords - centroid,
        tri[1].coords - centroid,
        tri[2].coords - centroid,
    ];

    let e1 = centered[1] - centered[0];
    let e2 = centered[2] - centered[0];
    let normal = e1.cross(&e2);
    let scale = e1.norm_squared().max(e2.norm_squared());

    // Also catches NaN coordinates
    if !(normal.norm() > COLLINEAR_EPS * scale) {
        return Err(ParamError::Flattening {
            triangle: usize::MAX,
            deviation: f64::INFINITY,
        });
    }

    let rotation = Rotation3::rotation_between(&normal, &Vector3::z())
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));

    let rotated = centered.map(|v| rotation * v);
    let deviation = rotated.iter().map(|v| v.z.abs()).fold(0.0, f64::max);
    if deviation > tolerance {
        return Err(ParamError::Flattening {
            triangle: usize::MAX,
            deviation,
        });
    }

    Ok(rotated.map(|v| Point2::new(v.x, v.y)))
}

/// Best rigid superposition of `first` onto `second`.
///
/// Finds the proper rotation `R` and translation `t` minimizing
/// `sum |R * first_i + t - second_i|^2`.
///
/// # Errors
///
/// Returns an error if the sets differ in length or hold fewer than 3 points.
pub fn align(first: &[Point2<f64>], second: &[Point2<f64>]) -> Result<RigidTransform2> {
    if first.len() != second.len() {
        return Err(ParamError::DimensionMismatch {
            what: "procrustes point sets",
            expected: first.len(),
            actual: second.len(),
        });
    }
    if first.len() < 3 {
        return Err(ParamError::invalid_param(
            "point count",
            first.len(),
            "alignment needs at least 3 points",
        ));
    }

    let first_centroid = centroid(first);
    let second_centroid = centroid(second);

    // Covariance H = sum(first_i * second_i^T)
    let mut h = Matrix2::zeros();
    for (f, s) in first.iter().zip(second.iter()) {
        h += (f.coords - first_centroid) * (s.coords - second_centroid).transpose();
    }

    // In 2D the optimal proper rotation has a closed form
    let angle = (h[(0, 1)] - h[(1, 0)]).atan2(h[(0, 0)] + h[(1, 1)]);
    let rotation = Rotation2::new(angle);
    let translation = second_centroid - rotation * first_centroid;

    Ok(RigidTransform2 {
        rotation,
        translation,
    })
}

/// Edge vectors of the 3D triangle expressed in the working 2D frame.
///
/// The triangle is flattened, aligned onto `tri2d`, mapped back through the
/// inverse alignment, and its edges are read off in [`TRIANGLE_EDGES`] order
/// as `corner[to] - corner[from]`.
pub fn aligned_edge_targets(
    tri2d: &[Point2<f64>; 3],
    tri3d: &[Point3<f64>; 3],
    tolerance: f64,
) -> Result<[Vector2<f64>; 3]> {
    let flat = flatten_triangle(tri3d, tolerance)?;
    let transform = align(tri2d, &flat)?;
    let mapped = flat.map(|q| transform.apply_inverse(&q));
    Ok(TRIANGLE_EDGES.map(|(from, to)| mapped[to] - mapped[from]))
}

fn centroid(points: &[Point2<f64>]) -> Vector2<f64> {
    let sum: Vector2<f64> = points.iter().map(|p| p.coords).sum();
    sum / points.len() as f64
}
