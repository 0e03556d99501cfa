//! Barycentric probes relating a 2D triangle to its 3D counterpart.
//!
//! The stretch and angle equations measure how a unit step in the 2D domain
//! maps onto the 3D surface. A [`ProbeFrame`] places synthetic probe points
//! around the centroid of the working 2D triangle:
//!
//! - `D`: the centroid
//! - `D + U`: one unit along U
//! - `D + V`: one unit along V
//! - `D + UV`: one unit along both (the diagonal)
//!
//! Each probe is expressed in barycentric coordinates of the 2D triangle and
//! pushed through the same affine combination of the 3D corners. Probes lie
//! outside the triangle in general, so coordinates can be negative.

use nalgebra::{Point2, Point3, Vector2, Vector3};

/// Barycentric coordinates of the centroid.
const CENTROID_BARY: Vector3<f64> = Vector3::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);

/// Relative area below which a 2D triangle is treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

#[inline]
fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed area of a 2D triangle (positive when counter-clockwise).
pub fn signed_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    0.5 * cross2(&(b - a), &(c - a))
}

/// Barycentric coordinates of `p` with respect to triangle `abc`.
///
/// The coordinates sum to one and may be negative when `p` lies outside the
/// triangle. Returns `None` if the triangle is degenerate.
///
/// # Example
///
/// ```
/// use pleat::algo::parameterize::barycentric_coords;
/// use nalgebra::Point2;
///
/// let a = Point2::new(0.0, 0.0);
/// let b = Point2::new(1.0, 0.0);
/// let c = Point2::new(0.0, 1.0);
/// let bary = barycentric_coords(&Point2::new(0.25, 0.25), &a, &b, &c).unwrap();
/// assert!((bary.x - 0.5).abs() < 1e-12);
/// ```
pub fn barycentric_coords(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
) -> Option<Vector3<f64>> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let det = cross2(&ab, &ac);
    let scale = ab.norm_squared().max(ac.norm_squared());
    if scale == 0.0 || det.abs() <= DEGENERATE_AREA * scale {
        return None;
    }

    let l1 = cross2(&ap, &ac) / det;
    let l2 = cross2(&ab, &ap) / det;
    Some(Vector3::new(1.0 - l1 - l2, l1, l2))
}

/// Affine combination of three 3D points with barycentric weights.
#[inline]
pub fn interpolate(bary: &Vector3<f64>, tri: &[Point3<f64>; 3]) -> Point3<f64> {
    Point3::from(bary.x * tri[0].coords + bary.y * tri[1].coords + bary.z * tri[2].coords)
}

/// Probe points of one triangle and their 3D images.
#[derive(Debug, Clone, Copy)]
pub struct ProbeFrame {
    /// `bary(D + U) - bary(D)`: coefficients of the U-direction equations.
    pub du: Vector3<f64>,
    /// `bary(D + V) - bary(D)`: coefficients of the V-direction equations.
    pub dv: Vector3<f64>,
    /// `bary(D + UV) - bary(D)`: coefficients of the diagonal (shear) equations.
    pub duv: Vector3<f64>,
    centroid: Point3<f64>,
    along_u: Point3<f64>,
    along_v: Point3<f64>,
    along_uv: Point3<f64>,
}

impl ProbeFrame {
    /// Build the probes of a working 2D triangle and map them onto its 3D corners.
    ///
    /// Returns `None` if the 2D triangle is degenerate.
    pub fn new(tri2d: &[Point2<f64>; 3], tri3d: &[Point3<f64>; 3]) -> Option<Self> {
        let [a, b, c] = tri2d;
        let d = Point2::from((a.coords + b.coords + c.coords) / 3.0);

        let du_bary = barycentric_coords(&(d + Vector2::new(1.0, 0.0)), a, b, c)?;
        let dv_bary = barycentric_coords(&(d + Vector2::new(0.0, 1.0)), a, b, c)?;
        let duv_bary = barycentric_coords(&(d + Vector2::new(1.0, 1.0)), a, b, c)?;

        Some(Self {
            du: du_bary - CENTROID_BARY,
            dv: dv_bary - CENTROID_BARY,
            duv: duv_bary - CENTROID_BARY,
            centroid: interpolate(&CENTROID_BARY, tri3d),
            along_u: interpolate(&du_bary, tri3d),
            along_v: interpolate(&dv_bary, tri3d),
            along_uv: interpolate(&duv_bary, tri3d),
        })
    }

    /// 3D lengths of a unit 2D step along U and along V.
    pub fn stretch_targets(&self) -> (f64, f64) {
        (
            (self.along_u - self.centroid).norm(),
            (self.along_v - self.centroid).norm(),
        )
    }

    /// Projection of the 3D diagonal step onto the 3D U and V steps.
    ///
    /// For a shear-free map the diagonal projects onto each axis with that
    /// axis' full length.
    pub fn angle_targets(&self) -> (f64, f64) {
        let eu = self.along_u - self.centroid;
        let ev = self.along_v - self.centroid;
        let ed = self.along_uv - self.centroid;
        (ed.dot(&eu) / eu.norm(), ed.dot(&ev) / ev.norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_right_triangle() -> [Point2<f64>; 3] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_barycentric_vertices_and_centroid() {
        let [a, b, c] = unit_right_triangle();

        let at_b = barycentric_coords(&b, &a, &b, &c).unwrap();
        assert!((at_b - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);

        let centroid = Point2::new(1.0 / 3.0, 1.0 / 3.0);
        let at_d = barycentric_coords(&centroid, &a, &b, &c).unwrap();
        assert!((at_d - CENTROID_BARY).norm() < 1e-12);
    }

    #[test]
    fn test_barycentric_outside_point() {
        let [a, b, c] = unit_right_triangle();
        let bary = barycentric_coords(&Point2::new(2.0, 2.0), &a, &b, &c).unwrap();

        assert!((bary.sum() - 1.0).abs() < 1e-12);
        assert!(bary.x < 0.0);
        // Reconstruct the point from its coordinates
        let p = bary.x * a.coords + bary.y * b.coords + bary.z * c.coords;
        assert!((p - Vector2::new(2.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_barycentric_degenerate() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        let c = Point2::new(2.0, 2.0);
        assert!(barycentric_coords(&Point2::new(0.5, 0.0), &a, &b, &c).is_none());
        assert!(barycentric_coords(&a, &a, &a, &a).is_none());
    }

    #[test]
    fn test_signed_area_orientation() {
        let [a, b, c] = unit_right_triangle();
        assert!((signed_area(&a, &b, &c) - 0.5).abs() < 1e-12);
        assert!((signed_area(&a, &c, &b) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probe_frame_isometric() {
        // 3D triangle tilted out of the XY plane, 2D layout is its isometric flattening
        let tri2d = unit_right_triangle();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let tri3d = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, s, s),
        ];
        let frame = ProbeFrame::new(&tri2d, &tri3d).unwrap();

        let (tu, tv) = frame.stretch_targets();
        assert!((tu - 1.0).abs() < 1e-10);
        assert!((tv - 1.0).abs() < 1e-10);

        // No shear: the diagonal projects with unit length on both axes
        let (au, av) = frame.angle_targets();
        assert!((au - 1.0).abs() < 1e-10);
        assert!((av - 1.0).abs() < 1e-10);

        // Coefficient deltas sum to zero (translation invariance)
        assert!(frame.du.sum().abs() < 1e-12);
        assert!(frame.dv.sum().abs() < 1e-12);
        assert!(frame.duv.sum().abs() < 1e-12);
    }

    #[test]
    fn test_probe_frame_scaled_layout() {
        // 2D layout twice as large as the 3D triangle: unit steps cover half a unit in 3D
        let tri2d = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let tri3d = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let frame = ProbeFrame::new(&tri2d, &tri3d).unwrap();
        let (tu, tv) = frame.stretch_targets();
        assert!((tu - 0.5).abs() < 1e-10);
        assert!((tv - 0.5).abs() < 1e-10);

        // The current layout advances exactly one unit along U per probe
        let actual_u = frame.du.x * tri2d[0].x + frame.du.y * tri2d[1].x + frame.du.z * tri2d[2].x;
        assert!((actual_u - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_interpolate() {
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 3.0),
        ];
        let p = interpolate(&CENTROID_BARY, &tri);
        assert!((p - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-12);
    }
}
