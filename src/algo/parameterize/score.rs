//! Quality measures for a layout.
//!
//! [`evaluate`] reports the residual of each equation family, recomputed
//! from the layout itself. The Jacobian helpers describe how every triangle
//! of the layout stretches or compresses relative to the 3D surface.

use nalgebra::{Point2, Point3, Vector3};

use crate::error::{ParamError, Result};
use crate::mesh::{Layout, PatchMesh};

use super::barycentric::ProbeFrame;
use super::dart::SimpleDart;
use super::procrustes::{aligned_edge_targets, TRIANGLE_EDGES};

/// Residuals of a layout, per equation family.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Squared stretch-U residual, averaged over scored triangles.
    pub stretch_u: f64,
    /// Squared stretch-V residual, averaged over scored triangles.
    pub stretch_v: f64,
    /// Summed squared edge residuals, averaged over scored triangles.
    pub edges: f64,
    /// `(V(a) - V(b))^2` for a valid selection.
    pub selected: Option<f64>,
    /// Squared distance to the symmetric targets, averaged over arm vertices.
    pub dart_sym: f64,
    /// Per scored triangle: 2D advance along U divided by its 3D length.
    pub stretch_u_ratios: Vec<f64>,
    /// Per scored triangle: 2D advance along V divided by its 3D length.
    pub stretch_v_ratios: Vec<f64>,
}

/// Measure `layout` against the 3D patch.
///
/// Only `triangles` are scored; triangles degenerate in the layout are
/// skipped. The layout is never modified.
///
/// # Errors
///
/// Returns [`ParamError::DimensionMismatch`] if the layout does not match the
/// patch, and [`ParamError::Flattening`] if a scored triangle cannot be
/// flattened.
pub fn evaluate(
    patch: &PatchMesh,
    layout: &Layout,
    triangles: &[usize],
    selection: Option<(usize, usize)>,
    darts: &[SimpleDart],
    flatten_tolerance: f64,
) -> Result<Score> {
    if layout.len() != patch.num_vertices() {
        return Err(ParamError::DimensionMismatch {
            what: "layout vertices",
            expected: patch.num_vertices(),
            actual: layout.len(),
        });
    }

    let mut stretch_u = 0.0;
    let mut stretch_v = 0.0;
    let mut edges = 0.0;
    let mut stretch_u_ratios = Vec::with_capacity(triangles.len());
    let mut stretch_v_ratios = Vec::with_capacity(triangles.len());

    for &t in triangles {
        let tri = patch.triangle(t);
        let tri2d = layout.triangle(tri);
        let tri3d = patch.triangle_points(t);

        let Some(frame) = ProbeFrame::new(&tri2d, &tri3d) else {
            continue;
        };
        let (target_u, target_v) = frame.stretch_targets();
        let actual_u = frame.du.dot(&Vector3::new(tri2d[0].x, tri2d[1].x, tri2d[2].x));
        let actual_v = frame.dv.dot(&Vector3::new(tri2d[0].y, tri2d[1].y, tri2d[2].y));

        stretch_u += (target_u - actual_u).powi(2);
        stretch_v += (target_v - actual_v).powi(2);
        stretch_u_ratios.push(actual_u / target_u);
        stretch_v_ratios.push(actual_v / target_v);

        let targets = aligned_edge_targets(&tri2d, &tri3d, flatten_tolerance).map_err(|e| {
            match e {
                ParamError::Flattening { deviation, .. } => ParamError::Flattening {
                    triangle: t,
                    deviation,
                },
                other => other,
            }
        })?;
        for (k, &(from, to)) in TRIANGLE_EDGES.iter().enumerate() {
            let actual = tri2d[to] - tri2d[from];
            edges += (targets[k] - actual).norm_squared();
        }
    }

    let scored = stretch_u_ratios.len();
    if scored > 0 {
        stretch_u /= scored as f64;
        stretch_v /= scored as f64;
        edges /= scored as f64;
    }

    let n = layout.len();
    let selected = match selection {
        Some((a, b)) if a != b && a < n && b < n => Some((layout.get(a).y - layout.get(b).y).powi(2)),
        _ => None,
    };

    Ok(Score {
        stretch_u,
        stretch_v,
        edges,
        selected,
        dart_sym: dart_residual(layout, darts),
        stretch_u_ratios,
        stretch_v_ratios,
    })
}

fn dart_residual(layout: &Layout, darts: &[SimpleDart]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for dart in darts {
        let Ok(axis) = dart.symmetry_axis(layout) else {
            log::warn!("dart with tip {} has no symmetry axis; not scored", dart.tip());
            continue;
        };
        let targets = dart.symmetry_targets(layout, &axis);
        for (vertex, target) in dart.arm_vertices().zip(targets) {
            total += (layout.get(vertex) - target).norm_squared();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Tangent vectors `dP/du` and `dP/dv` of the linear map from a 2D triangle
/// onto its 3D triangle.
///
/// Returns `None` if the 2D triangle is degenerate.
pub fn triangle_jacobian(
    tri3d: &[Point3<f64>; 3],
    tri2d: &[Point2<f64>; 3],
) -> Option<(Vector3<f64>, Vector3<f64>)> {
    let p1 = tri3d[1] - tri3d[0];
    let p2 = tri3d[2] - tri3d[0];
    let u1 = tri2d[1] - tri2d[0];
    let u2 = tri2d[2] - tri2d[0];

    let det = u1.x * u2.y - u1.y * u2.x;
    let scale = u1.norm_squared().max(u2.norm_squared());
    if !(det.abs() > 1e-12 * scale) {
        return None;
    }

    let du = (p1 * u2.y - p2 * u1.y) / det;
    let dv = (p2 * u1.x - p1 * u2.x) / det;
    Some((du, dv))
}

/// Signed stretch indicator of a tangent vector.
///
/// Zero for unit length, `|v| - 1` when stretched, and `1 - 1/|v|` when
/// compressed, so stretching by `k` and compressing by `1/k` have the same
/// magnitude. A zero-length tangent is fully collapsed and yields
/// `f64::NEG_INFINITY`.
pub fn stretch_compression(v: &Vector3<f64>) -> f64 {
    let k = v.norm();
    if k == 0.0 {
        f64::NEG_INFINITY
    } else if k < 1.0 {
        1.0 - 1.0 / k
    } else {
        k - 1.0
    }
}

/// Per-triangle Jacobian of a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceStretch {
    /// Triangle index in the patch.
    pub triangle: usize,
    /// `dP/du`.
    pub ju: Vector3<f64>,
    /// `dP/dv`.
    pub jv: Vector3<f64>,
    /// [`stretch_compression`] of `ju`.
    pub k_u: f64,
    /// [`stretch_compression`] of `jv`.
    pub k_v: f64,
}

/// Jacobian and stretch indicators of every non-degenerate triangle.
pub fn jacobian_stretch(patch: &PatchMesh, layout: &Layout) -> Vec<FaceStretch> {
    (0..patch.num_triangles())
        .filter_map(|t| {
            let tri = patch.triangle(t);
            match triangle_jacobian(&patch.triangle_points(t), &layout.triangle(tri)) {
                Some((ju, jv)) => Some(FaceStretch {
                    triangle: t,
                    ju,
                    jv,
                    k_u: stretch_compression(&ju),
                    k_v: stretch_compression(&jv),
                }),
                None => {
                    log::warn!("triangle {t} is degenerate in the layout; no Jacobian");
                    None
                }
            }
        })
        .collect()
}

/// Magnitude exceeded by roughly a fraction `p` of `values`, by rank.
///
/// Magnitudes are sorted ascending and the entry at `floor(len * (1 - p))`
/// is returned, clamped into range.
///
/// # Errors
///
/// Returns [`ParamError::EmptyInput`] for no values and
/// [`ParamError::InvalidParameter`] if `p` is outside `[0, 1]` or any value
/// is NaN.
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(ParamError::EmptyInput("percentile values"));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(ParamError::invalid_param("p", p, "must lie in [0, 1]"));
    }

    let mut magnitudes: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    if magnitudes.iter().any(|v| v.is_nan()) {
        return Err(ParamError::invalid_param("values", "NaN", "must not contain NaN"));
    }
    magnitudes.sort_by(f64::total_cmp);

    let index = ((magnitudes.len() as f64 * (1.0 - p)) as usize).min(magnitudes.len() - 1);
    Ok(magnitudes[index])
}
