//! Assembly of the weighted least-squares system.
//!
//! Every equation is one row of `A x = b` with its own weight in `W`. The
//! unknown vector interleaves the layout: vertex `i` owns columns `2i` (U)
//! and `2i+1` (V).
//!
//! Rows are emitted in a fixed order:
//! 1. per active triangle: stretch U/V, angle U/V, six edge rows
//! 2. seed (vertex 0 pinned)
//! 3. selected pair
//! 4. dart symmetry rows, dart by dart
//!
//! The number of rows is a pure function of the options, the number of
//! active triangles and the dart sizes. It is fixed when the assembler is
//! built and checked after every assembly.

use nalgebra::{Point2, Point3};
use rayon::prelude::*;

use crate::error::{ParamError, Result};
use crate::mesh::{u_col, v_col, Layout, PatchMesh};

use super::barycentric::ProbeFrame;
use super::dart::SimpleDart;
use super::options::BaryOptions;
use super::procrustes::{aligned_edge_targets, TRIANGLE_EDGES};
use super::sparse::Triplet;

/// Upper bound on the rows one triangle can emit.
const MAX_TRIANGLE_ROWS: usize = 10;

/// Number of equations each triangle contributes under `options`.
pub fn rows_per_triangle(options: &BaryOptions) -> usize {
    let mut rows = 0;
    if options.enable_stretch_eqs {
        rows += 2;
    }
    if options.enable_angle_eqs {
        rows += 2;
    }
    if options.enable_edges_eqs {
        rows += 6;
    }
    rows
}

/// Number of equations for a patch with `n_triangles` active triangles.
///
/// # Example
///
/// ```
/// use pleat::algo::parameterize::{predict_equation_count, BaryOptions, SimpleDart};
///
/// let options = BaryOptions::default();
/// let darts = vec![SimpleDart::new(vec![3, 4, 5]).unwrap()];
/// // 10 per triangle, 2 seed, 2 per non-tip dart vertex
/// assert_eq!(predict_equation_count(&options, 2, &darts), 20 + 2 + 4);
/// ```
pub fn predict_equation_count(
    options: &BaryOptions,
    n_triangles: usize,
    darts: &[SimpleDart],
) -> usize {
    let mut count = rows_per_triangle(options) * n_triangles;
    if options.enable_set_seed_eqs {
        count += 2;
    }
    if options.enable_selected_eqs {
        count += 1;
    }
    if options.enable_dart_sym_eqs {
        count += darts.iter().map(|d| 2 * d.arm_len()).sum::<usize>();
    }
    count
}

/// Upper bound on the number of matrix entries, for preallocation.
pub fn predict_triplet_count(
    options: &BaryOptions,
    n_triangles: usize,
    darts: &[SimpleDart],
) -> usize {
    let mut per_triangle = 0;
    if options.enable_stretch_eqs {
        per_triangle += 2 * 3;
    }
    if options.enable_angle_eqs {
        per_triangle += 2 * 3;
    }
    if options.enable_edges_eqs {
        per_triangle += 6 * 2;
    }

    let mut count = per_triangle * n_triangles;
    if options.enable_set_seed_eqs {
        count += 2;
    }
    if options.enable_selected_eqs {
        count += 2;
    }
    if options.enable_dart_sym_eqs {
        count += darts.iter().map(|d| 2 * d.arm_len()).sum::<usize>();
    }
    count
}

/// The assembled system `W (A x - b)`.
///
/// Buffers are cleared and refilled on every assembly, never shrunk.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    triplets: Vec<Triplet>,
    rhs: Vec<f64>,
    weights: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    next_equation_id: usize,
}

impl EquationSystem {
    fn with_capacity(n_rows: usize, n_cols: usize, n_triplets: usize) -> Self {
        Self {
            triplets: Vec::with_capacity(n_triplets),
            rhs: Vec::with_capacity(n_rows),
            weights: Vec::with_capacity(n_rows),
            n_rows,
            n_cols,
            next_equation_id: 0,
        }
    }

    fn clear(&mut self) {
        self.triplets.clear();
        self.rhs.clear();
        self.weights.clear();
        self.next_equation_id = 0;
    }

    /// Append one equation `sum(coeff * x[col]) = target` with `weight`.
    fn push_row(&mut self, entries: &[(usize, f64)], target: f64, weight: f64) -> Result<()> {
        let row = self.next_equation_id;
        if row >= self.n_rows {
            log::error!(
                "equation {row} exceeds the {} predicted equations",
                self.n_rows
            );
            return Err(ParamError::EquationCountMismatch {
                predicted: self.n_rows,
                emitted: row + 1,
            });
        }

        self.triplets
            .extend(entries.iter().map(|&(col, value)| (row, col, value)));
        self.rhs.push(target);
        self.weights.push(weight);
        self.next_equation_id += 1;
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        if self.next_equation_id != self.n_rows {
            log::error!(
                "emitted {} equations but {} were predicted",
                self.next_equation_id,
                self.n_rows
            );
            return Err(ParamError::EquationCountMismatch {
                predicted: self.n_rows,
                emitted: self.next_equation_id,
            });
        }
        Ok(())
    }

    /// Number of equations (rows of `A`).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of unknowns (columns of `A`), twice the vertex count.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Matrix entries as `(row, col, value)`; duplicates are summed.
    pub fn triplets(&self) -> &[Triplet] {
        &self.triplets
    }

    /// Right-hand side `b`.
    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// Row weights, the diagonal of `W`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Row {
    entries: [(usize, f64); 3],
    len: usize,
    target: f64,
    weight: f64,
}

impl Row {
    fn new(entries: &[(usize, f64)], target: f64, weight: f64) -> Self {
        let mut row = Row {
            len: entries.len(),
            target,
            weight,
            ..Default::default()
        };
        row.entries[..entries.len()].copy_from_slice(entries);
        row
    }

    fn entries(&self) -> &[(usize, f64)] {
        &self.entries[..self.len]
    }
}

/// Rows of one triangle, computed before being written in order.
#[derive(Debug, Clone, Copy)]
struct TriangleRows {
    rows: [Row; MAX_TRIANGLE_ROWS],
    len: usize,
    degenerate: bool,
}

impl TriangleRows {
    fn empty() -> Self {
        Self {
            rows: [Row::default(); MAX_TRIANGLE_ROWS],
            len: 0,
            degenerate: false,
        }
    }

    fn push(&mut self, row: Row) {
        self.rows[self.len] = row;
        self.len += 1;
    }

    /// Zero-weight rows keeping the count stable.
    fn push_disabled(&mut self, n_rows: usize) {
        for _ in 0..n_rows {
            self.push(Row::default());
        }
    }
}

fn triangle_rows(
    options: &BaryOptions,
    tri: [usize; 3],
    tri2d: &[Point2<f64>; 3],
    tri3d: &[Point3<f64>; 3],
) -> Result<TriangleRows> {
    // Stretch and angle rows need barycentric probes; edge rows do not
    let frame = ProbeFrame::new(tri2d, tri3d);
    let u = tri.map(u_col);
    let v = tri.map(v_col);
    let mut rows = TriangleRows::empty();
    rows.degenerate = frame.is_none();

    if options.enable_stretch_eqs {
        match &frame {
            Some(frame) => {
                let (target_u, target_v) = frame.stretch_targets();
                let w = options.stretch_coeff;
                rows.push(Row::new(
                    &[(u[0], frame.du.x), (u[1], frame.du.y), (u[2], frame.du.z)],
                    target_u,
                    w,
                ));
                rows.push(Row::new(
                    &[(v[0], frame.dv.x), (v[1], frame.dv.y), (v[2], frame.dv.z)],
                    target_v,
                    w,
                ));
            }
            None => rows.push_disabled(2),
        }
    }

    if options.enable_angle_eqs {
        match &frame {
            Some(frame) => {
                let (target_u, target_v) = frame.angle_targets();
                let w = options.angle_coeff;
                let d = frame.duv;
                rows.push(Row::new(
                    &[(u[0], d.x), (u[1], d.y), (u[2], d.z)],
                    target_u,
                    w,
                ));
                rows.push(Row::new(
                    &[(v[0], d.x), (v[1], d.y), (v[2], d.z)],
                    target_v,
                    w,
                ));
            }
            None => rows.push_disabled(2),
        }
    }

    if options.enable_edges_eqs {
        let targets = aligned_edge_targets(tri2d, tri3d, options.flatten_tolerance)?;
        let w = options.edges_coeff;
        for (k, &(from, to)) in TRIANGLE_EDGES.iter().enumerate() {
            rows.push(Row::new(&[(u[to], 1.0), (u[from], -1.0)], targets[k].x, w));
            rows.push(Row::new(&[(v[to], 1.0), (v[from], -1.0)], targets[k].y, w));
        }
    }

    Ok(rows)
}

/// Builds the weighted system for one patch, dart set and option set.
#[derive(Debug, Clone)]
pub struct EquationAssembler {
    options: BaryOptions,
    n_vertices: usize,
    n_triangles: usize,
    active: Vec<usize>,
    darts: Vec<SimpleDart>,
    system: EquationSystem,
    scratch: Vec<Result<TriangleRows>>,
    skipped: Vec<usize>,
}

impl EquationAssembler {
    /// Create an assembler for `patch` and preallocate its buffers.
    ///
    /// `active` lists the triangles (by patch index) that receive
    /// per-triangle equations.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidParameter`] if an active triangle or a
    /// dart vertex lies outside the patch.
    pub fn new(
        options: BaryOptions,
        patch: &PatchMesh,
        active: Vec<usize>,
        darts: Vec<SimpleDart>,
    ) -> Result<Self> {
        let n_vertices = patch.num_vertices();
        let n_triangles = patch.num_triangles();

        if let Some(&t) = active.iter().find(|&&t| t >= n_triangles) {
            log::error!("active triangle {t} is outside a patch of {n_triangles} triangles");
            return Err(ParamError::invalid_param(
                "active triangle",
                t,
                "outside the patch",
            ));
        }
        for (d, dart) in darts.iter().enumerate() {
            if let Some(&vertex) = dart.vertices().iter().find(|&&v| v >= n_vertices) {
                log::error!("dart {d} references vertex {vertex} outside the patch");
                return Err(ParamError::invalid_param(
                    "dart vertex",
                    vertex,
                    "outside the patch",
                ));
            }
        }

        let n_rows = predict_equation_count(&options, active.len(), &darts);
        let n_triplets = predict_triplet_count(&options, active.len(), &darts);
        log::debug!(
            "assembler: {} unknowns, {n_rows} equations, up to {n_triplets} entries",
            2 * n_vertices
        );

        Ok(Self {
            system: EquationSystem::with_capacity(n_rows, 2 * n_vertices, n_triplets),
            scratch: Vec::with_capacity(active.len()),
            skipped: Vec::new(),
            options,
            n_vertices,
            n_triangles,
            active,
            darts,
        })
    }

    /// The fixed number of equations.
    #[inline]
    pub fn equation_count(&self) -> usize {
        self.system.n_rows
    }

    /// The most recently assembled system.
    pub fn system(&self) -> &EquationSystem {
        &self.system
    }

    /// Triangles whose working 2D triangle was degenerate in the last assembly.
    pub fn skipped_triangles(&self) -> &[usize] {
        &self.skipped
    }

    /// Build the system for the current layout.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::DimensionMismatch`] if the layout or the patch
    /// does not match the one the assembler was built for, and [`ParamError::EquationCountMismatch`] or
    /// [`ParamError::DartTargetMismatch`] on internal inconsistencies.
    pub fn assemble(
        &mut self,
        patch: &PatchMesh,
        layout: &Layout,
        selection: Option<(usize, usize)>,
    ) -> Result<&EquationSystem> {
        if patch.num_vertices() != self.n_vertices {
            return Err(ParamError::DimensionMismatch {
                what: "patch vertices",
                expected: self.n_vertices,
                actual: patch.num_vertices(),
            });
        }
        if patch.num_triangles() != self.n_triangles {
            return Err(ParamError::DimensionMismatch {
                what: "patch triangles",
                expected: self.n_triangles,
                actual: patch.num_triangles(),
            });
        }
        if layout.len() != self.n_vertices {
            return Err(ParamError::DimensionMismatch {
                what: "layout vertices",
                expected: self.n_vertices,
                actual: layout.len(),
            });
        }

        self.system.clear();
        self.skipped.clear();

        self.emit_triangles(patch, layout)?;
        let after_triangles = self.system.next_equation_id;
        self.emit_seed(layout)?;
        let after_seed = self.system.next_equation_id;
        self.emit_selected(selection)?;
        let after_selected = self.system.next_equation_id;
        self.emit_darts(layout)?;

        log::trace!(
            "rows: triangles {after_triangles}, seed {}, selected {}, darts {}",
            after_seed - after_triangles,
            after_selected - after_seed,
            self.system.next_equation_id - after_selected
        );

        self.system.finish()?;

        log::debug!(
            "assembled {} equations with {} entries",
            self.system.n_rows,
            self.system.triplets.len()
        );
        Ok(&self.system)
    }

    fn emit_triangles(&mut self, patch: &PatchMesh, layout: &Layout) -> Result<()> {
        if rows_per_triangle(&self.options) == 0 {
            return Ok(());
        }

        let options = &self.options;
        let compute = |t: usize| {
            let tri = patch.triangle(t);
            triangle_rows(options, tri, &layout.triangle(tri), &patch.triangle_points(t))
        };

        if self.options.parallel {
            self.active
                .par_iter()
                .map(|&t| compute(t))
                .collect_into_vec(&mut self.scratch);
        } else {
            self.scratch.clear();
            self.scratch.extend(self.active.iter().map(|&t| compute(t)));
        }

        for (&t, rows) in self.active.iter().zip(self.scratch.iter()) {
            let rows = rows.as_ref().map_err(|e| match e {
                ParamError::Flattening { deviation, .. } => ParamError::Flattening {
                    triangle: t,
                    deviation: *deviation,
                },
                other => other.clone(),
            })?;

            if rows.degenerate {
                log::warn!(
                    "triangle {t} is degenerate in the layout; its stretch and angle equations are disabled"
                );
                self.skipped.push(t);
            }
            for row in &rows.rows[..rows.len] {
                self.system.push_row(row.entries(), row.target, row.weight)?;
            }
        }
        Ok(())
    }

    fn emit_seed(&mut self, layout: &Layout) -> Result<()> {
        if !self.options.enable_set_seed_eqs {
            return Ok(());
        }
        let seed = layout.get(0);
        let w = self.options.seed_coeff;
        self.system.push_row(&[(u_col(0), 1.0)], seed.x, w)?;
        self.system.push_row(&[(v_col(0), 1.0)], seed.y, w)
    }

    fn emit_selected(&mut self, selection: Option<(usize, usize)>) -> Result<()> {
        if !self.options.enable_selected_eqs {
            return Ok(());
        }
        match selection {
            Some((a, b)) if a != b && a < self.n_vertices && b < self.n_vertices => {
                self.system.push_row(
                    &[(v_col(a), 1.0), (v_col(b), -1.0)],
                    0.0,
                    self.options.selected_coeff,
                )
            }
            _ => {
                if let Some(pair) = selection {
                    log::warn!("ignoring invalid selection {pair:?}");
                }
                // Cancelling entries keep the row shape without constraining anything
                self.system
                    .push_row(&[(v_col(0), 1.0), (v_col(0), -1.0)], 0.0, 0.0)
            }
        }
    }

    fn emit_darts(&mut self, layout: &Layout) -> Result<()> {
        if !self.options.enable_dart_sym_eqs {
            return Ok(());
        }
        let w = self.options.dart_sym_coeff;

        for dart in &self.darts {
            let axis = match dart.symmetry_axis(layout) {
                Ok(axis) => axis,
                Err(e) => {
                    log::warn!("{e}; its symmetry equations are disabled");
                    for _ in 0..2 * dart.arm_len() {
                        self.system.push_row(&[], 0.0, 0.0)?;
                    }
                    continue;
                }
            };

            let targets = dart.symmetry_targets(layout, &axis);
            if targets.len() != dart.arm_len() {
                log::error!(
                    "dart with tip {} produced {} targets for {} arm vertices",
                    dart.tip(),
                    targets.len(),
                    dart.arm_len()
                );
                return Err(ParamError::DartTargetMismatch {
                    tip: dart.tip(),
                    targets: targets.len(),
                    arms: dart.arm_len(),
                });
            }

            for (vertex, target) in dart.arm_vertices().zip(targets) {
                self.system.push_row(&[(u_col(vertex), 1.0)], target.x, w)?;
                self.system.push_row(&[(v_col(vertex), 1.0)], target.y, w)?;
            }
        }
        Ok(())
    }
}
