//! Triangle patch input.
//!
//! A [`PatchMesh`] is the immutable source geometry of a flattening problem:
//! a triangle list indexing into one 3D position per vertex.

use nalgebra::Point3;

use crate::error::{ParamError, Result};

/// A triangle patch with 3D vertex positions.
#[derive(Debug, Clone)]
pub struct PatchMesh {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
}

impl PatchMesh {
    /// Build a patch from vertex positions and triangles.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are no vertices
    /// - A triangle references a vertex that does not exist
    /// - A triangle repeats a vertex
    ///
    /// # Example
    ///
    /// ```
    /// use pleat::mesh::PatchMesh;
    /// use nalgebra::Point3;
    ///
    /// let positions = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.5, 1.0, 0.0),
    /// ];
    /// let patch = PatchMesh::new(positions, vec![[0, 1, 2]]).unwrap();
    /// assert_eq!(patch.num_triangles(), 1);
    /// ```
    pub fn new(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        if positions.is_empty() {
            return Err(ParamError::EmptyMesh);
        }

        for (fi, tri) in triangles.iter().enumerate() {
            for &vi in tri {
                if vi >= positions.len() {
                    return Err(ParamError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(ParamError::DegenerateFace { face: fi });
            }
        }

        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Vertex indices of a triangle.
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        self.triangles[t]
    }

    /// All triangles.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// All 3D positions.
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// 3D corners of a triangle.
    #[inline]
    pub fn triangle_points(&self, t: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[t];
        [self.positions[a], self.positions[b], self.positions[c]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_patch_basic() {
        let patch = PatchMesh::new(triangle_positions(), vec![[0, 1, 2]]).unwrap();
        assert_eq!(patch.num_vertices(), 3);
        assert_eq!(patch.num_triangles(), 1);
        assert_eq!(patch.triangle(0), [0, 1, 2]);
        assert_eq!(patch.triangle_points(0)[2], Point3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn test_patch_without_triangles_is_valid() {
        let patch = PatchMesh::new(triangle_positions(), Vec::new()).unwrap();
        assert_eq!(patch.num_triangles(), 0);
    }

    #[test]
    fn test_patch_rejects_bad_input() {
        assert_eq!(
            PatchMesh::new(Vec::new(), Vec::new()).unwrap_err(),
            ParamError::EmptyMesh
        );
        assert_eq!(
            PatchMesh::new(triangle_positions(), vec![[0, 1, 5]]).unwrap_err(),
            ParamError::InvalidVertexIndex { face: 0, vertex: 5 }
        );
        assert_eq!(
            PatchMesh::new(triangle_positions(), vec![[0, 1, 2], [1, 1, 2]]).unwrap_err(),
            ParamError::DegenerateFace { face: 1 }
        );
    }
}
