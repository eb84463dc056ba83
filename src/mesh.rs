use log::warn;
use ndarray::Array2;
use smallvec::SmallVec;

use crate::barycentric::{triangle_det, DEGENERACY_EPS};
use crate::error::{Error, Result};

/// An unstructured 2D triangular mesh.
///
/// Holds node coordinates and triangle connectivity, both 0-based after
/// construction, along with the node → incident-triangle adjacency derived
/// from them. The mesh is immutable once built; the acceleration structures
/// in [`crate::SpatialIndex`] are derived from it exactly once.
#[derive(Debug, Clone)]
pub struct TriMesh {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
    // One fan per node, ascending by triangle index. Fans are small in real
    // meshes, typically 6-8 triangles around an interior node.
    node_triangles: Vec<SmallVec<[u32; 8]>>,
    elevation: Option<Array2<f64>>,
    cell_area: Option<Vec<f64>>,
}

impl TriMesh {
    /// Builds a mesh from raw coordinate arrays and signed connectivity
    /// triples.
    ///
    /// The connectivity may be 0- or 1-based: when the minimum index over the
    /// whole array is `>= 1` it is taken to be 1-based and shifted down once.
    /// The heuristic assumes that no valid 0-based mesh avoids referencing
    /// node `0` entirely, which holds for any real mesh with more than a
    /// handful of triangles.
    ///
    /// Indices still outside `[0, node_count - 1]` after the shift are clamped
    /// into range rather than rejected. This tolerates minor upstream indexing
    /// errors; the clamp is reported through a `warn!` log record, never
    /// silently.
    pub fn from_raw(x: &[f64], y: &[f64], connectivity: &[[i64; 3]]) -> Result<Self> {
        Error::check_size("mesh y coordinates", x.len(), y.len())?;
        if x.is_empty() {
            return Err(Error::invalid_mesh("mesh has no nodes"));
        }
        if connectivity.is_empty() {
            return Err(Error::invalid_mesh("mesh has no triangles"));
        }

        let points: Vec<[f64; 2]> = x.iter().zip(y).map(|(&x, &y)| [x, y]).collect();

        let min_index = connectivity.iter().flatten().min().copied().unwrap_or(0);
        let offset = i64::from(min_index >= 1);
        let last = points.len() as i64 - 1;

        let mut clamped = 0usize;
        let triangles: Vec<[usize; 3]> = connectivity
            .iter()
            .map(|tri| {
                tri.map(|idx| {
                    let shifted = idx - offset;
                    if shifted < 0 || shifted > last {
                        clamped += 1;
                    }
                    shifted.clamp(0, last) as usize
                })
            })
            .collect();
        if clamped > 0 {
            warn!(
                "clamped {} out-of-range connectivity indices into [0, {}]",
                clamped, last
            );
        }

        let mut node_triangles: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); points.len()];
        for (t, tri) in triangles.iter().enumerate() {
            let t = t as u32;
            for &v in tri {
                let fan = &mut node_triangles[v];
                // A clamped triangle can repeat a vertex; keep the fan deduplicated
                if fan.last() != Some(&t) {
                    fan.push(t);
                }
            }
        }

        Ok(Self {
            points,
            triangles,
            node_triangles,
            elevation: None,
            cell_area: None,
        })
    }

    /// Attaches a per-node, per-timestep surface elevation field (Nv × Nt).
    pub fn with_elevation(mut self, elevation: Array2<f64>) -> Result<Self> {
        Error::check_size("elevation rows", self.points.len(), elevation.nrows())?;
        self.elevation = Some(elevation);
        Ok(self)
    }

    /// Attaches per-triangle areas.
    ///
    /// The areas are carried for downstream consumers (aggregation over mesh
    /// cells); the point-location core does not use them.
    pub fn with_cell_area(mut self, cell_area: Vec<f64>) -> Result<Self> {
        Error::check_size("cell areas", self.triangles.len(), cell_area.len())?;
        self.cell_area = Some(cell_area);
        Ok(self)
    }

    /// Builds a regular triangulated grid covering `[xmin, xmax] × [ymin, ymax]`
    /// with `nx × ny` quads, each split into two triangles.
    ///
    /// Mostly useful for tests and benchmarks.
    pub fn grid(xmin: f64, xmax: f64, ymin: f64, ymax: f64, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(Error::invalid_mesh("grid needs at least one quad per axis"));
        }
        let dx = (xmax - xmin) / nx as f64;
        let dy = (ymax - ymin) / ny as f64;
        let mut x = Vec::with_capacity((nx + 1) * (ny + 1));
        let mut y = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                x.push(xmin + i as f64 * dx);
                y.push(ymin + j as f64 * dy);
            }
        }
        let mut connectivity = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let n00 = (j * (nx + 1) + i) as i64;
                let n10 = n00 + 1;
                let n01 = n00 + nx as i64 + 1;
                let n11 = n01 + 1;
                connectivity.push([n00, n10, n11]);
                connectivity.push([n00, n11, n01]);
            }
        }
        Self::from_raw(&x, &y, &connectivity)
    }

    /// Number of mesh nodes.
    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    /// Number of triangles, degenerate ones included.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Coordinates of one node.
    pub fn node(&self, idx: usize) -> [f64; 2] {
        self.points[idx]
    }

    /// All node coordinates.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Vertex indices of one triangle.
    pub fn triangle(&self, idx: usize) -> [usize; 3] {
        self.triangles[idx]
    }

    /// Vertex coordinates of one triangle.
    pub fn triangle_coords(&self, idx: usize) -> [[f64; 2]; 3] {
        self.triangles[idx].map(|v| self.points[v])
    }

    /// Signed area of one triangle.
    pub fn signed_area(&self, idx: usize) -> f64 {
        triangle_det(self.triangle_coords(idx)) / 2.
    }

    /// Whether a triangle has (near-)zero area.
    ///
    /// Degenerate triangles stay in storage but never match a containment
    /// test and are skipped during interpolation.
    pub fn is_degenerate(&self, idx: usize) -> bool {
        triangle_det(self.triangle_coords(idx)).abs() < DEGENERACY_EPS
    }

    /// Triangles incident to a node, ascending by triangle index.
    ///
    /// The fixed order makes the fallback search deterministic: a point that
    /// satisfies containment in several fan candidates resolves to the lowest
    /// indexed one.
    pub fn node_fan(&self, node: usize) -> &[u32] {
        &self.node_triangles[node]
    }

    /// The per-node, per-timestep elevation field, if one was attached.
    pub fn elevation(&self) -> Option<&Array2<f64>> {
        self.elevation.as_ref()
    }

    /// The per-triangle areas, if attached.
    pub fn cell_area(&self) -> Option<&[f64]> {
        self.cell_area.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> TriMesh {
        //
        //     3-------2
        //     | \  1  |
        //     |   \   |
        //     |  0  \ |
        //     0-------1
        //
        TriMesh::from_raw(
            &[0., 1., 1., 0.],
            &[0., 0., 1., 1.],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn zero_based_connectivity_is_kept() {
        let mesh = unit_square();

        assert_eq!(mesh.triangle(0), [0, 1, 2]);
        assert_eq!(mesh.triangle(1), [0, 2, 3]);
    }

    #[test]
    fn one_based_connectivity_is_shifted() {
        let mesh = TriMesh::from_raw(
            &[0., 1., 1., 0.],
            &[0., 0., 1., 1.],
            &[[1, 2, 3], [1, 3, 4]],
        )
        .unwrap();

        assert_eq!(mesh.triangle(0), [0, 1, 2]);
        assert_eq!(mesh.triangle(1), [0, 2, 3]);
    }

    #[test]
    fn out_of_range_indices_are_clamped() {
        let mesh = TriMesh::from_raw(&[0., 1., 0.], &[0., 0., 1.], &[[0, 1, 7]]).unwrap();

        assert_eq!(mesh.triangle(0), [0, 1, 2]);
    }

    #[test]
    fn mismatched_coordinate_lengths_are_rejected() {
        let res = TriMesh::from_raw(&[0., 1., 0.], &[0., 0.], &[[0, 1, 2]]);

        assert!(matches!(res, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(TriMesh::from_raw(&[], &[], &[[0, 1, 2]]).is_err());
        assert!(TriMesh::from_raw(&[0., 1., 0.], &[0., 0., 1.], &[]).is_err());
    }

    #[test]
    fn adjacency_is_ascending() {
        let mesh = unit_square();

        assert_eq!(mesh.node_fan(0), &[0, 1]);
        assert_eq!(mesh.node_fan(1), &[0]);
        assert_eq!(mesh.node_fan(2), &[0, 1]);
        assert_eq!(mesh.node_fan(3), &[1]);
    }

    #[test]
    fn degenerate_triangle_is_stored_but_flagged() {
        let mesh = TriMesh::from_raw(
            &[0., 1., 2., 0.],
            &[0., 0., 0., 1.],
            &[[0, 1, 2], [0, 1, 3]],
        )
        .unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.is_degenerate(0));
        assert!(!mesh.is_degenerate(1));
    }

    #[test]
    fn signed_area_of_ccw_triangle_is_positive() {
        let mesh = unit_square();

        assert!((mesh.signed_area(0) - 0.5).abs() < 1e-15);
        assert!((mesh.signed_area(1) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn elevation_shape_is_checked() {
        let elevation = Array2::zeros((3, 5));
        let res = unit_square().with_elevation(elevation);

        assert!(matches!(res, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn grid_has_expected_counts() {
        let mesh = TriMesh::grid(0., 1., 0., 1., 3, 2).unwrap();

        assert_eq!(mesh.node_count(), 4 * 3);
        assert_eq!(mesh.triangle_count(), 2 * 3 * 2);
    }
}
