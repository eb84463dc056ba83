use log::debug;
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, PointDistance, RTree, RTreeObject, AABB};

use crate::barycentric::{barycentric, DEFAULT_TOLERANCE};
use crate::mesh::TriMesh;

/// A trait to locate one or several query points within a triangular mesh.
pub trait PointLocator {
    /// Locates one query point.
    ///
    /// Returns [`None`] if the point does not lie in any triangle of the mesh,
    /// which includes any point with a non-finite coordinate.
    fn locate_one(&self, point: &[f64; 2]) -> Option<usize>;

    /// Locates several query points.
    fn locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>> {
        points.iter().map(|point| self.locate_one(point)).collect()
    }

    /// Locates several query points in parallel.
    fn par_locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>>
    where
        Self: Sync,
    {
        points
            .par_iter()
            .map(|point| self.locate_one(point))
            .collect()
    }
}

/// Axis-aligned bounding box of one triangle, as stored in the R-tree.
#[derive(Debug, Clone)]
struct TriEnvelope {
    tri: u32,
    min: [f64; 2],
    max: [f64; 2],
}

impl TriEnvelope {
    fn new(tri: u32, vertices: [[f64; 2]; 3]) -> Self {
        let [[x1, y1], [x2, y2], [x3, y3]] = vertices;
        Self {
            tri,
            min: [x1.min(x2).min(x3), y1.min(y2).min(y3)],
            max: [x1.max(x2).max(x3), y1.max(y2).max(y3)],
        }
    }
}

impl RTreeObject for TriEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for TriEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(point[0] - self.max[0]).max(0.);
        let dy = (self.min[1] - point[1]).max(point[1] - self.max[1]).max(0.);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        point[0] >= self.min[0]
            && point[0] <= self.max[0]
            && point[1] >= self.min[1]
            && point[1] <= self.max[1]
    }
}

type IndexedNode = GeomWithData<[f64; 2], usize>;

/// Acceleration structures for point queries against one mesh.
///
/// Built exactly once per mesh: an R-tree over triangle bounding boxes for
/// the primary containment search, and an R-tree over node coordinates for
/// the nearest-node fallback. The index owns its [`TriMesh`]; build one per
/// mesh and share it by reference (or through [`crate::MeshCache`]) instead
/// of rebuilding.
pub struct SpatialIndex {
    mesh: TriMesh,
    triangle_tree: RTree<TriEnvelope>,
    node_tree: RTree<IndexedNode>,
}

impl SpatialIndex {
    /// Builds the triangle and node trees for `mesh`.
    pub fn build(mesh: TriMesh) -> Self {
        let envelopes = (0..mesh.triangle_count())
            .map(|t| TriEnvelope::new(t as u32, mesh.triangle_coords(t)))
            .collect();
        let nodes = mesh
            .points()
            .iter()
            .enumerate()
            .map(|(idx, &p)| IndexedNode::new(p, idx))
            .collect();
        let index = Self {
            triangle_tree: RTree::bulk_load(envelopes),
            node_tree: RTree::bulk_load(nodes),
            mesh,
        };
        debug!(
            "built spatial index over {} nodes and {} triangles",
            index.mesh.node_count(),
            index.mesh.triangle_count()
        );
        index
    }

    /// The mesh this index was built from.
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// Index of the mesh node nearest to `[x, y]`.
    pub fn nearest_node(&self, x: f64, y: f64) -> Option<usize> {
        self.node_tree.nearest_neighbor(&[x, y]).map(|n| n.data)
    }

    /// Finds the triangle containing `point` under the given tolerance.
    ///
    /// Candidates come from the R-tree envelope query; each is confirmed with
    /// the tolerant barycentric predicate, degenerate triangles never match.
    /// A point sitting exactly on a shared edge or vertex satisfies the
    /// predicate in every incident triangle, so the lowest triangle index
    /// among the matches is returned to keep results reproducible.
    pub(crate) fn locate_with_tolerance(&self, point: [f64; 2], tol: f64) -> Option<usize> {
        self.triangle_tree
            .locate_all_at_point(&point)
            .filter_map(|env| {
                let tri = env.tri as usize;
                barycentric(self.mesh.triangle_coords(tri), point)
                    .filter(|w| w.is_inside(tol))
                    .map(|_| tri)
            })
            .min()
    }
}

impl PointLocator for SpatialIndex {
    fn locate_one(&self, point: &[f64; 2]) -> Option<usize> {
        if !point[0].is_finite() || !point[1].is_finite() {
            return None;
        }
        self.locate_with_tolerance(*point, DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriMesh;

    fn unit_square_index() -> SpatialIndex {
        let mesh = TriMesh::from_raw(
            &[0., 1., 1., 0.],
            &[0., 0., 1., 1.],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
        SpatialIndex::build(mesh)
    }

    #[test]
    fn locates_points_in_both_triangles() {
        let index = unit_square_index();

        assert_eq!(index.locate_one(&[0.75, 0.25]), Some(0));
        assert_eq!(index.locate_one(&[0.25, 0.75]), Some(1));
    }

    #[test]
    fn point_on_shared_diagonal_resolves_to_lowest_index() {
        let index = unit_square_index();

        assert_eq!(index.locate_one(&[0.5, 0.5]), Some(0));
    }

    #[test]
    fn point_outside_is_not_located() {
        let index = unit_square_index();

        assert_eq!(index.locate_one(&[10., 10.]), None);
    }

    #[test]
    fn non_finite_point_is_not_located() {
        let index = unit_square_index();

        assert_eq!(index.locate_one(&[f64::NAN, 0.5]), None);
        assert_eq!(index.locate_one(&[0.5, f64::INFINITY]), None);
    }

    #[test]
    fn nearest_node_picks_the_closest_vertex() {
        let index = unit_square_index();

        assert_eq!(index.nearest_node(0.1, 0.1), Some(0));
        assert_eq!(index.nearest_node(0.9, 0.1), Some(1));
        assert_eq!(index.nearest_node(10., 10.), Some(2));
    }

    #[test]
    fn locate_many_matches_locate_one() {
        let index = unit_square_index();
        let points = [[0.75, 0.25], [0.25, 0.75], [10., 10.]];

        let sequential = index.locate_many(&points);
        let parallel = index.par_locate_many(&points);

        assert_eq!(sequential, vec![Some(0), Some(1), None]);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn degenerate_triangle_is_never_matched() {
        // Triangle 0 is a zero-area sliver lying on the segment y = 0; the
        // real triangle 1 must win for points on that segment.
        let mesh = TriMesh::from_raw(
            &[0., 1., 2., 0.5],
            &[0., 0., 0., 1.],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
        let index = SpatialIndex::build(mesh);

        assert_eq!(index.locate_one(&[0.5, 0.]), Some(1));
    }
}
