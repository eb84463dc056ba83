/// Default symmetric tolerance of the containment predicate.
///
/// A point counts as inside a triangle when all three barycentric weights are
/// `>= -tolerance`, which accepts points on an edge or infinitesimally outside
/// it. This absorbs the floating-point noise that real particle positions
/// carry on mesh boundaries.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Triangles whose determinant is below this in magnitude are treated as
/// degenerate: they never match a containment test and are skipped during
/// interpolation.
pub const DEGENERACY_EPS: f64 = 1e-14;

/// Barycentric weights of a point with respect to a triangle.
///
/// The weights double as interpolation coefficients: when the point is inside
/// or on the boundary of the triangle, `l1*v1 + l2*v2 + l3*v3` is the exact
/// linear interpolation of any field with values `v1, v2, v3` at the vertices.
#[derive(Debug, Clone, Copy)]
pub struct BaryWeights {
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
}

impl BaryWeights {
    /// Tolerant containment test.
    pub fn is_inside(&self, tol: f64) -> bool {
        self.l1 >= -tol && self.l2 >= -tol && self.l3 >= -tol
    }

    /// Linearly interpolates a field given at the three vertices.
    pub fn interpolate(&self, values: [f64; 3]) -> f64 {
        self.l1 * values[0] + self.l2 * values[1] + self.l3 * values[2]
    }
}

/// Twice the signed area of a triangle.
pub(crate) fn triangle_det([[x1, y1], [x2, y2], [x3, y3]]: [[f64; 2]; 3]) -> f64 {
    (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1)
}

/// Computes the barycentric weights of `point` with respect to a triangle.
///
/// Returns [`None`] when the triangle is degenerate, i.e. its determinant is
/// smaller than [`DEGENERACY_EPS`] in magnitude.
pub fn barycentric(triangle: [[f64; 2]; 3], [px, py]: [f64; 2]) -> Option<BaryWeights> {
    let [[x1, y1], [x2, y2], [x3, y3]] = triangle;
    let det = triangle_det(triangle);
    if det.abs() < DEGENERACY_EPS {
        return None;
    }
    let l1 = ((y2 - y3) * (px - x3) + (x3 - x2) * (py - y3)) / det;
    let l2 = ((y3 - y1) * (px - x3) + (x1 - x3) * (py - y3)) / det;
    let l3 = 1. - l1 - l2;
    Some(BaryWeights { l1, l2, l3 })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const TRIANGLE: [[f64; 2]; 3] = [[0., 0.], [1., 0.], [0., 1.]];

    #[test]
    fn weights_sum_to_one() {
        let w = barycentric(TRIANGLE, [0.3, 0.2]).unwrap();

        assert!((w.l1 + w.l2 + w.l3 - 1.).abs() < 1e-15);
    }

    #[test]
    fn strictly_inside_point_is_inside() {
        let w = barycentric(TRIANGLE, [0.25, 0.25]).unwrap();

        assert!(w.is_inside(0.));
        assert!(w.l1 > 0. && w.l2 > 0. && w.l3 > 0.);
    }

    #[test]
    fn point_on_edge_is_inside() {
        // Midpoint of the hypotenuse
        let w = barycentric(TRIANGLE, [0.5, 0.5]).unwrap();

        assert!(w.is_inside(DEFAULT_TOLERANCE));
    }

    #[test]
    fn point_outside_is_outside() {
        let w = barycentric(TRIANGLE, [1., 1.]).unwrap();

        assert!(!w.is_inside(DEFAULT_TOLERANCE));
    }

    #[rstest]
    #[case([0., 0.], 0)]
    #[case([1., 0.], 1)]
    #[case([0., 1.], 2)]
    fn vertices_have_unit_weight(#[case] vertex: [f64; 2], #[case] which: usize) {
        let w = barycentric(TRIANGLE, vertex).unwrap();

        let weights = [w.l1, w.l2, w.l3];
        assert!((weights[which] - 1.).abs() < 1e-15);
        assert!(w.is_inside(DEFAULT_TOLERANCE));
    }

    #[test]
    fn degenerate_triangle_never_matches() {
        // All three vertices on a line
        let flat = [[0., 0.], [1., 0.], [2., 0.]];

        assert!(barycentric(flat, [0.5, 0.]).is_none());
    }

    #[test]
    fn weights_reproduce_a_linear_field_exactly() {
        // f(x, y) = 2 + 3x - y is linear, so barycentric interpolation of its
        // vertex values must reproduce it everywhere in the triangle.
        let f = |[x, y]: [f64; 2]| 2. + 3. * x - y;
        let values = [f(TRIANGLE[0]), f(TRIANGLE[1]), f(TRIANGLE[2])];

        for point in [[0.1, 0.1], [0.3, 0.3], [0.5, 0.25]] {
            let w = barycentric(TRIANGLE, point).unwrap();
            assert!((w.interpolate(values) - f(point)).abs() < 1e-12);
        }
    }
}
