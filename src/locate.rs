use std::collections::HashMap;

use itertools::izip;

use crate::barycentric::{barycentric, DEFAULT_TOLERANCE};
use crate::error::{Error, Result};
use crate::spatial_index::SpatialIndex;

/// Placeholder coordinate substituted for non-finite input so the tree
/// queries always see finite numbers. This is the MIKE null value; any
/// accidental match against it is discarded before returning.
pub(crate) const FILL_COORD: f64 = 1.000_000_018_002_51e-35;

/// Options for a batched point-location call.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    /// Symmetric tolerance of the containment predicate.
    pub tolerance: f64,
    /// Run the nearest-node triangle-fan search for points the primary pass
    /// leaves unresolved.
    pub fallback: bool,
    /// Re-base resolved indices to 1-based on output.
    pub one_based: bool,
    /// Number of points handed to the primary pass at a time. Chunking caps
    /// peak memory and never changes results.
    pub chunk_size: usize,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            fallback: true,
            one_based: true,
            chunk_size: 200_000,
        }
    }
}

impl SpatialIndex {
    /// Resolves a batch of query points to enclosing triangle indices.
    ///
    /// Returns one value per input point: the triangle index as a float
    /// (re-based when `one_based` is set) or NaN for points without an
    /// enclosing triangle. Non-finite coordinates never fail a call; they
    /// come back as NaN unconditionally.
    ///
    /// The only error is structural: `xp` and `yp` differing in length.
    pub fn locate(&self, xp: &[f64], yp: &[f64], options: &LocateOptions) -> Result<Vec<f64>> {
        Error::check_size("query y coordinates", xp.len(), yp.len())?;

        // Substitute a harmless placeholder for non-finite coordinates and
        // remember which entries must come back as NaN no matter what.
        let finite: Vec<bool> = izip!(xp, yp)
            .map(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let points: Vec<[f64; 2]> = izip!(xp, yp, &finite)
            .map(|(&x, &y, &ok)| if ok { [x, y] } else { [FILL_COORD, FILL_COORD] })
            .collect();

        let mut result = vec![f64::NAN; points.len()];
        let chunk_size = options.chunk_size.max(1);
        for (c, chunk) in points.chunks(chunk_size).enumerate() {
            let base = c * chunk_size;
            for (i, &point) in chunk.iter().enumerate() {
                if let Some(tri) = self.locate_with_tolerance(point, options.tolerance) {
                    result[base + i] = tri as f64;
                }
            }
        }

        if options.fallback {
            self.fallback_pass(&points, &finite, options.tolerance, &mut result);
        }

        // Non-finite inputs stay outside even if the placeholder coordinate
        // accidentally landed in a triangle.
        for (r, &ok) in result.iter_mut().zip(&finite) {
            if !ok {
                *r = f64::NAN;
            }
        }

        if options.one_based {
            for r in result.iter_mut() {
                if r.is_finite() {
                    *r += 1.;
                }
            }
        }

        Ok(result)
    }

    /// Nearest-node triangle-fan search for points the primary pass missed.
    ///
    /// The unresolved finite points are grouped by their nearest mesh node and
    /// each group is tested against that node's incident-triangle fan, every
    /// (candidate, point) pair of the group in one sweep. Within a fan the
    /// candidates are tried in ascending triangle order, so a point sitting
    /// exactly on a shared vertex or edge always resolves to the lowest
    /// indexed triangle. Points with no matching candidate stay unresolved.
    fn fallback_pass(&self, points: &[[f64; 2]], finite: &[bool], tol: f64, result: &mut [f64]) {
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for (pos, (&point, &ok)) in points.iter().zip(finite).enumerate() {
            if ok && result[pos].is_nan() {
                if let Some(node) = self.nearest_node(point[0], point[1]) {
                    groups.entry(node).or_default().push(pos);
                }
            }
        }

        for (node, positions) in groups {
            let fan = self.mesh().node_fan(node);
            if fan.is_empty() {
                continue;
            }
            for pos in positions {
                let hit = fan.iter().find(|&&tri| {
                    barycentric(self.mesh().triangle_coords(tri as usize), points[pos])
                        .map_or(false, |w| w.is_inside(tol))
                });
                if let Some(&tri) = hit {
                    result[pos] = f64::from(tri);
                }
            }
        }
    }
}
