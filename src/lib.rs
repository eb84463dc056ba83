//! Point location and particle-track interpolation on unstructured
//! triangular meshes.
//!
//! The crate answers one question fast, millions of times: *which mesh
//! triangle contains this point?* On top of that answer it interpolates a
//! time-varying, node-valued surface elevation at particle positions and
//! derives their depth below the surface, one parallel unit of work per
//! timestep.
//!
//! The building blocks are:
//! - [`TriMesh`]: node coordinates, triangle connectivity (0- or 1-based on
//!   input, normalized once) and the node → triangle adjacency.
//! - [`SpatialIndex`]: R-trees over triangle bounding boxes and node
//!   coordinates, built once per mesh.
//! - [`SpatialIndex::locate`]: batched, tolerant point location with a
//!   nearest-node triangle-fan fallback and NaN sentinels for unresolved
//!   points.
//! - [`SpatialIndex::map_track`]: per-timestep parallel mapping of particle
//!   tracks, with optional surface-elevation interpolation.
//! - [`MeshCache`]: an explicit build-once memo for callers juggling several
//!   meshes.
//!
//! # Example
//!
//! ```
//! use tritrack::{LocateOptions, SpatialIndex, TriMesh};
//!
//! # fn main() -> tritrack::Result<()> {
//! // Two triangles forming the unit square, split along the diagonal.
//! let mesh = TriMesh::from_raw(
//!     &[0., 1., 1., 0.],
//!     &[0., 0., 1., 1.],
//!     &[[0, 1, 2], [0, 2, 3]],
//! )?;
//! let index = SpatialIndex::build(mesh);
//!
//! let found = index.locate(&[0.75, 10.], &[0.25, 10.], &LocateOptions::default())?;
//! assert_eq!(found[0], 1.); // output is 1-based by default
//! assert!(found[1].is_nan()); // outside the mesh
//! # Ok(())
//! # }
//! ```

mod barycentric;
mod cache;
mod error;
mod locate;
mod mesh;
mod spatial_index;
mod track;

pub use barycentric::{barycentric, BaryWeights, DEFAULT_TOLERANCE, DEGENERACY_EPS};
pub use cache::{MeshCache, MeshId};
pub use error::{Error, Result};
pub use locate::LocateOptions;
pub use mesh::TriMesh;
pub use spatial_index::{PointLocator, SpatialIndex};
pub use track::{MappedTrack, ParticleTrack};
