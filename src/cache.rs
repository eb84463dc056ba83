use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::spatial_index::SpatialIndex;

/// Identity token for a mesh held in a [`MeshCache`].
///
/// Identity, not value equality: the caller hands out one id per mesh
/// instance it intends to reuse. Two value-identical meshes registered under
/// distinct ids get their structures built twice; reusing the id is what
/// buys the cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

/// Build-once memo of spatial indices keyed by mesh identity.
///
/// Prefer owning a [`SpatialIndex`] and passing it by reference; the cache
/// exists for callers that resolve queries against the same few meshes from
/// many call sites and want each build to happen exactly once. The
/// build-if-absent step runs under a mutex, so concurrent lookups of the
/// same id produce a single build, and the cache is read-mostly afterwards.
#[derive(Default)]
pub struct MeshCache {
    inner: Mutex<HashMap<MeshId, Arc<SpatialIndex>>>,
}

impl MeshCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index registered under `id`, building it on first use.
    pub fn get_or_build<F>(&self, id: MeshId, build: F) -> Arc<SpatialIndex>
    where
        F: FnOnce() -> SpatialIndex,
    {
        let mut inner = self.inner.lock();
        inner
            .entry(id)
            .or_insert_with(|| Arc::new(build()))
            .clone()
    }

    /// Drops the index registered under `id`, if any.
    pub fn invalidate(&self, id: MeshId) {
        self.inner.lock().remove(&id);
    }

    /// Number of cached indices.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
