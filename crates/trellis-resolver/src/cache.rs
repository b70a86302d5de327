//! Caller-owned memo of repository answers.
//!
//! The cache is passed into each resolution explicitly. Cloning it yields a
//! handle on the same storage, so one cache can serve several resolutions
//! and the concurrent branches of a single one. Only answers are memoised;
//! repository failures are retried on the next lookup.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use trellis_core::coordinate::Coordinate;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

use crate::repository::Descriptor;

#[derive(Debug, Default)]
struct Inner {
    descriptors: DashMap<Coordinate, Option<Arc<Descriptor>>>,
    versions: DashMap<ModuleId, Arc<Vec<Version>>>,
    artifacts: DashMap<Coordinate, Option<PathBuf>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Hit/miss counters of a [`ResolutionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    inner: Arc<Inner>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(None)` records that no repository has the descriptor.
    pub fn descriptor(&self, coordinate: &Coordinate) -> Option<Option<Arc<Descriptor>>> {
        let found = self.inner.descriptors.get(coordinate).map(|e| e.value().clone());
        self.count(found.is_some());
        found
    }

    pub fn put_descriptor(&self, coordinate: Coordinate, descriptor: Option<Arc<Descriptor>>) {
        self.inner.descriptors.insert(coordinate, descriptor);
    }

    pub fn versions(&self, module: &ModuleId) -> Option<Arc<Vec<Version>>> {
        let found = self.inner.versions.get(module).map(|e| e.value().clone());
        self.count(found.is_some());
        found
    }

    pub fn put_versions(&self, module: ModuleId, versions: Arc<Vec<Version>>) {
        self.inner.versions.insert(module, versions);
    }

    pub fn artifact(&self, coordinate: &Coordinate) -> Option<Option<PathBuf>> {
        let found = self.inner.artifacts.get(coordinate).map(|e| e.value().clone());
        self.count(found.is_some());
        found
    }

    pub fn put_artifact(&self, coordinate: Coordinate, path: Option<PathBuf>) {
        self.inner.artifacts.insert(coordinate, path);
    }

    pub fn clear(&self) {
        self.inner.descriptors.clear();
        self.inner.versions.clear();
        self.inner.artifacts.clear();
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            entries: self.inner.descriptors.len()
                + self.inner.versions.len()
                + self.inner.artifacts.len(),
        }
    }

    fn count(&self, hit: bool) {
        let counter = if hit {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoises_negative_answers() {
        let cache = ResolutionCache::new();
        let c = Coordinate::parse("g:a:1").unwrap();
        assert!(cache.descriptor(&c).is_none());
        cache.put_descriptor(c.clone(), None);
        assert_eq!(cache.descriptor(&c), Some(None));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn clones_share_storage() {
        let cache = ResolutionCache::new();
        let other = cache.clone();
        other.put_artifact(Coordinate::parse("g:a:1").unwrap(), Some("a.jar".into()));
        assert_eq!(cache.stats().entries, 1);
        cache.clear();
        assert_eq!(other.stats(), CacheStats::default());
    }
}
