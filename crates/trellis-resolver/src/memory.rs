//! Repository kept in memory, for tests and embedding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use trellis_core::coordinate::Coordinate;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

use crate::repository::{
    Descriptor, RepoFuture, RepositoryClient, RepositoryError, TransitiveDependency,
};

/// Calls received by an [`InMemoryRepository`].
#[derive(Debug, Default)]
pub struct CallCounts {
    pub versions: AtomicUsize,
    pub descriptors: AtomicUsize,
    pub artifacts: AtomicUsize,
}

impl CallCounts {
    pub fn descriptors(&self) -> usize {
        self.descriptors.load(Ordering::SeqCst)
    }

    pub fn artifacts(&self) -> usize {
        self.artifacts.load(Ordering::SeqCst)
    }

    pub fn versions(&self) -> usize {
        self.versions.load(Ordering::SeqCst)
    }
}

/// Modules registered up front.
///
/// Each registered module version has a descriptor and, unless told
/// otherwise, an artifact at `<root>/<file name>`. The repository can be
/// made to fail or to answer slowly.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    name: String,
    root: PathBuf,
    descriptors: HashMap<Coordinate, Descriptor>,
    missing_artifacts: Vec<Coordinate>,
    failing: bool,
    delay: Option<Duration>,
    calls: Arc<CallCounts>,
}

impl InMemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: PathBuf::from("/repo").join(&name),
            name,
            descriptors: HashMap::new(),
            missing_artifacts: Vec::new(),
            failing: false,
            delay: None,
            calls: Arc::new(CallCounts::default()),
        }
    }

    /// Register `coordinate` (`group:name:version`) with its descriptor.
    pub fn with_module(mut self, coordinate: &str, descriptor: Descriptor) -> Self {
        if let Ok(c) = Coordinate::parse(coordinate) {
            self.descriptors.insert(main_coordinate(&c), descriptor);
        }
        self
    }

    /// Register a module whose descriptor only lists `dependencies`, all compile scoped.
    pub fn with_simple(self, coordinate: &str, dependencies: &[&str]) -> Self {
        let descriptor = Descriptor {
            dependencies: dependencies
                .iter()
                .filter_map(|d| Coordinate::parse(d).ok())
                .map(TransitiveDependency::of)
                .collect(),
            ..Descriptor::default()
        };
        self.with_module(coordinate, descriptor)
    }

    pub fn without_artifact(mut self, coordinate: &str) -> Self {
        if let Ok(c) = Coordinate::parse(coordinate) {
            self.missing_artifacts.push(c);
        }
        self
    }

    /// Every call fails with a connection error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every call waits `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<CallCounts> {
        self.calls.clone()
    }

    pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(coordinate.file_name())
    }

    async fn answer<T>(&self, found: impl FnOnce() -> T) -> Result<T, RepositoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(RepositoryError::Connection {
                repository: self.name.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(found())
    }
}

fn main_coordinate(coordinate: &Coordinate) -> Coordinate {
    coordinate
        .module_id()
        .to_coordinate(coordinate.version().clone())
}

impl RepositoryClient for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions<'a>(&'a self, module: &'a ModuleId) -> RepoFuture<'a, Vec<Version>> {
        self.calls.versions.fetch_add(1, Ordering::SeqCst);
        self.answer(move || {
            self.descriptors
                .keys()
                .filter(|c| c.module_id() == module)
                .map(|c| c.version().clone())
                .collect()
        })
        .boxed()
    }

    fn fetch_descriptor<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> RepoFuture<'a, Option<Descriptor>> {
        self.calls.descriptors.fetch_add(1, Ordering::SeqCst);
        self.answer(move || self.descriptors.get(&main_coordinate(coordinate)).cloned())
            .boxed()
    }

    fn fetch_artifact<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> RepoFuture<'a, Option<PathBuf>> {
        self.calls.artifacts.fetch_add(1, Ordering::SeqCst);
        self.answer(move || {
            let known = self.descriptors.contains_key(&main_coordinate(coordinate))
                && !self.missing_artifacts.contains(coordinate);
            known.then(|| self.artifact_path(coordinate))
        })
        .boxed()
    }
}
