//! Contract between the resolver and repository clients.
//!
//! A [`RepositoryClient`] answers three questions about a module: which
//! versions exist, what a version depends on, and where its artifact file is.
//! [`RepoSet`] asks an ordered list of clients and falls through to the next
//! one when a client times out or fails.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use trellis_core::coordinate::Coordinate;
use trellis_core::dependency::Exclusion;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

/// Transport-level failure of a single repository.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{repository} did not answer within {after:?}")]
    Timeout { repository: String, after: Duration },

    #[error("{repository} is unreachable: {message}")]
    Connection { repository: String, message: String },

    #[error("{repository} returned malformed {what}: {message}")]
    Malformed {
        repository: String,
        what: String,
        message: String,
    },

    #[error("{repository}: I/O error: {message}")]
    Io { repository: String, message: String },
}

pub type RepoFuture<'a, T> = BoxFuture<'a, Result<T, RepositoryError>>;

/// One dependency listed in a module descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitiveDependency {
    /// Version may be unspecified when it comes from dependency management.
    pub coordinate: Coordinate,
    /// Maven scope name; empty means `compile`.
    pub scope: String,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl TransitiveDependency {
    pub fn of(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            scope: String::new(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// What a repository knows about one module version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub dependencies: Vec<TransitiveDependency>,
    /// Configurations (scopes) the module declares.
    pub configurations: Vec<String>,
    /// Versions from dependency management, applied to children without one
    /// and exported when the module is imported as a BOM.
    pub managed_versions: Vec<(ModuleId, Version)>,
    /// BOMs imported by dependency management.
    pub imported_boms: Vec<Coordinate>,
}

impl Descriptor {
    pub fn managed_version(&self, module: &ModuleId) -> Option<&Version> {
        self.managed_versions
            .iter()
            .find(|(m, _)| m == module)
            .map(|(_, v)| v)
    }
}

/// A source of module metadata and artifacts.
///
/// `Ok(None)` means the repository answered and does not have the item;
/// `Err` means it could not answer.
pub trait RepositoryClient: Send + Sync {
    fn name(&self) -> &str;

    fn list_versions<'a>(&'a self, module: &'a ModuleId) -> RepoFuture<'a, Vec<Version>>;

    fn fetch_descriptor<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> RepoFuture<'a, Option<Descriptor>>;

    fn fetch_artifact<'a>(&'a self, coordinate: &'a Coordinate)
        -> RepoFuture<'a, Option<PathBuf>>;
}

/// What a [`RepoSet`] found, and whether a repository failed on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<T> {
    pub found: Option<T>,
    /// At least one repository could not answer. A missing item may exist there.
    pub incomplete: bool,
}

impl<T> Lookup<T> {
    /// The answer may be cached: something was found or every repository answered.
    pub fn is_definitive(&self) -> bool {
        self.found.is_some() || !self.incomplete
    }
}

/// Ordered repositories, asked one after the other.
#[derive(Clone, Default)]
pub struct RepoSet {
    repos: Vec<Arc<dyn RepositoryClient>>,
}

impl fmt::Debug for RepoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.repos.iter().map(|r| r.name().to_string()))
            .finish()
    }
}

impl RepoSet {
    pub fn of(repos: Vec<Arc<dyn RepositoryClient>>) -> Self {
        Self { repos }
    }

    pub fn and(mut self, repo: impl RepositoryClient + 'static) -> Self {
        self.repos.push(Arc::new(repo));
        self
    }

    pub fn and_shared(mut self, repo: Arc<dyn RepositoryClient>) -> Self {
        self.repos.push(repo);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.repos.iter().map(|r| r.name()).collect()
    }

    /// Versions known by any repository, sorted with the version comparator.
    ///
    /// Fails only when every repository failed.
    pub async fn list_versions(
        &self,
        module: &ModuleId,
        timeout: Duration,
    ) -> Result<Vec<Version>, RepositoryError> {
        let mut versions: Vec<Version> = Vec::new();
        let mut last_error = None;
        let mut answered = self.repos.is_empty();
        for repo in &self.repos {
            match call(repo.as_ref(), timeout, repo.list_versions(module)).await {
                Ok(found) => {
                    answered = true;
                    for v in found {
                        if !versions.contains(&v) {
                            versions.push(v);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("listing versions of {module}: {e}");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !answered => Err(e),
            _ => {
                versions.sort_by(Version::compare);
                Ok(versions)
            }
        }
    }

    pub async fn fetch_descriptor(
        &self,
        coordinate: &Coordinate,
        timeout: Duration,
    ) -> Result<Option<Descriptor>, RepositoryError> {
        Ok(self.lookup_descriptor(coordinate, timeout).await?.found)
    }

    /// Like [`RepoSet::fetch_descriptor`], telling apart a module missing
    /// everywhere from one missing in the repositories that answered.
    pub async fn lookup_descriptor(
        &self,
        coordinate: &Coordinate,
        timeout: Duration,
    ) -> Result<Lookup<Descriptor>, RepositoryError> {
        self.first_answer(coordinate, timeout, |repo| repo.fetch_descriptor(coordinate))
            .await
    }

    pub async fn fetch_artifact(
        &self,
        coordinate: &Coordinate,
        timeout: Duration,
    ) -> Result<Option<PathBuf>, RepositoryError> {
        Ok(self.lookup_artifact(coordinate, timeout).await?.found)
    }

    pub async fn lookup_artifact(
        &self,
        coordinate: &Coordinate,
        timeout: Duration,
    ) -> Result<Lookup<PathBuf>, RepositoryError> {
        self.first_answer(coordinate, timeout, |repo| repo.fetch_artifact(coordinate))
            .await
    }

    /// First `Some` answer, falling through on `None`, failures and timeouts.
    ///
    /// Nothing found when at least one repository answered without having
    /// the item, `Err` with the last failure when none could answer.
    async fn first_answer<'a, T, F>(
        &'a self,
        coordinate: &Coordinate,
        timeout: Duration,
        ask: F,
    ) -> Result<Lookup<T>, RepositoryError>
    where
        F: Fn(&'a dyn RepositoryClient) -> RepoFuture<'a, Option<T>>,
    {
        let mut last_error = None;
        let mut answered = false;
        for repo in &self.repos {
            match call(repo.as_ref(), timeout, ask(repo.as_ref())).await {
                Ok(Some(found)) => {
                    return Ok(Lookup {
                        found: Some(found),
                        incomplete: last_error.is_some(),
                    })
                }
                Ok(None) => answered = true,
                Err(e) => {
                    tracing::warn!("{coordinate}: {e}, trying next repository");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !answered => Err(e),
            failure => Ok(Lookup {
                found: None,
                incomplete: failure.is_some(),
            }),
        }
    }
}

async fn call<T>(
    repo: &dyn RepositoryClient,
    timeout: Duration,
    future: RepoFuture<'_, T>,
) -> Result<T, RepositoryError> {
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout {
            repository: repo.name().to_string(),
            after: timeout,
        }),
    }
}
