//! Dependency resolution engine: concurrent tree expansion over an ordered
//! set of repositories, conflict resolution, BOM imports and artifact
//! collection.

pub mod bom;
pub mod cache;
pub mod error;
pub mod memory;
pub mod repository;
pub mod resolver;
pub mod result;
pub mod tree;

pub use cache::ResolutionCache;
pub use error::{ErrorReport, ResolutionError};
pub use repository::{
    Descriptor, Lookup, RepoSet, RepositoryClient, RepositoryError, TransitiveDependency,
};
pub use resolver::DependencyResolver;
pub use result::ResolveResult;
pub use tokio_util::sync::CancellationToken;
pub use tree::{NodeId, NodeKind, ResolvedDependencyNode, ResolvedTree};
