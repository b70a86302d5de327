//! Dependency model for the Trellis build tool.
//!
//! This crate defines how dependencies are declared: module ids, versions and
//! their ordering, coordinates, the dependency sum type, ordered dependency
//! sets with version providers and exclusions, qualified sets for IDE and
//! publication, the `dependencies.txt` format and resolution settings.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod conflict;
pub mod coordinate;
pub mod dependencies_txt;
pub mod dependency;
pub mod dependency_set;
pub mod module_id;
pub mod qualified;
pub mod settings;
pub mod version;
pub mod version_provider;

pub use conflict::ConflictStrategy;
pub use coordinate::Coordinate;
pub use dependency::{
    ComputedDependency, CoordinateDependency, Dependency, Exclusion, FileSystemDependency,
    Transitivity,
};
pub use dependency_set::{DependencySet, DependencySetMerge, Hint};
pub use module_id::ModuleId;
pub use qualified::{QualifiedDependency, QualifiedDependencySet};
pub use settings::{ResolutionParameters, Settings};
pub use version::Version;
pub use version_provider::VersionProvider;
