use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_util::errors::{TrellisError, TrellisResult};

use crate::coordinate::Coordinate;
use crate::module_id::ModuleId;
use crate::version::Version;

/// How far a dependency's own dependencies are pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transitivity {
    /// The dependency alone, nothing below it.
    None,
    /// Only what its compile scope exposes.
    Compile,
    /// Compile and runtime scope.
    Runtime,
}

impl Transitivity {
    /// Whether a transitive dependency declared with `scope` (a Maven scope
    /// name) is followed under this transitivity.
    pub fn accepts_scope(self, scope: &str) -> bool {
        match self {
            Self::None => false,
            Self::Compile => matches!(scope, "" | "compile"),
            Self::Runtime => matches!(scope, "" | "compile" | "runtime"),
        }
    }
}

impl fmt::Display for Transitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Compile => "compile",
            Self::Runtime => "runtime",
        };
        f.write_str(s)
    }
}

/// A module, or every module of a group, to keep out of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exclusion(ModuleId);

impl Exclusion {
    pub fn of(module: ModuleId) -> Self {
        Self(module)
    }

    /// `group`, `group:*`, `group:prefix*` or `group:name`.
    pub fn parse(s: &str) -> TrellisResult<Self> {
        let s = s.trim();
        if s.contains(':') {
            Ok(Self(ModuleId::parse(s)?))
        } else if s.is_empty() || s.chars().any(char::is_whitespace) {
            Err(TrellisError::parse(format!("'{s}' is not a valid exclusion")))
        } else {
            Ok(Self(ModuleId::new(s, "*")))
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.0
    }

    pub fn excludes(&self, module: &ModuleId) -> bool {
        self.0.matches(module)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Dependency on a module published in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateDependency {
    pub coordinate: Coordinate,
    /// `None` defers to the resolution parameters.
    pub transitivity: Option<Transitivity>,
    pub exclusions: Vec<Exclusion>,
    pub ide_project_dir: Option<PathBuf>,
}

impl CoordinateDependency {
    pub fn of(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            transitivity: None,
            exclusions: Vec::new(),
            ide_project_dir: None,
        }
    }

    pub fn parse(s: &str) -> TrellisResult<Self> {
        Ok(Self::of(Coordinate::parse(s)?))
    }

    pub fn module_id(&self) -> &ModuleId {
        self.coordinate.module_id()
    }

    pub fn with_transitivity(&self, transitivity: Transitivity) -> Self {
        Self {
            transitivity: Some(transitivity),
            ..self.clone()
        }
    }

    pub fn with_version(&self, version: Version) -> Self {
        Self {
            coordinate: self.coordinate.with_version(version),
            ..self.clone()
        }
    }

    /// Append exclusions, skipping ones already present.
    pub fn and_exclusions(&self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        let mut result = self.clone();
        for exclusion in exclusions {
            if !result.exclusions.contains(&exclusion) {
                result.exclusions.push(exclusion);
            }
        }
        result
    }

    pub fn excludes(&self, module: &ModuleId) -> bool {
        self.exclusions.iter().any(|e| e.excludes(module))
    }
}

/// Files on the local file system, used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemDependency {
    pub paths: Vec<PathBuf>,
    pub ide_project_dir: Option<PathBuf>,
}

impl FileSystemDependency {
    pub fn of<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            ide_project_dir: None,
        }
    }
}

/// Callback that (re)creates the files of a [`ComputedDependency`].
pub type FileProducer = Arc<dyn Fn() -> TrellisResult<()> + Send + Sync>;

/// Files produced by running a callback, typically the output of another
/// project in the same build.
#[derive(Clone)]
pub struct ComputedDependency {
    pub producer: FileProducer,
    pub ide_project_dir: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub description: String,
}

impl ComputedDependency {
    pub fn of(
        description: impl Into<String>,
        files: Vec<PathBuf>,
        producer: impl Fn() -> TrellisResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            producer: Arc::new(producer),
            ide_project_dir: None,
            files,
            description: description.into(),
        }
    }

    pub fn with_ide_project_dir(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            ide_project_dir: Some(dir.into()),
            ..self.clone()
        }
    }

    /// Run the producer when any declared file is missing.
    pub fn ensure_files(&self) -> TrellisResult<&[PathBuf]> {
        if self.files.iter().all(|f| f.exists()) {
            return Ok(&self.files);
        }
        tracing::debug!("computing files for {}", self.description);
        (self.producer)()?;
        if let Some(missing) = self.files.iter().find(|f| !f.exists()) {
            return Err(TrellisError::Generic {
                message: format!(
                    "{} did not produce {}",
                    self.description,
                    missing.display()
                ),
            });
        }
        Ok(&self.files)
    }
}

impl fmt::Debug for ComputedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedDependency")
            .field("description", &self.description)
            .field("files", &self.files)
            .field("ide_project_dir", &self.ide_project_dir)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ComputedDependency {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
            && self.files == other.files
            && self.ide_project_dir == other.ide_project_dir
    }
}

/// One entry of a [`crate::dependency_set::DependencySet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    Coordinate(CoordinateDependency),
    Files(FileSystemDependency),
    Computed(ComputedDependency),
}

impl Dependency {
    /// Parse a coordinate, or fall back to a file path relative to `base_dir`.
    pub fn parse(token: &str, base_dir: &Path) -> TrellisResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TrellisError::parse("empty dependency"));
        }
        if Coordinate::looks_like(token) {
            return Ok(Self::Coordinate(CoordinateDependency::parse(token)?));
        }
        let path = Path::new(token);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        Ok(Self::Files(FileSystemDependency::of([path])))
    }

    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Self::Coordinate(dep) => Some(dep.module_id()),
            Self::Files(_) | Self::Computed(_) => None,
        }
    }

    pub fn as_coordinate(&self) -> Option<&CoordinateDependency> {
        match self {
            Self::Coordinate(dep) => Some(dep),
            Self::Files(_) | Self::Computed(_) => None,
        }
    }

    /// Same module for coordinates, same files otherwise.
    pub fn matches(&self, other: &Dependency) -> bool {
        match (self, other) {
            (Self::Coordinate(a), Self::Coordinate(b)) => a.module_id() == b.module_id(),
            (Self::Files(a), Self::Files(b)) => a.paths == b.paths,
            (Self::Computed(a), Self::Computed(b)) => a.files == b.files,
            _ => false,
        }
    }

    pub fn ide_project_dir(&self) -> Option<&Path> {
        match self {
            Self::Coordinate(dep) => dep.ide_project_dir.as_deref(),
            Self::Files(dep) => dep.ide_project_dir.as_deref(),
            Self::Computed(dep) => dep.ide_project_dir.as_deref(),
        }
    }

    /// Files known before resolution; empty for coordinates.
    pub fn local_files(&self) -> &[PathBuf] {
        match self {
            Self::Coordinate(_) => &[],
            Self::Files(dep) => &dep.paths,
            Self::Computed(dep) => &dep.files,
        }
    }
}

impl From<CoordinateDependency> for Dependency {
    fn from(dep: CoordinateDependency) -> Self {
        Self::Coordinate(dep)
    }
}

impl From<Coordinate> for Dependency {
    fn from(coordinate: Coordinate) -> Self {
        Self::Coordinate(CoordinateDependency::of(coordinate))
    }
}

impl From<FileSystemDependency> for Dependency {
    fn from(dep: FileSystemDependency) -> Self {
        Self::Files(dep)
    }
}

impl From<ComputedDependency> for Dependency {
    fn from(dep: ComputedDependency) -> Self {
        Self::Computed(dep)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinate(dep) => f.write_str(&dep.coordinate.to_short_string()),
            Self::Files(dep) => {
                let paths: Vec<String> = dep.paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "files[{}]", paths.join(", "))
            }
            Self::Computed(dep) => write!(f, "computed[{}]", dep.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_forms() {
        let group = Exclusion::parse("org.slf4j").unwrap();
        assert!(group.excludes(&ModuleId::new("org.slf4j", "slf4j-api")));
        let exact = Exclusion::parse("org.slf4j:slf4j-api").unwrap();
        assert!(!exact.excludes(&ModuleId::new("org.slf4j", "jul-to-slf4j")));
    }

    #[test]
    fn transitivity_scopes() {
        assert!(Transitivity::Compile.accepts_scope("compile"));
        assert!(!Transitivity::Compile.accepts_scope("runtime"));
        assert!(Transitivity::Runtime.accepts_scope("runtime"));
        assert!(!Transitivity::Runtime.accepts_scope("test"));
        assert!(!Transitivity::Runtime.accepts_scope("provided"));
        assert!(!Transitivity::None.accepts_scope("compile"));
    }

    #[test]
    fn parse_picks_coordinate_or_path() {
        let base = Path::new("/project");
        match Dependency::parse("org.acme:core:1.0", base).unwrap() {
            Dependency::Coordinate(dep) => assert_eq!(dep.module_id().name(), "core"),
            other => panic!("unexpected {other:?}"),
        }
        match Dependency::parse("libs/foo.jar", base).unwrap() {
            Dependency::Files(dep) => assert_eq!(dep.paths, vec![base.join("libs/foo.jar")]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exclusions_are_not_duplicated() {
        let dep = CoordinateDependency::parse("g:n:1")
            .unwrap()
            .and_exclusions([Exclusion::parse("a:b").unwrap()])
            .and_exclusions([Exclusion::parse("a:b").unwrap()]);
        assert_eq!(dep.exclusions.len(), 1);
    }
}
