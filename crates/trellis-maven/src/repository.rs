//! A Maven-layout directory used as a [`RepositoryClient`].

use std::io;
use std::path::{Path, PathBuf};

use futures_util::FutureExt;
use trellis_core::coordinate::Coordinate;
use trellis_core::dependency::Exclusion;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;
use trellis_resolver::repository::{
    Descriptor, RepoFuture, RepositoryClient, RepositoryError, TransitiveDependency,
};
use trellis_util::errors::TrellisResult;

use crate::metadata;
use crate::pom::{self, Pom, PomDependency};

pub const METADATA_FILE: &str = "maven-metadata.xml";

/// Parent POM chains longer than this are cut.
const MAX_PARENT_DEPTH: usize = 16;

/// Reads modules from a directory laid out like a Maven repository:
/// `org/acme/acme-core/1.0/acme-core-1.0.pom`.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    name: String,
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_dir(&self, module: &ModuleId) -> PathBuf {
        self.root.join(module.to_path())
    }

    pub fn version_dir(&self, module: &ModuleId, version: &Version) -> PathBuf {
        self.module_dir(module).join(version.value())
    }

    /// Path where the file of `coordinate` lives, whether or not it exists.
    pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.version_dir(coordinate.module_id(), coordinate.version())
            .join(coordinate.file_name())
    }

    fn pom_path(&self, module: &ModuleId, version: &Version) -> PathBuf {
        self.version_dir(module, version)
            .join(format!("{}-{}.pom", module.name(), version))
    }

    async fn read(&self, path: &Path) -> Result<Option<String>, RepositoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(path, e)),
        }
    }

    fn io_error(&self, path: &Path, error: io::Error) -> RepositoryError {
        RepositoryError::Io {
            repository: self.name.clone(),
            message: format!("{}: {error}", path.display()),
        }
    }

    fn malformed(&self, path: &Path, message: impl std::fmt::Display) -> RepositoryError {
        RepositoryError::Malformed {
            repository: self.name.clone(),
            what: path.display().to_string(),
            message: message.to_string(),
        }
    }

    async fn versions(&self, module: &ModuleId) -> Result<Vec<Version>, RepositoryError> {
        let dir = self.module_dir(module);
        let metadata_path = dir.join(METADATA_FILE);
        if let Some(xml) = self.read(&metadata_path).await? {
            let meta =
                metadata::parse_metadata(&xml).map_err(|e| self.malformed(&metadata_path, e))?;
            return Ok(meta.versions.iter().map(|v| Version::of(v)).collect());
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&dir, e)),
        };
        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error(&dir, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| self.io_error(&entry.path(), e))?
                .is_dir();
            if is_dir {
                versions.push(Version::of(&entry.file_name().to_string_lossy()));
            }
        }
        versions.sort_by(|a, b| a.compare(b).then_with(|| a.value().cmp(b.value())));
        Ok(versions)
    }

    /// The POM of `module:version` with its parents folded in, or `None`
    /// when the repository doesn't have it.
    async fn effective_pom(
        &self,
        module: &ModuleId,
        version: &Version,
    ) -> Result<Option<Pom>, RepositoryError> {
        let Some(pom) = self.load_pom(module, version).await? else {
            return Ok(None);
        };

        let mut lineage = vec![pom];
        while lineage.len() <= MAX_PARENT_DEPTH {
            let Some(parent) = lineage.last().and_then(|p| p.parent.clone()) else {
                break;
            };
            let parent_module = ModuleId::new(parent.group_id, parent.artifact_id);
            let parent_version = Version::of(&parent.version);
            match self.load_pom(&parent_module, &parent_version).await? {
                Some(parent_pom) => lineage.push(parent_pom),
                None => {
                    tracing::warn!(
                        "{}: parent {parent_module}:{parent_version} of {module}:{version} not found",
                        self.name
                    );
                    break;
                }
            }
        }

        let mut effective = lineage.pop().unwrap_or_default();
        while let Some(mut child) = lineage.pop() {
            child.inherit(&effective);
            effective = child;
        }
        Ok(Some(effective.interpolated()))
    }

    async fn load_pom(
        &self,
        module: &ModuleId,
        version: &Version,
    ) -> Result<Option<Pom>, RepositoryError> {
        let path = self.pom_path(module, version);
        let Some(xml) = self.read(&path).await? else {
            return Ok(None);
        };
        pom::parse_pom(&xml)
            .map(Some)
            .map_err(|e| self.malformed(&path, e))
    }

    async fn descriptor(&self, coordinate: &Coordinate) -> Result<Option<Descriptor>, RepositoryError> {
        let module = coordinate.module_id();
        let version = coordinate.version();
        match self.effective_pom(module, version).await? {
            Some(pom) => Ok(Some(to_descriptor(&pom))),
            None => {
                let jar = module.to_coordinate(version.clone());
                let has_jar = tokio::fs::try_exists(self.artifact_path(&jar))
                    .await
                    .unwrap_or(false);
                if has_jar {
                    tracing::debug!("{}: {module}:{version} has no POM", self.name);
                }
                Ok(has_jar.then(Descriptor::default))
            }
        }
    }
}

/// What the resolver needs from an effective POM.
pub fn to_descriptor(pom: &Pom) -> Descriptor {
    let dependencies: Vec<TransitiveDependency> = pom
        .dependencies
        .iter()
        .filter(|d| d.scope.as_deref() != Some("import"))
        .filter_map(|d| checked(d, transitive(d)))
        .collect();

    let mut configurations: Vec<String> = Vec::new();
    for dep in &dependencies {
        let scope = if dep.scope.is_empty() {
            "compile"
        } else {
            dep.scope.as_str()
        };
        if !configurations.iter().any(|c| c == scope) {
            configurations.push(scope.to_string());
        }
    }

    Descriptor {
        dependencies,
        configurations,
        managed_versions: pom
            .managed_versions()
            .map(|d| {
                (
                    ModuleId::new(&d.group_id, &d.artifact_id),
                    Version::of(d.version.as_deref().unwrap_or_default()),
                )
            })
            .collect(),
        imported_boms: pom
            .bom_imports()
            .filter_map(|d| checked(d, coordinate_of(d)))
            .collect(),
    }
}

/// Drop a dependency whose fields cannot form a coordinate.
fn checked<T>(dep: &PomDependency, converted: TrellisResult<T>) -> Option<T> {
    converted
        .map_err(|e| {
            tracing::warn!("ignoring {}:{}: {e}", dep.group_id, dep.artifact_id);
        })
        .ok()
}

fn coordinate_of(dep: &PomDependency) -> TrellisResult<Coordinate> {
    let type_ = match dep.type_.as_deref() {
        None | Some("jar") => "",
        Some(other) => other,
    };
    let version: Version = dep.version.as_deref().unwrap_or_default().parse()?;
    ModuleId::new(&dep.group_id, &dep.artifact_id)
        .to_coordinate(version)
        .try_with_classifier_and_type(dep.classifier.as_deref().unwrap_or_default(), type_)
}

fn transitive(dep: &PomDependency) -> TrellisResult<TransitiveDependency> {
    let exclusions = dep
        .exclusions
        .iter()
        .map(|(group, name)| {
            let name = if name.is_empty() { "*" } else { name.as_str() };
            Exclusion::of(ModuleId::new(group, name))
        })
        .collect();
    let mut transitive = TransitiveDependency::of(coordinate_of(dep)?)
        .with_scope(dep.scope.clone().unwrap_or_default())
        .with_exclusions(exclusions);
    if dep.optional {
        transitive = transitive.optional();
    }
    Ok(transitive)
}

impl RepositoryClient for DirectoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions<'a>(&'a self, module: &'a ModuleId) -> RepoFuture<'a, Vec<Version>> {
        self.versions(module).boxed()
    }

    fn fetch_descriptor<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> RepoFuture<'a, Option<Descriptor>> {
        self.descriptor(coordinate).boxed()
    }

    fn fetch_artifact<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> RepoFuture<'a, Option<PathBuf>> {
        async move {
            let path = self.artifact_path(coordinate);
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => Ok(Some(path)),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(self.io_error(&path, e)),
            }
        }
        .boxed()
    }
}
