//! Loading a project directory and resolving one of its scopes.

use std::path::{Path, PathBuf};

use miette::Result;
use trellis_core::dependencies_txt::{self, DependenciesTxt};
use trellis_core::dependency_set::DependencySet;
use trellis_core::qualified::QualifiedDependencySet;
use trellis_core::settings::Settings;
use trellis_maven::DirectoryRepository;
use trellis_resolver::{DependencyResolver, RepoSet, ResolveResult};
use trellis_util::errors::TrellisError;
use trellis_util::progress;

/// `dependencies.txt` and `trellis.toml` of one directory.
pub struct Project {
    pub dir: PathBuf,
    pub settings: Settings,
    pub dependencies: DependenciesTxt,
}

impl Project {
    pub fn load(dir: &Path) -> Result<Self> {
        let settings = Settings::load(dir)?;
        let dependencies = DependenciesTxt::load(dir)?.ok_or_else(|| TrellisError::Config {
            message: format!(
                "No {} found in {}",
                dependencies_txt::FILE_NAME,
                dir.display()
            ),
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            settings,
            dependencies,
        })
    }

    /// Directory repositories from `[repositories]`, relative paths taken
    /// from the project directory.
    pub fn resolver(&self) -> Result<DependencyResolver> {
        let mut repos = RepoSet::default();
        for (name, location) in &self.settings.repositories {
            if location.contains("://") {
                progress::status_warn(
                    "Skipping",
                    &format!("repository {name}: only directories are supported ({location})"),
                );
                continue;
            }
            tracing::debug!("Repository {name} at {location}");
            repos = repos.and(DirectoryRepository::new(name, self.dir.join(location)));
        }
        if repos.is_empty() {
            return Err(TrellisError::Config {
                message: "No repository directory configured in [repositories]".to_string(),
            }
            .into());
        }
        Ok(DependencyResolver::of(repos).with_parameters(self.settings.resolution.clone()))
    }

    pub fn scope(&self, scope: &str) -> Result<DependencySet> {
        match scope {
            "compile" => Ok(self.dependencies.compute_compile_deps()),
            "runtime" => Ok(self.dependencies.compute_runtime_deps()),
            "test" => Ok(self.dependencies.compute_test_deps()),
            other => Err(TrellisError::Config {
                message: format!("Unknown scope '{other}', expected compile, runtime or test"),
            }
            .into()),
        }
    }
}

/// Resolve `set` behind a spinner and report what was found.
pub async fn resolve(
    resolver: &DependencyResolver,
    set: &QualifiedDependencySet,
) -> Result<ResolveResult> {
    let pb = progress::spinner(&format!("Resolving {} dependencies", set.len()));
    let result = resolver.resolve_qualified(set).await;
    pb.finish_and_clear();
    let result = result?;

    progress::status(
        "Resolved",
        &format!(
            "{} modules to {} files",
            result.resolved_versions.len(),
            result.files.len()
        ),
    );
    for error in &result.errors {
        progress::status_warn("Warning", &error.to_string());
    }
    Ok(result)
}
