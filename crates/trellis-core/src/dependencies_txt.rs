//! `dependencies.txt` parsing.
//!
//! ```text
//! [version-provider]
//! org.acme:acme-bom::pom:2.1.0     # imports the BOM
//! com.google.guava:guava:31.1-jre
//!
//! [compile]
//! com.google.guava:guava
//! org.hibernate:hibernate-core:6.4.0
//! !org.jboss.logging:jboss-logging   # excluded below hibernate only
//! !!commons-logging                  # excluded everywhere
//! libs/legacy.jar
//!
//! [test]
//! org.junit.jupiter:junit-jupiter:5.10.1
//! ```

use std::path::{Path, PathBuf};

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::dependency::{Dependency, Exclusion};
use crate::dependency_set::DependencySet;
use crate::version_provider::VersionProvider;

pub const FILE_NAME: &str = "dependencies.txt";

const LOCAL_EXCLUDE: &str = "!";
const GLOBAL_EXCLUDE: &str = "!!";

/// Known section names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Compile,
    CompileOnly,
    Runtime,
    Test,
    VersionProvider,
}

impl Section {
    fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "compile" => Some(Self::Compile),
            "compile-only" => Some(Self::CompileOnly),
            "runtime" => Some(Self::Runtime),
            "test" => Some(Self::Test),
            "version-provider" | "version" => Some(Self::VersionProvider),
            _ => None,
        }
    }
}

/// Parsed content of a `dependencies.txt` file.
#[derive(Debug, Clone, Default)]
pub struct DependenciesTxt {
    compile: DependencySet,
    compile_only: DependencySet,
    runtime: DependencySet,
    test: DependencySet,
    version_provider: VersionProvider,
}

impl DependenciesTxt {
    /// Load `dependencies.txt` from `base_dir`, or `None` when there is none.
    pub fn load(base_dir: &Path) -> TrellisResult<Option<Self>> {
        let path = base_dir.join(FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::parse_file(&path, base_dir).map(Some)
    }

    /// Parse `path`, resolving relative file entries against `base_dir`.
    ///
    /// The version provider of a `dependencies.txt` sitting in the parent of
    /// the file's directory is inherited, our entries overriding its own.
    pub fn parse_file(path: &Path, base_dir: &Path) -> TrellisResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut parsed = Self::parse_str(&content, base_dir).map_err(|e| match e {
            TrellisError::Parse { message } => {
                TrellisError::parse(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;

        if let Some(inherited) = grand_parent_file(path) {
            tracing::debug!("inheriting versions from {}", inherited.display());
            let parent_dir = inherited.parent().unwrap_or(base_dir).to_path_buf();
            let parent = Self::parse_file(&inherited, &parent_dir)?;
            parsed.version_provider = parent.version_provider.merge(&parsed.version_provider);
        }
        Ok(parsed)
    }

    /// Parse file content. Relative paths resolve against `base_dir`.
    pub fn parse_str(content: &str, base_dir: &Path) -> TrellisResult<Self> {
        let mut result = Self::default();
        let mut current: Option<Section> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let section = Section::parse(name).ok_or_else(|| {
                    TrellisError::parse(format!("line {line_no}: unknown section [{name}]"))
                })?;
                current = Some(section);
                continue;
            }
            let section = current.ok_or_else(|| {
                TrellisError::parse(format!(
                    "line {line_no}: '{line}' appears before any [section]"
                ))
            })?;
            let at_line = |e: TrellisError| match e {
                TrellisError::Parse { message } => {
                    TrellisError::parse(format!("line {line_no}: {message}"))
                }
                other => other,
            };
            if section == Section::VersionProvider {
                result.version_provider =
                    version_entry(&result.version_provider, line).map_err(at_line)?;
                continue;
            }
            let set = result.section_mut(section);
            *set = apply(set, line, base_dir).map_err(at_line)?;
        }
        Ok(result)
    }

    fn section_mut(&mut self, section: Section) -> &mut DependencySet {
        match section {
            Section::Compile => &mut self.compile,
            Section::CompileOnly => &mut self.compile_only,
            Section::Runtime => &mut self.runtime,
            Section::Test | Section::VersionProvider => &mut self.test,
        }
    }

    /// Raw entries of one section, without accretion.
    pub fn section(&self, section: Section) -> DependencySet {
        match section {
            Section::Compile => self.compile.clone(),
            Section::CompileOnly => self.compile_only.clone(),
            Section::Runtime => self.runtime.clone(),
            Section::Test => self.test.clone(),
            Section::VersionProvider => {
                DependencySet::of().with_version_provider(self.version_provider.clone())
            }
        }
    }

    pub fn version_provider(&self) -> &VersionProvider {
        &self.version_provider
    }

    /// `compile` + `compile-only`
    pub fn compute_compile_deps(&self) -> DependencySet {
        self.compile
            .and_set(&self.compile_only)
            .and_version_provider(&self.version_provider)
    }

    /// `compile` + `runtime`
    pub fn compute_runtime_deps(&self) -> DependencySet {
        self.compile
            .and_set(&self.runtime)
            .and_version_provider(&self.version_provider)
    }

    /// `compile` + `compile-only` + `runtime` + `test`
    pub fn compute_test_deps(&self) -> DependencySet {
        self.compile
            .and_set(&self.compile_only)
            .and_set(&self.runtime)
            .and_set(&self.test)
            .and_version_provider(&self.version_provider)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => line[..i].trim(),
        None => line.trim(),
    }
}

fn apply(set: &DependencySet, line: &str, base_dir: &Path) -> TrellisResult<DependencySet> {
    // `!!` must be tested before `!`.
    if let Some(rest) = line.strip_prefix(GLOBAL_EXCLUDE) {
        return Ok(set.and_global_exclusion(Exclusion::parse(rest)?));
    }
    if let Some(rest) = line.strip_prefix(LOCAL_EXCLUDE) {
        if !matches!(set.entries().last(), Some(Dependency::Coordinate(_))) {
            return Err(TrellisError::parse(format!(
                "exclusion '{line}' does not follow a module dependency"
            )));
        }
        return Ok(set.with_local_exclusions([Exclusion::parse(rest)?]));
    }
    Ok(set.and(Dependency::parse(line, base_dir)?))
}

fn version_entry(provider: &VersionProvider, line: &str) -> TrellisResult<VersionProvider> {
    let coordinate = crate::coordinate::Coordinate::parse(line)?;
    if coordinate.version().is_unspecified() {
        return Err(TrellisError::parse(format!(
            "'{line}' in [version-provider] must be written as group:name:version"
        )));
    }
    if coordinate.is_bom() {
        Ok(provider.and_bom_coordinate(coordinate))
    } else {
        Ok(provider.and(coordinate.module_id().clone(), coordinate.version().clone()))
    }
}

fn grand_parent_file(path: &Path) -> Option<PathBuf> {
    let candidate = path.parent()?.parent()?.join(FILE_NAME);
    candidate.is_file().then_some(candidate)
}
