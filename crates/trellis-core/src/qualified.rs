use std::fmt;

use trellis_util::errors::TrellisResult;

use crate::conflict::ConflictStrategy;
use crate::dependency::{Dependency, Exclusion};
use crate::dependency_set::DependencySet;
use crate::module_id::ModuleId;
use crate::version_provider::VersionProvider;

pub const COMPILE: &str = "compile";
pub const RUNTIME: &str = "runtime";
pub const PROVIDED: &str = "provided";
pub const TEST: &str = "test";

/// A dependency attached to a qualifier such as `compile` or `test`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedDependency {
    pub qualifier: Option<String>,
    pub dependency: Dependency,
}

impl QualifiedDependency {
    pub fn of(qualifier: Option<&str>, dependency: impl Into<Dependency>) -> Self {
        Self {
            qualifier: qualifier.map(str::to_string),
            dependency: dependency.into(),
        }
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn with_qualifier(&self, qualifier: Option<&str>) -> Self {
        Self::of(qualifier, self.dependency.clone())
    }
}

impl fmt::Display for QualifiedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}: {}", self.dependency),
            None => write!(f, "{}", self.dependency),
        }
    }
}

/// Ordered qualified dependencies, with the exclusions and version provider
/// applying to their resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualifiedDependencySet {
    entries: Vec<QualifiedDependency>,
    global_exclusions: Vec<Exclusion>,
    version_provider: VersionProvider,
}

impl QualifiedDependencySet {
    pub fn of() -> Self {
        Self::default()
    }

    /// Unqualified entries from a plain set, keeping its provider and exclusions.
    pub fn from_set(set: &DependencySet) -> Self {
        Self {
            entries: set
                .entries()
                .iter()
                .map(|dep| QualifiedDependency::of(None, dep.clone()))
                .collect(),
            global_exclusions: set.global_exclusions().to_vec(),
            version_provider: set.version_provider().clone(),
        }
    }

    pub fn entries(&self) -> &[QualifiedDependency] {
        &self.entries
    }

    pub fn global_exclusions(&self) -> &[Exclusion] {
        &self.global_exclusions
    }

    pub fn version_provider(&self) -> &VersionProvider {
        &self.version_provider
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with_entries(&self, entries: Vec<QualifiedDependency>) -> Self {
        Self {
            entries,
            global_exclusions: self.global_exclusions.clone(),
            version_provider: self.version_provider.clone(),
        }
    }

    pub fn and(&self, qualifier: Option<&str>, dependency: impl Into<Dependency>) -> Self {
        let mut entries = self.entries.clone();
        entries.push(QualifiedDependency::of(qualifier, dependency));
        self.with_entries(entries)
    }

    /// Entries declared on `module`, in order.
    pub fn find_by_module(&self, module: &ModuleId) -> Vec<&QualifiedDependency> {
        self.entries
            .iter()
            .filter(|q| q.dependency.module_id() == Some(module))
            .collect()
    }

    /// Drop every entry matching `dependency`.
    pub fn remove(&self, dependency: &Dependency) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|q| !q.dependency.matches(dependency))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    /// Change the qualifier of every entry matching `dependency`.
    pub fn replace_qualifier(&self, dependency: &Dependency, qualifier: Option<&str>) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|q| {
                if q.dependency.matches(dependency) {
                    q.with_qualifier(qualifier)
                } else {
                    q.clone()
                }
            })
            .collect();
        self.with_entries(entries)
    }

    /// Entries for which `keep` holds.
    pub fn filtered(&self, keep: impl Fn(&QualifiedDependency) -> bool) -> Self {
        let entries = self.entries.iter().filter(|q| keep(q)).cloned().collect();
        self.with_entries(entries)
    }

    pub fn with_qualifiers_only(&self, qualifiers: &[&str]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|q| q.qualifier().is_some_and(|name| qualifiers.contains(&name)))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    pub fn with_coordinate_dependencies_only(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|q| matches!(q.dependency, Dependency::Coordinate(_)))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    pub fn dependencies_having_qualifier(&self, qualifier: &str) -> Vec<&Dependency> {
        self.entries
            .iter()
            .filter(|q| q.qualifier() == Some(qualifier))
            .map(|q| &q.dependency)
            .collect()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.iter().map(|q| &q.dependency)
    }

    pub fn with_global_exclusions(&self, exclusions: Vec<Exclusion>) -> Self {
        Self {
            global_exclusions: exclusions,
            ..self.clone()
        }
    }

    pub fn with_version_provider(&self, provider: VersionProvider) -> Self {
        Self {
            version_provider: provider,
            ..self.clone()
        }
    }

    pub fn and_version_provider(&self, provider: &VersionProvider) -> Self {
        Self {
            version_provider: self.version_provider.merge(provider),
            ..self.clone()
        }
    }

    /// Qualifiers an IDE needs from the three accumulated sets.
    ///
    /// | compile | runtime | qualifier  |
    /// |---------|---------|------------|
    /// | yes     | yes     | `compile`  |
    /// | yes     | no      | `provided` |
    /// | no      | yes     | `runtime`  |
    /// | no      | no      | `test`     |
    ///
    /// Output follows compile order, then runtime-only, then test-only entries.
    pub fn compute_ide_dependencies(
        compile: &DependencySet,
        runtime: &DependencySet,
        test: &DependencySet,
        strategy: ConflictStrategy,
    ) -> TrellisResult<Self> {
        let prod = compile.merge(runtime);
        let all = prod.result.merge(test).result;
        let entries = all
            .normalised(strategy)?
            .entries()
            .iter()
            .map(|dep| {
                let in_prod = prod.result.entries().iter().any(|d| d.matches(dep));
                let qualifier = if !in_prod {
                    TEST
                } else if prod.absent_from_right.iter().any(|d| d.matches(dep)) {
                    PROVIDED
                } else if prod.absent_from_left.iter().any(|d| d.matches(dep)) {
                    RUNTIME
                } else {
                    COMPILE
                };
                QualifiedDependency::of(Some(qualifier), versioned(&all, dep))
            })
            .collect();
        Ok(Self {
            entries,
            global_exclusions: all.global_exclusions().to_vec(),
            version_provider: all.version_provider().clone(),
        })
    }

    /// Maven scopes for publication. Test dependencies are never published.
    pub fn compute_publish_dependencies(
        compile: &DependencySet,
        runtime: &DependencySet,
        strategy: ConflictStrategy,
    ) -> TrellisResult<Self> {
        let merge = compile.merge(runtime);
        let entries = merge
            .result
            .normalised(strategy)?
            .entries()
            .iter()
            .filter(|dep| matches!(dep, Dependency::Coordinate(_)))
            .map(|dep| {
                let qualifier = if merge.absent_from_right.iter().any(|d| d.matches(dep)) {
                    PROVIDED
                } else if merge.absent_from_left.iter().any(|d| d.matches(dep)) {
                    RUNTIME
                } else {
                    COMPILE
                };
                QualifiedDependency::of(Some(qualifier), versioned(&merge.result, dep))
            })
            .collect();
        Ok(Self {
            entries,
            global_exclusions: merge.result.global_exclusions().to_vec(),
            version_provider: merge.result.version_provider().clone(),
        })
    }
}

fn versioned(set: &DependencySet, dep: &Dependency) -> Dependency {
    match dep {
        Dependency::Coordinate(c) => Dependency::Coordinate(set.version_provider().version(c)),
        other => other.clone(),
    }
}
