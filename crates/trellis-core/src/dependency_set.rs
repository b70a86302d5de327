//! Ordered, immutable dependency declarations.
//!
//! A [`DependencySet`] is never mutated in place: every operation returns a
//! new set. Entry order is significant, it becomes the child order of the
//! resolved tree and the order of published dependencies.

use std::fmt;
use std::path::{Path, PathBuf};

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::conflict::ConflictStrategy;
use crate::dependency::{
    ComputedDependency, CoordinateDependency, Dependency, Exclusion, FileSystemDependency,
    Transitivity,
};
use crate::module_id::ModuleId;
use crate::version::Version;
use crate::version_provider::VersionProvider;

/// Where to insert entries in a [`DependencySet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    anchor: Anchor,
    condition: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Anchor {
    First,
    Last,
    Before(ModuleId),
    After(ModuleId),
}

impl Hint {
    pub fn first() -> Self {
        Self::new(Anchor::First, true)
    }

    pub fn last() -> Self {
        Self::new(Anchor::Last, true)
    }

    pub fn before(module: ModuleId) -> Self {
        Self::new(Anchor::Before(module), true)
    }

    pub fn after(module: ModuleId) -> Self {
        Self::new(Anchor::After(module), true)
    }

    /// Insert first when `condition` holds; otherwise leave the set untouched.
    pub fn first_if(condition: bool) -> Self {
        Self::new(Anchor::First, condition)
    }

    pub fn last_if(condition: bool) -> Self {
        Self::new(Anchor::Last, condition)
    }

    pub fn before_if(module: ModuleId, condition: bool) -> Self {
        Self::new(Anchor::Before(module), condition)
    }

    fn new(anchor: Anchor, condition: bool) -> Self {
        Self { anchor, condition }
    }

    /// Index at which to insert, `None` when the anchor module is absent.
    fn insertion_index(&self, entries: &[Dependency]) -> Option<usize> {
        let position = |module: &ModuleId| {
            entries
                .iter()
                .position(|dep| dep.module_id() == Some(module))
        };
        match &self.anchor {
            Anchor::First => Some(0),
            Anchor::Last => Some(entries.len()),
            Anchor::Before(module) => position(module),
            Anchor::After(module) => position(module).map(|i| i + 1),
        }
    }
}

/// Outcome of [`DependencySet::merge`].
#[derive(Debug, Clone)]
pub struct DependencySetMerge {
    pub result: DependencySet,
    /// Entries of the right set with no match in the left one.
    pub absent_from_left: Vec<Dependency>,
    /// Entries of the left set with no match in the right one.
    pub absent_from_right: Vec<Dependency>,
}

/// Ordered dependencies plus the version provider and global exclusions
/// applying to their resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencySet {
    entries: Vec<Dependency>,
    global_exclusions: Vec<Exclusion>,
    version_provider: VersionProvider,
}

impl DependencySet {
    pub fn of() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = Dependency>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[Dependency] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn global_exclusions(&self) -> &[Exclusion] {
        &self.global_exclusions
    }

    pub fn version_provider(&self) -> &VersionProvider {
        &self.version_provider
    }

    fn with_entries(&self, entries: Vec<Dependency>) -> Self {
        Self {
            entries,
            global_exclusions: self.global_exclusions.clone(),
            version_provider: self.version_provider.clone(),
        }
    }

    /// Append a dependency.
    pub fn and(&self, dependency: impl Into<Dependency>) -> Self {
        let mut entries = self.entries.clone();
        entries.push(dependency.into());
        self.with_entries(entries)
    }

    /// Append a coordinate (`group:name[:classifier[:type]]:version`) or a file path.
    pub fn and_str(&self, token: &str) -> TrellisResult<Self> {
        Ok(self.and(Dependency::parse(token, Path::new(""))?))
    }

    /// Append a coordinate with an explicit transitivity.
    pub fn and_with_transitivity(
        &self,
        coordinate: &str,
        transitivity: Transitivity,
    ) -> TrellisResult<Self> {
        let dep = CoordinateDependency::parse(coordinate)?.with_transitivity(transitivity);
        Ok(self.and(dep))
    }

    /// Append every entry of `other`, merging its exclusions and version provider.
    pub fn and_set(&self, other: &DependencySet) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().cloned());
        let mut result = self.with_entries(entries);
        result.global_exclusions = union(&self.global_exclusions, &other.global_exclusions);
        result.version_provider = self.version_provider.merge(&other.version_provider);
        result
    }

    /// Insert at the position described by `hint`.
    ///
    /// Fails when the hint is anchored on a module absent from this set.
    pub fn and_at(&self, hint: &Hint, dependency: impl Into<Dependency>) -> TrellisResult<Self> {
        self.and_all_at(hint, vec![dependency.into()])
    }

    pub fn and_all_at(&self, hint: &Hint, dependencies: Vec<Dependency>) -> TrellisResult<Self> {
        if !hint.condition {
            return Ok(self.clone());
        }
        let index = hint.insertion_index(&self.entries).ok_or_else(|| {
            TrellisError::Generic {
                message: format!("no dependency matching {:?} found in {self}", hint.anchor),
            }
        })?;
        let mut entries = self.entries.clone();
        entries.splice(index..index, dependencies);
        Ok(self.with_entries(entries))
    }

    pub fn and_files<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) -> Self {
        self.and(FileSystemDependency::of(paths))
    }

    pub fn and_computed(&self, dependency: ComputedDependency) -> Self {
        self.and(dependency)
    }

    /// Move the entry for `module` to the position described by `hint`.
    pub fn with_moving(&self, module: &ModuleId, hint: &Hint) -> TrellisResult<Self> {
        let dep = self
            .entries
            .iter()
            .find(|d| d.module_id() == Some(module))
            .cloned()
            .ok_or_else(|| TrellisError::Generic {
                message: format!("no dependency {module} found in {self}"),
            })?;
        self.minus(module).and_all_at(hint, vec![dep])
    }

    /// Remove every coordinate entry whose module matches `module`
    /// (`group:*` and `group:prefix*` wildcards accepted).
    pub fn minus(&self, module: &ModuleId) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|dep| !dep.module_id().is_some_and(|m| module.matches(m)))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    /// Remove `path` from file entries, dropping entries left empty.
    pub fn minus_path(&self, path: &Path) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Files(files) => {
                    let paths: Vec<PathBuf> = files
                        .paths
                        .iter()
                        .filter(|p| p.as_path() != path)
                        .cloned()
                        .collect();
                    if paths.is_empty() {
                        None
                    } else {
                        Some(Dependency::Files(FileSystemDependency {
                            paths,
                            ide_project_dir: files.ide_project_dir.clone(),
                        }))
                    }
                }
                other => Some(other.clone()),
            })
            .collect();
        self.with_entries(entries)
    }

    /// First coordinate entry for exactly `group:name`.
    pub fn get(&self, module: &str) -> Option<&CoordinateDependency> {
        let module = ModuleId::parse(module).ok()?;
        self.find(&module)
    }

    pub fn find(&self, module: &ModuleId) -> Option<&CoordinateDependency> {
        self.coordinate_dependencies()
            .find(|dep| dep.module_id() == module)
    }

    pub fn coordinate_dependencies(&self) -> impl Iterator<Item = &CoordinateDependency> {
        self.entries.iter().filter_map(Dependency::as_coordinate)
    }

    pub fn has_modules(&self) -> bool {
        self.coordinate_dependencies().next().is_some()
    }

    pub fn has_dynamic_versions(&self) -> bool {
        self.coordinate_dependencies()
            .any(|dep| dep.coordinate.version().is_dynamic())
    }

    /// Attach exclusions to the most recently appended entry.
    ///
    /// Has no effect when the last entry is not a coordinate dependency.
    pub fn with_local_exclusions(&self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        let mut entries = self.entries.clone();
        if let Some(Dependency::Coordinate(last)) = entries.last_mut() {
            *last = last.and_exclusions(exclusions);
        }
        self.with_entries(entries)
    }

    /// Attach exclusions to every entry for `module`.
    pub fn with_local_exclusions_on(
        &self,
        module: &ModuleId,
        exclusions: &[Exclusion],
    ) -> Self {
        self.map_coordinates(|dep| {
            if dep.module_id() == module {
                dep.and_exclusions(exclusions.iter().cloned())
            } else {
                dep.clone()
            }
        })
    }

    pub fn with_transitivity(&self, module: &ModuleId, transitivity: Transitivity) -> Self {
        self.map_coordinates(|dep| {
            if dep.module_id() == module {
                dep.with_transitivity(transitivity)
            } else {
                dep.clone()
            }
        })
    }

    /// Replace `former` transitivity by `replacement` on every entry carrying it.
    pub fn with_global_transitivity_replacement(
        &self,
        former: Option<Transitivity>,
        replacement: Transitivity,
    ) -> Self {
        self.map_coordinates(|dep| {
            if dep.transitivity == former {
                dep.with_transitivity(replacement)
            } else {
                dep.clone()
            }
        })
    }

    pub fn and_global_exclusion(&self, exclusion: Exclusion) -> Self {
        let mut result = self.clone();
        if !result.global_exclusions.contains(&exclusion) {
            result.global_exclusions.push(exclusion);
        }
        result
    }

    pub fn with_global_exclusions(&self, exclusions: Vec<Exclusion>) -> Self {
        Self {
            global_exclusions: union(&[], &exclusions),
            ..self.clone()
        }
    }

    /// Replace the version provider.
    pub fn with_version_provider(&self, provider: VersionProvider) -> Self {
        Self {
            version_provider: provider,
            ..self.clone()
        }
    }

    /// Merge `provider` into the current one; `provider` wins on shared keys.
    pub fn and_version_provider(&self, provider: &VersionProvider) -> Self {
        self.with_version_provider(self.version_provider.merge(provider))
    }

    /// Keep a single entry per `(module, classifier, type)`.
    ///
    /// The kept entry sits at the position of the first occurrence, takes the
    /// version chosen by `strategy` and the union of all exclusions. With
    /// [`ConflictStrategy::Fail`] divergent versions are an error.
    pub fn normalised(&self, strategy: ConflictStrategy) -> TrellisResult<Self> {
        let mut entries: Vec<Dependency> = Vec::with_capacity(self.entries.len());
        for dep in &self.entries {
            let Dependency::Coordinate(candidate) = dep else {
                entries.push(dep.clone());
                continue;
            };
            let existing = entries.iter_mut().find_map(|e| match e {
                Dependency::Coordinate(kept) if same_artifact(kept, candidate) => Some(kept),
                _ => None,
            });
            let Some(kept) = existing else {
                entries.push(dep.clone());
                continue;
            };
            let retained = kept.coordinate.version();
            let requested = candidate.coordinate.version();
            let version = strategy.select(retained, requested).ok_or_else(|| {
                TrellisError::Conflict {
                    message: format!(
                        "{} is declared with versions {retained} and {requested}",
                        kept.module_id()
                    ),
                }
            })?;
            *kept = kept
                .with_version(version)
                .and_exclusions(candidate.exclusions.iter().cloned());
        }
        Ok(self.with_entries(entries))
    }

    /// Fill unspecified versions from the version provider.
    pub fn to_resolved_module_versions(&self) -> Self {
        self.map_coordinates(|dep| self.version_provider.version(dep))
    }

    /// Entries with versions filled from the version provider.
    pub fn versioned_dependencies(&self) -> Vec<Dependency> {
        self.to_resolved_module_versions().entries
    }

    /// Error listing every coordinate entry left without a version.
    pub fn assert_no_unspecified_version(&self) -> TrellisResult<&Self> {
        let missing: Vec<String> = self
            .coordinate_dependencies()
            .filter(|dep| dep.coordinate.version().is_unspecified())
            .filter(|dep| self.version_provider.version_of(dep.module_id()).is_none())
            .map(|dep| dep.module_id().to_string())
            .collect();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(TrellisError::Generic {
                message: format!(
                    "the following modules do not specify a version: {}",
                    missing.join(", ")
                ),
            })
        }
    }

    /// Distinct IDE project directories, in declaration order.
    pub fn ide_project_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::new();
        for dir in self.entries.iter().filter_map(Dependency::ide_project_dir) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    /// Union of both sets, keeping our entries first.
    pub fn merge(&self, other: &DependencySet) -> DependencySetMerge {
        let absent_from_left: Vec<Dependency> = other
            .entries
            .iter()
            .filter(|dep| !self.entries.iter().any(|d| d.matches(dep)))
            .cloned()
            .collect();
        let absent_from_right: Vec<Dependency> = self
            .entries
            .iter()
            .filter(|dep| !other.entries.iter().any(|d| d.matches(dep)))
            .cloned()
            .collect();
        let mut entries = self.entries.clone();
        entries.extend(absent_from_left.iter().cloned());
        let result = Self {
            entries,
            global_exclusions: union(&self.global_exclusions, &other.global_exclusions),
            version_provider: other.version_provider.merge(&self.version_provider),
        };
        DependencySetMerge {
            result,
            absent_from_left,
            absent_from_right,
        }
    }

    /// Versions declared directly on entries.
    pub fn declared_versions(&self) -> Vec<(ModuleId, Version)> {
        self.coordinate_dependencies()
            .filter(|dep| !dep.coordinate.version().is_unspecified())
            .map(|dep| (dep.module_id().clone(), dep.coordinate.version().clone()))
            .collect()
    }

    fn map_coordinates(&self, f: impl Fn(&CoordinateDependency) -> CoordinateDependency) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|dep| match dep {
                Dependency::Coordinate(c) => Dependency::Coordinate(f(c)),
                other => other.clone(),
            })
            .collect();
        self.with_entries(entries)
    }
}

fn same_artifact(a: &CoordinateDependency, b: &CoordinateDependency) -> bool {
    a.module_id() == b.module_id()
        && a.coordinate.classifier() == b.coordinate.classifier()
        && a.coordinate.type_() == b.coordinate.type_()
}

fn union(left: &[Exclusion], right: &[Exclusion]) -> Vec<Exclusion> {
    let mut result: Vec<Exclusion> = Vec::with_capacity(left.len() + right.len());
    for exclusion in left.iter().chain(right) {
        if !result.contains(exclusion) {
            result.push(exclusion.clone());
        }
    }
    result
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ModuleId {
        ModuleId::parse(s).unwrap()
    }

    fn set(tokens: &[&str]) -> DependencySet {
        tokens
            .iter()
            .fold(DependencySet::of(), |s, t| s.and_str(t).unwrap())
    }

    fn names(set: &DependencySet) -> Vec<String> {
        set.entries()
            .iter()
            .map(|d| d.module_id().map(|m| m.name().to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn hints_compute_insertion_index() {
        let base = set(&["g:a:1", "g:b:1"]);
        let first = base.and_at(&Hint::first(), CoordinateDependency::parse("g:x:1").unwrap());
        assert_eq!(names(&first.unwrap()), ["x", "a", "b"]);
        let before = base
            .and_at(&Hint::before(id("g:b")), CoordinateDependency::parse("g:x:1").unwrap())
            .unwrap();
        assert_eq!(names(&before), ["a", "x", "b"]);
        let after = base
            .and_at(&Hint::after(id("g:a")), CoordinateDependency::parse("g:x:1").unwrap())
            .unwrap();
        assert_eq!(names(&after), ["a", "x", "b"]);
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let base = set(&["g:a:1"]);
        let dep = CoordinateDependency::parse("g:x:1").unwrap();
        assert!(base.and_at(&Hint::before(id("g:zz")), dep).is_err());
    }

    #[test]
    fn false_condition_leaves_set_unchanged() {
        let base = set(&["g:a:1"]);
        let dep = CoordinateDependency::parse("g:x:1").unwrap();
        assert_eq!(base.and_at(&Hint::first_if(false), dep).unwrap(), base);
    }

    #[test]
    fn minus_supports_wildcards() {
        let base = set(&["g:a:1", "h:b:1", "g:c:1"]);
        assert_eq!(names(&base.minus(&id("g:*"))), ["b"]);
        assert_eq!(names(&base.minus(&id("g:a"))), ["b", "c"]);
    }

    #[test]
    fn with_moving_relocates_entry() {
        let base = set(&["g:a:1", "g:b:1", "g:c:1"]);
        let moved = base.with_moving(&id("g:c"), &Hint::first()).unwrap();
        assert_eq!(names(&moved), ["c", "a", "b"]);
    }

    #[test]
    fn normalised_keeps_first_position_and_unions_exclusions() {
        let base = DependencySet::of()
            .and_str("g:m:2.0")
            .unwrap()
            .with_local_exclusions([Exclusion::parse("x:y").unwrap()])
            .and_str("g:other:1")
            .unwrap()
            .and_str("g:m:2.8")
            .unwrap()
            .with_local_exclusions([Exclusion::parse("x:z").unwrap()]);
        let normalised = base.normalised(ConflictStrategy::TakeHighest).unwrap();
        assert_eq!(names(&normalised), ["m", "other"]);
        let m = normalised.get("g:m").unwrap();
        assert_eq!(m.coordinate.version().value(), "2.8");
        assert_eq!(m.exclusions.len(), 2);
    }

    #[test]
    fn normalised_fail_reports_conflict() {
        let base = set(&["g:m:2.0", "g:m:2.8"]);
        let err = base.normalised(ConflictStrategy::Fail).unwrap_err();
        assert!(matches!(err, TrellisError::Conflict { .. }));
    }

    #[test]
    fn local_exclusions_apply_to_last_entry_only() {
        let base = set(&["g:a:1", "g:b:1"]).with_local_exclusions([Exclusion::parse("x").unwrap()]);
        assert!(base.get("g:a").unwrap().exclusions.is_empty());
        assert_eq!(base.get("g:b").unwrap().exclusions.len(), 1);
    }

    #[test]
    fn unspecified_version_assertion() {
        let base = set(&["g:a", "g:b:1"]);
        assert!(base.assert_no_unspecified_version().is_err());
        let provided = base.with_version_provider(VersionProvider::of().and_str("g:a", "3").unwrap());
        assert!(provided.assert_no_unspecified_version().is_ok());
        let filled = provided.to_resolved_module_versions();
        assert_eq!(filled.get("g:a").unwrap().coordinate.version().value(), "3");
    }

    #[test]
    fn merge_reports_both_sides() {
        let left = set(&["g:a:1", "g:b:1"]);
        let right = set(&["g:b:2", "g:c:1"]);
        let merge = left.merge(&right);
        assert_eq!(names(&merge.result), ["a", "b", "c"]);
        assert_eq!(merge.absent_from_left.len(), 1);
        assert_eq!(merge.absent_from_right.len(), 1);
    }

    #[test]
    fn minus_path_drops_empty_file_entries() {
        let base = DependencySet::of().and_files(["a.jar", "b.jar"]).and_files(["c.jar"]);
        let trimmed = base.minus_path(Path::new("c.jar")).minus_path(Path::new("a.jar"));
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.entries()[0].local_files(), [PathBuf::from("b.jar")]);
    }
}
