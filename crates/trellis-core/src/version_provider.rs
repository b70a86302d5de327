use trellis_util::errors::{TrellisError, TrellisResult};

use crate::coordinate::Coordinate;
use crate::dependency::CoordinateDependency;
use crate::module_id::ModuleId;
use crate::version::Version;

/// Versions to apply to modules, keyed by `group:name` or `group:*`.
///
/// Exact keys win over wildcard keys whatever the registration order.
/// Registering a key twice keeps the position of the first registration and
/// the version of the last one. BOM coordinates are carried along but do not
/// answer lookups themselves; they are expanded into entries by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionProvider {
    entries: Vec<(ModuleId, Version)>,
    boms: Vec<Coordinate>,
}

impl VersionProvider {
    pub fn of() -> Self {
        Self::default()
    }

    /// Provider pinning every versioned coordinate; BOM coordinates are kept as BOMs.
    pub fn of_coordinates<'a>(coordinates: impl IntoIterator<Item = &'a Coordinate>) -> Self {
        coordinates.into_iter().fold(Self::of(), |provider, c| {
            if c.is_bom() {
                provider.and_bom_coordinate(c.clone())
            } else {
                provider.and(c.module_id().clone(), c.version().clone())
            }
        })
    }

    pub fn and(&self, module: ModuleId, version: Version) -> Self {
        let mut result = self.clone();
        match result.entries.iter_mut().find(|(m, _)| *m == module) {
            Some(entry) => entry.1 = version,
            None => result.entries.push((module, version)),
        }
        result
    }

    /// Register `"group:name"` or `"group:*"`.
    pub fn and_str(&self, module: &str, version: &str) -> TrellisResult<Self> {
        Ok(self.and(ModuleId::parse(module)?, version.parse()?))
    }

    /// Add a BOM. A `group:name:version` shorthand is read as type `pom`.
    pub fn and_bom(&self, coordinate: &str) -> TrellisResult<Self> {
        let mut bom = Coordinate::parse(coordinate)?;
        if bom.type_().is_empty() && bom.classifier().is_empty() {
            bom = bom.with_classifier_and_type("", "pom");
        }
        if !bom.is_bom() {
            return Err(TrellisError::parse(format!(
                "'{coordinate}' is not a BOM coordinate"
            )));
        }
        if bom.version().is_unspecified() {
            return Err(TrellisError::parse(format!(
                "BOM '{coordinate}' must declare a version"
            )));
        }
        Ok(self.and_bom_coordinate(bom))
    }

    pub fn and_bom_coordinate(&self, bom: Coordinate) -> Self {
        let mut result = self.clone();
        if !result.boms.contains(&bom) {
            result.boms.push(bom);
        }
        result
    }

    /// Version for `module`: exact key first, then a matching wildcard key.
    pub fn version_of(&self, module: &ModuleId) -> Option<&Version> {
        self.entries
            .iter()
            .find(|(m, _)| !m.is_wildcard() && m == module)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(m, _)| m.is_wildcard() && m.matches(module))
            })
            .map(|(_, v)| v)
    }

    /// Fill in the version of `dependency` when it declares none.
    pub fn version(&self, dependency: &CoordinateDependency) -> CoordinateDependency {
        if !dependency.coordinate.version().is_unspecified() {
            return dependency.clone();
        }
        match self.version_of(dependency.module_id()) {
            Some(version) => dependency.with_version(version.clone()),
            None => dependency.clone(),
        }
    }

    /// Combine two providers; entries of `other` override ours.
    pub fn merge(&self, other: &VersionProvider) -> Self {
        let merged = other
            .entries
            .iter()
            .fold(self.clone(), |acc, (m, v)| acc.and(m.clone(), v.clone()));
        other
            .boms
            .iter()
            .fold(merged, |acc, bom| acc.and_bom_coordinate(bom.clone()))
    }

    pub fn boms(&self) -> &[Coordinate] {
        &self.boms
    }

    pub fn without_boms(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            boms: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[(ModuleId, Version)] {
        &self.entries
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries.iter().map(|(m, _)| m)
    }

    /// Entries as coordinates (wildcard keys included), followed by BOMs.
    pub fn to_coordinates(&self) -> Vec<Coordinate> {
        self.entries
            .iter()
            .map(|(m, v)| m.to_coordinate(v.clone()))
            .chain(self.boms.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.boms.is_empty()
    }
}
