//! BOM import expansion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use trellis_core::coordinate::Coordinate;
use trellis_core::dependency::{CoordinateDependency, Dependency};
use trellis_core::qualified::QualifiedDependencySet;
use trellis_core::version_provider::VersionProvider;

use crate::cache::ResolutionCache;
use crate::error::ResolutionError;
use crate::repository::{Descriptor, RepoSet};

/// A set whose BOM imports were turned into version provider entries.
#[derive(Debug, Clone, Default)]
pub struct BomExpansion {
    pub set: QualifiedDependencySet,
    pub errors: Vec<ResolutionError>,
}

/// Replace the BOMs of `set` by the versions they manage.
///
/// BOMs are the provider's BOM coordinates followed by direct entries of
/// type `pom` without classifier; those entries leave the set. Versions
/// the provider already answers for, through an exact or a wildcard key,
/// win over managed ones, and among BOMs the first
/// to manage a module wins. BOMs imported by a BOM come right after it.
/// Once `cancel` fires, the BOMs not yet read are reported as cancelled.
pub async fn with_resolved_boms(
    set: &QualifiedDependencySet,
    repos: &RepoSet,
    cache: &ResolutionCache,
    timeout: Duration,
    cancel: &CancellationToken,
) -> BomExpansion {
    let is_bom = |dependency: &Dependency| {
        matches!(dependency, Dependency::Coordinate(c) if c.coordinate.is_bom())
    };
    let mut boms: Vec<Coordinate> = set.version_provider().boms().to_vec();
    boms.extend(
        set.dependencies()
            .filter(|&d| is_bom(d))
            .filter_map(Dependency::as_coordinate)
            .map(|c| c.coordinate.clone()),
    );
    if boms.is_empty() {
        return BomExpansion {
            set: set.clone(),
            errors: Vec::new(),
        };
    }

    let mut provider = set.version_provider().without_boms();
    let mut errors = Vec::new();
    let mut visited = HashSet::new();
    let mut pending: Vec<Coordinate> = boms.into_iter().rev().collect();

    while let Some(bom) = pending.pop() {
        if !visited.insert(bom.clone()) {
            continue;
        }
        let bom = provider.version(&CoordinateDependency::of(bom)).coordinate;
        if bom.version().is_unspecified() {
            errors.push(ResolutionError::unresolved(&bom, "BOM has no version"));
            continue;
        }
        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            found = descriptor(&bom, repos, cache, timeout) => Some(found),
        };
        let Some(found) = found else {
            errors.push(ResolutionError::cancelled(&bom));
            continue;
        };
        match found {
            Ok(Some(descriptor)) => {
                tracing::debug!(
                    "{} manages {} versions",
                    bom.to_short_string(),
                    descriptor.managed_versions.len()
                );
                provider = import(&provider, &descriptor);
                pending.extend(descriptor.imported_boms.iter().rev().cloned());
            }
            Ok(None) => errors.push(ResolutionError::unresolved(
                &bom,
                "BOM not found in any repository",
            )),
            Err(reason) => errors.push(ResolutionError::unresolved(&bom, reason)),
        }
    }

    BomExpansion {
        set: set
            .filtered(|q| !is_bom(&q.dependency))
            .with_version_provider(provider),
        errors,
    }
}

fn import(provider: &VersionProvider, descriptor: &Descriptor) -> VersionProvider {
    descriptor
        .managed_versions
        .iter()
        .fold(provider.clone(), |acc, (module, version)| {
            if acc.version_of(module).is_some() {
                acc
            } else {
                acc.and(module.clone(), version.clone())
            }
        })
}

async fn descriptor(
    bom: &Coordinate,
    repos: &RepoSet,
    cache: &ResolutionCache,
    timeout: Duration,
) -> Result<Option<Arc<Descriptor>>, String> {
    let key = bom.module_id().to_coordinate(bom.version().clone());
    if let Some(found) = cache.descriptor(&key) {
        return Ok(found);
    }
    let lookup = repos
        .lookup_descriptor(&key, timeout)
        .await
        .map_err(|e| e.to_string())?;
    let definitive = lookup.is_definitive();
    let found = lookup.found.map(Arc::new);
    if definitive {
        cache.put_descriptor(key, found.clone());
    }
    Ok(found)
}
