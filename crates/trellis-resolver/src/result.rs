use std::collections::BTreeMap;
use std::path::PathBuf;

use trellis_core::coordinate::Coordinate;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;
use trellis_util::errors::{TrellisError, TrellisResult};

use crate::error::{ErrorReport, ResolutionError};
use crate::tree::{NodeId, NodeKind, ResolvedDependencyNode, ResolvedTree};

/// Outcome of one resolution, possibly partial.
#[derive(Debug, Clone, Default)]
pub struct ResolveResult {
    pub tree: ResolvedTree,
    pub resolved_versions: BTreeMap<ModuleId, Version>,
    /// Artifact and local files, deduplicated, in tree pre-order.
    pub files: Vec<PathBuf>,
    pub errors: Vec<ResolutionError>,
}

impl ResolveResult {
    pub fn contains(&self, module: &ModuleId) -> bool {
        self.resolved_versions.contains_key(module)
    }

    pub fn version_of(&self, module: &ModuleId) -> Option<&Version> {
        self.resolved_versions.get(module)
    }

    /// Every node in depth-first pre-order, root excluded.
    pub fn to_flatten_list(&self) -> Vec<&ResolvedDependencyNode> {
        self.tree
            .pre_order()
            .into_iter()
            .map(|id| self.tree.node(id))
            .collect()
    }

    /// Files of the nodes of `module`.
    pub fn files_for(&self, module: &ModuleId) -> Vec<&PathBuf> {
        let mut files: Vec<&PathBuf> = Vec::new();
        for node in self.to_flatten_list() {
            if node.module_id() == Some(module) {
                for file in &node.files {
                    if !files.contains(&file) {
                        files.push(file);
                    }
                }
            }
        }
        files
    }

    /// Winning coordinates of module nodes, once each, in pre-order.
    pub fn involved_coordinates(&self) -> Vec<Coordinate> {
        let mut coordinates: Vec<Coordinate> = Vec::new();
        for node in self.to_flatten_list() {
            if node.evicted {
                continue;
            }
            if let Some(c) = node.resolved_coordinate() {
                if !coordinates.contains(&c) {
                    coordinates.push(c);
                }
            }
        }
        coordinates
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_report(&self) -> ErrorReport {
        ErrorReport::new(self.errors.clone())
    }

    pub fn assert_no_error(&self) -> TrellisResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(TrellisError::Resolution {
            message: self
                .errors
                .iter()
                .map(ResolutionError::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        })
    }

    /// Concatenate two results: `other`'s top-level nodes follow ours.
    ///
    /// Versions of `self` win where both resolved the same module.
    pub fn and(&self, other: &ResolveResult) -> ResolveResult {
        let mut merged = self.clone();
        let root = merged.tree.root();
        for child in other.tree.node(other.tree.root()).children() {
            graft(&mut merged.tree, root, &other.tree, *child);
        }
        for (module, version) in &other.resolved_versions {
            merged
                .resolved_versions
                .entry(module.clone())
                .or_insert_with(|| version.clone());
        }
        for file in &other.files {
            if !merged.files.contains(file) {
                merged.files.push(file.clone());
            }
        }
        for error in &other.errors {
            if !merged.errors.contains(error) {
                merged.errors.push(error.clone());
            }
        }
        merged
    }
}

fn graft(into: &mut ResolvedTree, parent: NodeId, from: &ResolvedTree, id: NodeId) {
    let node = from.node(id);
    if node.kind == NodeKind::Root {
        return;
    }
    let mut copy = ResolvedDependencyNode::new(node.kind.clone());
    copy.declared_version = node.declared_version.clone();
    copy.resolved_version = node.resolved_version.clone();
    copy.qualifiers = node.qualifiers.clone();
    copy.transitivity = node.transitivity;
    copy.files = node.files.clone();
    copy.error = node.error.clone();
    copy.cycle = node.cycle;
    copy.evicted = node.evicted;
    let new_id = into.add(parent, copy);
    for child in node.children() {
        graft(into, new_id, from, *child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_no_error_lists_errors() {
        let mut result = ResolveResult::default();
        assert!(result.assert_no_error().is_ok());
        result.errors.push(ResolutionError::unresolved(
            &Coordinate::parse("org:a:1.0").unwrap(),
            "not found",
        ));
        let err = result.assert_no_error().unwrap_err();
        assert!(err.to_string().contains("Unable to resolve org:a:1.0: not found"));
    }

    #[test]
    fn and_appends_nodes_and_keeps_first_versions() {
        let mut left = ResolveResult::default();
        let a = ModuleId::new("org", "a");
        left.resolved_versions.insert(a.clone(), Version::of("1.0"));
        let root = left.tree.root();
        left.tree.add(
            root,
            ResolvedDependencyNode::new(NodeKind::Module {
                coordinate: Coordinate::parse("org:a:1.0").unwrap(),
            }),
        );

        let mut right = ResolveResult::default();
        right.resolved_versions.insert(a.clone(), Version::of("2.0"));
        let root = right.tree.root();
        right.tree.add(
            root,
            ResolvedDependencyNode::new(NodeKind::Files {
                label: "files[x.jar]".into(),
            }),
        );

        let merged = left.and(&right);
        assert_eq!(merged.tree.len(), 2);
        assert_eq!(merged.version_of(&a).unwrap().value(), "1.0");
        assert_eq!(merged.to_flatten_list()[1].to_string(), "files[x.jar]");
    }
}
