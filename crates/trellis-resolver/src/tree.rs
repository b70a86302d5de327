//! Order-preserving resolved dependency tree.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Index 0 is
//! the root, which stands for the resolved set itself.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use trellis_core::coordinate::Coordinate;
use trellis_core::dependency::Transitivity;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

use crate::error::ResolutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// A module coordinate; `coordinate` carries the requested version.
    Module { coordinate: Coordinate },
    /// Local or computed files.
    Files { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependencyNode {
    pub kind: NodeKind,
    /// Version written in the declaration or descriptor, possibly unspecified.
    pub declared_version: Option<Version>,
    /// Winning version of the module after conflict resolution.
    pub resolved_version: Option<Version>,
    /// Qualifiers of the top-level entries this node comes from.
    pub qualifiers: BTreeSet<String>,
    pub transitivity: Transitivity,
    pub files: Vec<PathBuf>,
    pub error: Option<ResolutionError>,
    /// The module already appears among the ancestors and was not expanded again.
    pub cycle: bool,
    /// The requested version lost conflict resolution; its dependencies were dropped.
    pub evicted: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ResolvedDependencyNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            declared_version: None,
            resolved_version: None,
            qualifiers: BTreeSet::new(),
            transitivity: Transitivity::None,
            files: Vec::new(),
            error: None,
            cycle: false,
            evicted: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn module_id(&self) -> Option<&ModuleId> {
        match &self.kind {
            NodeKind::Module { coordinate } => Some(coordinate.module_id()),
            _ => None,
        }
    }

    /// Requested coordinate of a module node.
    pub fn coordinate(&self) -> Option<&Coordinate> {
        match &self.kind {
            NodeKind::Module { coordinate } => Some(coordinate),
            _ => None,
        }
    }

    /// Coordinate with the winning version.
    pub fn resolved_coordinate(&self) -> Option<Coordinate> {
        let coordinate = self.coordinate()?;
        Some(match &self.resolved_version {
            Some(v) => coordinate.with_version(v.clone()),
            None => coordinate.clone(),
        })
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

impl fmt::Display for ResolvedDependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Root => write!(f, "root")?,
            NodeKind::Files { label } => write!(f, "{label}")?,
            NodeKind::Module { coordinate } => {
                write!(f, "{}", coordinate.to_short_string())?;
                if let Some(resolved) = &self.resolved_version {
                    if resolved != coordinate.version() {
                        write!(f, " -> {resolved}")?;
                    }
                }
            }
        }
        if self.cycle {
            write!(f, " (cycle)")?;
        }
        if self.evicted {
            write!(f, " (evicted)")?;
        }
        if self.error.is_some() {
            write!(f, " (unresolved)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTree {
    nodes: Vec<ResolvedDependencyNode>,
}

impl Default for ResolvedTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolvedTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ResolvedDependencyNode::new(NodeKind::Root)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub(crate) fn add(&mut self, parent: NodeId, mut node: ResolvedDependencyNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &ResolvedDependencyNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ResolvedDependencyNode {
        &mut self.nodes[id.0]
    }

    pub fn children_of(&self, id: NodeId) -> Vec<&ResolvedDependencyNode> {
        self.nodes[id.0]
            .children
            .iter()
            .map(|c| &self.nodes[c.0])
            .collect()
    }

    /// Number of nodes, root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first pre-order, root excluded.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.nodes[0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// First node of `module` in pre-order, evicted nodes skipped.
    pub fn first(&self, module: &ModuleId) -> Option<&ResolvedDependencyNode> {
        self.first_id(module).map(|id| self.node(id))
    }

    fn first_id(&self, module: &ModuleId) -> Option<NodeId> {
        self.pre_order()
            .into_iter()
            .find(|id| {
                let node = &self.nodes[id.0];
                !node.evicted && node.module_id() == Some(module)
            })
    }

    /// Chain of nodes from a top-level entry down to the first node of `module`.
    pub fn find_path(&self, module: &ModuleId) -> Option<Vec<&ResolvedDependencyNode>> {
        let mut current = self.first_id(module)?;
        let mut path = vec![self.node(current)];
        while let Some(parent) = self.nodes[current.0].parent {
            if parent == self.root() {
                break;
            }
            path.push(self.node(parent));
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// One line per node, indented two spaces per level.
    pub fn to_strings(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len());
        self.collect_lines(self.root(), 0, &mut lines);
        lines
    }

    fn collect_lines(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        for child in &self.nodes[id.0].children {
            lines.push(format!("{}{}", "  ".repeat(depth), self.node(*child)));
            self.collect_lines(*child, depth + 1, lines);
        }
    }

    /// Render the tree with box-drawing connectors.
    pub fn to_string_tree(&self) -> String {
        let mut output = String::new();
        let children = &self.nodes[0].children;
        for (i, child) in children.iter().enumerate() {
            self.print_subtree(&mut output, *child, "", i == children.len() - 1);
        }
        output
    }

    fn print_subtree(&self, output: &mut String, id: NodeId, prefix: &str, is_last: bool) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.node(id)));

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = &self.nodes[id.0].children;
        for (i, child) in children.iter().enumerate() {
            self.print_subtree(output, *child, &child_prefix, i == children.len() - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(s: &str) -> ResolvedDependencyNode {
        ResolvedDependencyNode::new(NodeKind::Module {
            coordinate: Coordinate::parse(s).unwrap(),
        })
    }

    fn sample() -> ResolvedTree {
        let mut tree = ResolvedTree::new();
        let root = tree.root();
        let a = tree.add(root, module("org:a:1.0"));
        let b = tree.add(a, module("org:b:1.0"));
        tree.add(b, module("org:c:2.0"));
        tree.add(
            root,
            ResolvedDependencyNode::new(NodeKind::Files {
                label: "files[lib.jar]".to_string(),
            }),
        );
        tree
    }

    #[test]
    fn pre_order_follows_declaration() {
        let tree = sample();
        let labels: Vec<String> = tree
            .pre_order()
            .into_iter()
            .map(|id| tree.node(id).to_string())
            .collect();
        assert_eq!(labels, ["org:a:1.0", "org:b:1.0", "org:c:2.0", "files[lib.jar]"]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn tree_printing() {
        let tree = sample();
        let output = tree.to_string_tree();
        assert_eq!(
            output,
            "├── org:a:1.0\n│   └── org:b:1.0\n│       └── org:c:2.0\n└── files[lib.jar]\n"
        );
        assert_eq!(
            tree.to_strings(),
            ["org:a:1.0", "  org:b:1.0", "    org:c:2.0", "files[lib.jar]"]
        );
    }

    #[test]
    fn find_path_exists() {
        let tree = sample();
        let path = tree.find_path(&ModuleId::new("org", "c")).unwrap();
        let names: Vec<String> = path.iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["org:a:1.0", "org:b:1.0", "org:c:2.0"]);
        assert!(tree.find_path(&ModuleId::new("org", "zzz")).is_none());
    }

    #[test]
    fn evicted_nodes_are_skipped_by_lookups() {
        let mut tree = ResolvedTree::new();
        let root = tree.root();
        let a = tree.add(root, module("org:a:1.0"));
        let mut loser = module("org:c:1.0");
        loser.resolved_version = Some(Version::of("2.0"));
        loser.evicted = true;
        tree.add(a, loser);
        let b = tree.add(root, module("org:b:1.0"));
        tree.add(b, module("org:c:2.0"));

        let c = ModuleId::new("org", "c");
        assert_eq!(tree.first(&c).unwrap().to_string(), "org:c:2.0");
        let names: Vec<String> = tree
            .find_path(&c)
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, ["org:b:1.0", "org:c:2.0"]);
        assert_eq!(
            tree.to_strings(),
            ["org:a:1.0", "  org:c:1.0 -> 2.0 (evicted)", "org:b:1.0", "  org:c:2.0"]
        );
    }

    #[test]
    fn resolved_version_is_shown_when_it_differs() {
        let mut node = module("org:a:1.0");
        node.resolved_version = Some(Version::of("2.0"));
        assert_eq!(node.to_string(), "org:a:1.0 -> 2.0");
        assert_eq!(
            node.resolved_coordinate().unwrap().to_short_string(),
            "org:a:2.0"
        );
    }
}
