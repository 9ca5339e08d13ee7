//! Node arena and name-keyed registries.
//!
//! The arena owns every node of one compile. Children are registered by name
//! in per-owner registries (one per child kind), which gives lazy
//! get-or-create semantics for forward references: a name may be referenced
//! before the node it names has been configured, and both references resolve
//! to the same node once configuration arrives.
//!
//! Registries are ordered maps so every traversal is name-sorted and
//! diagnostics are reproducible across runs.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::{CompilerIssues, Node, NodeDescriptor, NodeId, NodeKind};

/// Placement of a node being created, handed to the node factory.
#[derive(Debug, Clone)]
pub struct NodePlacement {
    pub name: String,
    pub kind: NodeKind,
    pub parent: NodeId,
    pub qualified_name: String,
}

struct Slot<N> {
    node: N,
    registries: BTreeMap<NodeKind, BTreeMap<String, NodeId>>,
}

/// Owner of all nodes of a single compile.
pub struct NodeArena<N> {
    slots: Vec<Slot<N>>,
}

impl<N: Node> Default for NodeArena<N> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<N: Node> NodeArena<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node that has no parent.
    pub fn insert_root(&mut self, node: N) -> NodeId {
        self.push(node)
    }

    fn push(&mut self, node: N) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(Slot {
            node,
            registries: BTreeMap::new(),
        });
        id
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    pub fn get(&self, id: NodeId) -> &N {
        &self.slots[id.index()].node
    }

    /// Mutable access to the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    pub fn get_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.slots[id.index()].node
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Finds the `kind` child of `owner` registered under `name`.
    pub fn lookup(&self, owner: NodeId, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.slots[owner.index()]
            .registries
            .get(&kind)
            .and_then(|registry| registry.get(name))
            .copied()
    }

    /// All `kind` children of `owner`, sorted by name.
    pub fn registered(&self, owner: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.slots[owner.index()]
            .registries
            .get(&kind)
            .into_iter()
            .flat_map(|registry| registry.values().copied())
    }

    /// All children of `id`, sorted by name then kind.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<(&str, NodeKind, NodeId)> = self.slots[id.index()]
            .registries
            .iter()
            .flat_map(|(kind, registry)| {
                registry
                    .iter()
                    .map(move |(name, child)| (name.as_str(), *kind, *child))
            })
            .collect();
        children.sort();
        children.into_iter().map(|(_, _, child)| child).collect()
    }

    fn placement(&self, owner: NodeId, kind: NodeKind, name: &str) -> NodePlacement {
        let parent = self.get(owner);
        let qualified_name = match parent.parent() {
            None => name.to_owned(),
            Some(_) => format!("{}.{name}", parent.qualified_name()),
        };
        NodePlacement {
            name: name.to_owned(),
            kind,
            parent: owner,
            qualified_name,
        }
    }

    /// Returns the `kind` child of `owner` named `name`, creating and
    /// registering it (uninitialised) if absent.
    pub fn get_or_create(
        &mut self,
        owner: NodeId,
        kind: NodeKind,
        name: &str,
        create: impl FnOnce(NodePlacement) -> N,
    ) -> NodeId {
        if let Some(existing) = self.lookup(owner, kind, name) {
            return existing;
        }
        let placement = self.placement(owner, kind, name);
        let id = self.push(create(placement));
        debug!(kind = %kind, node = %self.get(id).qualified_name(), "created node");
        self.slots[owner.index()]
            .registries
            .entry(kind)
            .or_default()
            .insert(name.to_owned(), id);
        id
    }

    /// As [`get_or_create`](Self::get_or_create), then initialises the node.
    ///
    /// If the node is already initialised it is returned unchanged and an
    /// "already added" issue is raised against `owner`.
    pub fn get_or_create_initialised(
        &mut self,
        owner: NodeId,
        kind: NodeKind,
        name: &str,
        issues: &mut dyn CompilerIssues,
        create: impl FnOnce(NodePlacement) -> N,
        initialise: impl FnOnce(&mut N),
    ) -> NodeId {
        let id = self.get_or_create(owner, kind, name, create);
        if self.get(id).is_initialised() {
            issues.report(
                &self.get(owner).descriptor(),
                format!("{kind} {name} already added"),
            );
        } else {
            initialise(self.get_mut(id));
        }
        id
    }

    /// Checks every node reachable from `root` is initialised.
    ///
    /// Walks pre-order in name order. At the first uninitialised node raises a
    /// single issue carrying a JSON dump of the tree and answers `false`.
    pub fn is_tree_initialised(&self, root: NodeId, issues: &mut dyn CompilerIssues) -> bool {
        match self.first_uninitialised(root) {
            None => true,
            Some(id) => {
                let node = self.get(id);
                let dump = serde_json::to_string_pretty(&self.tree_dump(root))
                    .unwrap_or_else(|err| format!("<tree dump unavailable: {err}>"));
                issues.report(
                    &node.descriptor(),
                    format!(
                        "{} {} is not initialised\n\nTree:\n{dump}",
                        node.node_kind(),
                        node.node_name()
                    ),
                );
                false
            }
        }
    }

    fn first_uninitialised(&self, id: NodeId) -> Option<NodeId> {
        if !self.get(id).is_initialised() {
            return Some(id);
        }
        self.children(id)
            .into_iter()
            .find_map(|child| self.first_uninitialised(child))
    }

    /// Structural dump of the tree below `root`.
    pub fn tree_dump(&self, root: NodeId) -> TreeDump {
        let node = self.get(root);
        TreeDump {
            name: node.node_name().to_owned(),
            kind: node.node_kind(),
            initialised: node.is_initialised(),
            children: self
                .children(root)
                .into_iter()
                .map(|child| self.tree_dump(child))
                .collect(),
        }
    }
}

/// JSON-serialisable view of a node tree, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeDump {
    pub name: String,
    pub kind: NodeKind,
    pub initialised: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeDump>,
}

/// Write-once initialisation of a node's state.
///
/// Creates the state from `create` when none exists. Otherwise raises an
/// "already initialised" issue and keeps the existing state untouched.
pub fn initialise<'s, S>(
    node: &NodeDescriptor,
    state: &'s mut Option<S>,
    issues: &mut dyn CompilerIssues,
    create: impl FnOnce() -> S,
) -> &'s S {
    if state.is_some() {
        issues.report(node, format!("{} {} already initialised", node.kind, node.name));
    }
    state.get_or_insert_with(create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestArena;
    use crate::CompilerIssue;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_or_create_returns_same_node() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let first = arena.uninitialised_child(root, NodeKind::Section, "SectionA");
        let second = arena.uninitialised_child(root, NodeKind::Section, "SectionA");
        assert_eq!(first, second);
        assert!(!arena.inner().get(first).is_initialised());
        assert_eq!(arena.inner().len(), 2);
    }

    #[test]
    fn same_name_different_kind_are_distinct() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let input = arena.uninitialised_child(root, NodeKind::SectionInput, "x");
        let output = arena.uninitialised_child(root, NodeKind::SectionOutput, "x");
        assert_ne!(input, output);
        assert_eq!(arena.inner().children(root), vec![input, output]);
    }

    #[test]
    fn duplicate_initialised_registration_is_reported() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        let first = arena.initialised_child(root, NodeKind::Team, "T", &mut issues);
        let second = arena.initialised_child(root, NodeKind::Team, "T", &mut issues);
        assert_eq!(first, second);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Team T already added");
        assert_eq!(issues[0].node.as_ref().map(|n| n.kind), Some(NodeKind::OfficeFloor));
    }

    #[test]
    fn initialise_is_write_once() {
        let node = NodeDescriptor {
            name: "repo".to_owned(),
            kind: NodeKind::ManagedObject,
            qualified_name: "repo".to_owned(),
        };
        let mut state: Option<u32> = None;
        let mut issues: Vec<CompilerIssue> = Vec::new();

        assert_eq!(*initialise(&node, &mut state, &mut issues, || 1), 1);
        assert!(issues.is_empty());

        assert_eq!(*initialise(&node, &mut state, &mut issues, || 2), 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Managed Object repo already initialised");

        assert_eq!(*initialise(&node, &mut state, &mut issues, || 3), 1);
        assert_eq!(issues.len(), 2);
        assert_eq!(state, Some(1));
    }

    #[test]
    fn children_are_sorted_by_name() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let b = arena.child(root, NodeKind::Team, "b");
        let a = arena.child(root, NodeKind::Office, "a");
        let c = arena.child(root, NodeKind::Team, "c");
        assert_eq!(arena.inner().children(root), vec![a, b, c]);
        let teams: Vec<NodeId> = arena.inner().registered(root, NodeKind::Team).collect();
        assert_eq!(teams, vec![b, c]);
    }

    #[test]
    fn qualified_names_skip_root() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let office = arena.child(root, NodeKind::Office, "OfficeA");
        let section = arena.child(office, NodeKind::Section, "SectionA");
        let function = arena.child(section, NodeKind::Function, "process");
        assert_eq!(arena.inner().get(office).qualified_name(), "OfficeA");
        assert_eq!(
            arena.inner().get(function).qualified_name(),
            "OfficeA.SectionA.process"
        );
    }

    #[test]
    fn fully_initialised_tree_passes() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let office = arena.child(root, NodeKind::Office, "OfficeA");
        arena.child(office, NodeKind::Section, "SectionA");
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(arena.inner().is_tree_initialised(root, &mut issues));
        assert!(issues.is_empty());
    }

    #[test]
    fn uninitialised_leaf_fails_with_dump() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let office = arena.child(root, NodeKind::Office, "OfficeA");
        let section = arena.child(office, NodeKind::Section, "SectionA");
        arena.uninitialised_child(section, NodeKind::SectionOutput, "missing");
        arena.uninitialised_child(section, NodeKind::SectionOutput, "zzz");

        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(!arena.inner().is_tree_initialised(root, &mut issues));
        assert_eq!(issues.len(), 1);

        let issue = &issues[0];
        assert!(issue
            .message
            .starts_with("Section Output missing is not initialised"));
        assert!(issue.message.contains("\"name\": \"missing\""));
        assert!(issue.message.contains("\"kind\": \"SectionOutput\""));
        assert_eq!(
            issue.node.as_ref().map(|n| n.qualified_name.as_str()),
            Some("OfficeA.SectionA.missing")
        );
    }
}
