//! Minimal node implementation for exercising the core helpers.

use crate::{CompilerIssues, LinkSlots, Node, NodeArena, NodeId, NodeKind, NodePlacement};

pub(crate) struct TestNode {
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    qualified_name: String,
    initialised: bool,
    links: LinkSlots,
}

impl TestNode {
    fn placed(placement: NodePlacement) -> Self {
        Self {
            name: placement.name,
            kind: placement.kind,
            parent: Some(placement.parent),
            qualified_name: placement.qualified_name,
            initialised: false,
            links: LinkSlots::new(),
        }
    }
}

impl Node for TestNode {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn node_kind(&self) -> NodeKind {
        self.kind
    }

    fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn links(&self) -> &LinkSlots {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkSlots {
        &mut self.links
    }
}

pub(crate) struct TestArena {
    arena: NodeArena<TestNode>,
    root: NodeId,
}

impl TestArena {
    pub(crate) fn with_root() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert_root(TestNode {
            name: "OfficeFloor".to_owned(),
            kind: NodeKind::OfficeFloor,
            parent: None,
            qualified_name: "OfficeFloor".to_owned(),
            initialised: true,
            links: LinkSlots::new(),
        });
        Self { arena, root }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn inner(&self) -> &NodeArena<TestNode> {
        &self.arena
    }

    pub(crate) fn inner_mut(&mut self) -> &mut NodeArena<TestNode> {
        &mut self.arena
    }

    /// Creates (or finds) a child and marks it initialised.
    pub(crate) fn child(&mut self, owner: NodeId, kind: NodeKind, name: &str) -> NodeId {
        let id = self.arena.get_or_create(owner, kind, name, TestNode::placed);
        self.arena.get_mut(id).initialised = true;
        id
    }

    pub(crate) fn uninitialised_child(&mut self, owner: NodeId, kind: NodeKind, name: &str) -> NodeId {
        self.arena.get_or_create(owner, kind, name, TestNode::placed)
    }

    pub(crate) fn initialised_child(
        &mut self,
        owner: NodeId,
        kind: NodeKind,
        name: &str,
        issues: &mut dyn CompilerIssues,
    ) -> NodeId {
        self.arena.get_or_create_initialised(owner, kind, name, issues, TestNode::placed, |node| {
            node.initialised = true
        })
    }
}
