//! Link slots and deferred link resolution.
//!
//! Every cross-node reference is a value held in the referring node's
//! [`LinkSlots`], never a pointer. Slots are filled by explicit linking or by
//! auto-wiring and read back through the resolution helpers, which follow
//! chains of links (function object → section object → office object →
//! managed object) to the node that actually provides the capability.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CompilerIssues, Node, NodeArena, NodeId, NodeKind};

/// Capability category of a link slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Object,
    Team,
    Flow,
    Pool,
    Office,
    StartBefore,
    StartAfter,
}

impl LinkKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Team => "team",
            Self::Flow => "flow",
            Self::Pool => "pool",
            Self::Office => "office",
            Self::StartBefore => "start before",
            Self::StartAfter => "start after",
        }
    }

    /// Start ordering slots hold any number of targets; all others hold one.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Self::StartBefore | Self::StartAfter)
    }
}

/// Outcome of placing a target into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The slot already held this exact target.
    AlreadyLinked,
    /// The slot holds a different target; nothing changed.
    Conflict(NodeId),
}

/// The link slots owned by one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSlots {
    single: BTreeMap<LinkKind, NodeId>,
    ordering: BTreeMap<LinkKind, BTreeSet<NodeId>>,
}

impl LinkSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `target` into the `kind` slot.
    ///
    /// Relinking to the identical target is a no-op; relinking to a different
    /// target is refused.
    pub fn link(&mut self, kind: LinkKind, target: NodeId) -> LinkOutcome {
        if kind.is_multi_valued() {
            return if self.ordering.entry(kind).or_default().insert(target) {
                LinkOutcome::Linked
            } else {
                LinkOutcome::AlreadyLinked
            };
        }
        match self.single.get(&kind) {
            Some(existing) if *existing == target => LinkOutcome::AlreadyLinked,
            Some(existing) => LinkOutcome::Conflict(*existing),
            None => {
                self.single.insert(kind, target);
                LinkOutcome::Linked
            }
        }
    }

    /// Target of a single-valued slot, if linked.
    pub fn linked(&self, kind: LinkKind) -> Option<NodeId> {
        self.single.get(&kind).copied()
    }

    /// Targets of a multi-valued slot.
    pub fn linked_all(&self, kind: LinkKind) -> impl Iterator<Item = NodeId> + '_ {
        self.ordering.get(&kind).into_iter().flatten().copied()
    }
}

/// Links `source`'s `kind` slot to `target`.
///
/// Returns `false` with an issue against `source` when the source does not
/// own such a slot, the target cannot receive such a link, or the slot is
/// already linked to a different target.
pub fn link<N: Node>(
    arena: &mut NodeArena<N>,
    source: NodeId,
    kind: LinkKind,
    target: NodeId,
    issues: &mut dyn CompilerIssues,
) -> bool {
    let descriptor = arena.get(source).descriptor();
    if !descriptor.kind.link_kinds().contains(&kind) {
        issues.report(
            &descriptor,
            format!("{} {} can not be linked to a {}", descriptor.kind, descriptor.name, kind.label()),
        );
        return false;
    }
    let target_kind = arena.get(target).node_kind();
    if !target_kind.accepts(kind) {
        issues.report(
            &descriptor,
            format!(
                "{} {} can not link {} to {} {}",
                descriptor.kind,
                descriptor.name,
                kind.label(),
                target_kind,
                arena.get(target).node_name()
            ),
        );
        return false;
    }

    let outcome = arena.get_mut(source).links_mut().link(kind, target);
    match outcome {
        LinkOutcome::Linked => {
            debug!(source = %descriptor, target = %arena.get(target).descriptor(), link = kind.label(), "linked");
            true
        }
        LinkOutcome::AlreadyLinked => true,
        LinkOutcome::Conflict(_) => {
            issues.report(
                &descriptor,
                format!("{} {} linked more than once", descriptor.kind, descriptor.name),
            );
            false
        }
    }
}

/// Result of following a chain of links.
enum Walk {
    Found(NodeId),
    Unresolved,
    Cycle,
}

/// Follows `kind` links from `start`.
///
/// With `furthest` unset, stops at the first node whose kind is in `targets`.
/// With it set, keeps following while the chain continues and answers the
/// last node of a target kind seen.
fn walk<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    kind: LinkKind,
    targets: &[NodeKind],
    furthest: bool,
    issues: &mut dyn CompilerIssues,
) -> Walk {
    let mut visited = vec![start];
    let mut found = None;
    let mut current = start;
    while let Some(next) = arena.get(current).links().linked(kind) {
        if visited.contains(&next) {
            visited.push(next);
            let path: Vec<&str> = visited
                .iter()
                .map(|id| arena.get(*id).qualified_name())
                .collect();
            issues.report(
                &arena.get(start).descriptor(),
                format!("Cycle in {} links ({})", kind.label(), path.join(" -> ")),
            );
            return Walk::Cycle;
        }
        visited.push(next);
        if targets.contains(&arena.get(next).node_kind()) {
            if !furthest {
                return Walk::Found(next);
            }
            found = Some(next);
        }
        current = next;
    }
    match found {
        Some(id) => Walk::Found(id),
        None => Walk::Unresolved,
    }
}

fn capability_label(targets: &[NodeKind]) -> String {
    let labels: Vec<&str> = targets.iter().map(|k| k.label()).collect();
    labels.join(" or ")
}

fn report_unresolved<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    targets: &[NodeKind],
    issues: &mut dyn CompilerIssues,
) {
    let descriptor = arena.get(start).descriptor();
    issues.report(
        &descriptor,
        format!(
            "{} {} is not linked to a {}",
            descriptor.kind,
            descriptor.name,
            capability_label(targets)
        ),
    );
}

/// Best-effort resolution: `None` without an issue when the chain is unlinked.
///
/// A cycle in the chain is still reported.
pub fn find_target<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    kind: LinkKind,
    targets: &[NodeKind],
    issues: &mut dyn CompilerIssues,
) -> Option<NodeId> {
    match walk(arena, start, kind, targets, false, issues) {
        Walk::Found(id) => Some(id),
        Walk::Unresolved | Walk::Cycle => None,
    }
}

/// Strict resolution: raises an issue when no target is reached.
pub fn retrieve_target<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    kind: LinkKind,
    targets: &[NodeKind],
    issues: &mut dyn CompilerIssues,
) -> Option<NodeId> {
    match walk(arena, start, kind, targets, false, issues) {
        Walk::Found(id) => Some(id),
        Walk::Cycle => None,
        Walk::Unresolved => {
            report_unresolved(arena, start, targets, issues);
            None
        }
    }
}

/// Best-effort resolution of the furthest target along the chain.
pub fn find_furthest_target<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    kind: LinkKind,
    targets: &[NodeKind],
    issues: &mut dyn CompilerIssues,
) -> Option<NodeId> {
    match walk(arena, start, kind, targets, true, issues) {
        Walk::Found(id) => Some(id),
        Walk::Unresolved | Walk::Cycle => None,
    }
}

/// Strict resolution of the furthest target along the chain.
pub fn retrieve_furthest_target<N: Node>(
    arena: &NodeArena<N>,
    start: NodeId,
    kind: LinkKind,
    targets: &[NodeKind],
    issues: &mut dyn CompilerIssues,
) -> Option<NodeId> {
    match walk(arena, start, kind, targets, true, issues) {
        Walk::Found(id) => Some(id),
        Walk::Cycle => None,
        Walk::Unresolved => {
            report_unresolved(arena, start, targets, issues);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestArena;
    use crate::CompilerIssue;

    fn chain() -> (TestArena, Vec<NodeId>) {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let function_object = arena.child(root, NodeKind::FunctionObject, "repo");
        let section_object = arena.child(root, NodeKind::SectionObject, "repo");
        let office_object = arena.child(root, NodeKind::OfficeObject, "repo");
        let managed_object = arena.child(root, NodeKind::ManagedObject, "repo");
        (
            arena,
            vec![function_object, section_object, office_object, managed_object],
        )
    }

    #[test]
    fn relinking_same_target_is_silent() {
        let (mut arena, ids) = chain();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(link(arena.inner_mut(), ids[0], LinkKind::Object, ids[3], &mut issues));
        assert!(link(arena.inner_mut(), ids[0], LinkKind::Object, ids[3], &mut issues));
        assert!(issues.is_empty());
    }

    #[test]
    fn relinking_different_target_is_refused() {
        let (mut arena, ids) = chain();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(link(arena.inner_mut(), ids[0], LinkKind::Object, ids[3], &mut issues));
        assert!(!link(arena.inner_mut(), ids[0], LinkKind::Object, ids[2], &mut issues));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Function Object repo linked more than once");
        assert_eq!(arena.inner().get(ids[0]).links().linked(LinkKind::Object), Some(ids[3]));
    }

    #[test]
    fn incompatible_link_is_refused() {
        let (mut arena, ids) = chain();
        let root = arena.root();
        let team = arena.child(root, NodeKind::Team, "T");
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(!link(arena.inner_mut(), ids[0], LinkKind::Object, team, &mut issues));
        assert!(!link(arena.inner_mut(), ids[3], LinkKind::Object, ids[0], &mut issues));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn find_target_follows_chain() {
        let (mut arena, ids) = chain();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        for pair in ids.windows(2) {
            assert!(link(arena.inner_mut(), pair[0], LinkKind::Object, pair[1], &mut issues));
        }
        let found = find_target(arena.inner(), ids[0], LinkKind::Object, &[NodeKind::ManagedObject], &mut issues);
        assert_eq!(found, Some(ids[3]));
        let first = find_target(
            arena.inner(),
            ids[0],
            LinkKind::Object,
            &[NodeKind::OfficeObject, NodeKind::ManagedObject],
            &mut issues,
        );
        assert_eq!(first, Some(ids[2]));
        let furthest = find_furthest_target(
            arena.inner(),
            ids[0],
            LinkKind::Object,
            &[NodeKind::OfficeObject, NodeKind::ManagedObject],
            &mut issues,
        );
        assert_eq!(furthest, Some(ids[3]));
        assert!(issues.is_empty());
    }

    #[test]
    fn find_is_quiet_and_retrieve_reports() {
        let (arena, ids) = chain();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert_eq!(
            find_target(arena.inner(), ids[0], LinkKind::Object, &[NodeKind::ManagedObject], &mut issues),
            None
        );
        assert!(issues.is_empty());
        assert_eq!(
            retrieve_furthest_target(arena.inner(), ids[0], LinkKind::Object, &[NodeKind::ManagedObject], &mut issues),
            None
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].message,
            "Function Object repo is not linked to a Managed Object"
        );
    }

    #[test]
    fn cycles_are_reported_not_looped() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let a = arena.child(root, NodeKind::SectionOutput, "a");
        let b = arena.child(root, NodeKind::SectionOutput, "b");
        let c = arena.child(root, NodeKind::SectionOutput, "c");
        let mut issues: Vec<CompilerIssue> = Vec::new();
        link(arena.inner_mut(), a, LinkKind::Flow, b, &mut issues);
        link(arena.inner_mut(), b, LinkKind::Flow, c, &mut issues);
        link(arena.inner_mut(), c, LinkKind::Flow, a, &mut issues);

        let found = retrieve_target(arena.inner(), a, LinkKind::Flow, &[NodeKind::Function], &mut issues);
        assert_eq!(found, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Cycle in flow links (a -> b -> c -> a)");
    }

    #[test]
    fn start_ordering_is_multi_valued() {
        let mut arena = TestArena::with_root();
        let root = arena.root();
        let first = arena.child(root, NodeKind::ManagedObjectSource, "first");
        let second = arena.child(root, NodeKind::ManagedObjectSource, "second");
        let third = arena.child(root, NodeKind::ManagedObjectSource, "third");
        let mut issues: Vec<CompilerIssue> = Vec::new();
        assert!(link(arena.inner_mut(), first, LinkKind::StartBefore, second, &mut issues));
        assert!(link(arena.inner_mut(), first, LinkKind::StartBefore, third, &mut issues));
        assert!(link(arena.inner_mut(), first, LinkKind::StartBefore, third, &mut issues));
        let before: Vec<NodeId> = arena.inner().get(first).links().linked_all(LinkKind::StartBefore).collect();
        assert_eq!(before, vec![second, third]);
        assert!(issues.is_empty());
    }
}
