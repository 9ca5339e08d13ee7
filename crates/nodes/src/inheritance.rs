//! Section inheritance.
//!
//! A section with a super section takes over the flow links of its super
//! section's outputs for every output it leaves unlinked. The nearest
//! ancestor whose same-named output is linked wins.

use std::collections::BTreeSet;

use graph::{LinkKind, Node, NodeId, NodeKind};
use tracing::{debug, instrument};

use crate::handles::SectionHandle;
use crate::node::{OfficeState, SectionOutputState, SectionState};
use crate::tree::NodeTree;

/// Resolves inherited output links. Answers `false` if an inheritance cycle
/// was found; sections outside any cycle are still resolved.
#[instrument(skip_all)]
pub(crate) fn resolve_section_inheritance(tree: &mut NodeTree) -> bool {
    let sections = all_sections(tree);

    let mut reported: BTreeSet<Vec<NodeId>> = BTreeSet::new();
    let mut cyclic: BTreeSet<NodeId> = BTreeSet::new();
    for section in &sections {
        if let Some(cycle) = find_cycle(tree, section.id()) {
            let mut members = cycle.clone();
            members.sort();
            cyclic.extend(members.iter().copied());
            if reported.insert(members) {
                let mut names: Vec<&str> = cycle
                    .iter()
                    .map(|id| tree.node(*id).node_name())
                    .collect();
                names.push(names[0]);
                let message = format!("Cyclic section inheritance hierarchy ({} : ...)", names.join(" : "));
                tree.report(cycle[0], message);
            }
        }
    }

    for section in &sections {
        if cyclic.contains(&section.id()) {
            continue;
        }
        inherit_outputs(tree, *section);
    }
    reported.is_empty()
}

/// Every section of every office, parents before children, each level in
/// name order.
fn all_sections(tree: &NodeTree) -> Vec<SectionHandle> {
    fn collect(tree: &NodeTree, owner: NodeId, into: &mut Vec<SectionHandle>) {
        for section in tree.registered::<SectionState>(owner) {
            into.push(section);
            collect(tree, section.id(), into);
        }
    }

    let mut sections = Vec::new();
    for office in tree.registered::<OfficeState>(tree.root().id()) {
        collect(tree, office.id(), &mut sections);
    }
    sections
}

fn super_section(tree: &NodeTree, section: NodeId) -> Option<NodeId> {
    tree.node(section)
        .state::<SectionState>()
        .and_then(|state| state.super_section)
}

/// The inheritance cycle reachable from `start`, beginning at the first
/// section of the cycle met on the way.
fn find_cycle(tree: &NodeTree, start: NodeId) -> Option<Vec<NodeId>> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(next) = super_section(tree, current) {
        if let Some(index) = chain.iter().position(|id| *id == next) {
            return Some(chain.split_off(index));
        }
        chain.push(next);
        current = next;
    }
    None
}

fn inherit_outputs(tree: &mut NodeTree, section: SectionHandle) {
    for output in tree.registered::<SectionOutputState>(section.id()) {
        if tree.is_linked(output.id(), LinkKind::Flow) {
            continue;
        }
        let name = tree.node(output.id()).node_name().to_owned();
        let Some(target) = inherited_target(tree, section.id(), &name) else {
            continue;
        };
        if tree.link(output.id(), LinkKind::Flow, target) {
            debug!(
                output = %tree.qualified_name(output.id()),
                target = %tree.qualified_name(target),
                "inherited output link"
            );
        }
    }
}

/// Flow target of the nearest ancestor output named `name` that is linked.
fn inherited_target(tree: &NodeTree, section: NodeId, name: &str) -> Option<NodeId> {
    let mut visited = BTreeSet::from([section]);
    let mut current = super_section(tree, section);
    while let Some(ancestor) = current {
        if !visited.insert(ancestor) {
            return None;
        }
        let linked = tree
            .arena
            .lookup(ancestor, NodeKind::SectionOutput, name)
            .and_then(|output| tree.node(output).links().linked(LinkKind::Flow));
        if linked.is_some() {
            return linked;
        }
        current = super_section(tree, ancestor);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTree;
    use pretty_assertions::assert_eq;

    #[test]
    fn three_section_cycle_is_reported_once() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let a = tree.section(office, "A");
        let b = tree.section(office, "B");
        let c = tree.section(office, "C");
        tree.set_super(a, b);
        tree.set_super(b, c);
        tree.set_super(c, a);

        assert!(!resolve_section_inheritance(&mut tree.tree));

        let messages = tree.messages();
        assert_eq!(
            messages,
            vec!["Cyclic section inheritance hierarchy (A : B : C : A : ...)".to_owned()]
        );
    }

    #[test]
    fn unlinked_output_takes_nearest_linked_ancestor_output() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let child = tree.section(office, "Child");
        let parent = tree.section(office, "Parent");
        let grandparent = tree.section(office, "Grandparent");
        tree.set_super(child, parent);
        tree.set_super(parent, grandparent);

        let handler = tree.section(office, "Handler");
        let handle = tree.input(handler, "handle");
        let fallback = tree.input(handler, "fallback");

        let child_out = tree.output(child, "failed");
        tree.output(parent, "failed");
        let grand_out = tree.output(grandparent, "failed");
        tree.tree.link(grand_out.id(), LinkKind::Flow, fallback.id());

        let parent_done = tree.output(parent, "done");
        tree.tree.link(parent_done.id(), LinkKind::Flow, handle.id());
        let child_done = tree.output(child, "done");

        assert!(resolve_section_inheritance(&mut tree.tree));
        assert!(tree.messages().is_empty());

        let linked = |id: NodeId| tree.tree.node(id).links().linked(LinkKind::Flow);
        assert_eq!(linked(child_out.id()), Some(fallback.id()));
        assert_eq!(linked(child_done.id()), Some(handle.id()));
    }

    #[test]
    fn explicit_output_link_is_kept() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let child = tree.section(office, "Child");
        let parent = tree.section(office, "Parent");
        tree.set_super(child, parent);
        let handler = tree.section(office, "Handler");
        let own = tree.input(handler, "own");
        let inherited = tree.input(handler, "inherited");

        let child_out = tree.output(child, "out");
        tree.tree.link(child_out.id(), LinkKind::Flow, own.id());
        let parent_out = tree.output(parent, "out");
        tree.tree.link(parent_out.id(), LinkKind::Flow, inherited.id());

        assert!(resolve_section_inheritance(&mut tree.tree));
        assert_eq!(
            tree.tree.node(child_out.id()).links().linked(LinkKind::Flow),
            Some(own.id())
        );
    }

    #[test]
    fn section_leading_into_a_cycle_terminates() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let lead = tree.section(office, "Lead");
        let x = tree.section(office, "X");
        let y = tree.section(office, "Y");
        tree.set_super(lead, x);
        tree.set_super(x, y);
        tree.set_super(y, x);
        tree.output(lead, "out");

        assert!(!resolve_section_inheritance(&mut tree.tree));
        assert_eq!(
            tree.messages(),
            vec!["Cyclic section inheritance hierarchy (X : Y : X : ...)".to_owned()]
        );
    }
}
