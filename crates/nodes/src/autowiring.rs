//! Auto-wiring stages.
//!
//! Objects, teams and extensions left unlinked by the providers are matched
//! by [`AutoWire`] against the scope chain OfficeFloor ⊃ office ⊃ section ⊃
//! sub-section. Objects may match targets that do not exist yet (supplied
//! managed objects, OfficeFloor managed objects needing an office object in
//! between); those are materialised when chosen, and because a materialised
//! managed object brings dependencies of its own the object stage repeats
//! until nothing new appears.

use std::collections::BTreeSet;
use std::rc::Rc;

use graph::{
    find_furthest_target, AutoWire, AutoWireDirection, AutoWirer, IssueLog, LinkKind,
    ManagedObjectScope, Necessity, Node, NodeId, NodeKind, Provider,
};
use tracing::{debug, info, instrument};

use crate::handles::{Handle, ManagedObjectHandle, OfficeHandle, SectionHandle};
use crate::node::{
    AdministrationState, FunctionObjectState, FunctionState, GovernanceState,
    ManagedObjectDependencyState, ManagedObjectSourceState, ManagedObjectState, OfficeFloorState,
    OfficeObjectState, OfficeState, OfficeTeamState, SectionObjectState, SectionState,
    SuppliedManagedObjectSourceState, SupplierState, TeamState,
};
use crate::sourcing::{materialise_object_type, materialise_source_type};
use crate::tree::NodeTree;

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// What an object auto-wire resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ObjectTarget {
    /// A node in the source's own scope chain below the OfficeFloor.
    Node(NodeId),
    /// An OfficeFloor managed object. Reached from inside an office through
    /// an office object.
    FloorManagedObject(NodeId),
    /// A supplied managed object source, materialised under `scope` on use.
    Supplied { scope: NodeId, supplied: NodeId },
}

type Targets = Vec<(String, ObjectTarget, Vec<AutoWire>)>;

#[derive(Default)]
struct ObjectPass {
    /// Sources already tried; failures are reported once.
    attempted: BTreeSet<NodeId>,
    /// Whether a managed object was created during the pass.
    materialised: bool,
    /// Managed objects created from suppliers, in creation order.
    created: Vec<ManagedObjectHandle>,
}

/// Links unlinked object slots by auto-wiring. Answers `false` if any issue
/// was raised.
#[instrument(skip_all)]
pub(crate) fn auto_wire_objects(tree: &mut NodeTree) -> bool {
    let before = tree.issues.len();
    let mut pass = ObjectPass::default();
    let mut passes = 0;
    loop {
        passes += 1;
        pass.materialised = false;
        object_pass(tree, &mut pass);
        if !pass.materialised {
            break;
        }
    }
    info!(passes, attempted = pass.attempted.len(), "auto-wired objects");
    tree.issues.len() == before
}

fn object_pass(tree: &mut NodeTree, pass: &mut ObjectPass) {
    let root = tree.root();
    let floor_enabled = tree.config.auto_wire_objects
        || tree
            .state(root)
            .is_some_and(|state: &OfficeFloorState| state.auto_wire_objects);

    let mut floor = AutoWirer::new(AutoWireDirection::SourceRequiresTarget, Rc::clone(&tree.types));
    for (label, target, auto_wires) in scope_targets(tree, root.id(), true) {
        floor.add_target(label, target, auto_wires);
    }

    let offices = tree.registered::<OfficeState>(root.id());
    if floor_enabled {
        for office in &offices {
            for object in tree.registered::<OfficeObjectState>(office.id()) {
                let Some(auto_wire) = tree.state(object).map(|state| state.auto_wire.clone()) else {
                    continue;
                };
                if pending(tree, pass, object.id()) {
                    wire_object(tree, &floor, object.id(), &[auto_wire], pass);
                }
            }
        }
        wire_dependencies(tree, &floor, root.id(), pass);
    }
    // Supplied OfficeFloor managed objects chosen by an office still need
    // their own dependencies when the OfficeFloor itself is not auto-wired.
    for managed_object in pass.created.clone() {
        if tree.node(managed_object.id()).parent() == Some(root.id()) {
            wire_managed_object_dependencies(tree, &floor, managed_object, pass);
        }
    }

    for office in offices {
        let office_enabled = tree.config.auto_wire_objects
            || tree.state(office).is_some_and(|state| state.auto_wire_objects);
        if !office_enabled {
            continue;
        }
        let mut scope = floor.create_scope();
        for (label, target, auto_wires) in scope_targets(tree, office.id(), false) {
            scope.add_target(label, target, auto_wires);
        }
        wire_dependencies(tree, &scope, office.id(), pass);
        for section in tree.registered::<SectionState>(office.id()) {
            wire_section_objects(tree, &scope, section, pass);
        }
        for section in tree.registered::<SectionState>(office.id()) {
            wire_section(tree, &scope, section, pass);
        }
        debug!(office = %tree.qualified_name(office.id()), "auto-wired office objects");
    }
}

fn wire_section(
    tree: &mut NodeTree,
    parent: &AutoWirer<'_, ObjectTarget>,
    section: SectionHandle,
    pass: &mut ObjectPass,
) {
    if tree.state(section).is_none() {
        return;
    }
    let mut scope = parent.create_scope();
    for (label, target, auto_wires) in scope_targets(tree, section.id(), false) {
        scope.add_target(label, target, auto_wires);
    }
    for (object, auto_wire) in section_own_objects(tree, section) {
        scope.add_target(tree.qualified_name(object).to_owned(), ObjectTarget::Node(object), [auto_wire]);
    }

    for function in tree.registered::<FunctionState>(section.id()) {
        for object in tree.registered::<FunctionObjectState>(function.id()) {
            let Some(state) = tree.state(object).filter(|state| !state.is_parameter) else {
                continue;
            };
            let auto_wire = state.auto_wire.clone();
            if pending(tree, pass, object.id()) {
                wire_object(tree, &scope, object.id(), &[auto_wire], pass);
            }
        }
    }
    wire_dependencies(tree, &scope, section.id(), pass);
    for sub_section in tree.registered::<SectionState>(section.id()) {
        wire_section_objects(tree, &scope, sub_section, pass);
    }
    for sub_section in tree.registered::<SectionState>(section.id()) {
        wire_section(tree, &scope, sub_section, pass);
    }
}

/// Section objects of `section`, wired in the scope enclosing it.
fn wire_section_objects(
    tree: &mut NodeTree,
    scope: &AutoWirer<'_, ObjectTarget>,
    section: SectionHandle,
    pass: &mut ObjectPass,
) {
    for (object, auto_wire) in section_own_objects(tree, section) {
        if pending(tree, pass, object) {
            wire_object(tree, scope, object, &[auto_wire], pass);
        }
    }
}

fn section_own_objects(tree: &NodeTree, section: SectionHandle) -> Vec<(NodeId, AutoWire)> {
    tree.registered::<SectionObjectState>(section.id())
        .into_iter()
        .filter_map(|object| {
            tree.state(object)
                .map(|state| (object.id(), state.auto_wire.clone()))
        })
        .collect()
}

/// Dependencies of the managed objects declared under `owner`.
fn wire_dependencies(
    tree: &mut NodeTree,
    scope: &AutoWirer<'_, ObjectTarget>,
    owner: NodeId,
    pass: &mut ObjectPass,
) {
    for managed_object in tree.registered::<ManagedObjectState>(owner) {
        wire_managed_object_dependencies(tree, scope, managed_object, pass);
    }
}

fn wire_managed_object_dependencies(
    tree: &mut NodeTree,
    scope: &AutoWirer<'_, ObjectTarget>,
    managed_object: ManagedObjectHandle,
    pass: &mut ObjectPass,
) {
    for dependency in tree.registered::<ManagedObjectDependencyState>(managed_object.id()) {
        let Some(auto_wire) = tree.state(dependency).map(|state| state.auto_wire.clone()) else {
            continue;
        };
        if pending(tree, pass, dependency.id()) {
            wire_object(tree, scope, dependency.id(), &[auto_wire], pass);
        }
    }
}

/// Whether `source` still needs wiring; marks it attempted.
fn pending(tree: &NodeTree, pass: &mut ObjectPass, source: NodeId) -> bool {
    !tree.is_linked(source, LinkKind::Object) && pass.attempted.insert(source)
}

/// Targets registered at the scope of `owner`.
///
/// Managed objects materialised from a supplier are represented by their
/// supplied entry, not listed twice.
fn scope_targets(tree: &mut NodeTree, owner: NodeId, floor: bool) -> Targets {
    let mut targets = Targets::new();
    for managed_object in tree.registered::<ManagedObjectState>(owner) {
        let Some(source) = tree.state(managed_object).map(|state| state.source) else {
            continue;
        };
        let supplied = tree
            .state(Handle::<ManagedObjectSourceState>::new(source))
            .is_some_and(|state| state.supplied_by.is_some());
        if supplied {
            continue;
        }
        let auto_wires = tree.managed_object_auto_wires(managed_object);
        let target = if floor {
            ObjectTarget::FloorManagedObject(managed_object.id())
        } else {
            ObjectTarget::Node(managed_object.id())
        };
        targets.push((tree.qualified_name(managed_object.id()).to_owned(), target, auto_wires));
    }
    if !floor {
        for object in tree.registered::<OfficeObjectState>(owner) {
            if let Some(state) = tree.state(object) {
                let auto_wire = state.auto_wire.clone();
                targets.push((
                    tree.qualified_name(object.id()).to_owned(),
                    ObjectTarget::Node(object.id()),
                    vec![auto_wire],
                ));
            }
        }
    }
    for supplier in tree.registered::<SupplierState>(owner) {
        for supplied in tree.registered::<SuppliedManagedObjectSourceState>(supplier.id()) {
            if let Some(state) = tree.state(supplied) {
                let auto_wire = state.supplied.auto_wire.clone();
                targets.push((
                    tree.qualified_name(supplied.id()).to_owned(),
                    ObjectTarget::Supplied {
                        scope: owner,
                        supplied: supplied.id(),
                    },
                    vec![auto_wire],
                ));
            }
        }
    }
    targets
}

fn wire_object(
    tree: &mut NodeTree,
    scope: &AutoWirer<'_, ObjectTarget>,
    source: NodeId,
    auto_wires: &[AutoWire],
    pass: &mut ObjectPass,
) {
    let descriptor = tree.descriptor(source);
    let Some(link) =
        scope.find_auto_wire_link(&descriptor, auto_wires, Necessity::Required, &mut tree.issues)
    else {
        return;
    };
    match link.target {
        ObjectTarget::Node(target) => {
            tree.link(source, LinkKind::Object, target);
        }
        ObjectTarget::FloorManagedObject(managed_object) => {
            link_floor_managed_object(tree, source, Handle::new(managed_object));
        }
        ObjectTarget::Supplied { scope, supplied } => {
            let Some(managed_object) = materialise_supplied(tree, scope, supplied, pass) else {
                return;
            };
            if tree.node(scope).node_kind() == NodeKind::OfficeFloor {
                link_floor_managed_object(tree, source, managed_object);
            } else {
                tree.link(source, LinkKind::Object, managed_object.id());
            }
        }
    }
}

/// Links `source` to an OfficeFloor managed object, through an office object
/// named after it when `source` is inside an office. The managed object's
/// source becomes managed by that office unless already assigned.
///
/// An office object of that name declared for something else is left alone;
/// the bridge then takes the first free `<name>-<n>`.
fn link_floor_managed_object(tree: &mut NodeTree, source: NodeId, managed_object: ManagedObjectHandle) {
    let Some(office) = tree.office_of(source) else {
        tree.link(source, LinkKind::Object, managed_object.id());
        return;
    };
    let object = if tree.node(source).node_kind() == NodeKind::OfficeObject {
        source
    } else {
        let name = tree.node(managed_object.id()).node_name().to_owned();
        let auto_wire = tree
            .managed_object_auto_wires(managed_object)
            .into_iter()
            .next()
            .unwrap_or_else(|| AutoWire::new(name.clone()));
        let name = bridge_name(tree, office, managed_object, name, &auto_wire);
        let bridge = tree.materialise(office.id(), &name, || OfficeObjectState { auto_wire });
        tree.link(source, LinkKind::Object, bridge.id());
        bridge.id()
    };
    tree.link(object, LinkKind::Object, managed_object.id());
    manage_by(tree, managed_object, office);
}

fn bridge_name(
    tree: &NodeTree,
    office: OfficeHandle,
    managed_object: ManagedObjectHandle,
    base: String,
    auto_wire: &AutoWire,
) -> String {
    let reusable = |name: &str| {
        tree.arena
            .lookup(office.id(), NodeKind::OfficeObject, name)
            .map_or(true, |existing| {
                let same_auto_wire = tree
                    .state(Handle::<OfficeObjectState>::new(existing))
                    .map_or(true, |state| state.auto_wire == *auto_wire);
                let same_target = tree
                    .node(existing)
                    .links()
                    .linked(LinkKind::Object)
                    .map_or(true, |target| target == managed_object.id());
                same_auto_wire && same_target
            })
    };
    if reusable(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let name = format!("{base}-{n}");
        if reusable(&name) {
            return name;
        }
        n += 1;
    }
}

fn manage_by(tree: &mut NodeTree, managed_object: ManagedObjectHandle, office: OfficeHandle) {
    let Some(source) = tree.state(managed_object).map(|state| state.source) else {
        return;
    };
    if !tree.is_linked(source, LinkKind::Office) {
        tree.link(source, LinkKind::Office, office.id());
    }
}

/// Creates the managed object source and managed object for a supplied entry
/// under `scope`, reusing them if an earlier match already did.
fn materialise_supplied(
    tree: &mut NodeTree,
    scope: NodeId,
    supplied: NodeId,
    pass: &mut ObjectPass,
) -> Option<ManagedObjectHandle> {
    let entry = tree
        .state(Handle::<SuppliedManagedObjectSourceState>::new(supplied))?
        .supplied
        .clone();
    let supplier = tree.node(supplied).parent()?;
    let supplier_name = tree.node(supplier).node_name().to_owned();
    let name = entry.auto_wire.qualified_type();

    let created = tree.arena.lookup(scope, NodeKind::ManagedObject, &name).is_none();
    let source = tree.materialise(scope, &name, || ManagedObjectSourceState {
        provider: Provider::instance(supplier_name, Rc::clone(&entry.source)),
        properties: entry.properties.clone(),
        timeout: None,
        supplied_by: Some(supplied),
    });
    let managed_object = tree.materialise(scope, &name, || ManagedObjectState {
        source: source.id(),
        scope: ManagedObjectScope::default(),
        type_qualifications: vec![entry.auto_wire.clone()],
    });
    if created {
        debug!(managed_object = %tree.qualified_name(managed_object.id()), "materialised supplied managed object");
        materialise_source_type(tree, source);
        materialise_object_type(tree, managed_object);
        pass.materialised = true;
        pass.created.push(managed_object);
    }
    Some(managed_object)
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Links office teams to OfficeFloor teams, and functions to office teams,
/// by type qualification. Answers `false` if any issue was raised.
#[instrument(skip_all)]
pub(crate) fn auto_wire_teams(tree: &mut NodeTree) -> bool {
    let before = tree.issues.len();
    let root = tree.root();
    let floor_enabled = tree.config.auto_wire_teams
        || tree.state(root).is_some_and(|state| state.auto_wire_teams);

    let mut floor = AutoWirer::new(AutoWireDirection::TargetCategorisesSource, Rc::clone(&tree.types));
    for team in tree.registered::<TeamState>(root.id()) {
        if let Some(state) = tree.state(team).filter(|state| !state.type_qualifications.is_empty()) {
            let auto_wires = state.type_qualifications.clone();
            floor.add_target(tree.qualified_name(team.id()).to_owned(), team.id(), auto_wires);
        }
    }

    for office in tree.registered::<OfficeState>(root.id()) {
        if floor_enabled {
            for team in tree.registered::<OfficeTeamState>(office.id()) {
                let Some(state) = tree.state(team) else {
                    continue;
                };
                if state.type_qualifications.is_empty() || tree.is_linked(team.id(), LinkKind::Team) {
                    continue;
                }
                let auto_wires = state.type_qualifications.clone();
                let descriptor = tree.descriptor(team.id());
                if let Some(link) =
                    floor.find_auto_wire_link(&descriptor, &auto_wires, Necessity::Required, &mut tree.issues)
                {
                    tree.link(team.id(), LinkKind::Team, link.target);
                }
            }
        }

        let office_enabled = tree.config.auto_wire_teams
            || tree.state(office).is_some_and(|state| state.auto_wire_teams);
        if office_enabled {
            wire_responsible_teams(tree, office);
        }
    }
    tree.issues.len() == before
}

/// Gives each function without a team the office team qualified by the
/// types of the managed objects it uses. Functions matching nothing keep
/// the default team.
fn wire_responsible_teams(tree: &mut NodeTree, office: OfficeHandle) {
    let mut wirer = AutoWirer::new(AutoWireDirection::TargetCategorisesSource, Rc::clone(&tree.types));
    for team in tree.registered::<OfficeTeamState>(office.id()) {
        if let Some(state) = tree.state(team).filter(|state| !state.type_qualifications.is_empty()) {
            let auto_wires = state.type_qualifications.clone();
            wirer.add_target(tree.qualified_name(team.id()).to_owned(), team.id(), auto_wires);
        }
    }
    if wirer.target_count() == 0 {
        return;
    }

    let mut functions = Vec::new();
    let mut sections = tree.registered::<SectionState>(office.id());
    while let Some(section) = sections.pop() {
        functions.extend(tree.registered::<FunctionState>(section.id()));
        sections.extend(tree.registered::<SectionState>(section.id()));
    }
    functions.sort_by(|a, b| tree.qualified_name(a.id()).cmp(tree.qualified_name(b.id())));

    for function in functions {
        if tree.state(function).is_none() || tree.is_linked(function.id(), LinkKind::Team) {
            continue;
        }
        let auto_wires = used_object_auto_wires(tree, function.id());
        if auto_wires.is_empty() {
            continue;
        }
        let descriptor = tree.descriptor(function.id());
        if let Some(link) =
            wirer.find_auto_wire_link(&descriptor, &auto_wires, Necessity::Optional, &mut tree.issues)
        {
            tree.link(function.id(), LinkKind::Team, link.target);
        }
    }
}

/// Auto-wires of the managed objects `function`'s objects resolve to.
fn used_object_auto_wires(tree: &mut NodeTree, function: NodeId) -> Vec<AutoWire> {
    let mut scratch = IssueLog::new();
    let mut auto_wires = Vec::new();
    for object in tree.registered::<FunctionObjectState>(function) {
        let resolved = find_furthest_target(
            &tree.arena,
            object.id(),
            LinkKind::Object,
            &[NodeKind::ManagedObject],
            &mut scratch,
        );
        if let Some(managed_object) = resolved {
            auto_wires.extend(tree.managed_object_auto_wires(Handle::new(managed_object)));
        }
    }
    auto_wires.sort();
    auto_wires.dedup();
    auto_wires
}

// ---------------------------------------------------------------------------
// Extensions
// ---------------------------------------------------------------------------

/// Administers and governs every managed object offering the extension type
/// of an administration or governance with auto-wiring enabled.
#[instrument(skip_all)]
pub(crate) fn auto_wire_extensions(tree: &mut NodeTree) -> bool {
    let before = tree.issues.len();
    let root = tree.root().id();
    for office in tree.registered::<OfficeState>(root) {
        let mut floor = AutoWirer::new(AutoWireDirection::SourceRequiresTarget, Rc::clone(&tree.types));
        for managed_object in floor_objects_used_by(tree, office) {
            add_extension_target(tree, &mut floor, managed_object);
        }
        let mut scope = floor.create_scope();
        let mut owners = vec![office.id()];
        while let Some(owner) = owners.pop() {
            for managed_object in tree.registered::<ManagedObjectState>(owner) {
                add_extension_target(tree, &mut scope, managed_object);
            }
            owners.extend(tree.registered::<SectionState>(owner).into_iter().map(Handle::id));
        }

        for administration in tree.registered::<AdministrationState>(office.id()) {
            if !tree.state(administration).is_some_and(|state| state.auto_wire_extensions) {
                continue;
            }
            let Some(loaded) = tree.administration_type(administration) else {
                continue;
            };
            let descriptor = tree.descriptor(administration.id());
            let links = scope.find_all_auto_wire_links(
                &descriptor,
                &[AutoWire::new(loaded.extension_type.clone())],
                &mut tree.issues,
            );
            if let Some(state) = tree.state_mut(administration) {
                state.administered.extend(links.into_iter().map(|link| link.target));
            }
        }
        for governance in tree.registered::<GovernanceState>(office.id()) {
            if !tree.state(governance).is_some_and(|state| state.auto_wire_extensions) {
                continue;
            }
            let Some(loaded) = tree.governance_type(governance) else {
                continue;
            };
            let descriptor = tree.descriptor(governance.id());
            let links = scope.find_all_auto_wire_links(
                &descriptor,
                &[AutoWire::new(loaded.extension_type.clone())],
                &mut tree.issues,
            );
            if let Some(state) = tree.state_mut(governance) {
                state.governed.extend(links.into_iter().map(|link| link.target));
            }
        }
    }
    tree.issues.len() == before
}

/// OfficeFloor managed objects reached through `office`'s office objects.
fn floor_objects_used_by(tree: &NodeTree, office: OfficeHandle) -> Vec<ManagedObjectHandle> {
    let mut scratch = IssueLog::new();
    let mut used: Vec<NodeId> = tree
        .registered::<OfficeObjectState>(office.id())
        .into_iter()
        .filter_map(|object| {
            find_furthest_target(
                &tree.arena,
                object.id(),
                LinkKind::Object,
                &[NodeKind::ManagedObject],
                &mut scratch,
            )
        })
        .filter(|managed_object| tree.office_of(*managed_object).is_none())
        .collect();
    used.sort();
    used.dedup();
    used.into_iter().map(Handle::new).collect()
}

fn add_extension_target(
    tree: &mut NodeTree,
    wirer: &mut AutoWirer<'_, NodeId>,
    managed_object: ManagedObjectHandle,
) {
    if tree.state(managed_object).is_none() {
        return;
    }
    let Some(loaded) = tree.managed_object_type_of(managed_object) else {
        return;
    };
    if loaded.extension_types.is_empty() {
        return;
    }
    wirer.add_target(
        tree.qualified_name(managed_object.id()).to_owned(),
        managed_object.id(),
        loaded.extension_types.iter().cloned().map(AutoWire::new),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTree;
    use graph::types::{ManagedObjectType, SuppliedManagedObjectSourceType};
    use graph::{ManagedObjectSource, PropertyList, SourceContext, SourceError, TypeHierarchy};
    use pretty_assertions::assert_eq;

    const REPO: &str = "com.example.Repo";

    struct Fixed(ManagedObjectType);

    impl ManagedObjectSource for Fixed {
        fn load_type(&self, _: &SourceContext) -> Result<ManagedObjectType, SourceError> {
            Ok(self.0.clone())
        }
    }

    fn repo() -> Rc<dyn ManagedObjectSource> {
        Rc::new(Fixed(ManagedObjectType::new(REPO)))
    }

    fn enabled() -> TestTree {
        let config = crate::CompilerConfig {
            auto_wire_objects: true,
            ..Default::default()
        };
        TestTree::with(crate::Providers::new(), TypeHierarchy::new().with(REPO, Vec::<String>::new()), config)
    }

    fn linked(tree: &TestTree, id: NodeId) -> Option<NodeId> {
        tree.tree.node(id).links().linked(LinkKind::Object)
    }

    #[test]
    fn section_object_bridges_to_floor_managed_object() {
        let mut tree = enabled();
        let root = tree.tree.root();
        let (source, managed_object) = tree.managed_object(root, "Repo", repo());
        let office = tree.office("OfficeA");
        let section = tree.section(office, "SectionA");
        let object = tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree));
        assert!(tree.messages().is_empty());

        let bridge = tree
            .tree
            .arena
            .lookup(office.id(), NodeKind::OfficeObject, "Repo")
            .expect("office object created");
        assert_eq!(linked(&tree, object.id()), Some(bridge));
        assert_eq!(linked(&tree, bridge), Some(managed_object.id()));
        assert_eq!(
            tree.tree.node(source.id()).links().linked(LinkKind::Office),
            Some(office.id())
        );
    }

    #[test]
    fn office_managed_object_wins_over_floor() {
        let mut tree = enabled();
        let root = tree.tree.root();
        tree.managed_object(root, "FloorRepo", repo());
        let office = tree.office("OfficeA");
        let (_, local) = tree.managed_object(office, "LocalRepo", repo());
        let section = tree.section(office, "SectionA");
        let object = tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree));
        assert_eq!(linked(&tree, object.id()), Some(local.id()));
    }

    #[test]
    fn ambiguous_floor_targets_leave_object_unlinked() {
        let mut tree = enabled();
        let root = tree.tree.root();
        tree.managed_object(root, "RepoA", repo());
        tree.managed_object(root, "RepoB", repo());
        let office = tree.office("OfficeA");
        let section = tree.section(office, "SectionA");
        let object = tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(!auto_wire_objects(&mut tree.tree));
        assert_eq!(linked(&tree, object.id()), None);
        assert_eq!(
            tree.messages(),
            vec![format!(
                "Duplicate auto-wire targets ({REPO} -> {REPO} [RepoA], {REPO} -> {REPO} [RepoB]). \
                 Please qualify to specify which target to link."
            )]
        );
    }

    #[test]
    fn supplied_source_is_materialised_once_and_its_dependencies_wired() {
        const CONNECTION: &str = "com.example.Connection";
        let mut tree = TestTree::with(
            crate::Providers::new(),
            TypeHierarchy::new()
                .with(REPO, Vec::<String>::new())
                .with(CONNECTION, Vec::<String>::new()),
            crate::CompilerConfig {
                auto_wire_objects: true,
                ..Default::default()
            },
        );
        let office = tree.office("OfficeA");
        tree.managed_object(
            office,
            "Connection",
            Rc::new(Fixed(ManagedObjectType::new(CONNECTION))),
        );
        let supplier = tree.tree.add(
            office.id(),
            "Supplier",
            SupplierState {
                provider: Provider::Named(graph::ProviderName::new("supplier").unwrap()),
                properties: PropertyList::new(),
            },
        );
        let supplied_source: Rc<dyn ManagedObjectSource> = Rc::new(Fixed(
            ManagedObjectType::new(REPO).with_dependency("connection", AutoWire::new(CONNECTION)),
        ));
        tree.tree.materialise(supplier.id(), REPO, || SuppliedManagedObjectSourceState {
            supplied: SuppliedManagedObjectSourceType {
                auto_wire: AutoWire::new(REPO),
                source: supplied_source,
                properties: PropertyList::new(),
            },
        });
        let first = tree.section(office, "First");
        let second = tree.section(office, "Second");
        let a = tree.section_object(first, "repo", AutoWire::new(REPO));
        let b = tree.section_object(second, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree), "{:?}", tree.messages());

        let managed_object = tree
            .tree
            .arena
            .lookup(office.id(), NodeKind::ManagedObject, REPO)
            .expect("supplied managed object");
        assert_eq!(linked(&tree, a.id()), Some(managed_object));
        assert_eq!(linked(&tree, b.id()), Some(managed_object));

        let dependency = tree
            .tree
            .arena
            .lookup(managed_object, NodeKind::ManagedObjectDependency, "connection")
            .expect("dependency materialised");
        let connection = tree
            .tree
            .arena
            .lookup(office.id(), NodeKind::ManagedObject, "Connection");
        assert_eq!(linked(&tree, dependency), connection);
    }

    #[test]
    fn disabled_auto_wiring_leaves_objects_alone() {
        let mut tree = TestTree::new();
        let root = tree.tree.root();
        tree.managed_object(root, "Repo", repo());
        let office = tree.office("OfficeA");
        let section = tree.section(office, "SectionA");
        let object = tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree));
        assert_eq!(linked(&tree, object.id()), None);
    }

    #[test]
    fn administration_collects_managed_objects_by_extension() {
        const PAUSE: &str = "com.example.Pausable";
        let mut tree = TestTree::with(
            crate::Providers::new(),
            TypeHierarchy::new().with(PAUSE, Vec::<String>::new()),
            crate::CompilerConfig::default(),
        );
        let office = tree.office("OfficeA");
        let (_, pausable) = tree.managed_object(
            office,
            "Pausable",
            Rc::new(Fixed(ManagedObjectType::new(REPO).with_extension(PAUSE))),
        );
        tree.managed_object(office, "Plain", repo());

        struct Pause;
        impl graph::AdministrationSource for Pause {
            fn load_type(
                &self,
                _: &SourceContext,
            ) -> Result<graph::types::AdministrationType, SourceError> {
                Ok(graph::types::AdministrationType {
                    extension_type: PAUSE.to_owned(),
                })
            }
        }
        let administration = tree.tree.add(
            office.id(),
            "Pause",
            AdministrationState {
                provider: Provider::instance("pause", Rc::new(Pause) as Rc<dyn graph::AdministrationSource>),
                properties: PropertyList::new(),
                auto_wire_extensions: true,
                administered: BTreeSet::new(),
            },
        );

        assert!(auto_wire_extensions(&mut tree.tree));
        let administered: Vec<NodeId> = tree
            .tree
            .state(administration)
            .map(|state| state.administered.iter().copied().collect())
            .unwrap_or_default();
        assert_eq!(administered, vec![pausable.id()]);
    }

    fn office_only(tree: &mut TestTree, office: OfficeHandle) {
        if let Some(state) = tree.tree.state_mut(office) {
            state.auto_wire_objects = true;
        }
    }

    #[test]
    fn floor_supplied_dependencies_are_wired_for_office_only_auto_wiring() {
        const CONNECTION: &str = "com.example.Connection";
        let mut tree = TestTree::with(
            crate::Providers::new(),
            TypeHierarchy::new()
                .with(REPO, Vec::<String>::new())
                .with(CONNECTION, Vec::<String>::new()),
            crate::CompilerConfig::default(),
        );
        let root = tree.tree.root();
        let (_, connection) = tree.managed_object(
            root,
            "Connection",
            Rc::new(Fixed(ManagedObjectType::new(CONNECTION))),
        );
        let supplier = tree.tree.add(
            root.id(),
            "Supplier",
            SupplierState {
                provider: Provider::Named(graph::ProviderName::new("supplier").unwrap()),
                properties: PropertyList::new(),
            },
        );
        let supplied_source: Rc<dyn ManagedObjectSource> = Rc::new(Fixed(
            ManagedObjectType::new(REPO).with_dependency("connection", AutoWire::new(CONNECTION)),
        ));
        tree.tree.materialise(supplier.id(), REPO, || SuppliedManagedObjectSourceState {
            supplied: SuppliedManagedObjectSourceType {
                auto_wire: AutoWire::new(REPO),
                source: supplied_source,
                properties: PropertyList::new(),
            },
        });
        let office = tree.office("OfficeA");
        office_only(&mut tree, office);
        let section = tree.section(office, "SectionA");
        tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree), "{:?}", tree.messages());

        let managed_object = tree
            .tree
            .arena
            .lookup(root.id(), NodeKind::ManagedObject, REPO)
            .expect("supplied managed object");
        let dependency = tree
            .tree
            .arena
            .lookup(managed_object, NodeKind::ManagedObjectDependency, "connection")
            .expect("dependency materialised");
        assert_eq!(linked(&tree, dependency), Some(connection.id()));
    }

    #[test]
    fn bridge_avoids_declared_office_object_of_the_same_name() {
        const CONNECTION: &str = "com.example.Connection";
        let mut tree = TestTree::with(
            crate::Providers::new(),
            TypeHierarchy::new()
                .with(REPO, Vec::<String>::new())
                .with(CONNECTION, Vec::<String>::new()),
            crate::CompilerConfig::default(),
        );
        let root = tree.tree.root();
        let (_, managed_object) = tree.managed_object(root, "Repo", repo());
        let office = tree.office("OfficeA");
        office_only(&mut tree, office);
        let declared = tree.tree.add(
            office.id(),
            "Repo",
            OfficeObjectState {
                auto_wire: AutoWire::new(CONNECTION),
            },
        );
        let section = tree.section(office, "SectionA");
        let object = tree.section_object(section, "repo", AutoWire::new(REPO));

        assert!(auto_wire_objects(&mut tree.tree), "{:?}", tree.messages());

        let bridge = tree
            .tree
            .arena
            .lookup(office.id(), NodeKind::OfficeObject, "Repo-2")
            .expect("bridge renamed");
        assert_eq!(linked(&tree, object.id()), Some(bridge));
        assert_eq!(linked(&tree, bridge), Some(managed_object.id()));
        assert_eq!(linked(&tree, declared.id()), None);
        assert_eq!(
            tree.tree.state(declared).map(|state| state.auto_wire.clone()),
            Some(AutoWire::new(CONNECTION))
        );
    }
}
