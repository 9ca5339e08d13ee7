//! Sourcing: running the structural providers top down.
//!
//! The OfficeFloor provider runs first and declares offices, teams and
//! managed objects. Then every declared leaf has its type loaded, which
//! materialises the children that type describes (managed object flows,
//! teams and dependencies, supplied managed object sources), and every
//! office and section provider runs in turn. A failing provider stops its own
//! subtree only; siblings are still sourced so one compile reports as many
//! problems as it can.

use graph::NodeId;
use tracing::{debug, info, instrument};

use crate::architect::{OfficeArchitect, OfficeFloorDeployer, SectionDesigner};
use crate::handles::{Handle, OfficeHandle, SectionHandle};
use crate::node::{
    AdministrationState, GovernanceState, ManagedObjectDependencyState, ManagedObjectFlowState,
    ManagedObjectSourceState, ManagedObjectState, ManagedObjectTeamState, OfficeState, PoolState,
    SectionState, SuppliedManagedObjectSourceState, SupplierState, TeamState,
};
use crate::tree::NodeTree;

/// Sources the whole tree. Answers `false` if any part failed.
#[instrument(skip_all, fields(office_floor = %tree.qualified_name(tree.root().id())))]
pub(crate) fn source_office_floor_tree(tree: &mut NodeTree) -> bool {
    let root = tree.root();
    let Some(floor) = tree.state(root) else {
        return false;
    };
    let provider = floor.provider.clone();
    let context = tree.source_context(root.id(), &floor.properties, None);

    let Some(source) = tree.instantiate(root.id(), &provider, |p| &p.office_floors) else {
        return false;
    };
    let outcome = source.source_office_floor(&mut OfficeFloorDeployer::new(tree), &context);
    if let Err(err) = outcome {
        tree.report_source_error(root.id(), provider.label(), err);
        return false;
    }

    let mut ok = source_suppliers(tree, root.id());
    for team in tree.registered::<TeamState>(root.id()) {
        if tree.state(team).is_some() {
            ok &= tree.team_type(team).is_some();
        }
    }
    for pool in tree.registered::<PoolState>(root.id()) {
        if tree.state(pool).is_some() {
            ok &= tree.pool_type(pool).is_some();
        }
    }
    ok &= source_managed_objects(tree, root.id());

    for office in tree.registered::<OfficeState>(root.id()) {
        ok &= source_office(tree, office);
    }
    info!(nodes = tree.arena.len(), ok, "sourced OfficeFloor");
    ok
}

fn source_office(tree: &mut NodeTree, office: OfficeHandle) -> bool {
    // Referenced only; the initialisation gate reports it.
    let Some(state) = tree.state(office) else {
        return true;
    };
    let provider = state.provider.clone();
    let context = tree.source_context(office.id(), &state.properties, Some(state.location.as_str()));

    let Some(source) = tree.instantiate(office.id(), &provider, |p| &p.offices) else {
        return false;
    };
    let outcome = source.source_office(&mut OfficeArchitect::new(tree, office), &context);
    if let Err(err) = outcome {
        tree.report_source_error(office.id(), provider.label(), err);
        return false;
    }

    let mut ok = source_suppliers(tree, office.id());
    ok &= source_managed_objects(tree, office.id());
    for section in tree.registered::<SectionState>(office.id()) {
        ok &= source_section(tree, section);
    }
    for administration in tree.registered::<AdministrationState>(office.id()) {
        if tree.state(administration).is_some() {
            ok &= tree.administration_type(administration).is_some();
        }
    }
    for governance in tree.registered::<GovernanceState>(office.id()) {
        if tree.state(governance).is_some() {
            ok &= tree.governance_type(governance).is_some();
        }
    }
    debug!(office = %tree.qualified_name(office.id()), ok, "sourced office");
    ok
}

fn source_section(tree: &mut NodeTree, section: SectionHandle) -> bool {
    let Some(state) = tree.state(section) else {
        return true;
    };
    let provider = state.provider.clone();
    let context = tree.source_context(section.id(), &state.properties, Some(state.location.as_str()));

    let Some(source) = tree.instantiate(section.id(), &provider, |p| &p.sections) else {
        return false;
    };
    let outcome = source.source_section(&mut SectionDesigner::new(tree, section), &context);
    if let Err(err) = outcome {
        tree.report_source_error(section.id(), provider.label(), err);
        return false;
    }

    let mut ok = source_managed_objects(tree, section.id());
    for sub_section in tree.registered::<SectionState>(section.id()) {
        ok &= source_section(tree, sub_section);
    }
    ok
}

/// Loads each supplier's type and materialises what it supplies.
fn source_suppliers(tree: &mut NodeTree, owner: NodeId) -> bool {
    let mut ok = true;
    for supplier in tree.registered::<SupplierState>(owner) {
        if tree.state(supplier).is_none() {
            continue;
        }
        let Some(supplier_type) = tree.supplier_type(supplier) else {
            ok = false;
            continue;
        };
        for supplied in &supplier_type.supplied {
            tree.materialise(supplier.id(), &supplied.auto_wire.qualified_type(), || {
                SuppliedManagedObjectSourceState {
                    supplied: supplied.clone(),
                }
            });
        }
        debug!(
            supplier = %tree.qualified_name(supplier.id()),
            supplied = supplier_type.supplied.len(),
            "loaded supplier"
        );
    }
    ok
}

/// Loads the type of each managed object source declared under `owner` and
/// materialises flows, teams and dependencies from it.
pub(crate) fn source_managed_objects(tree: &mut NodeTree, owner: NodeId) -> bool {
    let mut ok = true;
    for source in tree.registered::<ManagedObjectSourceState>(owner) {
        if tree.state(source).is_none() {
            continue;
        }
        ok &= materialise_source_type(tree, source);
    }
    for managed_object in tree.registered::<ManagedObjectState>(owner) {
        if tree.state(managed_object).is_none() {
            continue;
        }
        ok &= materialise_object_type(tree, managed_object);
    }
    ok
}

pub(crate) fn materialise_source_type(
    tree: &mut NodeTree,
    source: Handle<ManagedObjectSourceState>,
) -> bool {
    let Some(loaded) = tree.managed_object_type(source) else {
        return false;
    };
    for flow in &loaded.flows {
        tree.materialise(source.id(), &flow.name, || ManagedObjectFlowState {
            argument_type: flow.argument_type.clone(),
        });
    }
    for team in &loaded.teams {
        tree.materialise(source.id(), team, || ManagedObjectTeamState);
    }
    true
}

pub(crate) fn materialise_object_type(
    tree: &mut NodeTree,
    managed_object: Handle<ManagedObjectState>,
) -> bool {
    let Some(source) = tree.state(managed_object).map(|state| state.source) else {
        return true;
    };
    if tree.state(Handle::<ManagedObjectSourceState>::new(source)).is_none() {
        return true;
    }
    let Some(loaded) = tree.managed_object_type_of(managed_object) else {
        return false;
    };
    for dependency in &loaded.dependencies {
        tree.materialise(managed_object.id(), &dependency.name, || {
            ManagedObjectDependencyState {
                auto_wire: dependency.auto_wire.clone(),
            }
        });
    }
    true
}
