//! Build: replaying the wired tree into an [`OfficeFloorBuilder`].
//!
//! Traversal is fixed (teams, pools, OfficeFloor managed objects, then each
//! office with its teams, managed objects, sections, administrations and
//! governances) and every level is visited in name order, so the same tree
//! always produces the same call sequence.

use graph::{
    find_target, retrieve_furthest_target, retrieve_target, CompilerIssue, CompilerIssues,
    IssueLog, LinkKind, Node, NodeId, NodeKind,
};
use tracing::{debug, instrument};

use crate::builder::OfficeFloorBuilder;
use crate::handles::{OfficeHandle, SectionHandle};
use crate::node::{
    AdministrationState, FunctionFlowState, FunctionObjectState, FunctionState, GovernanceState,
    ManagedObjectDependencyState, ManagedObjectFlowState, ManagedObjectSourceState,
    ManagedObjectState, ManagedObjectTeamState, OfficeState, OfficeTeamState, PoolState,
    SectionState, TeamState,
};
use crate::tree::NodeTree;

struct Build<'t, 'b> {
    tree: &'t mut NodeTree,
    builder: &'b mut dyn OfficeFloorBuilder,
}

/// Builds the OfficeFloor. Answers `false` if any issue was raised.
#[instrument(skip_all)]
pub(crate) fn build_office_floor(tree: &mut NodeTree, builder: &mut dyn OfficeFloorBuilder) -> bool {
    let before = tree.issues.len();
    let mut build = Build { tree, builder };
    build.run();
    build.tree.issues.len() == before
}

impl Build<'_, '_> {
    fn run(&mut self) {
        let root = self.tree.root().id();

        for team in self.tree.registered::<TeamState>(root) {
            let Some(state) = self.tree.state(team) else {
                continue;
            };
            let (provider, size) = (state.provider.clone(), state.size);
            let properties = self.tree.properties(team.id(), &state.properties);
            let Some(source) = self.tree.instantiate(team.id(), &provider, |p| &p.teams) else {
                continue;
            };
            let name = self.name(team.id());
            let outcome = self.builder.add_team(&name, source, size, &properties);
            self.check(team.id(), outcome);
        }

        for pool in self.tree.registered::<PoolState>(root) {
            let Some(state) = self.tree.state(pool) else {
                continue;
            };
            let provider = state.provider.clone();
            let properties = self.tree.properties(pool.id(), &state.properties);
            let Some(source) = self.tree.instantiate(pool.id(), &provider, |p| &p.pools) else {
                continue;
            };
            let name = self.name(pool.id());
            let outcome = self.builder.add_managed_object_pool(&name, source, &properties);
            self.check(pool.id(), outcome);
        }

        self.managed_objects(root, None);

        for office in self.tree.registered::<OfficeState>(root) {
            if self.tree.state(office).is_some() {
                self.office(office);
            }
        }
    }

    fn office(&mut self, office: OfficeHandle) {
        let office_name = self.name(office.id());
        let outcome = self.builder.add_office(&office_name);
        self.check(office.id(), outcome);

        for team in self.tree.registered::<OfficeTeamState>(office.id()) {
            let Some(floor_team) = self.retrieve(team.id(), LinkKind::Team, &[NodeKind::Team]) else {
                continue;
            };
            let team_name = self.tree.node(team.id()).node_name().to_owned();
            let floor_team = self.name(floor_team);
            let outcome = self.builder.register_team(&office_name, &team_name, &floor_team);
            self.check(team.id(), outcome);
        }

        self.managed_objects(office.id(), Some(office));
        for section in self.tree.registered::<SectionState>(office.id()) {
            self.section(&office_name, office, section);
        }

        for administration in self.tree.registered::<AdministrationState>(office.id()) {
            let Some(state) = self.tree.state(administration) else {
                continue;
            };
            let provider = state.provider.clone();
            let properties = self.tree.properties(administration.id(), &state.properties);
            let administered = self.names(state.administered.iter().copied());
            let Some(source) = self
                .tree
                .instantiate(administration.id(), &provider, |p| &p.administrations)
            else {
                continue;
            };
            let name = self.name(administration.id());
            let outcome =
                self.builder
                    .add_administration(&office_name, &name, source, &properties, &administered);
            self.check(administration.id(), outcome);
        }

        for governance in self.tree.registered::<GovernanceState>(office.id()) {
            let Some(state) = self.tree.state(governance) else {
                continue;
            };
            let provider = state.provider.clone();
            let properties = self.tree.properties(governance.id(), &state.properties);
            let governed = self.names(state.governed.iter().copied());
            let Some(source) = self.tree.instantiate(governance.id(), &provider, |p| &p.governances) else {
                continue;
            };
            let name = self.name(governance.id());
            let outcome = self
                .builder
                .add_governance(&office_name, &name, source, &properties, &governed);
            self.check(governance.id(), outcome);
        }
        debug!(office = %office_name, "built office");
    }

    fn section(&mut self, office_name: &str, office: OfficeHandle, section: SectionHandle) {
        if self.tree.state(section).is_none() {
            return;
        }
        for function in self.tree.registered::<FunctionState>(section.id()) {
            let Some(state) = self.tree.state(function) else {
                continue;
            };
            let (namespace, function_type) = (state.namespace, state.function_type.clone());
            let function_name = self.name(function.id());
            let namespace = self.name(namespace);
            let outcome = self
                .builder
                .add_function(office_name, &function_name, &namespace, &function_type);
            self.check(function.id(), outcome);

            let mut scratch = IssueLog::new();
            let team = find_target(
                &self.tree.arena,
                function.id(),
                LinkKind::Team,
                &[NodeKind::OfficeTeam],
                &mut scratch,
            );
            if let Some(team) = team {
                let team = self.tree.node(team).node_name().to_owned();
                let outcome = self.builder.set_responsible_team(office_name, &function_name, &team);
                self.check(function.id(), outcome);
            }

            for object in self.tree.registered::<FunctionObjectState>(function.id()) {
                if !self.tree.state(object).is_some_and(|state| !state.is_parameter) {
                    continue;
                }
                let Some(managed_object) =
                    self.retrieve_furthest(object.id(), LinkKind::Object, &[NodeKind::ManagedObject])
                else {
                    continue;
                };
                let object_name = self.tree.node(object.id()).node_name().to_owned();
                let managed_object = self.name(managed_object);
                let outcome =
                    self.builder
                        .link_object(office_name, &function_name, &object_name, &managed_object);
                self.check(object.id(), outcome);
            }

            for flow in self.tree.registered::<FunctionFlowState>(function.id()) {
                let Some((argument_type, spawn)) = self
                    .tree
                    .state(flow)
                    .map(|state| (state.argument_type.clone(), state.spawn))
                else {
                    continue;
                };
                let Some(target) = self.retrieve(flow.id(), LinkKind::Flow, &[NodeKind::Function]) else {
                    continue;
                };
                let flow_name = self.tree.node(flow.id()).node_name().to_owned();
                let target = self.name(target);
                let outcome = self
                    .builder
                    .link_flow(
                        office_name,
                        &function_name,
                        &flow_name,
                        argument_type.as_deref(),
                        &target,
                        spawn,
                    );
                self.check(flow.id(), outcome);
            }
        }

        self.managed_objects(section.id(), Some(office));
        for sub_section in self.tree.registered::<SectionState>(section.id()) {
            self.section(office_name, office, sub_section);
        }
    }

    /// Managed object sources and managed objects declared under `owner`.
    ///
    /// `office` manages the sources of an office or section; OfficeFloor
    /// sources are managed by whatever office they were linked to.
    fn managed_objects(&mut self, owner: NodeId, office: Option<OfficeHandle>) {
        for source in self.tree.registered::<ManagedObjectSourceState>(owner) {
            let Some(state) = self.tree.state(source) else {
                continue;
            };
            let (provider, timeout) = (state.provider.clone(), state.timeout);
            let properties = self.tree.properties(source.id(), &state.properties);
            let Some(instance) = self
                .tree
                .instantiate(source.id(), &provider, |p| &p.managed_object_sources)
            else {
                continue;
            };
            let source_name = self.name(source.id());
            let outcome = self
                .builder
                .add_managed_object_source(&source_name, instance, &properties, timeout);
            self.check(source.id(), outcome);

            let links = self.tree.node(source.id()).links().clone();
            let managing = links
                .linked(LinkKind::Office)
                .or_else(|| office.map(|office| office.id()));
            if let Some(managing) = managing {
                let managing = self.name(managing);
                let outcome = self.builder.set_managing_office(&source_name, &managing);
                self.check(source.id(), outcome);
            }
            if let Some(pool) = links.linked(LinkKind::Pool) {
                let pool = self.name(pool);
                let outcome = self.builder.set_managed_object_pool(&source_name, &pool);
                self.check(source.id(), outcome);
            }
            for other in links.linked_all(LinkKind::StartBefore) {
                let other = self.name(other);
                let outcome = self.builder.start_before(&source_name, &other);
                self.check(source.id(), outcome);
            }
            for other in links.linked_all(LinkKind::StartAfter) {
                let other = self.name(other);
                let outcome = self.builder.start_after(&source_name, &other);
                self.check(source.id(), outcome);
            }

            for flow in self.tree.registered::<ManagedObjectFlowState>(source.id()) {
                let Some(function) = self.retrieve(flow.id(), LinkKind::Flow, &[NodeKind::Function]) else {
                    continue;
                };
                let flow_name = self.tree.node(flow.id()).node_name().to_owned();
                let argument_type = self
                    .tree
                    .state(flow)
                    .and_then(|state| state.argument_type.clone());
                let function = self.name(function);
                let outcome = self.builder.link_managed_object_flow(
                    &source_name,
                    &flow_name,
                    argument_type.as_deref(),
                    &function,
                );
                self.check(flow.id(), outcome);
            }
            for team in self.tree.registered::<ManagedObjectTeamState>(source.id()) {
                let Some(floor_team) = self.retrieve_furthest(team.id(), LinkKind::Team, &[NodeKind::Team]) else {
                    continue;
                };
                let team_name = self.tree.node(team.id()).node_name().to_owned();
                let floor_team = self.name(floor_team);
                let outcome = self
                    .builder
                    .link_managed_object_team(&source_name, &team_name, &floor_team);
                self.check(team.id(), outcome);
            }
        }

        for managed_object in self.tree.registered::<ManagedObjectState>(owner) {
            let Some(state) = self.tree.state(managed_object) else {
                continue;
            };
            let (source, scope) = (state.source, state.scope);
            let name = self.name(managed_object.id());
            let source = self.name(source);
            let outcome = self.builder.add_managed_object(&name, &source, scope);
            self.check(managed_object.id(), outcome);

            for dependency in self
                .tree
                .registered::<ManagedObjectDependencyState>(managed_object.id())
            {
                let Some(target) = self.retrieve_furthest(
                    dependency.id(),
                    LinkKind::Object,
                    &[NodeKind::ManagedObject],
                ) else {
                    continue;
                };
                let dependency_name = self.tree.node(dependency.id()).node_name().to_owned();
                let target = self.name(target);
                let outcome = self.builder.link_dependency(&name, &dependency_name, &target);
                self.check(dependency.id(), outcome);
            }
        }
    }

    fn name(&self, id: NodeId) -> String {
        self.tree.qualified_name(id).to_owned()
    }

    fn names(&self, ids: impl Iterator<Item = NodeId>) -> Vec<String> {
        let mut names: Vec<String> = ids.map(|id| self.name(id)).collect();
        names.sort();
        names
    }

    fn retrieve(&mut self, start: NodeId, kind: LinkKind, targets: &[NodeKind]) -> Option<NodeId> {
        retrieve_target(&self.tree.arena, start, kind, targets, &mut self.tree.issues)
    }

    fn retrieve_furthest(&mut self, start: NodeId, kind: LinkKind, targets: &[NodeKind]) -> Option<NodeId> {
        retrieve_furthest_target(&self.tree.arena, start, kind, targets, &mut self.tree.issues)
    }

    /// Reports a builder failure against `id`.
    fn check(&mut self, id: NodeId, outcome: anyhow::Result<()>) {
        if let Err(err) = outcome {
            let descriptor = self.tree.descriptor(id);
            let message = format!("Failed to build {} {}", descriptor.kind, descriptor.name);
            self.tree
                .issues
                .add_issue(CompilerIssue::new(&descriptor, message).with_cause(&*err));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::builder::{BuildCall, RecordingBuilder};
    use crate::testing::TestTree;
    use graph::types::ManagedObjectType;
    use graph::{ManagedObjectSource, SourceContext, SourceError};
    use pretty_assertions::assert_eq;

    struct Fixed;

    impl ManagedObjectSource for Fixed {
        fn load_type(&self, _: &SourceContext) -> Result<ManagedObjectType, SourceError> {
            Ok(ManagedObjectType::new("com.example.Repo"))
        }
    }

    #[test]
    fn office_managed_objects_are_managed_by_their_office() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let fixed: Rc<dyn ManagedObjectSource> = Rc::new(Fixed);
        tree.managed_object(office, "Repo", fixed);

        let mut builder = RecordingBuilder::new();
        assert!(build_office_floor(&mut tree.tree, &mut builder));

        let calls = builder.into_calls();
        assert_eq!(
            calls,
            vec![
                BuildCall::AddOffice {
                    name: "OfficeA".to_owned()
                },
                BuildCall::AddManagedObjectSource {
                    name: "OfficeA.Repo".to_owned(),
                    properties: Default::default(),
                    timeout: None,
                },
                BuildCall::SetManagingOffice {
                    managed_object_source: "OfficeA.Repo".to_owned(),
                    office: "OfficeA".to_owned(),
                },
                BuildCall::AddManagedObject {
                    name: "OfficeA.Repo".to_owned(),
                    managed_object_source: "OfficeA.Repo".to_owned(),
                    scope: graph::ManagedObjectScope::Thread,
                },
            ]
        );
    }

    #[test]
    fn unlinked_dependency_is_reported() {
        let mut tree = TestTree::new();
        let office = tree.office("OfficeA");
        let fixed: Rc<dyn ManagedObjectSource> = Rc::new(Fixed);
        let (_, managed_object) = tree.managed_object(office, "Repo", fixed);
        tree.tree.materialise(managed_object.id(), "connection", || ManagedObjectDependencyState {
            auto_wire: graph::AutoWire::new("com.example.Connection"),
        });

        let mut builder = RecordingBuilder::new();
        assert!(!build_office_floor(&mut tree.tree, &mut builder));
        assert_eq!(
            tree.messages(),
            vec!["Managed Object Dependency connection is not linked to a Managed Object".to_owned()]
        );
    }
}
