//! Designer surfaces handed to structural source providers.
//!
//! A provider never sees the node tree directly. It receives the designer
//! for the node being sourced ([`OfficeFloorDeployer`], [`OfficeArchitect`]
//! or [`SectionDesigner`]) and declares children, references children that
//! may not have been declared yet, and links them. Every operation answers a
//! typed [`Handle`]; misconfiguration is raised as an issue against the node
//! being sourced, never as an error returned to the provider.

use std::rc::Rc;

use graph::{
    AdministrationSource, AutoWire, GovernanceSource, LinkKind, ManagedFunctionSource,
    ManagedObjectPoolSource, ManagedObjectScope, ManagedObjectSource, NodeId, PropertyList,
    Provider, SupplierSource, TeamSource,
};
use tracing::debug;

use crate::explore::ExecutionExplorer;
use crate::handles::{
    AdministrationHandle, FunctionFlowHandle, FunctionHandle, FunctionNamespaceHandle,
    FunctionObjectHandle, GovernanceHandle, Handle, LinksFlow, LinksObject, LinksTeam,
    ManagedObjectDependencyHandle, ManagedObjectFlowHandle, ManagedObjectHandle,
    ManagedObjectSourceHandle, ManagedObjectTeamHandle, OfficeFloorHandle, OfficeHandle,
    OfficeObjectHandle, OfficeTeamHandle, PoolHandle, ProvidesObject, ProvidesTeam, ReceivesFlow,
    SectionHandle, SectionInputHandle, SectionObjectHandle, SectionOutputHandle, SupplierHandle,
    TeamHandle,
};
use crate::node::{
    AdministrationState, FunctionFlowState, FunctionNamespaceState, FunctionObjectState,
    FunctionState, GovernanceState, ManagedObjectSourceState, ManagedObjectState, OfficeState,
    OfficeObjectState, OfficeTeamState, PoolState, SectionInputState, SectionObjectState,
    SectionOutputState, SectionState, SupplierState, TeamState,
};
use crate::providers::{OfficeSource, SectionSource};
use crate::tree::NodeTree;

mod sealed {
    use graph::NodeId;

    use crate::tree::NodeTree;

    pub trait Scope {
        fn tree(&mut self) -> &mut NodeTree;

        /// Node being sourced; owns what the designer declares.
        fn scope(&self) -> NodeId;
    }
}

/// Operations available at every structural scope.
pub trait Designer: sealed::Scope {
    /// Raises an issue against the node being sourced.
    ///
    /// A provider that gives up after reporting should answer
    /// [`graph::SourceError::AlreadyReported`].
    fn add_issue(&mut self, message: impl Into<String>) {
        let scope = self.scope();
        self.tree().report(scope, message.into());
    }

    fn add_managed_object_source(
        &mut self,
        name: &str,
        provider: Provider<dyn ManagedObjectSource>,
        properties: PropertyList,
    ) -> ManagedObjectSourceHandle {
        let scope = self.scope();
        self.tree().add(
            scope,
            name,
            ManagedObjectSourceState {
                provider,
                properties,
                timeout: None,
                supplied_by: None,
            },
        )
    }

    fn set_timeout(&mut self, source: ManagedObjectSourceHandle, timeout: u64) {
        if let Some(state) = self.tree().state_mut(source) {
            state.timeout = Some(timeout);
        }
    }

    fn add_managed_object(
        &mut self,
        name: &str,
        source: ManagedObjectSourceHandle,
        scope: ManagedObjectScope,
    ) -> ManagedObjectHandle {
        let owner = self.scope();
        self.tree().add(
            owner,
            name,
            ManagedObjectState {
                source: source.id(),
                scope,
                type_qualifications: Vec::new(),
            },
        )
    }

    /// Offers `managed_object` for auto-wiring under `(qualifier, type_name)`.
    fn add_type_qualification(
        &mut self,
        managed_object: ManagedObjectHandle,
        qualifier: Option<&str>,
        type_name: &str,
    ) {
        if let Some(state) = self.tree().state_mut(managed_object) {
            state
                .type_qualifications
                .push(AutoWire::qualified(qualifier, type_name));
        }
    }

    fn get_managed_object_dependency(
        &mut self,
        managed_object: ManagedObjectHandle,
        name: &str,
    ) -> ManagedObjectDependencyHandle {
        self.tree().reference(managed_object.id(), name)
    }

    fn get_managed_object_flow(
        &mut self,
        source: ManagedObjectSourceHandle,
        name: &str,
    ) -> ManagedObjectFlowHandle {
        self.tree().reference(source.id(), name)
    }

    fn get_managed_object_team(
        &mut self,
        source: ManagedObjectSourceHandle,
        name: &str,
    ) -> ManagedObjectTeamHandle {
        self.tree().reference(source.id(), name)
    }

    fn link_object<S: LinksObject, T: ProvidesObject>(
        &mut self,
        source: Handle<S>,
        target: Handle<T>,
    ) -> bool {
        self.tree().link(source.id(), LinkKind::Object, target.id())
    }

    fn link_flow<S: LinksFlow, T: ReceivesFlow>(&mut self, source: Handle<S>, target: Handle<T>) -> bool {
        self.tree().link(source.id(), LinkKind::Flow, target.id())
    }

    fn link_team<S: LinksTeam, T: ProvidesTeam>(&mut self, source: Handle<S>, target: Handle<T>) -> bool {
        self.tree().link(source.id(), LinkKind::Team, target.id())
    }
}

// ---------------------------------------------------------------------------
// Helpers shared between scopes
// ---------------------------------------------------------------------------

fn add_supplier(
    tree: &mut NodeTree,
    owner: NodeId,
    name: &str,
    provider: Provider<dyn SupplierSource>,
    properties: PropertyList,
) -> SupplierHandle {
    tree.add(owner, name, SupplierState { provider, properties })
}

fn add_section(
    tree: &mut NodeTree,
    owner: NodeId,
    name: &str,
    provider: Provider<dyn SectionSource>,
    location: &str,
    properties: PropertyList,
) -> SectionHandle {
    tree.add(
        owner,
        name,
        SectionState {
            provider,
            location: location.to_owned(),
            properties,
            super_section: None,
        },
    )
}

// ---------------------------------------------------------------------------
// OfficeFloor
// ---------------------------------------------------------------------------

/// Designer for the OfficeFloor.
pub struct OfficeFloorDeployer<'t> {
    tree: &'t mut NodeTree,
    floor: OfficeFloorHandle,
}

impl sealed::Scope for OfficeFloorDeployer<'_> {
    fn tree(&mut self) -> &mut NodeTree {
        self.tree
    }

    fn scope(&self) -> NodeId {
        self.floor.id()
    }
}

impl Designer for OfficeFloorDeployer<'_> {}

impl<'t> OfficeFloorDeployer<'t> {
    pub(crate) fn new(tree: &'t mut NodeTree) -> Self {
        let floor = tree.root();
        Self { tree, floor }
    }

    pub fn enable_auto_wire_objects(&mut self) {
        if let Some(state) = self.tree.state_mut(self.floor) {
            state.auto_wire_objects = true;
        }
    }

    pub fn enable_auto_wire_teams(&mut self) {
        if let Some(state) = self.tree.state_mut(self.floor) {
            state.auto_wire_teams = true;
        }
    }

    pub fn add_supplier(
        &mut self,
        name: &str,
        provider: Provider<dyn SupplierSource>,
        properties: PropertyList,
    ) -> SupplierHandle {
        add_supplier(self.tree, self.floor.id(), name, provider, properties)
    }

    /// Declares a team of one thread. See [`set_team_size`](Self::set_team_size).
    pub fn add_team(
        &mut self,
        name: &str,
        provider: Provider<dyn TeamSource>,
        properties: PropertyList,
    ) -> TeamHandle {
        self.tree.add(
            self.floor.id(),
            name,
            TeamState {
                provider,
                properties,
                size: 1,
                type_qualifications: Vec::new(),
            },
        )
    }

    pub fn set_team_size(&mut self, team: TeamHandle, size: usize) {
        if let Some(state) = self.tree.state_mut(team) {
            state.size = size;
        }
    }

    /// Offers `team` for auto-wiring to office teams qualified by `type_name`.
    pub fn add_team_type_qualification(
        &mut self,
        team: TeamHandle,
        qualifier: Option<&str>,
        type_name: &str,
    ) {
        if let Some(state) = self.tree.state_mut(team) {
            state
                .type_qualifications
                .push(AutoWire::qualified(qualifier, type_name));
        }
    }

    pub fn add_pool(
        &mut self,
        name: &str,
        provider: Provider<dyn ManagedObjectPoolSource>,
        properties: PropertyList,
    ) -> PoolHandle {
        self.tree
            .add(self.floor.id(), name, PoolState { provider, properties })
    }

    pub fn link_pool(&mut self, source: ManagedObjectSourceHandle, pool: PoolHandle) -> bool {
        self.tree.link(source.id(), LinkKind::Pool, pool.id())
    }

    pub fn add_office(
        &mut self,
        name: &str,
        provider: Provider<dyn OfficeSource>,
        location: &str,
        properties: PropertyList,
    ) -> OfficeHandle {
        self.tree.add(
            self.floor.id(),
            name,
            OfficeState {
                provider,
                location: location.to_owned(),
                properties,
                auto_wire_objects: false,
                auto_wire_teams: false,
                explorers: Vec::new(),
            },
        )
    }

    /// Sets the office managing `source`'s managed objects.
    pub fn link_managing_office(&mut self, source: ManagedObjectSourceHandle, office: OfficeHandle) -> bool {
        self.tree.link(source.id(), LinkKind::Office, office.id())
    }

    /// Orders `source` to start before `other`.
    pub fn start_before(
        &mut self,
        source: ManagedObjectSourceHandle,
        other: ManagedObjectSourceHandle,
    ) -> bool {
        self.tree.link(source.id(), LinkKind::StartBefore, other.id())
    }

    /// Orders `source` to start after `other`.
    pub fn start_after(
        &mut self,
        source: ManagedObjectSourceHandle,
        other: ManagedObjectSourceHandle,
    ) -> bool {
        self.tree.link(source.id(), LinkKind::StartAfter, other.id())
    }

    pub fn get_office_object(&mut self, office: OfficeHandle, name: &str) -> OfficeObjectHandle {
        self.tree.reference(office.id(), name)
    }

    pub fn get_office_team(&mut self, office: OfficeHandle, name: &str) -> OfficeTeamHandle {
        self.tree.reference(office.id(), name)
    }

    /// Input `input` of the office section `section`, which the office may
    /// not have declared yet.
    pub fn get_office_section_input(
        &mut self,
        office: OfficeHandle,
        section: &str,
        input: &str,
    ) -> SectionInputHandle {
        let section: SectionHandle = self.tree.reference(office.id(), section);
        self.tree.reference(section.id(), input)
    }
}

// ---------------------------------------------------------------------------
// Office
// ---------------------------------------------------------------------------

/// Designer for an office.
pub struct OfficeArchitect<'t> {
    tree: &'t mut NodeTree,
    office: OfficeHandle,
}

impl sealed::Scope for OfficeArchitect<'_> {
    fn tree(&mut self) -> &mut NodeTree {
        self.tree
    }

    fn scope(&self) -> NodeId {
        self.office.id()
    }
}

impl Designer for OfficeArchitect<'_> {}

impl<'t> OfficeArchitect<'t> {
    pub(crate) fn new(tree: &'t mut NodeTree, office: OfficeHandle) -> Self {
        Self { tree, office }
    }

    pub fn enable_auto_wire_objects(&mut self) {
        if let Some(state) = self.tree.state_mut(self.office) {
            state.auto_wire_objects = true;
        }
    }

    pub fn enable_auto_wire_teams(&mut self) {
        if let Some(state) = self.tree.state_mut(self.office) {
            state.auto_wire_teams = true;
        }
    }

    pub fn add_supplier(
        &mut self,
        name: &str,
        provider: Provider<dyn SupplierSource>,
        properties: PropertyList,
    ) -> SupplierHandle {
        add_supplier(self.tree, self.office.id(), name, provider, properties)
    }

    /// Declares an object the office requires of the OfficeFloor.
    pub fn add_office_object(&mut self, name: &str, auto_wire: AutoWire) -> OfficeObjectHandle {
        self.tree
            .add(self.office.id(), name, OfficeObjectState { auto_wire })
    }

    /// Declares a team the office requires of the OfficeFloor.
    pub fn add_office_team(&mut self, name: &str) -> OfficeTeamHandle {
        self.tree
            .add(self.office.id(), name, OfficeTeamState::default())
    }

    pub fn add_office_team_type_qualification(
        &mut self,
        team: OfficeTeamHandle,
        qualifier: Option<&str>,
        type_name: &str,
    ) {
        if let Some(state) = self.tree.state_mut(team) {
            state
                .type_qualifications
                .push(AutoWire::qualified(qualifier, type_name));
        }
    }

    pub fn add_section(
        &mut self,
        name: &str,
        provider: Provider<dyn SectionSource>,
        location: &str,
        properties: PropertyList,
    ) -> SectionHandle {
        add_section(self.tree, self.office.id(), name, provider, location, properties)
    }

    pub fn get_section_input(&mut self, section: SectionHandle, name: &str) -> SectionInputHandle {
        self.tree.reference(section.id(), name)
    }

    pub fn get_section_output(&mut self, section: SectionHandle, name: &str) -> SectionOutputHandle {
        self.tree.reference(section.id(), name)
    }

    pub fn get_section_object(&mut self, section: SectionHandle, name: &str) -> SectionObjectHandle {
        self.tree.reference(section.id(), name)
    }

    /// `section` inherits the links of `super_section`'s outputs for any
    /// output it leaves unlinked.
    pub fn set_super_section(&mut self, section: SectionHandle, super_section: SectionHandle) {
        let descriptor = self.tree.descriptor(section.id());
        match self.tree.state_mut(section) {
            Some(state) if state.super_section.is_none() => {
                state.super_section = Some(super_section.id());
            }
            Some(_) => self.tree.report(
                section.id(),
                format!("{} {} already has a super section", descriptor.kind, descriptor.name),
            ),
            None => self.tree.report(
                section.id(),
                format!("{} {} is not initialised", descriptor.kind, descriptor.name),
            ),
        }
    }

    pub fn add_administration(
        &mut self,
        name: &str,
        provider: Provider<dyn AdministrationSource>,
        properties: PropertyList,
    ) -> AdministrationHandle {
        self.tree.add(
            self.office.id(),
            name,
            AdministrationState {
                provider,
                properties,
                auto_wire_extensions: false,
                administered: Default::default(),
            },
        )
    }

    /// Administers every managed object offering the administration's
    /// extension type.
    pub fn enable_administration_auto_wire(&mut self, administration: AdministrationHandle) {
        if let Some(state) = self.tree.state_mut(administration) {
            state.auto_wire_extensions = true;
        }
    }

    pub fn administer(&mut self, administration: AdministrationHandle, managed_object: ManagedObjectHandle) {
        if let Some(state) = self.tree.state_mut(administration) {
            state.administered.insert(managed_object.id());
        }
    }

    pub fn add_governance(
        &mut self,
        name: &str,
        provider: Provider<dyn GovernanceSource>,
        properties: PropertyList,
    ) -> GovernanceHandle {
        self.tree.add(
            self.office.id(),
            name,
            GovernanceState {
                provider,
                properties,
                auto_wire_extensions: false,
                governed: Default::default(),
            },
        )
    }

    /// Governs every managed object offering the governance's extension type.
    pub fn enable_governance_auto_wire(&mut self, governance: GovernanceHandle) {
        if let Some(state) = self.tree.state_mut(governance) {
            state.auto_wire_extensions = true;
        }
    }

    pub fn govern(&mut self, governance: GovernanceHandle, managed_object: ManagedObjectHandle) {
        if let Some(state) = self.tree.state_mut(governance) {
            state.governed.insert(managed_object.id());
        }
    }

    /// Registers `explorer` to inspect the execution starting at `input`
    /// once the office is fully wired.
    pub fn add_execution_explorer(&mut self, input: SectionInputHandle, explorer: Rc<dyn ExecutionExplorer>) {
        if let Some(state) = self.tree.state_mut(self.office) {
            state.explorers.push((input.id(), explorer));
        }
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Designer for a section.
pub struct SectionDesigner<'t> {
    tree: &'t mut NodeTree,
    section: SectionHandle,
}

impl sealed::Scope for SectionDesigner<'_> {
    fn tree(&mut self) -> &mut NodeTree {
        self.tree
    }

    fn scope(&self) -> NodeId {
        self.section.id()
    }
}

impl Designer for SectionDesigner<'_> {}

impl<'t> SectionDesigner<'t> {
    pub(crate) fn new(tree: &'t mut NodeTree, section: SectionHandle) -> Self {
        Self { tree, section }
    }

    pub fn add_section_input(&mut self, name: &str, parameter_type: Option<&str>) -> SectionInputHandle {
        self.tree.add(
            self.section.id(),
            name,
            SectionInputState {
                parameter_type: parameter_type.map(str::to_owned),
            },
        )
    }

    pub fn add_section_output(
        &mut self,
        name: &str,
        argument_type: Option<&str>,
        escalation_only: bool,
    ) -> SectionOutputHandle {
        self.tree.add(
            self.section.id(),
            name,
            SectionOutputState {
                argument_type: argument_type.map(str::to_owned),
                escalation_only,
            },
        )
    }

    /// Declares an object the section requires of its enclosing scope.
    pub fn add_section_object(&mut self, name: &str, auto_wire: AutoWire) -> SectionObjectHandle {
        self.tree
            .add(self.section.id(), name, SectionObjectState { auto_wire })
    }

    pub fn add_sub_section(
        &mut self,
        name: &str,
        provider: Provider<dyn SectionSource>,
        location: &str,
        properties: PropertyList,
    ) -> SectionHandle {
        add_section(self.tree, self.section.id(), name, provider, location, properties)
    }

    pub fn get_sub_section_input(&mut self, sub_section: SectionHandle, name: &str) -> SectionInputHandle {
        self.tree.reference(sub_section.id(), name)
    }

    pub fn get_sub_section_output(&mut self, sub_section: SectionHandle, name: &str) -> SectionOutputHandle {
        self.tree.reference(sub_section.id(), name)
    }

    pub fn get_sub_section_object(&mut self, sub_section: SectionHandle, name: &str) -> SectionObjectHandle {
        self.tree.reference(sub_section.id(), name)
    }

    pub fn add_function_namespace(
        &mut self,
        name: &str,
        provider: Provider<dyn ManagedFunctionSource>,
        properties: PropertyList,
    ) -> FunctionNamespaceHandle {
        self.tree.add(
            self.section.id(),
            name,
            FunctionNamespaceState { provider, properties },
        )
    }

    /// Adds function `name` implemented by `function_type` of `namespace`.
    ///
    /// The namespace's type is loaded (once) and the function's objects and
    /// flows are created from it.
    pub fn add_function(
        &mut self,
        namespace: FunctionNamespaceHandle,
        name: &str,
        function_type: &str,
    ) -> FunctionHandle {
        let before = self.tree.issues.len();
        let function = self.tree.add(
            self.section.id(),
            name,
            FunctionState {
                namespace: namespace.id(),
                function_type: function_type.to_owned(),
            },
        );
        if self.tree.issues.len() > before {
            // Duplicate; the first declaration keeps its objects and flows.
            return function;
        }
        let Some(namespace_type) = self.tree.function_namespace_type(namespace) else {
            return function;
        };
        let Some(signature) = namespace_type.function(function_type) else {
            let descriptor = self.tree.descriptor(namespace.id());
            self.tree.report(
                namespace.id(),
                format!(
                    "{} {} has no function type '{function_type}'",
                    descriptor.kind, descriptor.name
                ),
            );
            return function;
        };

        for object in &signature.objects {
            self.tree
                .materialise(function.id(), &object.name, || FunctionObjectState {
                    auto_wire: object.auto_wire.clone(),
                    is_parameter: object.is_parameter,
                });
        }
        for flow in &signature.flows {
            self.tree
                .materialise(function.id(), &flow.name, || FunctionFlowState {
                    argument_type: flow.argument_type.clone(),
                    spawn: false,
                });
        }
        debug!(
            function = %self.tree.qualified_name(function.id()),
            objects = signature.objects.len(),
            flows = signature.flows.len(),
            "added function"
        );
        function
    }

    pub fn get_function_object(&mut self, function: FunctionHandle, name: &str) -> FunctionObjectHandle {
        self.tree.reference(function.id(), name)
    }

    pub fn get_function_flow(&mut self, function: FunctionHandle, name: &str) -> FunctionFlowHandle {
        self.tree.reference(function.id(), name)
    }

    /// Invokes `flow` on a new thread state.
    pub fn spawn_thread_state(&mut self, flow: FunctionFlowHandle) {
        if let Some(state) = self.tree.state_mut(flow) {
            state.spawn = true;
        }
    }
}
