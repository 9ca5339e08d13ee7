//! The per-compile node tree.
//!
//! [`NodeTree`] owns everything one compile touches: the node arena, the
//! type caches, the issue log, and shared handles to the providers, the type
//! resolver and the configuration. Stages and designers operate on it by
//! `&mut`; nothing outlives the compile.

use std::rc::Rc;

use graph::types::{
    AdministrationType, FunctionNamespaceType, GovernanceType, ManagedObjectPoolType,
    ManagedObjectType, SupplierType, TeamType,
};
use graph::{
    AutoWire, CompileContext, CompileId, CompilerIssue, CompilerIssues, IssueLog, LinkKind, Node,
    NodeArena, NodeDescriptor, NodeId, NodeKind, PropertyList, Provider, ProviderTable,
    SourceContext, SourceError, TypeCache, TypeResolver,
};

use crate::config::CompilerConfig;
use crate::handles::{
    AdministrationHandle, FunctionNamespaceHandle, GovernanceHandle, Handle, ManagedObjectHandle,
    ManagedObjectSourceHandle, OfficeFloorHandle, OfficeHandle, PoolHandle, SupplierHandle,
    TeamHandle,
};
use crate::node::{
    AdministrationState, FunctionNamespaceState, GovernanceState, KindState,
    ManagedObjectSourceState, ManagedObjectState, OfficeFloorState, PoolState, StructuralNode,
    SupplierState, TeamState,
};
use crate::providers::Providers;

/// All state of a single compile.
pub struct NodeTree {
    pub(crate) arena: NodeArena<StructuralNode>,
    pub(crate) context: CompileContext,
    pub(crate) issues: IssueLog,
    pub(crate) providers: Rc<Providers>,
    pub(crate) types: Rc<dyn TypeResolver>,
    pub(crate) config: Rc<CompilerConfig>,
    root: OfficeFloorHandle,
}

impl NodeTree {
    pub(crate) fn new(
        name: &str,
        floor: OfficeFloorState,
        providers: Rc<Providers>,
        types: Rc<dyn TypeResolver>,
        config: Rc<CompilerConfig>,
        compile_id: CompileId,
    ) -> Self {
        let mut arena = NodeArena::new();
        let root = Handle::new(arena.insert_root(StructuralNode::root(name, floor)));
        Self {
            arena,
            context: CompileContext::new(compile_id),
            issues: IssueLog::new(),
            providers,
            types,
            config,
            root,
        }
    }

    pub fn root(&self) -> OfficeFloorHandle {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &StructuralNode {
        self.arena.get(id)
    }

    pub fn qualified_name(&self, id: NodeId) -> &str {
        self.arena.get(id).qualified_name()
    }

    pub(crate) fn descriptor(&self, id: NodeId) -> NodeDescriptor {
        self.arena.get(id).descriptor()
    }

    pub(crate) fn report(&mut self, id: NodeId, message: String) {
        let descriptor = self.descriptor(id);
        self.issues.report(&descriptor, message);
    }

    // -----------------------------------------------------------------------
    // State access
    // -----------------------------------------------------------------------

    pub(crate) fn state<S: KindState>(&self, handle: Handle<S>) -> Option<&S> {
        self.arena.get(handle.id()).state()
    }

    pub(crate) fn state_mut<S: KindState>(&mut self, handle: Handle<S>) -> Option<&mut S> {
        self.arena.get_mut(handle.id()).state_mut()
    }

    // -----------------------------------------------------------------------
    // Children
    // -----------------------------------------------------------------------

    /// The `S` child of `owner` named `name`, created uninitialised if it
    /// has not been declared yet.
    pub(crate) fn reference<S: KindState>(&mut self, owner: NodeId, name: &str) -> Handle<S> {
        Handle::new(
            self.arena
                .get_or_create(owner, S::KIND, name, StructuralNode::placed),
        )
    }

    /// Declares the `S` child of `owner` named `name`.
    ///
    /// Declaring the same child twice raises an "already added" issue and
    /// keeps the first declaration.
    pub(crate) fn add<S: KindState>(&mut self, owner: NodeId, name: &str, state: S) -> Handle<S> {
        let id = self.arena.get_or_create_initialised(
            owner,
            S::KIND,
            name,
            &mut self.issues,
            StructuralNode::placed,
            |node| *node.slot_mut::<S>() = Some(state),
        );
        Handle::new(id)
    }

    /// Initialises the `S` child of `owner` named `name` from a loaded type.
    ///
    /// A child already referenced by a designer is initialised in place; one
    /// already initialised is left alone.
    pub(crate) fn materialise<S: KindState>(
        &mut self,
        owner: NodeId,
        name: &str,
        create: impl FnOnce() -> S,
    ) -> Handle<S> {
        let handle = self.reference::<S>(owner, name);
        let slot = self.arena.get_mut(handle.id()).slot_mut::<S>();
        if slot.is_none() {
            *slot = Some(create());
        }
        handle
    }

    /// Every `S` child of `owner`, in name order.
    pub(crate) fn registered<S: KindState>(&self, owner: NodeId) -> Vec<Handle<S>> {
        self.arena
            .registered(owner, S::KIND)
            .map(Handle::new)
            .collect()
    }

    pub(crate) fn link(&mut self, source: NodeId, kind: LinkKind, target: NodeId) -> bool {
        graph::link(&mut self.arena, source, kind, target, &mut self.issues)
    }

    pub(crate) fn is_linked(&self, source: NodeId, kind: LinkKind) -> bool {
        self.arena.get(source).links().linked(kind).is_some()
    }

    /// The office `id` belongs to, if any.
    pub(crate) fn office_of(&self, id: NodeId) -> Option<OfficeHandle> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.arena.get(node).node_kind() == NodeKind::Office {
                return Some(Handle::new(node));
            }
            current = self.arena.get(node).parent();
        }
        None
    }

    // -----------------------------------------------------------------------
    // Providers
    // -----------------------------------------------------------------------

    /// Declared properties of `id` with configured overrides applied.
    pub(crate) fn properties(&self, id: NodeId, declared: &PropertyList) -> PropertyList {
        effective_properties(&self.config, self.arena.get(id), declared)
    }

    pub(crate) fn source_context(
        &self,
        id: NodeId,
        declared: &PropertyList,
        location: Option<&str>,
    ) -> SourceContext {
        source_context(&self.config, self.arena.get(id), declared, location)
    }

    /// Resolves `provider`, raising an issue against `id` on failure.
    pub(crate) fn instantiate<P: ?Sized>(
        &mut self,
        id: NodeId,
        provider: &Provider<P>,
        table: impl FnOnce(&Providers) -> &ProviderTable<P>,
    ) -> Option<Rc<P>> {
        let providers = Rc::clone(&self.providers);
        match provider.resolve(table(&providers)) {
            Ok(instance) => Some(instance),
            Err(err) => {
                self.report_source_error(id, provider.label(), err);
                None
            }
        }
    }

    pub(crate) fn report_source_error(&mut self, id: NodeId, provider: &str, error: SourceError) {
        let descriptor = self.descriptor(id);
        report_source_error(&mut self.issues, &descriptor, provider, error);
    }

    // -----------------------------------------------------------------------
    // Type loading (memoised per node)
    // -----------------------------------------------------------------------

    pub(crate) fn managed_object_type(
        &mut self,
        source: ManagedObjectSourceHandle,
    ) -> Option<Rc<ManagedObjectType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.managed_object_types,
            source.id(),
            &self.providers.managed_object_sources,
            |state: &ManagedObjectSourceState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    /// Type of the source behind `managed_object`.
    pub(crate) fn managed_object_type_of(
        &mut self,
        managed_object: ManagedObjectHandle,
    ) -> Option<Rc<ManagedObjectType>> {
        let source = self.state(managed_object)?.source;
        self.managed_object_type(Handle::new(source))
    }

    pub(crate) fn team_type(&mut self, team: TeamHandle) -> Option<Rc<TeamType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.team_types,
            team.id(),
            &self.providers.teams,
            |state: &TeamState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    pub(crate) fn pool_type(&mut self, pool: PoolHandle) -> Option<Rc<ManagedObjectPoolType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.pool_types,
            pool.id(),
            &self.providers.pools,
            |state: &PoolState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    pub(crate) fn administration_type(
        &mut self,
        administration: AdministrationHandle,
    ) -> Option<Rc<AdministrationType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.administration_types,
            administration.id(),
            &self.providers.administrations,
            |state: &AdministrationState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    pub(crate) fn governance_type(
        &mut self,
        governance: GovernanceHandle,
    ) -> Option<Rc<GovernanceType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.governance_types,
            governance.id(),
            &self.providers.governances,
            |state: &GovernanceState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    pub(crate) fn function_namespace_type(
        &mut self,
        namespace: FunctionNamespaceHandle,
    ) -> Option<Rc<FunctionNamespaceType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.function_namespace_types,
            namespace.id(),
            &self.providers.function_namespaces,
            |state: &FunctionNamespaceState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    pub(crate) fn supplier_type(&mut self, supplier: SupplierHandle) -> Option<Rc<SupplierType>> {
        load_type(
            &self.arena,
            &mut self.issues,
            &self.config,
            &mut self.context.supplier_types,
            supplier.id(),
            &self.providers.suppliers,
            |state: &SupplierState| (&state.provider, &state.properties),
            |provider, context| provider.load_type(context),
        )
    }

    /// Auto-wires a managed object is offered under: its type
    /// qualifications, or its object type when it has none.
    pub(crate) fn managed_object_auto_wires(&mut self, managed_object: ManagedObjectHandle) -> Vec<AutoWire> {
        let qualifications = self
            .state(managed_object)
            .map(|state| state.type_qualifications.clone())
            .unwrap_or_default();
        if !qualifications.is_empty() {
            return qualifications;
        }
        self.managed_object_type_of(managed_object)
            .map(|loaded| vec![AutoWire::new(loaded.object_type.clone())])
            .unwrap_or_default()
    }
}

fn effective_properties(
    config: &CompilerConfig,
    node: &StructuralNode,
    declared: &PropertyList,
) -> PropertyList {
    match config.overrides_for(node.qualified_name()) {
        Some(overrides) => declared.overridden_by(overrides),
        None => declared.clone(),
    }
}

fn source_context(
    config: &CompilerConfig,
    node: &StructuralNode,
    declared: &PropertyList,
    location: Option<&str>,
) -> SourceContext {
    let context = SourceContext::new(node.node_name(), effective_properties(config, node, declared));
    match location {
        Some(location) => context.with_location(location),
        None => context,
    }
}

/// Translates a provider failure into an issue against `node`.
pub(crate) fn report_source_error(
    issues: &mut dyn CompilerIssues,
    node: &NodeDescriptor,
    provider: &str,
    error: SourceError,
) {
    match error {
        SourceError::AlreadyReported => {}
        SourceError::Other(cause) => issues.add_issue(
            CompilerIssue::new(
                node,
                format!("Failed to source {} {} (source={provider})", node.kind, node.name),
            )
            .with_cause(&*cause),
        ),
        structured => issues.report(node, structured.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn load_type<S, P, V>(
    arena: &NodeArena<StructuralNode>,
    issues: &mut IssueLog,
    config: &CompilerConfig,
    cache: &mut TypeCache<V>,
    id: NodeId,
    table: &ProviderTable<P>,
    parts: impl FnOnce(&S) -> (&Provider<P>, &PropertyList),
    load: impl FnOnce(&P, &SourceContext) -> Result<V, SourceError>,
) -> Option<Rc<V>>
where
    S: KindState,
    P: ?Sized,
{
    cache.get_or_load(id, || {
        let node = arena.get(id);
        let (provider, declared) = parts(node.state::<S>()?);
        let context = source_context(config, node, declared, None);
        match provider
            .resolve(table)
            .and_then(|instance| load(&*instance, &context))
        {
            Ok(loaded) => Some(loaded),
            Err(err) => {
                report_source_error(issues, &node.descriptor(), provider.label(), err);
                None
            }
        }
    })
}
