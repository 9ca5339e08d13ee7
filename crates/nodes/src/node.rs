//! The structural node and its per-kind configuration state.
//!
//! Every element of the OfficeFloor tree is a [`StructuralNode`]. What
//! distinguishes a section from a team is the [`NodeState`] variant it
//! carries; the variant is fixed at creation from the node's kind and starts
//! out empty (the node is referenced but not yet configured).

use std::collections::BTreeSet;
use std::rc::Rc;

use graph::types::SuppliedManagedObjectSourceType;
use graph::{
    AdministrationSource, AutoWire, GovernanceSource, LinkSlots, ManagedFunctionSource,
    ManagedObjectPoolSource, ManagedObjectScope, ManagedObjectSource, Node, NodeId, NodeKind,
    NodePlacement, PropertyList, Provider, SupplierSource, TeamSource,
};

use crate::explore::ExecutionExplorer;
use crate::providers::{OfficeFloorSource, OfficeSource, SectionSource};

// ---------------------------------------------------------------------------
// Per-kind state
// ---------------------------------------------------------------------------

pub struct OfficeFloorState {
    pub(crate) provider: Provider<dyn OfficeFloorSource>,
    pub(crate) properties: PropertyList,
    pub(crate) auto_wire_objects: bool,
    pub(crate) auto_wire_teams: bool,
}

pub struct OfficeState {
    pub(crate) provider: Provider<dyn OfficeSource>,
    pub(crate) location: String,
    pub(crate) properties: PropertyList,
    pub(crate) auto_wire_objects: bool,
    pub(crate) auto_wire_teams: bool,
    /// Explorers keyed by the office section input they start from.
    pub(crate) explorers: Vec<(NodeId, Rc<dyn ExecutionExplorer>)>,
}

pub struct SectionState {
    pub(crate) provider: Provider<dyn SectionSource>,
    pub(crate) location: String,
    pub(crate) properties: PropertyList,
    /// Section this one inherits unlinked outputs from.
    pub(crate) super_section: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SectionInputState {
    pub(crate) parameter_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SectionOutputState {
    pub(crate) argument_type: Option<String>,
    pub(crate) escalation_only: bool,
}

#[derive(Debug, Clone)]
pub struct SectionObjectState {
    pub(crate) auto_wire: AutoWire,
}

pub struct FunctionNamespaceState {
    pub(crate) provider: Provider<dyn ManagedFunctionSource>,
    pub(crate) properties: PropertyList,
}

#[derive(Debug, Clone)]
pub struct FunctionState {
    pub(crate) namespace: NodeId,
    /// Name of the function within its namespace's type.
    pub(crate) function_type: String,
}

#[derive(Debug, Clone)]
pub struct FunctionObjectState {
    pub(crate) auto_wire: AutoWire,
    pub(crate) is_parameter: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionFlowState {
    pub(crate) argument_type: Option<String>,
    pub(crate) spawn: bool,
}

pub struct ManagedObjectSourceState {
    pub(crate) provider: Provider<dyn ManagedObjectSource>,
    pub(crate) properties: PropertyList,
    pub(crate) timeout: Option<u64>,
    /// Supplied entry this source was materialised from by auto-wiring.
    pub(crate) supplied_by: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ManagedObjectState {
    pub(crate) source: NodeId,
    pub(crate) scope: ManagedObjectScope,
    /// Auto-wires this managed object is offered under. Empty means its
    /// object type, unqualified.
    pub(crate) type_qualifications: Vec<AutoWire>,
}

#[derive(Debug, Clone)]
pub struct ManagedObjectDependencyState {
    pub(crate) auto_wire: AutoWire,
}

#[derive(Debug, Clone, Default)]
pub struct ManagedObjectFlowState {
    pub(crate) argument_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ManagedObjectTeamState;

pub struct PoolState {
    pub(crate) provider: Provider<dyn ManagedObjectPoolSource>,
    pub(crate) properties: PropertyList,
}

pub struct TeamState {
    pub(crate) provider: Provider<dyn TeamSource>,
    pub(crate) properties: PropertyList,
    pub(crate) size: usize,
    pub(crate) type_qualifications: Vec<AutoWire>,
}

#[derive(Debug, Clone)]
pub struct OfficeObjectState {
    pub(crate) auto_wire: AutoWire,
}

#[derive(Debug, Clone, Default)]
pub struct OfficeTeamState {
    pub(crate) type_qualifications: Vec<AutoWire>,
}

pub struct AdministrationState {
    pub(crate) provider: Provider<dyn AdministrationSource>,
    pub(crate) properties: PropertyList,
    pub(crate) auto_wire_extensions: bool,
    pub(crate) administered: BTreeSet<NodeId>,
}

pub struct GovernanceState {
    pub(crate) provider: Provider<dyn GovernanceSource>,
    pub(crate) properties: PropertyList,
    pub(crate) auto_wire_extensions: bool,
    pub(crate) governed: BTreeSet<NodeId>,
}

pub struct SupplierState {
    pub(crate) provider: Provider<dyn SupplierSource>,
    pub(crate) properties: PropertyList,
}

#[derive(Debug, Clone)]
pub struct SuppliedManagedObjectSourceState {
    pub(crate) supplied: SuppliedManagedObjectSourceType,
}

// ---------------------------------------------------------------------------
// Tagged state
// ---------------------------------------------------------------------------

/// State type belonging to exactly one [`NodeKind`].
pub trait KindState: Sized + 'static {
    const KIND: NodeKind;

    fn slot(state: &NodeState) -> Option<&Option<Self>>;

    fn slot_mut(state: &mut NodeState) -> Option<&mut Option<Self>>;
}

macro_rules! node_states {
    ($($kind:ident => $state:ident),* $(,)?) => {
        /// Configuration of a node, tagged by kind. `None` until initialised.
        pub enum NodeState {
            $($kind(Option<$state>),)*
        }

        impl NodeState {
            pub(crate) fn empty(kind: NodeKind) -> Self {
                match kind {
                    $(NodeKind::$kind => Self::$kind(None),)*
                }
            }

            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Self::$kind(_) => NodeKind::$kind,)*
                }
            }

            pub fn is_initialised(&self) -> bool {
                match self {
                    $(Self::$kind(state) => state.is_some(),)*
                }
            }
        }

        $(
            impl KindState for $state {
                const KIND: NodeKind = NodeKind::$kind;

                fn slot(state: &NodeState) -> Option<&Option<Self>> {
                    match state {
                        NodeState::$kind(slot) => Some(slot),
                        _ => None,
                    }
                }

                fn slot_mut(state: &mut NodeState) -> Option<&mut Option<Self>> {
                    match state {
                        NodeState::$kind(slot) => Some(slot),
                        _ => None,
                    }
                }
            }
        )*
    };
}

node_states! {
    OfficeFloor => OfficeFloorState,
    Office => OfficeState,
    Section => SectionState,
    SectionInput => SectionInputState,
    SectionOutput => SectionOutputState,
    SectionObject => SectionObjectState,
    FunctionNamespace => FunctionNamespaceState,
    Function => FunctionState,
    FunctionObject => FunctionObjectState,
    FunctionFlow => FunctionFlowState,
    ManagedObjectSource => ManagedObjectSourceState,
    ManagedObject => ManagedObjectState,
    ManagedObjectDependency => ManagedObjectDependencyState,
    ManagedObjectFlow => ManagedObjectFlowState,
    ManagedObjectTeam => ManagedObjectTeamState,
    ManagedObjectPool => PoolState,
    Team => TeamState,
    OfficeObject => OfficeObjectState,
    OfficeTeam => OfficeTeamState,
    Administration => AdministrationState,
    Governance => GovernanceState,
    Supplier => SupplierState,
    SuppliedManagedObjectSource => SuppliedManagedObjectSourceState,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node of the OfficeFloor tree.
pub struct StructuralNode {
    name: String,
    qualified_name: String,
    parent: Option<NodeId>,
    links: LinkSlots,
    state: NodeState,
}

impl StructuralNode {
    pub(crate) fn placed(placement: NodePlacement) -> Self {
        Self {
            name: placement.name,
            qualified_name: placement.qualified_name,
            parent: Some(placement.parent),
            links: LinkSlots::new(),
            state: NodeState::empty(placement.kind),
        }
    }

    pub(crate) fn root(name: &str, state: OfficeFloorState) -> Self {
        Self {
            name: name.to_owned(),
            qualified_name: name.to_owned(),
            parent: None,
            links: LinkSlots::new(),
            state: NodeState::OfficeFloor(Some(state)),
        }
    }

    /// Configured state, `None` while uninitialised or if `S` is not this
    /// node's kind.
    pub fn state<S: KindState>(&self) -> Option<&S> {
        S::slot(&self.state).and_then(Option::as_ref)
    }

    pub(crate) fn state_mut<S: KindState>(&mut self) -> Option<&mut S> {
        S::slot_mut(&mut self.state).and_then(Option::as_mut)
    }

    /// The state slot for this node's kind.
    ///
    /// # Panics
    ///
    /// Panics if `S` belongs to another kind. Handles are typed by state, so
    /// this only happens if a raw id is paired with the wrong state type.
    pub(crate) fn slot_mut<S: KindState>(&mut self) -> &mut Option<S> {
        let kind = self.state.kind();
        match S::slot_mut(&mut self.state) {
            Some(slot) => slot,
            None => panic!("{kind} {} has no {} state", self.qualified_name, S::KIND),
        }
    }
}

impl Node for StructuralNode {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn node_kind(&self) -> NodeKind {
        self.state.kind()
    }

    fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    fn is_initialised(&self) -> bool {
        self.state.is_initialised()
    }

    fn links(&self) -> &LinkSlots {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkSlots {
        &mut self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::NodeArena;

    #[test]
    fn empty_state_matches_kind() {
        let kinds = [
            NodeKind::Office,
            NodeKind::SectionOutput,
            NodeKind::ManagedObjectTeam,
            NodeKind::SuppliedManagedObjectSource,
        ];
        for kind in kinds {
            let state = NodeState::empty(kind);
            assert_eq!(state.kind(), kind);
            assert!(!state.is_initialised());
        }
    }

    #[test]
    fn state_is_visible_once_initialised() {
        let mut arena: NodeArena<StructuralNode> = NodeArena::new();
        let root = arena.insert_root(StructuralNode::root(
            "OfficeFloor",
            OfficeFloorState {
                provider: Provider::Named(graph::ProviderName::new("floor").unwrap()),
                properties: PropertyList::new(),
                auto_wire_objects: false,
                auto_wire_teams: false,
            },
        ));
        let team = arena.get_or_create(root, NodeKind::OfficeTeam, "T", StructuralNode::placed);

        assert!(arena.get(team).state::<OfficeTeamState>().is_none());
        *arena.get_mut(team).slot_mut::<OfficeTeamState>() = Some(OfficeTeamState::default());

        assert!(arena.get(team).is_initialised());
        assert!(arena.get(team).state::<OfficeTeamState>().is_some());
        assert!(arena.get(team).state::<TeamState>().is_none());
    }
}
