//! Typed node handles and link capabilities.
//!
//! A [`Handle`] is a [`NodeId`] tagged with the state type of the node it
//! names, so designer operations only accept nodes of the right kind and
//! links between incompatible kinds do not compile.

use std::fmt;
use std::marker::PhantomData;

use graph::NodeId;

use crate::node::{
    AdministrationState, FunctionFlowState, FunctionNamespaceState, FunctionObjectState,
    FunctionState, GovernanceState, KindState, ManagedObjectDependencyState,
    ManagedObjectFlowState, ManagedObjectSourceState, ManagedObjectState, ManagedObjectTeamState,
    OfficeFloorState, OfficeObjectState, OfficeState, OfficeTeamState, PoolState,
    SectionInputState, SectionObjectState, SectionOutputState, SectionState, SupplierState,
    TeamState,
};

/// Reference to a node whose state is `S`.
pub struct Handle<S> {
    id: NodeId,
    _state: PhantomData<fn() -> S>,
}

impl<S: KindState> Handle<S> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _state: PhantomData,
        }
    }

    pub fn id(self) -> NodeId {
        self.id
    }
}

impl<S> Clone for Handle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Handle<S> {}

impl<S> PartialEq for Handle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<S> Eq for Handle<S> {}

impl<S: KindState> fmt::Debug for Handle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", S::KIND, self.id)
    }
}

pub type OfficeFloorHandle = Handle<OfficeFloorState>;
pub type OfficeHandle = Handle<OfficeState>;
pub type SectionHandle = Handle<SectionState>;
pub type SectionInputHandle = Handle<SectionInputState>;
pub type SectionOutputHandle = Handle<SectionOutputState>;
pub type SectionObjectHandle = Handle<SectionObjectState>;
pub type FunctionNamespaceHandle = Handle<FunctionNamespaceState>;
pub type FunctionHandle = Handle<FunctionState>;
pub type FunctionObjectHandle = Handle<FunctionObjectState>;
pub type FunctionFlowHandle = Handle<FunctionFlowState>;
pub type ManagedObjectSourceHandle = Handle<ManagedObjectSourceState>;
pub type ManagedObjectHandle = Handle<ManagedObjectState>;
pub type ManagedObjectDependencyHandle = Handle<ManagedObjectDependencyState>;
pub type ManagedObjectFlowHandle = Handle<ManagedObjectFlowState>;
pub type ManagedObjectTeamHandle = Handle<ManagedObjectTeamState>;
pub type PoolHandle = Handle<PoolState>;
pub type TeamHandle = Handle<TeamState>;
pub type OfficeObjectHandle = Handle<OfficeObjectState>;
pub type OfficeTeamHandle = Handle<OfficeTeamState>;
pub type AdministrationHandle = Handle<AdministrationState>;
pub type GovernanceHandle = Handle<GovernanceState>;
pub type SupplierHandle = Handle<SupplierState>;

// ---------------------------------------------------------------------------
// Link capabilities
// ---------------------------------------------------------------------------

/// Owns an object link slot.
pub trait LinksObject: KindState {}
/// May be the target of an object link.
pub trait ProvidesObject: KindState {}
/// Owns a flow link slot.
pub trait LinksFlow: KindState {}
/// May be the target of a flow link.
pub trait ReceivesFlow: KindState {}
/// Owns a team link slot.
pub trait LinksTeam: KindState {}
/// May be the target of a team link.
pub trait ProvidesTeam: KindState {}

impl LinksObject for SectionObjectState {}
impl LinksObject for FunctionObjectState {}
impl LinksObject for ManagedObjectDependencyState {}
impl LinksObject for OfficeObjectState {}

impl ProvidesObject for ManagedObjectState {}
impl ProvidesObject for OfficeObjectState {}
impl ProvidesObject for SectionObjectState {}

impl LinksFlow for SectionInputState {}
impl LinksFlow for SectionOutputState {}
impl LinksFlow for FunctionFlowState {}
impl LinksFlow for ManagedObjectFlowState {}

impl ReceivesFlow for FunctionState {}
impl ReceivesFlow for SectionInputState {}
impl ReceivesFlow for SectionOutputState {}

impl LinksTeam for FunctionState {}
impl LinksTeam for ManagedObjectTeamState {}
impl LinksTeam for OfficeTeamState {}

impl ProvidesTeam for TeamState {}
impl ProvidesTeam for OfficeTeamState {}
