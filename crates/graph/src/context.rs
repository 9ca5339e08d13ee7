//! Per-compile state shared by every node.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::types::{
    AdministrationType, FunctionNamespaceType, GovernanceType, ManagedObjectPoolType,
    ManagedObjectType, SupplierType, TeamType,
};
use crate::{CompileId, NodeId, Timestamp};

/// Memoised loads of one type category, keyed by the node that loaded them.
///
/// A failed load is cached too: the loader runs at most once per node, so an
/// issue raised by a failing loader is raised once however often the type is
/// asked for.
#[derive(Debug)]
pub struct TypeCache<V> {
    loaded: HashMap<NodeId, Option<Rc<V>>>,
}

impl<V> Default for TypeCache<V> {
    fn default() -> Self {
        Self {
            loaded: HashMap::new(),
        }
    }
}

impl<V> TypeCache<V> {
    /// Returns the cached type for `node`, running `loader` on first request.
    pub fn get_or_load(&mut self, node: NodeId, loader: impl FnOnce() -> Option<V>) -> Option<Rc<V>> {
        if let Some(cached) = self.loaded.get(&node) {
            return cached.clone();
        }
        trace!(%node, "loading type");
        let loaded = loader().map(Rc::new);
        self.loaded.insert(node, loaded.clone());
        loaded
    }

    /// The cached type for `node`, without loading.
    pub fn cached(&self, node: NodeId) -> Option<Rc<V>> {
        self.loaded.get(&node).cloned().flatten()
    }

    /// Whether a load (successful or not) has been attempted for `node`.
    pub fn is_loaded(&self, node: NodeId) -> bool {
        self.loaded.contains_key(&node)
    }
}

/// Shared compile context: one type cache per category plus the compile's
/// identity.
///
/// Created once per compile by the driver and passed to every node
/// operation that loads a type.
#[derive(Debug)]
pub struct CompileContext {
    compile_id: CompileId,
    started: Timestamp,
    pub managed_object_types: TypeCache<ManagedObjectType>,
    pub team_types: TypeCache<TeamType>,
    pub pool_types: TypeCache<ManagedObjectPoolType>,
    pub administration_types: TypeCache<AdministrationType>,
    pub governance_types: TypeCache<GovernanceType>,
    pub function_namespace_types: TypeCache<FunctionNamespaceType>,
    pub supplier_types: TypeCache<SupplierType>,
}

impl CompileContext {
    pub fn new(compile_id: CompileId) -> Self {
        Self {
            compile_id,
            started: Timestamp::now(),
            managed_object_types: TypeCache::default(),
            team_types: TypeCache::default(),
            pool_types: TypeCache::default(),
            administration_types: TypeCache::default(),
            governance_types: TypeCache::default(),
            function_namespace_types: TypeCache::default(),
            supplier_types: TypeCache::default(),
        }
    }

    pub fn compile_id(&self) -> CompileId {
        self.compile_id
    }

    pub fn started(&self) -> Timestamp {
        self.started
    }
}
