//! Hand-built node trees for stage tests.

use std::rc::Rc;

use graph::{
    AutoWire, CompileId, ManagedObjectScope, ManagedObjectSource, PropertyList, Provider,
    ProviderName, TypeHierarchy,
};

use crate::config::CompilerConfig;
use crate::handles::{
    Handle, ManagedObjectHandle, ManagedObjectSourceHandle, OfficeHandle, SectionHandle,
    SectionInputHandle, SectionObjectHandle, SectionOutputHandle,
};
use crate::node::{
    KindState, ManagedObjectSourceState, ManagedObjectState, OfficeFloorState, OfficeState,
    SectionInputState, SectionObjectState, SectionOutputState, SectionState,
};
use crate::providers::Providers;
use crate::tree::NodeTree;

fn named<T: ?Sized>(name: &str) -> Provider<T> {
    Provider::Named(ProviderName::new(name).expect("provider name"))
}

pub(crate) struct TestTree {
    pub(crate) tree: NodeTree,
}

impl TestTree {
    pub(crate) fn new() -> Self {
        Self::with(Providers::new(), TypeHierarchy::new(), CompilerConfig::default())
    }

    pub(crate) fn with(providers: Providers, types: TypeHierarchy, config: CompilerConfig) -> Self {
        let floor = OfficeFloorState {
            provider: named("floor"),
            properties: PropertyList::new(),
            auto_wire_objects: false,
            auto_wire_teams: false,
        };
        Self {
            tree: NodeTree::new(
                "OfficeFloor",
                floor,
                Rc::new(providers),
                Rc::new(types),
                Rc::new(config),
                CompileId::new_random(),
            ),
        }
    }

    pub(crate) fn office(&mut self, name: &str) -> OfficeHandle {
        let root = self.tree.root().id();
        self.tree.add(
            root,
            name,
            OfficeState {
                provider: named("office"),
                location: name.to_owned(),
                properties: PropertyList::new(),
                auto_wire_objects: false,
                auto_wire_teams: false,
                explorers: Vec::new(),
            },
        )
    }

    pub(crate) fn section<S: KindState>(&mut self, owner: Handle<S>, name: &str) -> SectionHandle {
        self.tree.add(
            owner.id(),
            name,
            SectionState {
                provider: named("section"),
                location: name.to_owned(),
                properties: PropertyList::new(),
                super_section: None,
            },
        )
    }

    pub(crate) fn set_super(&mut self, section: SectionHandle, super_section: SectionHandle) {
        if let Some(state) = self.tree.state_mut(section) {
            state.super_section = Some(super_section.id());
        }
    }

    pub(crate) fn input(&mut self, section: SectionHandle, name: &str) -> SectionInputHandle {
        self.tree.add(section.id(), name, SectionInputState::default())
    }

    pub(crate) fn output(&mut self, section: SectionHandle, name: &str) -> SectionOutputHandle {
        self.tree.add(section.id(), name, SectionOutputState::default())
    }

    pub(crate) fn section_object(
        &mut self,
        section: SectionHandle,
        name: &str,
        auto_wire: AutoWire,
    ) -> SectionObjectHandle {
        self.tree.add(section.id(), name, SectionObjectState { auto_wire })
    }

    /// Managed object source plus managed object of the same name, both
    /// under `owner`, backed by `source`.
    pub(crate) fn managed_object<S: KindState>(
        &mut self,
        owner: Handle<S>,
        name: &str,
        source: Rc<dyn ManagedObjectSource>,
    ) -> (ManagedObjectSourceHandle, ManagedObjectHandle) {
        let mos = self.tree.add(
            owner.id(),
            name,
            ManagedObjectSourceState {
                provider: Provider::instance(name, source),
                properties: PropertyList::new(),
                timeout: None,
                supplied_by: None,
            },
        );
        let mo = self.tree.add(
            owner.id(),
            name,
            ManagedObjectState {
                source: mos.id(),
                scope: ManagedObjectScope::Thread,
                type_qualifications: Vec::new(),
            },
        );
        (mos, mo)
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.tree
            .issues
            .iter()
            .map(|issue| issue.message.clone())
            .collect()
    }
}
