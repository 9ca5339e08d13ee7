//! Structural source providers and the provider registry.

use graph::{
    AdministrationSource, GovernanceSource, ManagedFunctionSource, ManagedObjectPoolSource,
    ManagedObjectSource, NodeKind, ProviderTable, SourceContext, SourceError, SupplierSource,
    TeamSource,
};

use crate::architect::{OfficeArchitect, OfficeFloorDeployer, SectionDesigner};

/// Populates the OfficeFloor through its deployer.
pub trait OfficeFloorSource {
    fn source_office_floor(
        &self,
        deployer: &mut OfficeFloorDeployer<'_>,
        context: &SourceContext,
    ) -> Result<(), SourceError>;
}

/// Populates an office through its architect.
pub trait OfficeSource {
    fn source_office(
        &self,
        architect: &mut OfficeArchitect<'_>,
        context: &SourceContext,
    ) -> Result<(), SourceError>;
}

/// Populates a section through its designer.
pub trait SectionSource {
    fn source_section(
        &self,
        designer: &mut SectionDesigner<'_>,
        context: &SourceContext,
    ) -> Result<(), SourceError>;
}

/// Every provider factory available to a compile, one table per category.
pub struct Providers {
    pub office_floors: ProviderTable<dyn OfficeFloorSource>,
    pub offices: ProviderTable<dyn OfficeSource>,
    pub sections: ProviderTable<dyn SectionSource>,
    pub managed_object_sources: ProviderTable<dyn ManagedObjectSource>,
    pub teams: ProviderTable<dyn TeamSource>,
    pub pools: ProviderTable<dyn ManagedObjectPoolSource>,
    pub administrations: ProviderTable<dyn AdministrationSource>,
    pub governances: ProviderTable<dyn GovernanceSource>,
    pub function_namespaces: ProviderTable<dyn ManagedFunctionSource>,
    pub suppliers: ProviderTable<dyn SupplierSource>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            office_floors: ProviderTable::new(NodeKind::OfficeFloor),
            offices: ProviderTable::new(NodeKind::Office),
            sections: ProviderTable::new(NodeKind::Section),
            managed_object_sources: ProviderTable::new(NodeKind::ManagedObjectSource),
            teams: ProviderTable::new(NodeKind::Team),
            pools: ProviderTable::new(NodeKind::ManagedObjectPool),
            administrations: ProviderTable::new(NodeKind::Administration),
            governances: ProviderTable::new(NodeKind::Governance),
            function_namespaces: ProviderTable::new(NodeKind::FunctionNamespace),
            suppliers: ProviderTable::new(NodeKind::Supplier),
        }
    }
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }
}
