//! Source provider seams.
//!
//! Every configurable element of the graph is described by a provider that
//! is either named (looked up in a [`ProviderTable`] at sourcing time) or
//! supplied as a ready instance. Leaf providers expose a single
//! `load_type` operation returning the introspected signature of what they
//! provide.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::types::{
    AdministrationType, FunctionNamespaceType, GovernanceType, ManagedObjectPoolType,
    ManagedObjectType, PropertyList, SupplierType, TeamType,
};
use crate::{NodeKind, ProviderName, SourceError};

// ---------------------------------------------------------------------------
// Context handed to providers
// ---------------------------------------------------------------------------

/// Configuration visible to a provider while it loads.
#[derive(Debug, Clone)]
pub struct SourceContext {
    name: String,
    location: Option<String>,
    properties: PropertyList,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, properties: PropertyList) -> Self {
        Self {
            name: name.into(),
            location: None,
            properties,
        }
    }

    /// Sets the location the provider reads its configuration from.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Name of the node being sourced.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn properties(&self) -> &PropertyList {
        &self.properties
    }

    /// Value of a required property.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnknownProperty`] when the property is not configured.
    pub fn property(&self, name: &str) -> Result<&str, SourceError> {
        self.properties
            .value(name)
            .ok_or_else(|| SourceError::UnknownProperty {
                name: name.to_owned(),
            })
    }

    pub fn property_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.properties.value(name).unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Leaf providers
// ---------------------------------------------------------------------------

/// Provides managed objects.
pub trait ManagedObjectSource {
    fn load_type(&self, context: &SourceContext) -> Result<ManagedObjectType, SourceError>;
}

pub trait TeamSource {
    fn load_type(&self, context: &SourceContext) -> Result<TeamType, SourceError>;
}

pub trait ManagedObjectPoolSource {
    fn load_type(&self, context: &SourceContext) -> Result<ManagedObjectPoolType, SourceError>;
}

pub trait AdministrationSource {
    fn load_type(&self, context: &SourceContext) -> Result<AdministrationType, SourceError>;
}

pub trait GovernanceSource {
    fn load_type(&self, context: &SourceContext) -> Result<GovernanceType, SourceError>;
}

/// Provides a namespace of functions.
pub trait ManagedFunctionSource {
    fn load_type(&self, context: &SourceContext) -> Result<FunctionNamespaceType, SourceError>;
}

/// Supplies ready-made managed object sources for auto-wiring.
pub trait SupplierSource {
    fn load_type(&self, context: &SourceContext) -> Result<SupplierType, SourceError>;
}

// ---------------------------------------------------------------------------
// Provider lookup
// ---------------------------------------------------------------------------

type Factory<T> = Box<dyn Fn() -> Rc<T>>;

/// Named provider factories for one category.
pub struct ProviderTable<T: ?Sized> {
    kind: NodeKind,
    factories: BTreeMap<ProviderName, Factory<T>>,
}

impl<T: ?Sized> ProviderTable<T> {
    /// Creates an empty table for providers of `kind` nodes.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            factories: BTreeMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: ProviderName, factory: impl Fn() -> Rc<T> + 'static) {
        self.factories.insert(name, Box::new(factory));
    }

    pub fn contains(&self, name: &ProviderName) -> bool {
        self.factories.contains_key(name)
    }

    /// Creates a fresh provider instance.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnknownProvider`] when nothing is registered under `name`.
    pub fn instantiate(&self, name: &ProviderName) -> Result<Rc<T>, SourceError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SourceError::UnknownProvider {
                kind: self.kind,
                name: name.to_string(),
            })?;
        Ok(factory())
    }
}

impl<T: ?Sized> std::fmt::Debug for ProviderTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTable")
            .field("kind", &self.kind)
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How a node's provider is specified.
pub enum Provider<T: ?Sized> {
    /// Looked up by name when the node is sourced.
    Named(ProviderName),
    /// A ready instance. `label` stands in for the name in output.
    Instance { label: String, instance: Rc<T> },
}

impl<T: ?Sized> Provider<T> {
    pub fn instance(label: impl Into<String>, instance: Rc<T>) -> Self {
        Self::Instance {
            label: label.into(),
            instance,
        }
    }

    /// Name or label identifying the provider in output.
    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name.as_str(),
            Self::Instance { label, .. } => label,
        }
    }

    /// Resolves to an instance, instantiating named providers from `table`.
    pub fn resolve(&self, table: &ProviderTable<T>) -> Result<Rc<T>, SourceError> {
        match self {
            Self::Named(name) => table.instantiate(name),
            Self::Instance { instance, .. } => Ok(Rc::clone(instance)),
        }
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Instance { label, instance } => Self::Instance {
                label: label.clone(),
                instance: Rc::clone(instance),
            },
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Instance { label, .. } => {
                f.debug_struct("Instance").field("label", label).finish_non_exhaustive()
            }
        }
    }
}
