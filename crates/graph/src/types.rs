//! Shared value types for the node graph.
//!
//! Unlike the identifiers in [`crate::identifiers`], these carry configuration
//! or introspected capability data: auto-wire descriptors, ordered property
//! lists, and the "type" signatures produced by the leaf loaders.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sources::ManagedObjectSource;

// ---------------------------------------------------------------------------
// Auto-wiring
// ---------------------------------------------------------------------------

/// A `(qualifier, type)` capability descriptor used for type-directed matching.
///
/// Equality is structural. The derived ordering is lexicographic on
/// `(qualifier, type)` with unqualified descriptors first, which is the order
/// used whenever auto-wires are listed in output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AutoWire {
    qualifier: Option<String>,
    #[serde(rename = "type")]
    type_name: String,
}

impl AutoWire {
    /// Creates an unqualified auto-wire for `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            type_name: type_name.into(),
        }
    }

    /// Creates an auto-wire with an optional qualifier.
    ///
    /// An empty qualifier is treated as no qualifier.
    pub fn qualified(qualifier: Option<&str>, type_name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.filter(|q| !q.is_empty()).map(str::to_owned),
            type_name: type_name.into(),
        }
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name used for nodes materialised from this auto-wire
    /// (`qualifier-type`, or just `type`).
    pub fn qualified_type(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{q}-{}", self.type_name),
            None => self.type_name.clone(),
        }
    }
}

impl std::fmt::Display for AutoWire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}:{}", self.type_name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A single `name = value` configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Ordered name → value configuration bag handed to source providers.
///
/// Insertion order is preserved. Adding a property whose name already exists
/// replaces the value in place, keeping the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyList(Vec<Property>);

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a property.
    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Property { name, value }),
        }
    }

    /// Builder-style [`add_property`](Self::add_property).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_property(name, value);
        self
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy of this list with every entry of `overrides` applied on top.
    pub fn overridden_by(&self, overrides: &PropertyList) -> PropertyList {
        let mut merged = self.clone();
        for property in overrides.iter() {
            merged.add_property(property.name.clone(), property.value.clone());
        }
        merged
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PropertyList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut list = PropertyList::new();
        for (name, value) in iter {
            list.add_property(name, value);
        }
        list
    }
}

// ---------------------------------------------------------------------------
// Managed object scope
// ---------------------------------------------------------------------------

/// Lifetime of a managed object instance within the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedObjectScope {
    /// One instance per process (the default).
    #[default]
    Process,
    /// One instance per thread of execution.
    Thread,
    /// One instance per function invocation.
    Function,
}

impl std::fmt::Display for ManagedObjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Process => "process",
            Self::Thread => "thread",
            Self::Function => "function",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Loaded type signatures
// ---------------------------------------------------------------------------

/// A dependency a managed object requires of another managed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDependencyType {
    pub name: String,
    pub auto_wire: AutoWire,
}

/// A flow a managed object source (or function) may instigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowType {
    pub name: String,
    pub argument_type: Option<String>,
}

/// Introspected capability signature of a managed object source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObjectType {
    /// Type of the object the managed object provides.
    pub object_type: String,
    pub dependencies: Vec<ObjectDependencyType>,
    pub flows: Vec<FlowType>,
    /// Names of the teams the source requires.
    pub teams: Vec<String>,
    /// Extension interfaces administrations/governances may use.
    pub extension_types: Vec<String>,
}

impl ManagedObjectType {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, auto_wire: AutoWire) -> Self {
        self.dependencies.push(ObjectDependencyType {
            name: name.into(),
            auto_wire,
        });
        self
    }

    pub fn with_flow(mut self, name: impl Into<String>, argument_type: Option<&str>) -> Self {
        self.flows.push(FlowType {
            name: name.into(),
            argument_type: argument_type.map(str::to_owned),
        });
        self
    }

    pub fn with_team(mut self, name: impl Into<String>) -> Self {
        self.teams.push(name.into());
        self
    }

    pub fn with_extension(mut self, extension_type: impl Into<String>) -> Self {
        self.extension_types.push(extension_type.into());
        self
    }
}

/// Introspected signature of a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamType {
    /// Whether functions on this team may rely on thread-local state.
    pub thread_local_aware: bool,
}

/// Introspected signature of a managed object pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObjectPoolType {
    pub pooled_object_type: String,
}

/// Introspected signature of an administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationType {
    pub extension_type: String,
}

/// Introspected signature of a governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceType {
    pub extension_type: String,
}

/// An object a function requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionObjectType {
    pub name: String,
    pub auto_wire: AutoWire,
    /// Parameters are supplied by the invoking flow, never linked.
    pub is_parameter: bool,
}

/// Signature of one function within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionType {
    pub name: String,
    pub objects: Vec<FunctionObjectType>,
    pub flows: Vec<FlowType>,
}

impl FunctionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn with_object(mut self, name: impl Into<String>, auto_wire: AutoWire) -> Self {
        self.objects.push(FunctionObjectType {
            name: name.into(),
            auto_wire,
            is_parameter: false,
        });
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.objects.push(FunctionObjectType {
            name: name.into(),
            auto_wire: AutoWire::new(type_name),
            is_parameter: true,
        });
        self
    }

    pub fn with_flow(mut self, name: impl Into<String>, argument_type: Option<&str>) -> Self {
        self.flows.push(FlowType {
            name: name.into(),
            argument_type: argument_type.map(str::to_owned),
        });
        self
    }
}

/// Introspected signature of a function namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNamespaceType {
    pub functions: Vec<FunctionType>,
}

impl FunctionNamespaceType {
    pub fn function(&self, name: &str) -> Option<&FunctionType> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// One managed object source made available by a supplier.
#[derive(Clone)]
pub struct SuppliedManagedObjectSourceType {
    pub auto_wire: AutoWire,
    pub source: Rc<dyn ManagedObjectSource>,
    pub properties: PropertyList,
}

impl std::fmt::Debug for SuppliedManagedObjectSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppliedManagedObjectSourceType")
            .field("auto_wire", &self.auto_wire)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Introspected signature of a supplier.
#[derive(Debug, Clone, Default)]
pub struct SupplierType {
    pub supplied: Vec<SuppliedManagedObjectSourceType>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
