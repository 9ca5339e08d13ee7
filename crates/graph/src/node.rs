//! The uniform node contract every graph element implements.

use serde::{Deserialize, Serialize};

use crate::link::{LinkKind, LinkSlots};
use crate::NodeId;

/// Type tag identifying what a node is.
///
/// Also carries the capability table of the graph: which link slots a kind
/// owns ([`NodeKind::link_kinds`]) and which link categories may target it
/// ([`NodeKind::accepts`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    OfficeFloor,
    Office,
    Section,
    SectionInput,
    SectionOutput,
    SectionObject,
    FunctionNamespace,
    Function,
    FunctionObject,
    FunctionFlow,
    ManagedObjectSource,
    ManagedObject,
    ManagedObjectDependency,
    ManagedObjectFlow,
    ManagedObjectTeam,
    ManagedObjectPool,
    Team,
    OfficeObject,
    OfficeTeam,
    Administration,
    Governance,
    Supplier,
    SuppliedManagedObjectSource,
}

impl NodeKind {
    /// Human-readable label used in issue messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::OfficeFloor => "OfficeFloor",
            Self::Office => "Office",
            Self::Section => "Section",
            Self::SectionInput => "Section Input",
            Self::SectionOutput => "Section Output",
            Self::SectionObject => "Section Object",
            Self::FunctionNamespace => "Function Namespace",
            Self::Function => "Function",
            Self::FunctionObject => "Function Object",
            Self::FunctionFlow => "Function Flow",
            Self::ManagedObjectSource => "Managed Object Source",
            Self::ManagedObject => "Managed Object",
            Self::ManagedObjectDependency => "Managed Object Dependency",
            Self::ManagedObjectFlow => "Managed Object Source Flow",
            Self::ManagedObjectTeam => "Managed Object Source Team",
            Self::ManagedObjectPool => "Managed Object Pool",
            Self::Team => "Team",
            Self::OfficeObject => "Office Object",
            Self::OfficeTeam => "Office Team",
            Self::Administration => "Administration",
            Self::Governance => "Governance",
            Self::Supplier => "Supplier",
            Self::SuppliedManagedObjectSource => "Supplied Managed Object Source",
        }
    }

    /// Link slots a node of this kind owns.
    pub fn link_kinds(self) -> &'static [LinkKind] {
        match self {
            Self::SectionInput | Self::SectionOutput | Self::FunctionFlow | Self::ManagedObjectFlow => {
                &[LinkKind::Flow]
            }
            Self::SectionObject
            | Self::FunctionObject
            | Self::ManagedObjectDependency
            | Self::OfficeObject => &[LinkKind::Object],
            Self::Function | Self::ManagedObjectTeam | Self::OfficeTeam => &[LinkKind::Team],
            Self::ManagedObjectSource => &[
                LinkKind::Pool,
                LinkKind::Office,
                LinkKind::StartBefore,
                LinkKind::StartAfter,
            ],
            _ => &[],
        }
    }

    /// Whether a link of category `link` may target a node of this kind.
    pub fn accepts(self, link: LinkKind) -> bool {
        match link {
            LinkKind::Object => matches!(
                self,
                Self::ManagedObject | Self::OfficeObject | Self::SectionObject
            ),
            LinkKind::Flow => matches!(
                self,
                Self::Function | Self::SectionInput | Self::SectionOutput
            ),
            LinkKind::Team => matches!(self, Self::Team | Self::OfficeTeam),
            LinkKind::Pool => self == Self::ManagedObjectPool,
            LinkKind::Office => self == Self::Office,
            LinkKind::StartBefore | LinkKind::StartAfter => self == Self::ManagedObjectSource,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a node as it appears in issues and tree dumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub kind: NodeKind,
    /// Dotted path from the first node below the root, e.g. `OfficeA.SectionA.process`.
    pub qualified_name: String,
}

impl std::fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.qualified_name)
    }
}

/// Contract every graph element implements.
///
/// A node's identity (name, kind, parent) is fixed at creation. It may exist
/// uninitialised, referenced before anything configured it, and becomes
/// initialised exactly once.
pub trait Node {
    fn node_name(&self) -> &str;

    fn node_kind(&self) -> NodeKind;

    /// Owning node; `None` only for the root.
    fn parent(&self) -> Option<NodeId>;

    fn qualified_name(&self) -> &str;

    fn is_initialised(&self) -> bool;

    fn links(&self) -> &LinkSlots;

    fn links_mut(&mut self) -> &mut LinkSlots;

    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: self.node_name().to_owned(),
            kind: self.node_kind(),
            qualified_name: self.qualified_name().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_sources_have_matching_targets() {
        let kinds = [
            NodeKind::SectionInput,
            NodeKind::SectionOutput,
            NodeKind::SectionObject,
            NodeKind::Function,
            NodeKind::FunctionObject,
            NodeKind::FunctionFlow,
            NodeKind::ManagedObjectSource,
            NodeKind::ManagedObjectDependency,
            NodeKind::ManagedObjectFlow,
            NodeKind::ManagedObjectTeam,
            NodeKind::OfficeObject,
            NodeKind::OfficeTeam,
        ];
        let all = [
            NodeKind::Function,
            NodeKind::SectionInput,
            NodeKind::ManagedObject,
            NodeKind::Team,
            NodeKind::ManagedObjectPool,
            NodeKind::Office,
            NodeKind::ManagedObjectSource,
        ];
        for kind in kinds {
            for link in kind.link_kinds() {
                assert!(
                    all.iter().any(|target| target.accepts(*link)),
                    "{kind} links {link:?} but nothing accepts it"
                );
            }
        }
    }

    #[test]
    fn descriptor_display_names_kind_and_path() {
        let descriptor = NodeDescriptor {
            name: "out".to_owned(),
            kind: NodeKind::SectionOutput,
            qualified_name: "OfficeA.SectionA.out".to_owned(),
        };
        assert_eq!(descriptor.to_string(), "Section Output OfficeA.SectionA.out");
    }
}
