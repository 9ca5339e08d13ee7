//! Core node graph for OfficeFloor compilation.
//!
//! This crate holds the pure domain shared by every structural node: the
//! node arena and registry helpers, typed link slots with transitive target
//! resolution, the scoped [`AutoWirer`], the per-compile type cache, and the
//! provider seams through which configuration is loaded. It performs no I/O
//! and knows nothing about any concrete node kind's state; that lives in the
//! `nodes` crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`NodeId`, `CompileId`, `ProviderName`) |
//! | [`types`] | Value types (`AutoWire`, `PropertyList`, introspected `*Type`s) |
//! | [`errors`] | `SourceError` and `CompileError` |
//! | [`issues`] | `CompilerIssue`, the `CompilerIssues` sink, `IssueLog` |
//! | [`node`] | `NodeKind`, `NodeDescriptor`, the `Node` trait |
//! | [`arena`] | `NodeArena` registry helpers and initialisation checks |
//! | [`link`] | `LinkSlots` and transitive target resolution |
//! | [`autowire`] | `AutoWirer`, match tiers, `TypeResolver` |
//! | [`context`] | `CompileContext` and its type caches |
//! | [`sources`] | Provider traits, `ProviderTable`, `SourceContext` |

pub mod arena;
pub mod autowire;
pub mod context;
pub mod errors;
pub mod identifiers;
pub mod issues;
pub mod link;
pub mod node;
pub mod sources;
pub mod types;

#[cfg(test)]
mod testing;

pub use arena::{initialise, NodeArena, NodePlacement, TreeDump};
pub use autowire::{
    AutoWireDirection, AutoWireLink, AutoWirer, MatchTier, Necessity, TypeHierarchy, TypeResolver,
};
pub use context::{CompileContext, TypeCache};
pub use errors::{CompileError, SourceError};
pub use identifiers::{CompileId, NodeId, ProviderName};
pub use issues::{CompilerIssue, CompilerIssues, IssueLog};
pub use link::{
    find_furthest_target, find_target, link, retrieve_furthest_target, retrieve_target, LinkKind,
    LinkOutcome, LinkSlots,
};
pub use node::{Node, NodeDescriptor, NodeKind};
pub use sources::{
    AdministrationSource, GovernanceSource, ManagedFunctionSource, ManagedObjectPoolSource,
    ManagedObjectSource, Provider, ProviderTable, SourceContext, SupplierSource, TeamSource,
};
pub use types::{AutoWire, ManagedObjectScope, Property, PropertyList, Timestamp};
