//! Structural nodes and the OfficeFloor compiler.
//!
//! This crate gives every structural node kind its state, the designer
//! surfaces that source providers populate the tree through, and the
//! compiler that drives a tree from sourcing to build.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The generic machinery (arena, link slots,
//! auto-wiring, type caches) lives in the [`graph`] crate. This crate decides
//! what each node kind holds, which stages run in which order, and what the
//! external [`OfficeFloorBuilder`] is told.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`node`] | Per-kind node state and `StructuralNode` |
//! | [`handles`] | Typed node handles and link capability traits |
//! | `tree` | `NodeTree`: arena, issues and caches for one compile |
//! | `architect` | `OfficeFloorDeployer`, `OfficeArchitect`, `SectionDesigner` |
//! | `providers` | Structural source traits and the `Providers` registry |
//! | `config` | `CompilerConfig` |
//! | `sourcing` | Sourcing the tree from its providers |
//! | `inheritance` | Section inheritance |
//! | `autowiring` | Object, team and extension auto-wiring |
//! | `explore` | Execution explorers |
//! | `builder` | `OfficeFloorBuilder` and `RecordingBuilder` |
//! | `build` | Replaying the tree into a builder |
//! | `compiler` | `OfficeFloorCompiler`, the stage driver |

mod architect;
mod autowiring;
mod build;
mod builder;
mod compiler;
mod config;
mod explore;
pub mod handles;
mod inheritance;
pub mod node;
mod providers;
mod sourcing;
mod tree;

#[cfg(test)]
mod testing;

pub use architect::{Designer, OfficeArchitect, OfficeFloorDeployer, SectionDesigner};
pub use builder::{BuildCall, OfficeFloorBuilder, RecordingBuilder};
pub use compiler::{CompileSummary, OfficeFloorCompiler};
pub use config::CompilerConfig;
pub use explore::{ExecutionExplorer, ExecutionView, FunctionView, ObjectView};
pub use handles::Handle;
pub use node::StructuralNode;
pub use providers::{OfficeFloorSource, OfficeSource, Providers, SectionSource};
pub use tree::NodeTree;
