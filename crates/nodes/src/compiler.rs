//! The compilation driver.
//!
//! A compile runs the stages in order and stops at the first one that fails:
//!
//! 1. sourcing, then section inheritance
//! 2. the initialisation gate (every referenced node must have been declared)
//! 3. auto-wiring of objects, teams and extensions
//! 4. execution exploration
//! 5. build
//!
//! A stage fails when it says so or when it raised any issue. Every issue
//! raised is handed to the caller's sink whatever the outcome.

use std::rc::Rc;

use graph::{
    CompileError, CompileId, CompilerIssues, PropertyList, Provider, Timestamp, TypeResolver,
};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::autowiring::{auto_wire_extensions, auto_wire_objects, auto_wire_teams};
use crate::build::build_office_floor;
use crate::builder::OfficeFloorBuilder;
use crate::config::CompilerConfig;
use crate::explore::explore_executions;
use crate::inheritance::resolve_section_inheritance;
use crate::node::OfficeFloorState;
use crate::providers::{OfficeFloorSource, Providers};
use crate::sourcing::source_office_floor_tree;
use crate::tree::NodeTree;

/// Outcome of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    pub compile_id: CompileId,
    pub started: Timestamp,
    pub finished: Timestamp,
    /// Nodes in the compiled tree, the OfficeFloor included.
    pub nodes: usize,
}

/// Compiles OfficeFloors from their sources.
///
/// Holds only what is shared between compiles; each call to
/// [`compile`](Self::compile) works on a fresh node tree.
pub struct OfficeFloorCompiler {
    providers: Rc<Providers>,
    types: Rc<dyn TypeResolver>,
    config: Rc<CompilerConfig>,
}

impl OfficeFloorCompiler {
    pub fn new(providers: Providers, types: impl TypeResolver + 'static, config: CompilerConfig) -> Self {
        Self {
            providers: Rc::new(providers),
            types: Rc::new(types),
            config: Rc::new(config),
        }
    }

    /// Compiles the OfficeFloor named `name` and builds it into `builder`.
    ///
    /// # Errors
    ///
    /// The [`CompileError`] of the stage that failed. The issues explaining
    /// the failure have been delivered to `issues` by then.
    pub fn compile(
        &self,
        name: &str,
        source: Provider<dyn OfficeFloorSource>,
        properties: PropertyList,
        builder: &mut dyn OfficeFloorBuilder,
        issues: &mut dyn CompilerIssues,
    ) -> Result<CompileSummary, CompileError> {
        let compile_id = CompileId::new_random();
        let span = info_span!("compile", %compile_id, office_floor = name);
        let _entered = span.enter();

        let floor = OfficeFloorState {
            provider: source,
            properties,
            auto_wire_objects: false,
            auto_wire_teams: false,
        };
        let mut tree = NodeTree::new(
            name,
            floor,
            Rc::clone(&self.providers),
            Rc::clone(&self.types),
            Rc::clone(&self.config),
            compile_id,
        );

        let outcome = run_stages(&mut tree, builder);
        let raised = tree.issues.len();
        tree.issues.drain_into(issues);

        match outcome {
            Ok(()) => {
                let summary = CompileSummary {
                    compile_id,
                    started: tree.context.started(),
                    finished: Timestamp::now(),
                    nodes: tree.arena.len(),
                };
                info!(nodes = summary.nodes, "compiled OfficeFloor");
                Ok(summary)
            }
            Err(err) => {
                warn!(issues = raised, error = %err, "compile failed");
                Err(err)
            }
        }
    }
}

fn run_stages(tree: &mut NodeTree, builder: &mut dyn OfficeFloorBuilder) -> Result<(), CompileError> {
    stage(tree, source_office_floor_tree, |issues| CompileError::Sourcing { issues })?;
    stage(tree, resolve_section_inheritance, |issues| CompileError::Sourcing { issues })?;
    stage(
        tree,
        |tree| {
            let root = tree.root().id();
            tree.arena.is_tree_initialised(root, &mut tree.issues)
        },
        |issues| CompileError::Uninitialised { issues },
    )?;
    stage(tree, auto_wire_objects, |issues| CompileError::AutoWire { issues })?;
    stage(tree, auto_wire_teams, |issues| CompileError::AutoWire { issues })?;
    stage(tree, auto_wire_extensions, |issues| CompileError::AutoWire { issues })?;
    stage(tree, explore_executions, |issues| CompileError::Exploration { issues })?;
    stage(
        tree,
        |tree| build_office_floor(tree, builder),
        |issues| CompileError::Build { issues },
    )
}

fn stage(
    tree: &mut NodeTree,
    run: impl FnOnce(&mut NodeTree) -> bool,
    fail: impl FnOnce(usize) -> CompileError,
) -> Result<(), CompileError> {
    let before = tree.issues.len();
    let ok = run(tree);
    let raised = tree.issues.len();
    if ok && raised == before {
        Ok(())
    } else {
        Err(fail(raised))
    }
}
