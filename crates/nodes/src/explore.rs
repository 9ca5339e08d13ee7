//! Execution exploration.
//!
//! Once auto-wiring has settled, each [`ExecutionExplorer`] an office
//! registered is shown the execution starting at its section input: the
//! function first invoked, the managed objects that function's objects
//! resolve to, and where its flows lead.

use std::cell::RefCell;
use std::rc::Rc;

use graph::{
    find_furthest_target, find_target, CompilerIssue, CompilerIssues, IssueLog, LinkKind, Node,
    NodeId, NodeKind, SourceError,
};
use tracing::{debug, instrument};

use crate::node::{FunctionFlowState, FunctionObjectState, OfficeState};
use crate::tree::NodeTree;

/// Inspects the wired execution from one office section input.
pub trait ExecutionExplorer {
    /// Fails the compile by returning an error or raising an issue through
    /// [`ExecutionView::add_issue`].
    fn explore(&self, execution: &ExecutionView<'_>) -> Result<(), SourceError>;
}

/// Read-only view of an execution.
pub struct ExecutionView<'t> {
    tree: &'t NodeTree,
    input: NodeId,
    issues: RefCell<Vec<String>>,
}

impl<'t> ExecutionView<'t> {
    fn new(tree: &'t NodeTree, input: NodeId) -> Self {
        Self {
            tree,
            input,
            issues: RefCell::new(Vec::new()),
        }
    }

    /// Qualified name of the section input the execution starts from.
    pub fn input_name(&self) -> &str {
        self.tree.qualified_name(self.input)
    }

    /// Function the input ultimately flows to, if it is linked.
    pub fn initial_function(&self) -> Option<FunctionView<'t>> {
        let mut scratch = IssueLog::new();
        find_target(
            &self.tree.arena,
            self.input,
            LinkKind::Flow,
            &[NodeKind::Function],
            &mut scratch,
        )
        .map(|id| FunctionView { tree: self.tree, id })
    }

    /// Raises an issue against the section input.
    pub fn add_issue(&self, message: impl Into<String>) {
        self.issues.borrow_mut().push(message.into());
    }
}

/// A function within an explored execution.
#[derive(Clone, Copy)]
pub struct FunctionView<'t> {
    tree: &'t NodeTree,
    id: NodeId,
}

/// An object of an explored function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectView {
    pub name: String,
    /// Qualified name of the managed object the object resolves to.
    pub managed_object: Option<String>,
    pub is_parameter: bool,
}

impl<'t> FunctionView<'t> {
    pub fn name(&self) -> &str {
        self.tree.node(self.id).node_name()
    }

    pub fn qualified_name(&self) -> &str {
        self.tree.qualified_name(self.id)
    }

    pub fn objects(&self) -> Vec<ObjectView> {
        let mut scratch = IssueLog::new();
        self.tree
            .registered::<FunctionObjectState>(self.id)
            .into_iter()
            .map(|object| {
                let managed_object = find_furthest_target(
                    &self.tree.arena,
                    object.id(),
                    LinkKind::Object,
                    &[NodeKind::ManagedObject],
                    &mut scratch,
                );
                ObjectView {
                    name: self.tree.node(object.id()).node_name().to_owned(),
                    managed_object: managed_object.map(|id| self.tree.qualified_name(id).to_owned()),
                    is_parameter: self
                        .tree
                        .state(object)
                        .is_some_and(|state| state.is_parameter),
                }
            })
            .collect()
    }

    /// Each flow by name with the function it leads to.
    pub fn flows(&self) -> Vec<(String, Option<FunctionView<'t>>)> {
        let mut scratch = IssueLog::new();
        self.tree
            .registered::<FunctionFlowState>(self.id)
            .into_iter()
            .map(|flow| {
                let next = find_target(
                    &self.tree.arena,
                    flow.id(),
                    LinkKind::Flow,
                    &[NodeKind::Function],
                    &mut scratch,
                )
                .map(|id| FunctionView { tree: self.tree, id });
                (self.tree.node(flow.id()).node_name().to_owned(), next)
            })
            .collect()
    }

    /// Qualified name of the OfficeFloor team responsible for the function.
    pub fn responsible_team(&self) -> Option<&'t str> {
        let mut scratch = IssueLog::new();
        find_furthest_target(
            &self.tree.arena,
            self.id,
            LinkKind::Team,
            &[NodeKind::Team],
            &mut scratch,
        )
        .map(|id| self.tree.qualified_name(id))
    }
}

/// Runs every registered explorer. Answers `false` if any failed.
#[instrument(skip_all)]
pub(crate) fn explore_executions(tree: &mut NodeTree) -> bool {
    if !tree.config.explore_executions {
        debug!("execution exploration disabled");
        return true;
    }

    let root = tree.root().id();
    let mut failures: Vec<(NodeId, Result<(), SourceError>, Vec<String>)> = Vec::new();
    for office in tree.registered::<OfficeState>(root) {
        let explorers: Vec<(NodeId, Rc<dyn ExecutionExplorer>)> = tree
            .state(office)
            .map(|state| state.explorers.clone())
            .unwrap_or_default();
        for (input, explorer) in explorers {
            let view = ExecutionView::new(tree, input);
            let outcome = explorer.explore(&view);
            let raised = view.issues.into_inner();
            debug!(input = %tree.qualified_name(input), ok = outcome.is_ok(), "explored execution");
            if outcome.is_err() || !raised.is_empty() {
                failures.push((input, outcome, raised));
            }
        }
    }

    let ok = failures.is_empty();
    for (input, outcome, raised) in failures {
        for message in raised {
            tree.report(input, message);
        }
        match outcome {
            Ok(()) | Err(SourceError::AlreadyReported) => {}
            Err(SourceError::Other(cause)) => {
                let descriptor = tree.descriptor(input);
                let issue = CompilerIssue::new(
                    &descriptor,
                    format!("Failed to explore execution from {} {}", descriptor.kind, descriptor.name),
                )
                .with_cause(&*cause);
                tree.issues.add_issue(issue);
            }
            Err(structured) => tree.report(input, structured.to_string()),
        }
    }
    ok
}
