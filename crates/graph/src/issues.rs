//! Compiler issue reporting.
//!
//! Helpers in this crate never fail with an error for configuration
//! mistakes; they raise a [`CompilerIssue`] against the offending node and
//! return `None`/`false`, so a single compile can surface every independent
//! problem at once.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::NodeDescriptor;

/// A single diagnostic raised during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerIssue {
    /// Node the issue is attributed to. `None` for compile-wide issues.
    pub node: Option<NodeDescriptor>,
    /// Human-readable description.
    pub message: String,
    /// Rendered cause chain, when the issue wraps a provider failure.
    pub cause: Option<String>,
}

impl CompilerIssue {
    pub fn new(node: &NodeDescriptor, message: impl Into<String>) -> Self {
        Self {
            node: Some(node.clone()),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: &dyn std::error::Error) -> Self {
        let mut rendered = cause.to_string();
        let mut source = cause.source();
        while let Some(next) = source {
            rendered.push_str(": ");
            rendered.push_str(&next.to_string());
            source = next.source();
        }
        self.cause = Some(rendered);
        self
    }
}

impl std::fmt::Display for CompilerIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "{node}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {cause})")?;
        }
        Ok(())
    }
}

/// Sink receiving every issue raised during a compile.
pub trait CompilerIssues {
    fn add_issue(&mut self, issue: CompilerIssue);

    /// Raises `message` against `node`.
    fn report(&mut self, node: &NodeDescriptor, message: String) {
        self.add_issue(CompilerIssue::new(node, message));
    }
}

impl CompilerIssues for Vec<CompilerIssue> {
    fn add_issue(&mut self, issue: CompilerIssue) {
        self.push(issue);
    }
}

/// In-compile issue collector.
///
/// Records issues in the order raised and emits a `warn` event for each. The
/// driver hands the collected issues to the caller's sink when the compile
/// finishes.
#[derive(Debug, Default)]
pub struct IssueLog {
    issues: Vec<CompilerIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompilerIssue> {
        self.issues.iter()
    }

    /// Moves every collected issue into `sink`, leaving the log empty.
    pub fn drain_into(&mut self, sink: &mut dyn CompilerIssues) {
        for issue in self.issues.drain(..) {
            sink.add_issue(issue);
        }
    }
}

impl CompilerIssues for IssueLog {
    fn add_issue(&mut self, issue: CompilerIssue) {
        match &issue.node {
            Some(node) => warn!(node = %node, cause = ?issue.cause, "{}", issue.message),
            None => warn!(cause = ?issue.cause, "{}", issue.message),
        }
        self.issues.push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    fn team() -> NodeDescriptor {
        NodeDescriptor {
            name: "T".to_owned(),
            kind: NodeKind::Team,
            qualified_name: "T".to_owned(),
        }
    }

    #[test]
    fn cause_chain_is_rendered() {
        let cause = anyhow::anyhow!("socket closed").context("load failed");
        let issue = CompilerIssue::new(&team(), "Failed").with_cause(&*cause);
        assert_eq!(issue.cause.as_deref(), Some("load failed: socket closed"));
        assert_eq!(
            issue.to_string(),
            "Team T: Failed (cause: load failed: socket closed)"
        );
    }

    #[test]
    fn log_drains_in_order() {
        let mut log = IssueLog::new();
        log.report(&team(), "first".to_owned());
        log.report(&team(), "second".to_owned());

        let mut sink: Vec<CompilerIssue> = Vec::new();
        log.drain_into(&mut sink);

        assert!(log.is_empty());
        let messages: Vec<&str> = sink.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
