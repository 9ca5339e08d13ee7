//! Type-directed auto-wiring.
//!
//! An [`AutoWirer`] holds the targets registered at one scope and a reference
//! to the enclosing scope. A query is answered by the innermost scope that
//! has any match at all; within that scope the first [`MatchTier`] producing
//! matches decides. More than one distinct target in the deciding tier is an
//! ambiguity and is reported, never resolved by picking one.
//!
//! ## Tiers
//!
//! | Tier | Type comparison | Qualifier rule |
//! |------|-----------------|----------------|
//! | 1 | identical | both qualified, equal |
//! | 2 | identical | both unqualified |
//! | 3 | identical | target unqualified |
//! | 4 | assignable | both qualified, equal |
//! | 5 | assignable | both unqualified |
//! | 6 | assignable | target unqualified |
//!
//! Assignability is answered by a [`TypeResolver`] and is only consulted for
//! tiers 4–6.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::{AutoWire, CompilerIssues, NodeDescriptor};

// ---------------------------------------------------------------------------
// Type resolution
// ---------------------------------------------------------------------------

/// Answers type assignability for tiers 4–6.
pub trait TypeResolver {
    /// Every type a value of `type_name` may be assigned to, itself included.
    ///
    /// `None` when `type_name` is unknown.
    fn assignable_types(&self, type_name: &str) -> Option<BTreeSet<String>>;
}

/// Declared type hierarchy: each known type with its direct supertypes.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    supertypes: BTreeMap<String, BTreeSet<String>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `type_name` with its direct supertypes (interfaces, parents).
    pub fn declare<S: Into<String>>(
        &mut self,
        type_name: impl Into<String>,
        supertypes: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.supertypes
            .entry(type_name.into())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
        self
    }

    /// Builder-style [`declare`](Self::declare).
    pub fn with<S: Into<String>>(
        mut self,
        type_name: impl Into<String>,
        supertypes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.declare(type_name, supertypes);
        self
    }
}

impl TypeResolver for TypeHierarchy {
    fn assignable_types(&self, type_name: &str) -> Option<BTreeSet<String>> {
        self.supertypes.get(type_name)?;
        let mut seen = BTreeSet::from([type_name.to_owned()]);
        let mut pending = VecDeque::from([type_name.to_owned()]);
        while let Some(current) = pending.pop_front() {
            for parent in self.supertypes.get(&current).into_iter().flatten() {
                if seen.insert(parent.clone()) {
                    pending.push_back(parent.clone());
                }
            }
        }
        Some(seen)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Which way assignability is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoWireDirection {
    /// The target's type must be assignable to the source's type
    /// (an object requirement accepts an implementation).
    SourceRequiresTarget,
    /// The source's type must be assignable to the target's type
    /// (the target is a category the source falls into, e.g. a team
    /// qualified by a supertype of the objects a function uses).
    TargetCategorisesSource,
}

/// Whether a failed match is an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Necessity {
    Required,
    /// Absence is a valid outcome: no issue when nothing matches, and
    /// unresolvable types are skipped silently.
    Optional,
}

/// Match precedence, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    ExactQualified,
    ExactUnqualified,
    ExactDefault,
    AssignableQualified,
    AssignableUnqualified,
    AssignableDefault,
}

impl MatchTier {
    pub const ALL: [MatchTier; 6] = [
        MatchTier::ExactQualified,
        MatchTier::ExactUnqualified,
        MatchTier::ExactDefault,
        MatchTier::AssignableQualified,
        MatchTier::AssignableUnqualified,
        MatchTier::AssignableDefault,
    ];

    fn is_exact(self) -> bool {
        matches!(
            self,
            Self::ExactQualified | Self::ExactUnqualified | Self::ExactDefault
        )
    }

    fn qualifier_matches(self, source: &AutoWire, target: &AutoWire) -> bool {
        match self {
            Self::ExactQualified | Self::AssignableQualified => {
                source.qualifier().is_some() && source.qualifier() == target.qualifier()
            }
            Self::ExactUnqualified | Self::AssignableUnqualified => {
                source.qualifier().is_none() && target.qualifier().is_none()
            }
            Self::ExactDefault | Self::AssignableDefault => target.qualifier().is_none(),
        }
    }
}

/// A resolved match of a source requirement onto a registered target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoWireLink<T> {
    pub source_auto_wire: AutoWire,
    pub target_auto_wire: AutoWire,
    pub target: T,
    pub target_label: String,
}

struct AutoWireTarget<T> {
    label: String,
    target: T,
    auto_wires: Vec<AutoWire>,
}

/// One candidate pairing found in a scope.
struct Candidate {
    target_index: usize,
    source: AutoWire,
    target: AutoWire,
}

/// Auto-wire registry for one scope, chained to its enclosing scope.
///
/// `T` is the handle a match answers with. It may be a node or a deferred
/// description of one that the caller materialises after matching.
pub struct AutoWirer<'p, T> {
    direction: AutoWireDirection,
    resolver: Rc<dyn TypeResolver>,
    parent: Option<&'p AutoWirer<'p, T>>,
    targets: Vec<AutoWireTarget<T>>,
    unresolved: Rc<RefCell<BTreeSet<String>>>,
}

impl<'p, T: Clone + PartialEq> AutoWirer<'p, T> {
    /// Creates an outermost scope.
    pub fn new(direction: AutoWireDirection, resolver: Rc<dyn TypeResolver>) -> Self {
        Self {
            direction,
            resolver,
            parent: None,
            targets: Vec::new(),
            unresolved: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    /// Creates a scope nested inside this one.
    ///
    /// Queries against the nested scope consult this scope only when the
    /// nested scope has no match.
    pub fn create_scope(&self) -> AutoWirer<'_, T> {
        AutoWirer {
            direction: self.direction,
            resolver: Rc::clone(&self.resolver),
            parent: Some(self),
            targets: Vec::new(),
            unresolved: Rc::clone(&self.unresolved),
        }
    }

    /// Registers a target providing each of `auto_wires`.
    ///
    /// `label` names the target in diagnostics.
    pub fn add_target(
        &mut self,
        label: impl Into<String>,
        target: T,
        auto_wires: impl IntoIterator<Item = AutoWire>,
    ) {
        let mut auto_wires: Vec<AutoWire> = auto_wires.into_iter().collect();
        auto_wires.sort();
        auto_wires.dedup();
        self.targets.push(AutoWireTarget {
            label: label.into(),
            target,
            auto_wires,
        });
    }

    /// Number of targets registered at this scope (enclosing scopes excluded).
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Finds the single target satisfying `source_auto_wires`.
    ///
    /// Returns `None` (with an issue against `source` unless the query is
    /// [`Necessity::Optional`]) when nothing matches, and `None` with an
    /// ambiguity issue when the deciding scope and tier hold more than one
    /// distinct target.
    pub fn find_auto_wire_link(
        &self,
        source: &NodeDescriptor,
        source_auto_wires: &[AutoWire],
        necessity: Necessity,
        issues: &mut dyn CompilerIssues,
    ) -> Option<AutoWireLink<T>> {
        let mut scope = Some(self);
        while let Some(wirer) = scope {
            for tier in MatchTier::ALL {
                let candidates = wirer.candidates(tier, source, source_auto_wires, necessity, issues);
                let Some(first) = candidates.first() else {
                    continue;
                };

                let distinct: BTreeSet<usize> = candidates.iter().map(|c| c.target_index).collect();
                if distinct.len() == 1 {
                    let chosen = &wirer.targets[first.target_index];
                    debug!(
                        source = %source,
                        target = %chosen.label,
                        tier = ?tier,
                        "auto-wired"
                    );
                    return Some(AutoWireLink {
                        source_auto_wire: first.source.clone(),
                        target_auto_wire: first.target.clone(),
                        target: chosen.target.clone(),
                        target_label: chosen.label.clone(),
                    });
                }

                let mut pairs: Vec<String> = candidates
                    .iter()
                    .map(|c| {
                        format!(
                            "{} -> {} [{}]",
                            c.source, c.target, wirer.targets[c.target_index].label
                        )
                    })
                    .collect();
                pairs.sort();
                pairs.dedup();
                issues.report(
                    source,
                    format!(
                        "Duplicate auto-wire targets ({}). Please qualify to specify which target to link.",
                        pairs.join(", ")
                    ),
                );
                return None;
            }
            scope = wirer.parent;
        }

        if necessity == Necessity::Required {
            let wanted: Vec<String> = source_auto_wires.iter().map(ToString::to_string).collect();
            issues.report(
                source,
                format!("No target found by auto-wiring ({})", wanted.join(", ")),
            );
        }
        None
    }

    /// Finds every target satisfying any of `source_auto_wires`, across all
    /// tiers and scopes.
    ///
    /// Used where a source legitimately applies to many targets (an
    /// administration over every managed object offering its extension).
    /// Answers in label order; never raises an issue for absence.
    pub fn find_all_auto_wire_links(
        &self,
        source: &NodeDescriptor,
        source_auto_wires: &[AutoWire],
        issues: &mut dyn CompilerIssues,
    ) -> Vec<AutoWireLink<T>> {
        let mut links: Vec<AutoWireLink<T>> = Vec::new();
        let mut scope = Some(self);
        while let Some(wirer) = scope {
            for tier in MatchTier::ALL {
                for candidate in
                    wirer.candidates(tier, source, source_auto_wires, Necessity::Optional, issues)
                {
                    let chosen = &wirer.targets[candidate.target_index];
                    if links.iter().any(|link| link.target == chosen.target) {
                        continue;
                    }
                    links.push(AutoWireLink {
                        source_auto_wire: candidate.source,
                        target_auto_wire: candidate.target,
                        target: chosen.target.clone(),
                        target_label: chosen.label.clone(),
                    });
                }
            }
            scope = wirer.parent;
        }
        links.sort_by(|a, b| a.target_label.cmp(&b.target_label));
        links
    }

    /// Candidates at this scope only, for one tier.
    fn candidates(
        &self,
        tier: MatchTier,
        node: &NodeDescriptor,
        source_auto_wires: &[AutoWire],
        necessity: Necessity,
        issues: &mut dyn CompilerIssues,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (target_index, target) in self.targets.iter().enumerate() {
            for source in source_auto_wires {
                for provided in &target.auto_wires {
                    if tier.qualifier_matches(source, provided)
                        && self.types_match(tier, source, provided, node, necessity, issues)
                    {
                        candidates.push(Candidate {
                            target_index,
                            source: source.clone(),
                            target: provided.clone(),
                        });
                    }
                }
            }
        }
        candidates
    }

    fn types_match(
        &self,
        tier: MatchTier,
        source: &AutoWire,
        target: &AutoWire,
        node: &NodeDescriptor,
        necessity: Necessity,
        issues: &mut dyn CompilerIssues,
    ) -> bool {
        if tier.is_exact() {
            return source.type_name() == target.type_name();
        }
        let (from, to) = match self.direction {
            AutoWireDirection::SourceRequiresTarget => (target.type_name(), source.type_name()),
            AutoWireDirection::TargetCategorisesSource => (source.type_name(), target.type_name()),
        };
        match self.resolver.assignable_types(from) {
            Some(assignable) => assignable.contains(to),
            None => {
                if necessity == Necessity::Required
                    && self.unresolved.borrow_mut().insert(from.to_owned())
                {
                    issues.report(node, format!("Unable to load type {from} for auto-wiring"));
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompilerIssue, NodeKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const REPO: &str = "com.example.Repo";
    const JDBC_REPO: &str = "com.example.JdbcRepo";

    fn source() -> NodeDescriptor {
        NodeDescriptor {
            name: "repo".to_owned(),
            kind: NodeKind::FunctionObject,
            qualified_name: "OfficeA.SectionA.process.repo".to_owned(),
        }
    }

    fn hierarchy() -> Rc<dyn TypeResolver> {
        Rc::new(
            TypeHierarchy::new()
                .with(JDBC_REPO, [REPO])
                .with(REPO, Vec::<String>::new()),
        )
    }

    fn wirer() -> AutoWirer<'static, &'static str> {
        AutoWirer::new(AutoWireDirection::SourceRequiresTarget, hierarchy())
    }

    #[test]
    fn single_match_links() {
        let mut wirer = wirer();
        wirer.add_target("repo", "repo", [AutoWire::new(REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = wirer.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);

        assert_eq!(link.map(|l| l.target), Some("repo"));
        assert!(issues.is_empty());
    }

    #[test]
    fn identical_targets_are_ambiguous() {
        let mut wirer = wirer();
        wirer.add_target("repoOne", "one", [AutoWire::new(REPO)]);
        wirer.add_target("repoTwo", "two", [AutoWire::new(REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = wirer.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);

        assert_eq!(link, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].message,
            "Duplicate auto-wire targets (com.example.Repo -> com.example.Repo [repoOne], \
             com.example.Repo -> com.example.Repo [repoTwo]). \
             Please qualify to specify which target to link."
        );
    }

    #[test]
    fn inner_scope_wins_even_at_lower_tier() {
        let mut outer = wirer();
        outer.add_target("outer", "outer", [AutoWire::new(REPO)]);
        let mut inner = outer.create_scope();
        inner.add_target("inner", "inner", [AutoWire::new(JDBC_REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = inner.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);

        assert_eq!(link.map(|l| l.target), Some("inner"));
        assert!(issues.is_empty());
    }

    #[test]
    fn outer_scope_consulted_when_inner_has_nothing() {
        let mut outer = wirer();
        outer.add_target("outer", "outer", [AutoWire::new(REPO)]);
        let mut inner = outer.create_scope();
        inner.add_target("other", "other", [AutoWire::new("com.example.Other")]);
        let innermost = inner.create_scope();
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = innermost.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);

        assert_eq!(link.map(|l| l.target), Some("outer"));
    }

    #[test]
    fn inner_ambiguity_is_not_masked_by_outer() {
        let mut outer = wirer();
        outer.add_target("outer", "outer", [AutoWire::new(REPO)]);
        let mut inner = outer.create_scope();
        inner.add_target("a", "a", [AutoWire::new(REPO)]);
        inner.add_target("b", "b", [AutoWire::new(REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = inner.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Optional, &mut issues);

        assert_eq!(link, None);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.starts_with("Duplicate auto-wire targets"));
    }

    #[rstest]
    #[case::qualified_beats_default(AutoWire::qualified(Some("q"), REPO), Some("qualified"))]
    #[case::unqualified_prefers_unqualified(AutoWire::new(REPO), Some("plain"))]
    #[case::unknown_qualifier_falls_back_to_default(AutoWire::qualified(Some("x"), REPO), Some("plain"))]
    #[case::exact_default_beats_assignable_qualified(AutoWire::qualified(Some("jdbc"), REPO), Some("plain"))]
    fn tier_precedence(#[case] wanted: AutoWire, #[case] expected: Option<&'static str>) {
        let mut wirer = wirer();
        wirer.add_target("qualified", "qualified", [AutoWire::qualified(Some("q"), REPO)]);
        wirer.add_target("plain", "plain", [AutoWire::new(REPO)]);
        wirer.add_target("jdbc", "jdbc", [AutoWire::qualified(Some("jdbc"), JDBC_REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = wirer.find_auto_wire_link(&source(), &[wanted], Necessity::Required, &mut issues);

        assert_eq!(link.map(|l| l.target), expected);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn unqualified_source_never_matches_qualified_target() {
        let mut wirer = wirer();
        wirer.add_target("qualified", "qualified", [AutoWire::qualified(Some("q"), REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = wirer.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);

        assert_eq!(link, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "No target found by auto-wiring (com.example.Repo)");
    }

    #[test]
    fn optional_absence_is_silent() {
        let wirer = wirer();
        let mut issues: Vec<CompilerIssue> = Vec::new();
        let link = wirer.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Optional, &mut issues);
        assert_eq!(link, None);
        assert!(issues.is_empty());
    }

    #[test]
    fn target_categorises_source() {
        let mut teams = AutoWirer::new(AutoWireDirection::TargetCategorisesSource, hierarchy());
        teams.add_target("repoTeam", "team", [AutoWire::new(REPO)]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let link = teams.find_auto_wire_link(&source(), &[AutoWire::new(JDBC_REPO)], Necessity::Required, &mut issues);
        assert_eq!(link.map(|l| l.target), Some("team"));

        let mut reverse = wirer();
        reverse.add_target("jdbc", "jdbc", [AutoWire::new(JDBC_REPO)]);
        let link = reverse.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);
        assert_eq!(link.map(|l| l.target), Some("jdbc"));
        assert!(issues.is_empty());
    }

    #[test]
    fn unresolvable_type_reported_once() {
        let mut outer = wirer();
        outer.add_target("unknown", "unknown", [AutoWire::new("com.example.Unknown")]);
        let inner = outer.create_scope();
        let mut issues: Vec<CompilerIssue> = Vec::new();

        for _ in 0..3 {
            let link = inner.find_auto_wire_link(&source(), &[AutoWire::new(REPO)], Necessity::Required, &mut issues);
            assert_eq!(link, None);
        }

        let unresolved: Vec<&CompilerIssue> = issues
            .iter()
            .filter(|i| i.message.starts_with("Unable to load type"))
            .collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(
            unresolved[0].message,
            "Unable to load type com.example.Unknown for auto-wiring"
        );
    }

    #[test]
    fn find_all_collects_across_scopes() {
        let mut outer = wirer();
        outer.add_target("b", "b", [AutoWire::new("ext.Audit")]);
        outer.add_target("c", "c", [AutoWire::new("ext.Other")]);
        let mut inner = outer.create_scope();
        inner.add_target("a", "a", [AutoWire::new("ext.Audit")]);
        let mut issues: Vec<CompilerIssue> = Vec::new();

        let links = inner.find_all_auto_wire_links(&source(), &[AutoWire::new("ext.Audit")], &mut issues);

        let targets: Vec<&str> = links.iter().map(|l| l.target).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn hierarchy_is_transitive() {
        let types = TypeHierarchy::new()
            .with("c.C", ["c.B"])
            .with("c.B", ["c.A"]);
        let assignable = types.assignable_types("c.C").unwrap();
        assert!(assignable.contains("c.A"));
        assert!(assignable.contains("c.C"));
        assert!(types.assignable_types("c.Z").is_none());
    }
}
