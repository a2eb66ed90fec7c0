//! The error tree used throughout parsing.
//!
//! The teacher crate has a flat trio of error types (`ImplementationError`,
//! `ProductionError`, `ParseError`) because a combinator-built parser only
//! ever needs to report "this static production failed here". A grammar
//! interpreted at runtime needs more: a failed alternative should be able to
//! carry along *why each of its siblings also failed*, so a human (or a
//! caller walking the tree) can see the whole decision the interpreter made.
//! [SilvaError] generalizes the teacher's error types into exactly that tree,
//! and [Severity] gives the interpreter a vocabulary for how far a failure
//! should propagate.
use crate::catalog::NameId;
use std::fmt::{Display, Formatter};

/// How far a failure should propagate before the interpreter gives up.
///
/// Ordered from least to most severe; `Ord` follows declaration order so
/// `max` picks the more severe of two severities, which is how errors
/// escalate as they're folded together (see [SilvaError::merge]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// An alternative failed but a sibling alternative may still succeed.
    Minor,
    /// A committed production failed; sibling alternatives must not be tried.
    Major,
    /// Parsing cannot continue at all (e.g. a repetition depth limit hit).
    Fatal,
    /// The grammar itself is inconsistent (unknown rule, axe validation
    /// failure, shadowed rule name). Never recoverable by retrying input.
    BrokenSeed,
    /// An internal invariant was violated; indicates a bug in this crate.
    Assert,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Fatal => "fatal",
            Severity::BrokenSeed => "broken-seed",
            Severity::Assert => "assert",
        };
        write!(f, "{s}")
    }
}

/// A parse failure, possibly carrying the failures of alternatives that were
/// tried and also failed.
#[derive(Debug, Clone)]
pub struct SilvaError {
    pub severity: Severity,
    pub message: String,
    /// Token index the failure was detected at, for positional reporting.
    pub token_index: u32,
    /// The rule (if any) that was being matched when this error occurred.
    pub rule_name: Option<NameId>,
    pub children: Vec<SilvaError>,
}

impl SilvaError {
    pub fn new(severity: Severity, token_index: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            token_index,
            rule_name: None,
            children: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule_name: NameId) -> Self {
        self.rule_name = Some(rule_name);
        self
    }

    pub fn with_children(mut self, children: Vec<SilvaError>) -> Self {
        self.children = children;
        self
    }

    /// Escalates `self` to at least `severity`, e.g. once a production's
    /// leading terminals have matched and a later failure can no longer be
    /// treated as "try the next alternative".
    pub fn escalate(mut self, severity: Severity) -> Self {
        self.severity = self.severity.max(severity);
        self
    }

    /// Renders the error tree as an indented human-readable dump.
    pub fn render(&self, ward: &crate::catalog::Ward) -> String {
        let mut out = String::new();
        self.render_into(ward, 0, &mut out);
        out
    }

    fn render_into(&self, ward: &crate::catalog::Ward, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let rule = self
            .rule_name
            .map(|n| ward.absolute(n))
            .unwrap_or_else(|| "?".to_string());
        out.push_str(&format!(
            "{indent}[{}] at token {}: {} ({})\n",
            self.severity, self.token_index, self.message, rule
        ));
        for child in &self.children {
            child.render_into(ward, depth + 1, out);
        }
    }
}

impl Display for SilvaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] at token {}: {}",
            self.severity, self.token_index, self.message
        )
    }
}

impl std::error::Error for SilvaError {}

pub type Result<T> = std::result::Result<T, SilvaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalate_only_raises_severity() {
        let e = SilvaError::new(Severity::Minor, 0, "nope");
        let e = e.escalate(Severity::Major);
        assert_eq!(e.severity, Severity::Major);
        let e = e.escalate(Severity::Minor);
        assert_eq!(e.severity, Severity::Major);
    }

    #[test]
    fn ordering_follows_declaration() {
        assert!(Severity::Minor < Severity::Major);
        assert!(Severity::Major < Severity::Fatal);
        assert!(Severity::Fatal < Severity::BrokenSeed);
        assert!(Severity::BrokenSeed < Severity::Assert);
    }
}
