//! Duplicate-Sibling Checker
//!
//! Schema-aware pass. The downstream parser maps single-value children
//! onto plain fields, so a repeated `<max>` inside one `<event>` is not a
//! syntax error but silently loses every value except the last one.
//! Which children count as single-valued depends on the document kind,
//! so the rules come from registered rule sets.

use std::collections::HashSet;
use std::fmt;

use crate::rules::{DocumentKind, ElementRule, RuleSet};
use crate::scanner::{find_attribute, Scan, TagKind};
use crate::validation::engine::Diagnostic;

/// A schema-specific validation pass
pub trait DocumentCheck: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn applies_to(&self, kind: &DocumentKind) -> bool;

    fn check(&self, scan: &Scan<'_>) -> Vec<Diagnostic>;
}

/// An owning element whose direct children are being tracked
struct OwnerFrame<'r, 'a> {
    rule: &'r ElementRule,
    element: &'a str,
    owner: &'a str,
    /// Nesting depth at which this element's direct children open
    child_depth: usize,
    seen: HashSet<&'a str>,
}

impl DocumentCheck for RuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, kind: &DocumentKind) -> bool {
        self.kinds.contains(kind)
    }

    fn check(&self, scan: &Scan<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut frames: Vec<OwnerFrame<'_, '_>> = Vec::new();
        let mut depth = 0usize;

        for tag in scan.tags() {
            if tag.kind == TagKind::Closing {
                depth = depth.saturating_sub(1);
                while frames.last().is_some_and(|f| f.child_depth > depth) {
                    frames.pop();
                }
                continue;
            }

            if let Some(frame) = frames.last_mut() {
                if depth == frame.child_depth
                    && frame.rule.is_unique_child(tag.name)
                    && !frame.seen.insert(tag.name)
                {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Found duplicate <{}> tag in {} '{}' at line {}: the parser keeps only the last occurrence, so the earlier value is silently discarded",
                            tag.name, frame.element, frame.owner, tag.line
                        ))
                        .at_line(tag.line)
                        .with_context(tag.name),
                    );
                }
            }

            if tag.kind == TagKind::Opening {
                depth += 1;
                if let Some(rule) = self.element(tag.name) {
                    frames.push(OwnerFrame {
                        rule,
                        element: tag.name,
                        owner: find_attribute(tag.raw_attributes, &rule.identify_by)
                            .unwrap_or("unknown"),
                        child_depth: depth,
                        seen: HashSet::new(),
                    });
                }
            }
        }

        diagnostics
    }
}
