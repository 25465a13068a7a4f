//! Tag Balance Checker
//!
//! Stack discipline over the tag stream. A mismatched closing tag still
//! pops the stack so that one mistake does not cascade into an error for
//! every tag after it.

use crate::scanner::{Scan, TagKind};
use crate::validation::engine::Diagnostic;

/// An opening tag still waiting for its closing tag
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTagFrame<'a> {
    pub name: &'a str,
    pub line: usize,
}

pub fn check(scan: &Scan<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack: Vec<OpenTagFrame<'_>> = Vec::new();

    for tag in scan.tags() {
        match tag.kind {
            TagKind::Opening => stack.push(OpenTagFrame {
                name: tag.name,
                line: tag.line,
            }),
            TagKind::SelfClosing => {}
            TagKind::Closing => match stack.pop() {
                None => diagnostics.push(
                    Diagnostic::error(format!(
                        "Closing tag </{}> at line {} has no matching opening tag",
                        tag.name, tag.line
                    ))
                    .at_line(tag.line)
                    .with_context(tag.name),
                ),
                Some(frame) if frame.name == tag.name => {}
                Some(frame) => diagnostics.push(
                    Diagnostic::error(format!(
                        "Mismatched tags at line {}: expected </{}> (opened at line {}) but found </{}>",
                        tag.line, frame.name, frame.line, tag.name
                    ))
                    .at_line(tag.line)
                    .with_context(frame.name),
                ),
            },
        }
    }

    for frame in stack {
        diagnostics.push(
            Diagnostic::error(format!(
                "Unclosed tag <{}> opened at line {}: the element is left unclosed, add </{}>",
                frame.name, frame.line, frame.name
            ))
            .at_line(frame.line)
            .with_context(frame.name),
        );
    }

    diagnostics
}
