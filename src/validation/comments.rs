//! Comment and declaration checks

use crate::scanner::{parse_attributes, RegionKind, Scan};
use crate::validation::engine::Diagnostic;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

pub fn check(scan: &Scan<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_comment_balance(scan, &mut diagnostics);
    check_comment_content(scan, &mut diagnostics);
    check_declaration(scan, &mut diagnostics);
    check_encoding(scan, &mut diagnostics);
    diagnostics
}

/// Counts only: with unbalanced markers there is no reliable way to tell
/// which block is the broken one.
fn check_comment_balance(scan: &Scan<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let opened = scan.source.matches(COMMENT_OPEN).count();
    let closed = scan.source.matches(COMMENT_CLOSE).count();

    if opened != closed {
        diagnostics.push(
            Diagnostic::error(format!(
                "Mismatched comment blocks: found {} opening '{}' but {} closing '{}' (unclosed comment)",
                opened, COMMENT_OPEN, closed, COMMENT_CLOSE
            ))
            .with_context(format!("{} vs {}", opened, closed)),
        );
    }
}

fn check_comment_content(scan: &Scan<'_>, diagnostics: &mut Vec<Diagnostic>) {
    for comment in scan
        .regions()
        .filter(|r| r.kind == RegionKind::Comment && r.terminated)
    {
        if let Some(idx) = comment.body().find("--") {
            let line = scan.lines.line_of(comment.start + COMMENT_OPEN.len() + idx);
            diagnostics.push(
                Diagnostic::error(format!(
                    "Invalid comment content at line {}: '--' is not allowed inside a comment",
                    line
                ))
                .at_line(line),
            );
        }
    }
}

fn check_declaration(scan: &Scan<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let Some(declaration) = scan.declaration() else {
        return;
    };

    let attributes = parse_attributes(declaration.body());
    let has = |name: &str| attributes.iter().any(|a| a.name == name);

    if !has("version") {
        diagnostics.push(
            Diagnostic::error(format!(
                "XML declaration at line {} is missing the required version attribute",
                declaration.line
            ))
            .at_line(declaration.line),
        );
    }

    if !has("encoding") {
        diagnostics.push(
            Diagnostic::warning(format!(
                "XML declaration at line {} has no encoding attribute; add encoding=\"UTF-8\"",
                declaration.line
            ))
            .at_line(declaration.line),
        );
    }
}

fn check_encoding(scan: &Scan<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let body = scan.source.trim_start_matches('\u{FEFF}');
    let Some(first) = body.find(|c: char| !c.is_ascii()) else {
        return;
    };

    let declared = scan.declaration().and_then(|decl| {
        parse_attributes(decl.body())
            .into_iter()
            .find(|a| a.name == "encoding")
            .and_then(|a| a.quoted_value())
    });

    let message = match declared {
        Some(encoding) if is_utf8(encoding) => return,
        Some(encoding) => format!(
            "File contains non-ASCII characters but declares encoding '{}'; characters may be misread unless the file is saved as UTF-8",
            encoding
        ),
        None => "File contains non-ASCII characters but declares no UTF-8 encoding; characters may be misread".to_string(),
    };

    let offset = scan.source.len() - body.len() + first;
    diagnostics.push(Diagnostic::warning(message).at_line(scan.lines.line_of(offset)));
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}
