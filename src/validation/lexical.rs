//! Lexical rules
//!
//! Per-token checks that need no nesting information: tag names,
//! attribute syntax, entity escapes in text and text that sits outside
//! every element.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::{AttributeValue, Scan, Segment, TagKind, TagToken, TextRun};
use crate::validation::engine::{Diagnostic, ValidatorOptions};

const EXCERPT_CHARS: usize = 100;
const PREDEFINED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}_.\-]*$").expect("tag name pattern is valid")
});

pub fn check(scan: &Scan<'_>, options: &ValidatorOptions) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // A bad name already reported on its opening tag is not repeated on
    // the closing tag
    let mut flagged_names = HashSet::new();
    for tag in scan.tags() {
        if tag.kind == TagKind::Closing {
            if !flagged_names.contains(tag.name) && !check_tag_name(tag, &mut diagnostics) {
                flagged_names.insert(tag.name);
            }
            check_closing_tag(tag, &mut diagnostics);
        } else {
            if !check_tag_name(tag, &mut diagnostics) {
                flagged_names.insert(tag.name);
            }
            check_attributes(tag, &mut diagnostics);
        }
    }

    for text in scan.texts() {
        check_ampersands(scan, text, options, &mut diagnostics);
    }

    for run in stray_text(scan, options.stray_text_threshold) {
        let excerpt: String = run.text.trim().chars().take(EXCERPT_CHARS).collect();
        let line = text_line(scan, run);
        diagnostics.push(
            Diagnostic::error(format!(
                "Found invalid text content outside of tags at line {}: '{}'",
                line, excerpt
            ))
            .at_line(line),
        );
    }

    diagnostics
}

/// Returns false when the name was reported
fn check_tag_name(tag: &TagToken<'_>, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let name = tag.name;
    let slash = if tag.kind == TagKind::Closing { "/" } else { "" };
    let message = if name.ends_with('-') {
        format!(
            "Invalid tag name '<{}{}>' at line {}: tag names must not end with a hyphen",
            slash, name, tag.line
        )
    } else if !TAG_NAME.is_match(name) {
        format!(
            "Invalid tag name '<{}{}>' at line {}: tag names must start with a letter or underscore and contain only letters, digits, hyphens, underscores or periods",
            slash, name, tag.line
        )
    } else {
        return true;
    };

    diagnostics.push(
        Diagnostic::error(message)
            .at_line(tag.line)
            .with_context(name),
    );
    false
}

fn check_closing_tag(tag: &TagToken<'_>, diagnostics: &mut Vec<Diagnostic>) {
    if tag.raw_attributes.is_empty() {
        return;
    }
    diagnostics.push(
        Diagnostic::error(format!(
            "Malformed closing tag </{}> at line {}: closing tags must not carry attributes, found '{}'",
            tag.name, tag.line, tag.raw_attributes
        ))
        .at_line(tag.line)
        .with_context(tag.name),
    );
}

fn check_attributes(tag: &TagToken<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let attributes = tag.attributes();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for attribute in &attributes {
        if attribute.name.is_empty() {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Malformed attribute in <{}> at line {}: '=' without an attribute name",
                    tag.name, tag.line
                ))
                .at_line(tag.line)
                .with_context(tag.name),
            );
            continue;
        }

        let problem = match attribute.value {
            AttributeValue::Quoted(_) => None,
            AttributeValue::Unquoted(value) => Some(format!(
                "value '{}' must be quoted (enclose it in double or single quotes)",
                value
            )),
            AttributeValue::Unterminated(_) => Some(
                "value has an opening quote but no closing one; enclose it in matching quotes"
                    .to_string(),
            ),
            AttributeValue::Missing => Some(
                "attribute has no value; use name=\"value\" with the value in quotes".to_string(),
            ),
        };
        if let Some(problem) = problem {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Malformed attribute '{}' in <{}> at line {}: {}",
                    attribute.name, tag.name, tag.line, problem
                ))
                .at_line(tag.line)
                .with_context(attribute.name),
            );
        }

        if !seen.insert(attribute.name) && reported.insert(attribute.name) {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Duplicate attribute '{}' in <{}> at line {}: remove the duplicate attribute, only the last value would be kept",
                    attribute.name, tag.name, tag.line
                ))
                .at_line(tag.line)
                .with_context(attribute.name),
            );
        }
    }
}

fn check_ampersands(
    scan: &Scan<'_>,
    text: &TextRun<'_>,
    options: &ValidatorOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (idx, _) in text.text.match_indices('&') {
        if is_reference(&text.text[idx + 1..]) {
            continue;
        }
        let line = scan.lines.line_of(text.start + idx);
        diagnostics.push(
            Diagnostic::new(
                options.ampersand_severity.into(),
                format!(
                    "Unescaped ampersand at line {}: use &amp; instead of a bare '&'",
                    line
                ),
            )
            .at_line(line),
        );
    }
}

/// True if `after` (the text following a `&`) starts a predefined entity
/// or a numeric character reference. Only the reference name itself is
/// looked at, never the rest of the text run.
fn is_reference(after: &str) -> bool {
    let Some(end) = after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '#')) else {
        return false;
    };
    if !after[end..].starts_with(';') {
        return false;
    }
    let name = &after[..end];

    if PREDEFINED_ENTITIES.contains(&name) {
        return true;
    }

    match name.strip_prefix('#') {
        Some(hex) if hex.starts_with('x') || hex.starts_with('X') => {
            hex.len() > 1 && hex[1..].chars().all(|c| c.is_ascii_hexdigit())
        }
        Some(dec) => !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Text runs outside every element that look like real words rather
/// than leftover numbers or punctuation
pub fn stray_text<'s, 'a>(scan: &'s Scan<'a>, threshold: usize) -> Vec<&'s TextRun<'a>> {
    let mut depth = 0usize;
    let mut found = Vec::new();

    for segment in &scan.segments {
        match segment {
            Segment::Tag(tag) => match tag.kind {
                TagKind::Opening => depth += 1,
                TagKind::Closing => depth = depth.saturating_sub(1),
                TagKind::SelfClosing => {}
            },
            Segment::Text(run) if depth == 0 && looks_like_words(run.text, threshold) => {
                found.push(run)
            }
            _ => {}
        }
    }

    found
}

fn looks_like_words(text: &str, threshold: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() <= threshold {
        return false;
    }

    let mut letters = 0;
    for c in trimmed.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if letters >= 3 {
                return true;
            }
        } else {
            letters = 0;
        }
    }
    false
}

/// Line of the first non-whitespace character in a run
fn text_line(scan: &Scan<'_>, run: &TextRun<'_>) -> usize {
    let leading = run.text.len() - run.text.trim_start().len();
    scan.lines.line_of(run.start + leading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use crate::validation::engine::{AmpersandSeverity, Severity};

    fn run(source: &str) -> Vec<Diagnostic> {
        check(&scan(source).unwrap(), &ValidatorOptions::default())
    }

    #[test]
    fn test_valid_names_and_attributes() {
        let source = r#"<types><type name="AK_74" category='weapons'><item.v2 x="1"/><_x/></type></types>"#;
        assert!(run(source).is_empty());
    }

    #[test]
    fn test_trailing_hyphen_has_own_message() {
        let diagnostics = run("<a>\n<nominal->5</nominal->\n</a>");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Invalid tag name"));
        assert!(diagnostics[0].message.contains("hyphen"));
        assert_eq!(diagnostics[0].line, Some(2));
    }

    #[test]
    fn test_invalid_characters_in_name() {
        let diagnostics = run("<a><1abc/><b$c/></a>");

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.message.contains("Invalid tag name") && !d.message.contains("hyphen")));
    }

    #[test]
    fn test_non_ascii_letters_allowed_in_names() {
        assert!(run("<ä><straße/></ä>").is_empty());
    }

    #[test]
    fn test_unquoted_value() {
        let diagnostics = run("<types><type id=5/></types>");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Malformed attribute 'id'"));
        assert!(diagnostics[0].message.contains("quotes"));
    }

    #[test]
    fn test_missing_values() {
        let diagnostics = run("<a x= ><b y></b></a>");

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.message.contains("Malformed attribute")));
    }

    #[test]
    fn test_duplicate_attribute_reported_once() {
        let diagnostics = run(r#"<types><type name="X" name="Y" name="Z"/></types>"#);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Duplicate attribute 'name'"));
    }

    #[test]
    fn test_bare_ampersand_uses_configured_severity() {
        let scan = scan("<d>\nValue & More\n</d>").unwrap();

        let diagnostics = check(&scan, &ValidatorOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(diagnostics[0].message.contains("ampersand"));
        assert_eq!(diagnostics[0].line, Some(2));

        let lenient = ValidatorOptions {
            ampersand_severity: AmpersandSeverity::Warning,
            ..ValidatorOptions::default()
        };
        assert_eq!(check(&scan, &lenient)[0].severity, Severity::Warning);
    }

    #[test]
    fn test_entity_references_accepted() {
        let source = "<d>&amp; &lt; &gt; &quot; &apos; &#38; &#x26;</d>";
        assert!(run(source).is_empty());
    }

    #[test]
    fn test_ampersand_in_comment_or_cdata_ignored() {
        assert!(run("<d><!-- a & b --><![CDATA[c & d]]></d>").is_empty());
    }

    #[test]
    fn test_reference_name_ends_at_first_non_name_char() {
        assert!(is_reference("amp; and more"));
        assert!(is_reference("#x26;"));
        assert!(!is_reference("amp and more;"));
        assert!(!is_reference("amp"));
        assert!(!is_reference(" & lt;"));
    }

    #[test]
    fn test_many_bare_ampersands_in_one_run() {
        let text = format!("<d>{};</d>", "Salt & Pepper ".repeat(5_000));
        let diagnostics = run(&text);
        assert_eq!(diagnostics.len(), 5_000);
    }

    #[test]
    fn test_closing_tag_with_attributes() {
        let diagnostics = run("<a>x</a foo=\"1\">");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Malformed closing tag </a>"));
        assert!(diagnostics[0].message.contains("foo=\"1\""));
    }

    #[test]
    fn test_closing_tag_whitespace_is_fine() {
        assert!(run("<a>x</a >").is_empty());
    }

    #[test]
    fn test_invalid_closing_tag_name() {
        let diagnostics = run("<a>\n</1a>\n</a>");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Invalid tag name '</1a>'"));
        assert_eq!(diagnostics[0].line, Some(2));
    }

    #[test]
    fn test_unknown_entity_is_unescaped() {
        assert_eq!(run("<d>&nbsp;</d>").len(), 1);
        assert_eq!(run("<d>&#xZZ;</d>").len(), 1);
    }

    #[test]
    fn test_stray_text_between_elements() {
        let source = "<types>\n</types>\nefvnervnoeboem garbage\n";
        let diagnostics = run(source);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("invalid text content outside of tags"));
        assert!(diagnostics[0].message.contains("efvnervnoeboem"));
        assert_eq!(diagnostics[0].line, Some(3));
    }

    #[test]
    fn test_short_or_numeric_leftovers_ignored() {
        assert!(run("<a/>\n12345678901234567890\n<b/>").is_empty());
        assert!(run("<a/> abc <b/>").is_empty());
    }

    #[test]
    fn test_text_inside_elements_is_not_stray() {
        assert!(run("<a>this is long element text</a>").is_empty());
    }

    #[test]
    fn test_stray_text_excerpt_truncated() {
        let long = "word".repeat(60);
        let diagnostics = run(&format!("<a/>{}", long));
        let excerpt = diagnostics[0].message.split('\'').nth(1).unwrap();
        assert_eq!(excerpt.chars().count(), 100);
    }

    #[test]
    fn test_stray_text_is_stable() {
        let scan = scan("<a/>\nsome stray words here\n<b/>").unwrap();
        let first: Vec<_> = stray_text(&scan, 10).iter().map(|r| r.start).collect();
        let second: Vec<_> = stray_text(&scan, 10).iter().map(|r| r.start).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
