//! Rendering of validation results for terminal and machine consumers

use serde::Serialize;

use crate::validation::{Severity, ValidationResult};

/// Output format of the `check` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One validated input, named for display
#[derive(Debug, Clone, Serialize)]
pub struct FileReport<'a> {
    pub source: &'a str,
    #[serde(flatten)]
    pub result: &'a ValidationResult,
}

/// Human readable report, grouped by severity
pub fn render_text(report: &FileReport<'_>) -> String {
    let result = report.result;
    let mut out = String::new();

    if result.diagnostics.is_empty() {
        out.push_str(&format!("{}: valid\n", report.source));
        return out;
    }

    let status = if result.is_valid() { "valid" } else { "invalid" };
    out.push_str(&format!(
        "{}: {} ({} critical, {} errors, {} warnings)\n",
        report.source,
        status,
        result.count(Severity::Critical),
        result.count(Severity::Error),
        result.count(Severity::Warning),
    ));

    for severity in [Severity::Critical, Severity::Error, Severity::Warning] {
        for diagnostic in result.with_severity(severity) {
            out.push_str(&format!("  {}\n", diagnostic));
        }
    }

    out
}

/// Machine readable report for every input at once
pub fn render_json(reports: &[FileReport<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    #[test]
    fn test_text_for_clean_file() {
        let result = validate("<types/>");
        let text = render_text(&FileReport {
            source: "types.xml",
            result: &result,
        });
        assert_eq!(text, "types.xml: valid\n");
    }

    #[test]
    fn test_text_groups_by_severity() {
        let result = validate("<?xml version=\"1.0\"?>\n<d>a & b</d>");
        let text = render_text(&FileReport {
            source: "d.xml",
            result: &result,
        });

        assert!(text.starts_with("d.xml: invalid (0 critical, 1 errors, 1 warnings)"));
        let error = text.find("ERROR:").unwrap();
        let warning = text.find("WARNING:").unwrap();
        assert!(error < warning);
    }

    #[test]
    fn test_json_shape() {
        let result = validate("");
        let json = render_json(&[FileReport {
            source: "empty.xml",
            result: &result,
        }])
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["source"], "empty.xml");
        assert_eq!(value[0]["valid"], false);
        assert_eq!(value[0]["diagnostics"][0]["severity"], "critical");
        assert!(value[0]["diagnostics"][0].get("line").is_none());
    }
}
