//! Validation Engine
//!
//! Runs the well-formedness passes over one document and aggregates their
//! diagnostics. Pure and synchronous: every call owns its own scan, stack
//! and diagnostic list, so a `Validator` can be shared across threads.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::rules::{DocumentKind, RuleRegistry};
use crate::scanner::{self, ScanError};
use crate::validation::{balance, comments, lexical};

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Validation stopped; nothing after this point was checked
    Critical,
    Error,
    Warning,
}

impl Severity {
    /// Upper-case label used when a diagnostic is flattened to text
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }

    /// Critical and Error diagnostics make a document invalid
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severities an unescaped `&` may be reported with. Critical is not one
/// of them: a Critical diagnostic always ends validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AmpersandSeverity {
    Error,
    Warning,
}

impl From<AmpersandSeverity> for Severity {
    fn from(value: AmpersandSeverity) -> Self {
        match value {
            AmpersandSeverity::Error => Severity::Error,
            AmpersandSeverity::Warning => Severity::Warning,
        }
    }
}

/// A diagnostic message for a validation issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 1-based line in the original text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Short excerpt such as the offending tag name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: None,
            context: None,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.label(), self.message)
    }
}

impl From<ScanError> for Diagnostic {
    fn from(error: ScanError) -> Self {
        let line = error.line;
        let context = error.excerpt.clone();
        Diagnostic::critical(error.to_string())
            .at_line(line)
            .with_context(context)
    }
}

/// Result of validating a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let valid = !diagnostics.iter().any(|d| d.severity.is_blocking());
        Self { valid, diagnostics }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity.is_blocking() {
            self.valid = false;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn add_critical(&mut self, message: String) {
        self.push(Diagnostic::critical(message));
    }

    pub fn add_error(&mut self, line: usize, message: String) {
        self.push(Diagnostic::error(message).at_line(line));
    }

    pub fn add_warning(&mut self, line: usize, message: String) {
        self.push(Diagnostic::warning(message).at_line(line));
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    /// Diagnostics flattened to `SEVERITY: message` strings
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_string()).collect()
    }
}

/// Tunable validation behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorOptions {
    /// Severity for a bare `&` in text content
    pub ampersand_severity: AmpersandSeverity,
    /// Stray text outside tags must be longer than this to be reported
    pub stray_text_threshold: usize,
    /// Refuse to validate input larger than this many bytes
    pub max_input_bytes: Option<usize>,
    /// Document kind to assume instead of detecting it from the root
    pub schema_override: Option<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            ampersand_severity: AmpersandSeverity::Error,
            stray_text_threshold: 10,
            max_input_bytes: None,
            schema_override: None,
        }
    }
}

/// Well-formedness validator with its options and schema rule sets
#[derive(Debug, Clone)]
pub struct Validator {
    options: ValidatorOptions,
    rules: RuleRegistry,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorOptions::default(), RuleRegistry::with_builtin_rules())
    }
}

static DEFAULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(Validator::default);

/// Validate a document with default options and the built-in rule sets
pub fn validate(text: &str) -> ValidationResult {
    DEFAULT_VALIDATOR.validate(text)
}

impl Validator {
    pub fn new(options: ValidatorOptions, rules: RuleRegistry) -> Self {
        Self { options, rules }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Validate a document. Never panics: an internal fault becomes a
    /// single Critical diagnostic.
    pub fn validate(&self, text: &str) -> ValidationResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(text))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown failure".to_string());
                log::error!("validator fault on {} byte input: {}", text.len(), reason);
                ValidationResult::from_diagnostics(vec![Diagnostic::critical(format!(
                    "Internal validator error: {}",
                    reason
                ))])
            }
        }
    }

    /// Document kind used to select rule sets
    pub fn detect_kind(&self, text: &str) -> DocumentKind {
        let root = scanner::scan(text).ok().and_then(|scan| scan.root_name());
        self.kind_of(root)
    }

    fn kind_of(&self, root: Option<&str>) -> DocumentKind {
        match (&self.options.schema_override, root) {
            (Some(name), _) => DocumentKind::from_root(name),
            (None, Some(root)) => DocumentKind::from_root(root),
            (None, None) => DocumentKind::Unknown,
        }
    }

    fn run(&self, text: &str) -> ValidationResult {
        if let Some(limit) = self.options.max_input_bytes {
            if text.len() > limit {
                return fatal(Diagnostic::critical(format!(
                    "File is too large to validate: {} bytes exceeds the limit of {} bytes",
                    text.len(),
                    limit
                )));
            }
        }

        if text.trim().is_empty() {
            return fatal(Diagnostic::critical(
                "File is empty or contains only whitespace",
            ));
        }

        // A '<' without any '>' is left to the scanner, which reports it as
        // an incomplete tag
        if !text.contains('<') {
            return fatal(Diagnostic::critical(
                "No XML tags found: the file does not contain any '<' character",
            ));
        }

        let scan = match scanner::scan(text) {
            Ok(scan) => scan,
            Err(error) => return fatal(error.into()),
        };

        if scan.tags().next().is_none() && scan.declaration().is_none() {
            return fatal(Diagnostic::critical(
                "No XML tags found: the file contains no elements, only comments or markup",
            ));
        }

        let mut diagnostics = Vec::new();
        append_pass(&mut diagnostics, "comments", comments::check(&scan));
        append_pass(&mut diagnostics, "balance", balance::check(&scan));
        append_pass(
            &mut diagnostics,
            "lexical",
            lexical::check(&scan, &self.options),
        );

        let kind = self.kind_of(scan.root_name());
        for check in self.rules.checks_for(&kind) {
            append_pass(&mut diagnostics, check.name(), check.check(&scan));
        }

        ValidationResult::from_diagnostics(diagnostics)
    }
}

fn fatal(diagnostic: Diagnostic) -> ValidationResult {
    ValidationResult::from_diagnostics(vec![diagnostic])
}

/// Append one pass's diagnostics in ascending line order
fn append_pass(all: &mut Vec<Diagnostic>, pass: &str, mut found: Vec<Diagnostic>) {
    found.sort_by_key(|d| d.line.unwrap_or(0));
    log::debug!("{} pass: {} diagnostics", pass, found.len());
    all.append(&mut found);
}
