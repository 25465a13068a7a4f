//! Economy XML Lint
//!
//! Well-formedness validation for game-server economy XML files
//! (`types.xml`, `events.xml` and friends), run before any schema-level
//! parsing so that broken files are reported with line-numbered,
//! human-readable diagnostics instead of a bare parser error.
//!
//! This library provides:
//! - A single-pass tag scanner
//! - Ordered validation passes and the `validate` entry point
//! - Pluggable duplicate-sibling rule sets per document kind
//! - A structural parser boundary and report rendering
//! - An LSP host and configuration management

pub mod config;
pub mod lsp;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod structural;
pub mod validation;

// Re-exports for clean public API
pub use config::Config;
pub use rules::{DocumentKind, RuleRegistry, RuleSet};
pub use structural::{validate_and_parse, RoxmlParser, StructuralParser, XmlDocument};
pub use validation::{
    validate, AmpersandSeverity, Diagnostic, Severity, ValidationResult, Validator,
    ValidatorOptions,
};
