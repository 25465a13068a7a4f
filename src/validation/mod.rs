//! Validation Engine
//!
//! Ordered validation passes over a scanned document. Every pass reads
//! the same segment stream and returns its own diagnostics; the engine
//! decides order and validity.

pub mod balance;
pub mod comments;
pub mod engine;
pub mod lexical;
pub mod siblings;

pub use engine::{
    validate, AmpersandSeverity, Diagnostic, Severity, Validator, ValidatorOptions,
};
pub use siblings::DocumentCheck;

// Re-export common types
pub use engine::ValidationResult;
