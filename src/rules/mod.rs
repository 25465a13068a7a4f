//! Duplicate-sibling rule sets, keyed by document kind

pub mod registry;
pub mod schema;

pub use registry::RuleRegistry;
pub use schema::{DocumentKind, ElementRule, RuleSet, RuleSetFile, RuleSetMeta};
