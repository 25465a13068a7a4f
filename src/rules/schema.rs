//! Rule Set Schema Types
//!
//! TOML format for duplicate-sibling rule sets and the runtime form the
//! registry keeps.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Root rule set file structure (matches TOML)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuleSetFile {
    pub rule_set: RuleSetMeta,
    #[serde(default)]
    pub elements: Vec<ElementRule>,
}

/// Rule set metadata
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuleSetMeta {
    pub name: String,
    pub description: Option<String>,
    /// Root element names of the documents this set applies to
    pub roots: Vec<String>,
}

/// Children of one element kind that must not repeat
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ElementRule {
    pub element: String,
    /// Attribute used to name the owning element in messages
    #[serde(default = "default_identify_by")]
    pub identify_by: String,
    pub unique_children: Vec<String>,
}

fn default_identify_by() -> String {
    "name".to_string()
}

impl ElementRule {
    pub fn is_unique_child(&self, name: &str) -> bool {
        self.unique_children.iter().any(|child| child == name)
    }
}

/// Runtime rule set (optimized for lookups)
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub name: String,
    pub description: Option<String>,
    pub kinds: Vec<DocumentKind>,
    pub elements: HashMap<String, ElementRule>,
}

impl From<RuleSetFile> for RuleSet {
    fn from(file: RuleSetFile) -> Self {
        let kinds = file
            .rule_set
            .roots
            .iter()
            .map(|root| DocumentKind::from_root(root))
            .collect();
        let elements = file
            .elements
            .into_iter()
            .map(|rule| (rule.element.clone(), rule))
            .collect();

        Self {
            name: file.rule_set.name,
            description: file.rule_set.description,
            kinds,
            elements,
        }
    }
}

impl RuleSet {
    pub fn element(&self, name: &str) -> Option<&ElementRule> {
        self.elements.get(name)
    }
}

/// Economy file shape, detected from the root element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Types,
    Events,
    SpawnableTypes,
    EconomyCore,
    Other(String),
    /// No element found to decide from
    Unknown,
}

impl DocumentKind {
    pub fn from_root(root: &str) -> Self {
        match root.to_ascii_lowercase().as_str() {
            "types" | "type" => Self::Types,
            "events" | "event" => Self::Events,
            "spawnabletypes" => Self::SpawnableTypes,
            "economycore" => Self::EconomyCore,
            _ => Self::Other(root.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Types => "types",
            Self::Events => "events",
            Self::SpawnableTypes => "spawnabletypes",
            Self::EconomyCore => "economycore",
            Self::Other(root) => root,
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
