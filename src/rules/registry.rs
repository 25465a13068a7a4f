//! Rule Registry
//!
//! In-memory list of schema checks. Built-in rule sets are embedded in
//! the binary; user rule sets are loaded from `*.rules.toml` files and
//! replace a built-in set with the same name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::schema::{DocumentKind, ElementRule, RuleSet, RuleSetFile};
use crate::validation::DocumentCheck;

const RULE_FILE_SUFFIX: &str = ".rules.toml";

/// Registered schema checks in registration order
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    checks: Vec<Arc<dyn DocumentCheck>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the embedded `events` and `types` rule sets
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.add_embedded_rule_sets();
        registry
    }

    /// Add the rule sets embedded from `resources/rules/`
    pub fn add_embedded_rule_sets(&mut self) {
        let embedded = [
            (
                "events",
                include_str!("../../resources/rules/events.rules.toml"),
            ),
            (
                "types",
                include_str!("../../resources/rules/types.rules.toml"),
            ),
        ];

        for (name, content) in embedded {
            match toml::from_str::<RuleSetFile>(content) {
                Ok(file) => self.add_rule_set(RuleSet::from(file)),
                Err(e) => {
                    log::warn!(
                        "Failed to parse embedded '{}' rule set: {}. Using minimal fallback.",
                        name,
                        e
                    );
                    if name == "events" {
                        self.add_minimal_events_rules();
                    }
                }
            }
        }
    }

    /// Fallback covering the leaves that are most often duplicated by hand
    fn add_minimal_events_rules(&mut self) {
        let rule = ElementRule {
            element: "event".to_string(),
            identify_by: "name".to_string(),
            unique_children: ["nominal", "min", "max", "lifetime", "restock"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let mut elements = HashMap::new();
        elements.insert(rule.element.clone(), rule);

        self.add_rule_set(RuleSet {
            name: "events".to_string(),
            description: Some("Minimal fallback events rules".to_string()),
            kinds: vec![DocumentKind::Events],
            elements,
        });
    }

    /// Add a rule set, replacing any registered check with the same name
    pub fn add_rule_set(&mut self, rule_set: RuleSet) {
        self.register(Arc::new(rule_set));
    }

    /// Add any check, replacing one with the same name
    pub fn register(&mut self, check: Arc<dyn DocumentCheck>) {
        match self.checks.iter().position(|c| c.name() == check.name()) {
            Some(idx) => {
                log::debug!("replacing rule set '{}'", check.name());
                self.checks[idx] = check;
            }
            None => self.checks.push(check),
        }
    }

    /// Load a single rule set file, returning its name
    pub fn load_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file: {}", path.display()))?;
        let file: RuleSetFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse rule TOML: {}", path.display()))?;

        let rule_set = RuleSet::from(file);
        let name = rule_set.name.clone();
        self.add_rule_set(rule_set);
        Ok(name)
    }

    /// Load every `*.rules.toml` file in a directory. A missing directory
    /// loads nothing; a broken file is logged and skipped.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read rule directory: {}", dir.display()))?
        {
            let path = entry?.path();
            let is_rule_file = path
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|name| name.ends_with(RULE_FILE_SUFFIX));
            if is_rule_file {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(name) => {
                    log::info!("Loaded rule set '{}' from {}", name, path.display());
                    loaded += 1;
                }
                Err(e) => log::warn!("Skipping rule file {}: {:#}", path.display(), e),
            }
        }

        Ok(loaded)
    }

    /// List all registered check names
    pub fn list_rule_sets(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Checks that apply to a document kind, in registration order
    pub fn checks_for(&self, kind: &DocumentKind) -> Vec<&Arc<dyn DocumentCheck>> {
        self.checks.iter().filter(|c| c.applies_to(kind)).collect()
    }
}
