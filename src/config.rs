//! Configuration management for the economy XML linter.
//!
//! Handles:
//! - Command-line argument parsing
//! - The project file `.econ-xml-lint.toml`
//! - Rule-set directory discovery

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::OutputFormat;
use crate::rules::RuleRegistry;
pub use crate::validation::AmpersandSeverity;
use crate::validation::{Validator, ValidatorOptions};

pub const PROJECT_CONFIG_FILE: &str = ".econ-xml-lint.toml";
const APP_DIR: &str = "econ-xml-lint";

/// Command-line arguments for the economy XML linter
#[derive(Debug, Parser)]
#[command(name = "econ-xml-lint")]
#[command(about = "Well-formedness linter for game-server economy XML files")]
#[command(version)]
pub struct Args {
    /// Log level
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate files (stdin when none are given or for `-`)
    Check(CheckArgs),
    /// Run the language server on stdio
    Serve(ServeArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    pub files: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Skip the structural parser stage
    #[arg(long)]
    pub no_parse: bool,

    #[command(flatten)]
    pub validation: ValidationArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub validation: ValidationArgs,
}

/// Flags shared by every command that validates
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ValidationArgs {
    /// Severity of an unescaped `&` in text content
    #[arg(long, value_enum)]
    pub ampersand_severity: Option<AmpersandSeverity>,

    /// Treat every input as this document kind (e.g. `events`)
    #[arg(long)]
    pub schema: Option<String>,

    /// Extra directory of `*.rules.toml` files
    #[arg(long, help = "Directory containing rule set TOML files")]
    pub rules_dir: Vec<PathBuf>,

    /// Refuse inputs larger than this many bytes
    #[arg(long)]
    pub max_input_bytes: Option<usize>,
}

/// Contents of `.econ-xml-lint.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub ampersand_severity: Option<AmpersandSeverity>,
    pub stray_text_threshold: Option<usize>,
    pub max_input_bytes: Option<usize>,
    /// Relative entries resolve against the config file's directory
    pub rules_dirs: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Load `.econ-xml-lint.toml` from `dir`, if present
    pub fn load(dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let path = dir.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(Some((config, path)))
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub options: ValidatorOptions,
    /// Rule directories, lowest priority first
    pub rules_dirs: Vec<PathBuf>,
    pub project_config_path: Option<PathBuf>,
}

impl Config {
    /// Configuration for validation flags, reading the project file from
    /// the current directory
    pub fn from_validation_args(args: &ValidationArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::from_sources(args, &cwd, user_rules_dir())
    }

    /// Create configuration from explicit sources (useful for testing).
    /// CLI flags win over the project file.
    pub fn from_sources(
        args: &ValidationArgs,
        project_dir: &Path,
        user_rules_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let project = ProjectConfig::load(project_dir)?;

        let mut options = ValidatorOptions::default();
        let mut rules_dirs = Vec::new();
        let mut project_config_path = None;

        // Lowest priority: user global rules
        rules_dirs.extend(user_rules_dir);

        if let Some((project, path)) = project {
            if let Some(severity) = project.ampersand_severity {
                options.ampersand_severity = severity;
            }
            if let Some(threshold) = project.stray_text_threshold {
                options.stray_text_threshold = threshold;
            }
            options.max_input_bytes = project.max_input_bytes;

            let base = path.parent().unwrap_or(project_dir);
            rules_dirs.extend(project.rules_dirs.iter().map(|dir| base.join(dir)));
            project_config_path = Some(path);
        }

        if let Some(severity) = args.ampersand_severity {
            options.ampersand_severity = severity;
        }
        if args.max_input_bytes.is_some() {
            options.max_input_bytes = args.max_input_bytes;
        }
        options.schema_override = args.schema.clone();
        rules_dirs.extend(args.rules_dir.iter().cloned());

        Ok(Config {
            options,
            rules_dirs,
            project_config_path,
        })
    }

    pub fn has_project_config(&self) -> bool {
        self.project_config_path.is_some()
    }

    /// Built-in rule sets plus every configured rule directory. Later
    /// directories replace rule sets of the same name.
    pub fn build_registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::with_builtin_rules();
        for dir in &self.rules_dirs {
            match registry.load_dir(dir) {
                Ok(0) => {}
                Ok(count) => log::debug!("{} rule sets from {}", count, dir.display()),
                Err(e) => log::warn!("Failed to load rules from {}: {:#}", dir.display(), e),
            }
        }
        registry
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.options.clone(), self.build_registry())
    }
}

/// `<config_dir>/econ-xml-lint/rules`
pub fn user_rules_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("rules"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let args = Args::try_parse_from([
            "econ-xml-lint",
            "check",
            "types.xml",
            "--format",
            "json",
            "--ampersand-severity",
            "warning",
            "--rules-dir",
            "rules",
        ])
        .unwrap();

        assert_eq!(args.log_level, "info");
        let Command::Check(check) = args.command else {
            panic!("expected check command");
        };
        assert_eq!(check.files, vec![PathBuf::from("types.xml")]);
        assert_eq!(check.format, OutputFormat::Json);
        assert!(!check.no_parse);
        assert_eq!(
            check.validation.ampersand_severity,
            Some(AmpersandSeverity::Warning)
        );
        assert_eq!(check.validation.rules_dir, vec![PathBuf::from("rules")]);
    }

    #[test]
    fn test_parse_serve_command() {
        let args = Args::try_parse_from(["econ-xml-lint", "--log-level", "debug", "serve"]).unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, Command::Serve(_)));
    }

    #[test]
    fn test_defaults_without_project_file() {
        let dir = std::env::temp_dir().join("econ-xml-lint-no-such-project");
        let config = Config::from_sources(&ValidationArgs::default(), &dir, None).unwrap();

        assert!(!config.has_project_config());
        assert_eq!(config.options, ValidatorOptions::default());
        assert!(config.rules_dirs.is_empty());
    }

    #[test]
    fn test_project_config_parsing() {
        let config: ProjectConfig = toml::from_str(
            r#"
ampersand_severity = "warning"
stray_text_threshold = 20
rules_dirs = ["rules"]
"#,
        )
        .unwrap();

        assert_eq!(config.ampersand_severity, Some(AmpersandSeverity::Warning));
        assert_eq!(config.stray_text_threshold, Some(20));
        assert_eq!(config.max_input_bytes, None);
    }

    #[test]
    fn test_critical_ampersand_severity_rejected() {
        let err = toml::from_str::<ProjectConfig>("ampersand_severity = \"critical\"").unwrap_err();
        assert!(err.to_string().contains("critical"));
        assert!(Args::try_parse_from([
            "econ-xml-lint",
            "check",
            "--ampersand-severity",
            "critical",
        ])
        .is_err());
    }

    #[test]
    fn test_unknown_project_key_rejected() {
        assert!(toml::from_str::<ProjectConfig>("root_kind = \"events\"").is_err());
    }
}
