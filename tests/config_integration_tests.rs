//! Project file and CLI flag layering
use std::fs;
use std::path::PathBuf;

use economy_xml_lint::config::{AmpersandSeverity, Config, ValidationArgs, PROJECT_CONFIG_FILE};
use tempfile::TempDir;

const SPAWNABLE_RULES: &str = r#"
[rule_set]
name = "spawnabletypes"
roots = ["spawnabletypes"]

[[elements]]
element = "type"
unique_children = ["hoarder"]
"#;

#[test]
fn test_project_config_is_loaded() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "ampersand_severity = \"warning\"\nstray_text_threshold = 25\n",
    )
    .unwrap();

    let config = Config::from_sources(&ValidationArgs::default(), project.path(), None).unwrap();

    assert!(config.has_project_config());
    assert_eq!(
        config.project_config_path,
        Some(project.path().join(PROJECT_CONFIG_FILE))
    );
    assert_eq!(config.options.ampersand_severity, AmpersandSeverity::Warning);
    assert_eq!(config.options.stray_text_threshold, 25);
}

#[test]
fn test_cli_flags_override_project_config() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "ampersand_severity = \"warning\"\nmax_input_bytes = 100\n",
    )
    .unwrap();

    let args = ValidationArgs {
        ampersand_severity: Some(AmpersandSeverity::Error),
        max_input_bytes: Some(5000),
        schema: Some("types".to_string()),
        ..ValidationArgs::default()
    };
    let config = Config::from_sources(&args, project.path(), None).unwrap();

    assert_eq!(config.options.ampersand_severity, AmpersandSeverity::Error);
    assert_eq!(config.options.max_input_bytes, Some(5000));
    assert_eq!(config.options.schema_override.as_deref(), Some("types"));
}

#[test]
fn test_rule_directories_in_priority_order() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "rules_dirs = [\"econ-rules\"]\n",
    )
    .unwrap();

    let args = ValidationArgs {
        rules_dir: vec![PathBuf::from("/opt/cli-rules")],
        ..ValidationArgs::default()
    };
    let user_dir = PathBuf::from("/home/user/.config/econ-xml-lint/rules");
    let config = Config::from_sources(&args, project.path(), Some(user_dir.clone())).unwrap();

    assert_eq!(
        config.rules_dirs,
        vec![
            user_dir,
            project.path().join("econ-rules"),
            PathBuf::from("/opt/cli-rules"),
        ]
    );
}

#[test]
fn test_critical_ampersand_severity_is_refused() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "ampersand_severity = \"critical\"\n",
    )
    .unwrap();

    let err = Config::from_sources(&ValidationArgs::default(), project.path(), None).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_invalid_project_config_is_an_error() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "ampersand_severity = \"loud\"\n",
    )
    .unwrap();

    let err = Config::from_sources(&ValidationArgs::default(), project.path(), None).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_project_rules_reach_the_validator() {
    let project = TempDir::new().unwrap();
    let rules_dir = project.path().join("econ-rules");
    fs::create_dir(&rules_dir).unwrap();
    fs::write(rules_dir.join("spawnable.rules.toml"), SPAWNABLE_RULES).unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "rules_dirs = [\"econ-rules\"]\n",
    )
    .unwrap();

    let config = Config::from_sources(&ValidationArgs::default(), project.path(), None).unwrap();
    let registry = config.build_registry();
    assert!(registry.list_rule_sets().contains(&"spawnabletypes"));

    let result = config.validator().validate(
        "<spawnabletypes><type name=\"Mosin\"><hoarder/><hoarder/></type></spawnabletypes>",
    );
    assert!(!result.valid);
    assert!(result.messages()[0].contains("duplicate <hoarder>"));
}

#[test]
fn test_missing_rule_directory_is_ignored() {
    let project = TempDir::new().unwrap();
    let args = ValidationArgs {
        rules_dir: vec![project.path().join("does-not-exist")],
        ..ValidationArgs::default()
    };
    let config = Config::from_sources(&args, project.path(), None).unwrap();

    assert_eq!(config.build_registry().list_rule_sets(), vec!["events", "types"]);
}
