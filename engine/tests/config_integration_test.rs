//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded,
//! validated, and processed with path expansion and canonicalization, and
//! that a loaded config drives the registry and conductor.

use conductor_engine::config::Config;
use conductor_engine::modules::InMemoryPreferences;
use conductor_engine::registry::ModuleRegistry;
use conductor_engine::scheduler::DependencyPolicy;
use conductor_engine::Conductor;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("work");
    let path = write_config(
        &temp,
        &format!(
            r#"
[core]
workspace = "{}"
log_level = "debug"

[modules]
enabled = ["memory_tools"]

[permissions]
require_confirmation = false
auto_approve_read_only = false

[execution]
timeout_secs = 45
max_plan_steps = 4
dependency_failure = "skip"
"#,
            workspace.display()
        ),
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.modules.enabled, vec!["memory_tools".to_string()]);
    assert!(!config.permissions.require_confirmation);
    assert!(!config.permissions.auto_approve_read_only);
    assert_eq!(config.execution.timeout(), Some(Duration::from_secs(45)));
    assert_eq!(config.execution.max_plan_steps, 4);
    assert_eq!(config.execution.dependency_failure, DependencyPolicy::Skip);

    // The workspace is created and canonicalized
    assert!(workspace.is_dir());
    assert_eq!(config.core.workspace, workspace.canonicalize().unwrap());
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        &format!("[core]\nworkspace = \"{}\"\n", temp.path().display()),
    );

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(
        config.modules.enabled,
        vec!["system_control".to_string(), "memory_tools".to_string()]
    );
    assert!(config.permissions.require_confirmation);
    assert!(config.permissions.auto_approve_read_only);
    assert_eq!(config.execution.timeout(), Some(Duration::from_secs(300)));
    assert_eq!(config.execution.max_plan_steps, 10);
    assert_eq!(config.execution.dependency_failure, DependencyPolicy::Attempt);
}

#[test]
fn test_zero_timeout_disables_it() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        &format!(
            "[core]\nworkspace = \"{}\"\n\n[execution]\ntimeout_secs = 0\n",
            temp.path().display()
        ),
    );

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.execution.timeout(), None);
}

#[test]
fn test_invalid_configs_rejected() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().display().to_string();

    let cases = [
        format!("[core]\nworkspace = \"{}\"\nlog_level = \"loud\"\n", workspace),
        format!(
            "[core]\nworkspace = \"{}\"\n\n[modules]\nenabled = [\"telepathy\"]\n",
            workspace
        ),
        format!(
            "[core]\nworkspace = \"{}\"\n\n[execution]\nmax_plan_steps = 0\n",
            workspace
        ),
        format!(
            "[core]\nworkspace = \"{}\"\n\n[execution]\ndependency_failure = \"maybe\"\n",
            workspace
        ),
        "[modules]\nenabled = []\n".to_string(),
    ];

    for body in cases {
        let path = write_config(&temp, &body);
        assert!(
            Config::load_from_path(&path).is_err(),
            "config should be rejected:\n{}",
            body
        );
    }
}

#[test]
fn test_workspace_must_be_a_directory() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("not_a_dir");
    fs::write(&file, "x").unwrap();
    let path = write_config(&temp, &format!("[core]\nworkspace = \"{}\"\n", file.display()));

    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = Config::load_from_path(&temp.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_config_drives_registry_and_conductor() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        &format!(
            "[core]\nworkspace = \"{}\"\n\n[modules]\nenabled = [\"memory_tools\"]\n\n[execution]\nmax_plan_steps = 2\n",
            temp.path().display()
        ),
    );
    let config = Config::load_from_path(&path).unwrap();

    let registry =
        ModuleRegistry::from_config(&config, Arc::new(InMemoryPreferences::new())).unwrap();
    assert_eq!(registry.module_names(), vec!["memory_tools"]);
    assert!(registry.resolve("system_control.scan_directory").is_err());

    let conductor = Conductor::from_config(&config, Arc::new(registry));
    let names: Vec<String> = conductor
        .capabilities()
        .into_iter()
        .map(|c| c.full_name)
        .collect();
    assert!(names.contains(&"memory_tools.log_message".to_string()));
    assert!(names.iter().all(|n| n.starts_with("memory_tools.")));
}
