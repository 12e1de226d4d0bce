//! Configuration management
//!
//! This module handles loading, validation, and management of the Conductor configuration.
//! Configuration is stored in TOML format at ~/.conductor/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path and log level
//! - **modules**: Which built-in capability modules are registered
//! - **permissions**: Confirmation gate policy
//! - **execution**: Plan timeout, plan size limit and dependency failure policy
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the workspace to resolve symlinks and .. patterns
//! - Creates the workspace directory if it doesn't exist
//!
//! # Examples
//!
//! ```no_run
//! use conductor_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Modules: {:?}", config.modules.enabled);
//! # Ok(())
//! # }
//! ```

use crate::modules::BUILTIN_MODULES;
use crate::scheduler::{DependencyPolicy, PermissionPolicy};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Only `[core]` is required; every other section falls back to its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Capability module enablement
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Confirmation gate policy
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Plan execution limits
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory filesystem modules are confined to (supports ~ expansion)
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Module enablement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Names of the built-in modules to register
    #[serde(default = "default_enabled_modules")]
    pub enabled: Vec<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_modules(),
        }
    }
}

/// Permission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Ask before running steps of modules that require confirmation
    #[serde(default = "default_true")]
    pub require_confirmation: bool,

    /// Skip the question for read-only capabilities
    #[serde(default = "default_true")]
    pub auto_approve_read_only: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            auto_approve_read_only: true,
        }
    }
}

impl PermissionsConfig {
    pub fn policy(&self) -> PermissionPolicy {
        PermissionPolicy {
            require_confirmation: self.require_confirmation,
            auto_approve_read_only: self.auto_approve_read_only,
        }
    }
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Plan-wide time budget in seconds (0 disables it)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest plan the validator accepts
    #[serde(default = "default_max_plan_steps")]
    pub max_plan_steps: usize,

    /// What happens to steps whose dependencies failed
    #[serde(default)]
    pub dependency_failure: DependencyPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_plan_steps: default_max_plan_steps(),
            dependency_failure: DependencyPolicy::default(),
        }
    }
}

impl ExecutionConfig {
    /// The plan timeout, or `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_enabled_modules() -> Vec<String> {
    vec!["system_control".to_string(), "memory_tools".to_string()]
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_plan_steps() -> usize {
    10
}

impl Config {
    /// Load configuration from the default location (~/.conductor/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (invalid paths, unknown modules, bad limits)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load an explicit path if given, otherwise the default location
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_or_create(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Default configuration rooted at `workspace`, validated
    pub fn with_workspace(workspace: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let mut config = Self::default_config();
        config.core.workspace = workspace.into();
        config.validate_and_process()?;
        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.conductor/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".conductor").join("config.toml"))
    }

    /// Create a default configuration
    fn default_config() -> Self {
        Self {
            core: CoreConfig {
                workspace: PathBuf::from("~/conductor"),
                log_level: default_log_level(),
            },
            modules: ModulesConfig::default(),
            permissions: PermissionsConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Checks the log level, module names and limits, then expands,
    /// creates and canonicalizes the workspace.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        for name in &self.modules.enabled {
            if !BUILTIN_MODULES.contains(&name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Unknown module '{}' in modules.enabled. Must be one of: {}",
                    name,
                    BUILTIN_MODULES.join(", ")
                )));
            }
        }

        if self.execution.max_plan_steps == 0 {
            return Err(EngineError::Config(
                "max_plan_steps must be at least 1".to_string(),
            ));
        }

        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }
    path.canonicalize()
        .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
}
