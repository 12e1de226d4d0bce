//! Error types and handling
//!
//! This module provides the error types shared by the engine and capability
//! modules. Every step-level failure the scheduler records is an
//! [`EngineError`], and every error carries an [`ErrorKind`] so callers can
//! tell lookup, parameter, permission and capability failures apart without
//! matching on message text.
//!
//! All errors implement the [`ConductorErrorExt`] trait which provides
//! user-friendly hints that are safe to show at an interactive front end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for Conductor error extensions
///
/// Provides additional context for errors: a user-facing hint and the coarse
/// [`ErrorKind`] used in execution results.
pub trait ConductorErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint never contains parameter values, file paths or provider
    /// payloads.
    fn user_hint(&self) -> &str;

    /// Returns the error category
    fn kind(&self) -> ErrorKind;
}

/// Coarse error category recorded on every failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The step's `provider.capability` reference could not be resolved
    Lookup,
    /// The step's parameters do not match the capability schema
    Parameter,
    /// The confirmation gate declined the step
    PermissionDenied,
    /// The provider failed while executing
    CapabilityFault,
    /// The plan-wide timeout stopped or cancelled the step
    Timeout,
    /// A dependency of the step failed and the dependency policy skips dependents
    Dependency,
    /// Configuration problems
    Config,
    /// Filesystem problems outside a provider invocation
    Io,
}

/// Main engine error type
///
/// Each variant includes the context needed to diagnose the failure. Lookup
/// messages are stable (`unknown module: foo`) because callers read the
/// `errors` list of an execution result verbatim.
///
/// # Examples
///
/// ```
/// use sdk::errors::{ConductorErrorExt, EngineError, ErrorKind};
///
/// let error = EngineError::UnknownModule("foo".to_string());
/// assert_eq!(error.to_string(), "unknown module: foo");
/// assert_eq!(error.kind(), ErrorKind::Lookup);
/// assert!(!error.user_hint().is_empty());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    // Lookup errors
    #[error("invalid capability reference '{0}': expected <module>.<capability>")]
    InvalidReference(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("module disabled: {0}")]
    ModuleDisabled(String),

    #[error("unknown capability: {module}.{capability}")]
    UnknownCapability { module: String, capability: String },

    // Parameter errors
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': expected {expected}, got {found}")]
    InvalidParameter {
        name: String,
        expected: String,
        found: String,
    },

    #[error("unexpected parameter: {0}")]
    UnexpectedParameter(String),

    // Permission errors
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // Capability errors
    #[error("capability fault: {0}")]
    CapabilityFault(String),

    #[error("capability panicked: {0}")]
    CapabilityPanicked(String),

    // Timeout errors
    #[error("cancelled: plan timeout exceeded")]
    Cancelled,

    #[error("not run: plan timeout exceeded")]
    NotRun,

    // Dependency errors
    #[error("skipped: dependency {0} failed")]
    DependencyFailed(i64),

    // File system security errors
    #[error("path denied: {0:?}")]
    PathDenied(std::path::PathBuf),

    #[error("path outside workspace: {0:?}")]
    PathOutsideWorkspace(std::path::PathBuf),

    #[error("path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConductorErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::InvalidReference(_) => "Steps must name a capability as <module>.<capability>",
            Self::UnknownModule(_) => "The requested module is not registered",
            Self::ModuleDisabled(_) => "Enable the module in config.toml to use it",
            Self::UnknownCapability { .. } => "Run 'conductor capabilities' to see what exists",

            Self::MissingParameter(_) => "A required parameter was not supplied",
            Self::InvalidParameter { .. } => "A parameter has the wrong type",
            Self::UnexpectedParameter(_) => "The capability does not accept this parameter",

            Self::PermissionDenied(_) => "The step was not approved",

            Self::CapabilityFault(_) => "The module failed while running the step",
            Self::CapabilityPanicked(_) => "The module crashed while running the step",

            Self::Cancelled => "The plan ran out of time while this step was running",
            Self::NotRun => "The plan ran out of time before this step started",

            Self::DependencyFailed(_) => "A step this one depends on failed",

            Self::PathDenied(_) => "Access to this path is not allowed",
            Self::PathOutsideWorkspace(_) => "Operation must be within workspace",
            Self::PathCanonicalization(_, _) => "Invalid path specified",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidReference(_)
            | Self::UnknownModule(_)
            | Self::ModuleDisabled(_)
            | Self::UnknownCapability { .. } => ErrorKind::Lookup,
            Self::MissingParameter(_)
            | Self::InvalidParameter { .. }
            | Self::UnexpectedParameter(_) => ErrorKind::Parameter,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::CapabilityFault(_)
            | Self::CapabilityPanicked(_)
            | Self::PathDenied(_)
            | Self::PathOutsideWorkspace(_)
            | Self::PathCanonicalization(_, _) => ErrorKind::CapabilityFault,
            Self::Cancelled | Self::NotRun => ErrorKind::Timeout,
            Self::DependencyFailed(_) => ErrorKind::Dependency,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
