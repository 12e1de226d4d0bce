//! Conductor Engine Library
//!
//! Capability registry, plan validation and group scheduling. Used by the
//! `conductor` binary and by integration tests.

/// Configuration management module
pub mod config;

/// File system security module
pub mod fs_guard;

/// Capability registry
pub mod registry;

/// Plan documents and validation
pub mod plan;

/// Group scheduler and execution results
pub mod scheduler;

/// Built-in capability modules
pub mod modules;

/// Conductor facade and planner hand-off
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

pub use conductor::{Conductor, PlanProducer, PlanRequest};
pub use plan::{PlanDocument, PlanError, PlanStep, PlanValidator, ValidatedPlan};
pub use registry::ModuleRegistry;
pub use scheduler::{ExecutionResult, PermissionPolicy, Scheduler, StepResult, StepStatus};
