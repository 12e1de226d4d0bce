//! Module trait and invocation context
//!
//! This module defines the [`Module`] trait that every capability provider
//! implements, and the [`InvocationContext`] the scheduler hands to each
//! invocation. Any type implementing the trait can be registered without
//! changes to the validator or scheduler.

use crate::errors::EngineError;
use crate::types::{CapabilityDescriptor, ModuleOutput, Params};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait that all capability modules must implement
///
/// Metadata is static for the lifetime of the module. `invoke` may be called
/// concurrently from many scheduler tasks and must not hold on to anything
/// from the context beyond the call.
#[async_trait]
pub trait Module: Send + Sync {
    /// Returns the stable name used in `module.capability` references
    fn name(&self) -> &str;

    /// Returns a human description of the module
    fn description(&self) -> &str;

    /// Returns the version of the module
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Whether invocations must pass the confirmation gate
    fn requires_confirmation(&self) -> bool;

    /// Whether the module never mutates external state
    fn is_read_only(&self) -> bool;

    /// Declared capabilities, in a stable order
    fn capabilities(&self) -> &[CapabilityDescriptor];

    /// Look up a declared capability by name
    fn capability(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.capabilities().iter().find(|cap| cap.name == name)
    }

    /// Handle a capability invocation
    ///
    /// `params` has already been bound against the capability's schema.
    /// Ordinary failures should be reported as [`ModuleOutput::error`];
    /// returning `Err` is treated as a capability fault.
    async fn invoke(
        &self,
        capability: &str,
        params: Params,
        ctx: &InvocationContext,
    ) -> Result<ModuleOutput, EngineError>;
}

/// Context provided to a module for one invocation
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Execution run this invocation belongs to
    pub run_id: String,

    /// Plan step being executed
    pub step_id: i64,

    /// Cancelled when the plan-wide timeout is exceeded.
    /// Long-running modules should check it between units of work.
    pub cancellation_token: CancellationToken,
}

impl InvocationContext {
    pub fn new(
        run_id: impl Into<String>,
        step_id: i64,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_id,
            cancellation_token,
        }
    }

    /// Check if the invocation has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Get a future that completes when cancellation is requested
    pub async fn cancelled(&self) {
        self.cancellation_token.cancelled().await
    }
}
