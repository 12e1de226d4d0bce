//! Group scheduler
//!
//! Runs a [`ValidatedPlan`] group by group. Steps of one group are spawned as
//! independent tokio tasks and drained as they complete; the next group
//! starts only when every step of the current one is terminal.
//!
//! A failing step never aborts its siblings or later groups. Lookup and
//! parameter errors, confirmation denials, module errors and module panics
//! all end up as a failed [`StepResult`] for that step alone.

pub mod result;

pub use result::{ExecutionResult, StepError, StepResult, StepStatus};

use crate::plan::{PlanStep, StepId, ValidatedPlan};
use crate::registry::ModuleRegistry;
use futures::stream::{FuturesUnordered, StreamExt};
use sdk::errors::EngineError;
use sdk::module::{InvocationContext, Module};
use sdk::types::{CapabilityDescriptor, Params};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Synchronous confirmation gate.
///
/// Receives a human-readable step description and returns whether the step
/// may run. It is called from the blocking pool.
pub type ConfirmationCallback = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// When steps must pass the confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    pub require_confirmation: bool,
    pub auto_approve_read_only: bool,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            auto_approve_read_only: true,
        }
    }
}

impl PermissionPolicy {
    /// Policy that never asks
    pub fn permissive() -> Self {
        Self {
            require_confirmation: false,
            auto_approve_read_only: true,
        }
    }

    /// Whether invoking `capability` on `module` needs confirmation
    pub fn needs_confirmation(&self, module: &dyn Module, capability: &CapabilityDescriptor) -> bool {
        if !self.require_confirmation || !module.requires_confirmation() || module.is_read_only() {
            return false;
        }
        !(self.auto_approve_read_only && capability.read_only)
    }
}

/// What happens to steps whose dependencies failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Run the step anyway
    #[default]
    Attempt,
    /// Fail the step without invoking its module
    Skip,
}

/// A step resolved against the registry before execution
#[derive(Clone)]
struct Binding {
    module: Arc<dyn Module>,
    capability: CapabilityDescriptor,
    params: Params,
}

struct BoundStep {
    step: PlanStep,
    binding: Result<Binding, EngineError>,
}

fn bind_step(registry: &ModuleRegistry, step: &PlanStep) -> Result<Binding, EngineError> {
    let resolved = registry.resolve(&step.module)?;
    let params = resolved.capability.bind(&step.params)?;
    Ok(Binding {
        module: resolved.module,
        capability: resolved.capability,
        params,
    })
}

/// Executes validated plans against a registry
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<ModuleRegistry>,
    policy: PermissionPolicy,
    confirm: Option<ConfirmationCallback>,
    timeout: Option<Duration>,
    dependency_policy: DependencyPolicy,
}

impl Scheduler {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            policy: PermissionPolicy::default(),
            confirm: None,
            timeout: None,
            dependency_policy: DependencyPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Install the confirmation gate. Without one, every step that needs
    /// confirmation is denied.
    pub fn with_confirmation<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.confirm = Some(Arc::new(confirm));
        self
    }

    /// Plan-wide time budget; `None` disables it
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dependency_policy(mut self, policy: DependencyPolicy) -> Self {
        self.dependency_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Execute a validated plan.
    ///
    /// Never fails as a whole: every step ends up with exactly one result,
    /// including steps that never started because the timeout was exceeded.
    pub async fn execute(&self, plan: ValidatedPlan) -> ExecutionResult {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = self.timeout.map(|budget| started + budget);
        let cancel = CancellationToken::new();

        info!(
            "Run {}: executing plan '{}' ({} steps, {} groups)",
            run_id,
            plan.goal(),
            plan.len(),
            plan.groups().len()
        );

        let mut bound: HashMap<StepId, BoundStep> = plan
            .steps()
            .iter()
            .map(|step| {
                let binding = bind_step(&self.registry, step);
                if let Err(e) = &binding {
                    debug!("Run {}: step {} failed to bind: {}", run_id, step.id, e);
                }
                (
                    step.id,
                    BoundStep {
                        step: step.clone(),
                        binding,
                    },
                )
            })
            .collect();

        let mut outcome = ExecutionResult::new(run_id.clone());
        let mut failed: HashSet<StepId> = HashSet::new();
        let mut timed_out = false;

        for (index, group) in plan.groups().iter().enumerate() {
            let expired = deadline.is_some_and(|d| Instant::now() >= d);
            if expired || cancel.is_cancelled() {
                if !timed_out {
                    warn!("Run {}: plan timeout exceeded before group {}", run_id, index);
                }
                timed_out = true;
                for id in group {
                    if let Some(entry) = bound.remove(id) {
                        outcome.record(StepResult::from_error(
                            *id,
                            entry.step.module,
                            &EngineError::NotRun,
                            Duration::ZERO,
                        ));
                    }
                }
                continue;
            }

            debug!("Run {}: starting group {} ({} steps)", run_id, index, group.len());
            let mut in_flight = FuturesUnordered::new();
            for id in group {
                let Some(entry) = bound.remove(id) else {
                    continue;
                };
                let blocked_by = match self.dependency_policy {
                    DependencyPolicy::Skip => entry
                        .step
                        .depends_on
                        .iter()
                        .copied()
                        .find(|dep| failed.contains(dep)),
                    DependencyPolicy::Attempt => None,
                };
                let module = entry.step.module.clone();
                let task = StepTask {
                    run_id: run_id.clone(),
                    entry,
                    blocked_by,
                    policy: self.policy,
                    confirm: self.confirm.clone(),
                    cancel: cancel.clone(),
                };
                let step_id = *id;
                let handle = tokio::spawn(task.run());
                in_flight.push(async move { (step_id, module, handle.await) });
            }

            loop {
                let next = match deadline {
                    Some(deadline) if !cancel.is_cancelled() => {
                        tokio::select! {
                            next = in_flight.next() => next,
                            _ = tokio::time::sleep_until(deadline) => {
                                warn!(
                                    "Run {}: plan timeout exceeded, cancelling {} in-flight step(s)",
                                    run_id,
                                    in_flight.len()
                                );
                                cancel.cancel();
                                timed_out = true;
                                continue;
                            }
                        }
                    }
                    _ => in_flight.next().await,
                };
                let Some((step_id, module, joined)) = next else {
                    break;
                };

                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        let message = if e.is_panic() {
                            panic_message(e.into_panic())
                        } else {
                            e.to_string()
                        };
                        warn!("Run {}: step {} panicked: {}", run_id, step_id, message);
                        StepResult::from_error(
                            step_id,
                            module,
                            &EngineError::CapabilityPanicked(message),
                            Duration::ZERO,
                        )
                    }
                };
                if !result.success {
                    failed.insert(step_id);
                }
                outcome.record(result);
            }
        }

        let outcome = outcome.finish(started.elapsed(), timed_out);
        info!(
            "Run {}: finished in {:.2}s ({} completed, {} failed, {} not run)",
            run_id,
            outcome.duration_seconds,
            outcome.steps_completed,
            outcome.steps_failed,
            outcome.steps_not_run
        );
        outcome
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("has_confirmation", &self.confirm.is_some())
            .field("timeout", &self.timeout)
            .field("dependency_policy", &self.dependency_policy)
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "module panicked".to_string(),
        },
    }
}

/// Everything one spawned step needs
struct StepTask {
    run_id: String,
    entry: BoundStep,
    blocked_by: Option<StepId>,
    policy: PermissionPolicy,
    confirm: Option<ConfirmationCallback>,
    cancel: CancellationToken,
}

impl StepTask {
    async fn run(self) -> StepResult {
        let started = Instant::now();
        let BoundStep { step, binding } = self.entry;
        let fail = |error: EngineError| {
            StepResult::from_error(step.id, step.module.clone(), &error, started.elapsed())
        };

        if let Some(dependency) = self.blocked_by {
            info!(
                "Run {}: skipping step {}, dependency {} failed",
                self.run_id, step.id, dependency
            );
            return fail(EngineError::DependencyFailed(dependency));
        }

        let binding = match binding {
            Ok(binding) => binding,
            Err(e) => {
                warn!("Run {}: step {} ({}) rejected: {}", self.run_id, step.id, step.module, e);
                return fail(e);
            }
        };

        if self
            .policy
            .needs_confirmation(binding.module.as_ref(), &binding.capability)
        {
            let approved = match self.confirm {
                None => {
                    warn!(
                        "Run {}: step {} needs confirmation but no callback is configured",
                        self.run_id, step.id
                    );
                    false
                }
                Some(confirm) => {
                    let prompt = step.confirmation_prompt();
                    // Cancellation abandons the gate; its thread stays parked until answered
                    let gate = tokio::task::spawn_blocking(move || confirm(&prompt));
                    tokio::select! {
                        decision = gate => decision.unwrap_or(false),
                        _ = self.cancel.cancelled() => return fail(EngineError::Cancelled),
                    }
                }
            };
            if !approved {
                warn!("Run {}: step {} denied", self.run_id, step.id);
                return fail(EngineError::PermissionDenied(step.confirmation_prompt()));
            }
        }

        info!("Run {}: step {} invoking {}", self.run_id, step.id, step.module);
        let ctx = InvocationContext::new(self.run_id.clone(), step.id, self.cancel.clone());
        let invocation = binding
            .module
            .invoke(&binding.capability.name, binding.params, &ctx);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Run {}: step {} cancelled", self.run_id, step.id);
                return fail(EngineError::Cancelled);
            }
            outcome = invocation => outcome,
        };

        match outcome {
            Ok(output) if output.success => {
                debug!("Run {}: step {} succeeded", self.run_id, step.id);
                StepResult::succeeded(step.id, step.module.clone(), output.data, started.elapsed())
            }
            Ok(output) => {
                let error = output
                    .error
                    .unwrap_or_else(|| "module reported failure".to_string());
                warn!("Run {}: step {} failed: {}", self.run_id, step.id, error);
                StepResult::reported_failure(step.id, step.module.clone(), error, started.elapsed())
            }
            Err(e) => {
                warn!("Run {}: step {} raised: {}", self.run_id, step.id, e);
                fail(e)
            }
        }
    }
}
