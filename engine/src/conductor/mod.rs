//! Conductor
//!
//! Ties the pieces together: goal → capability listing → planner → parse →
//! validate → schedule. A planner failure is reported as
//! [`PlanError::Generation`] and nothing runs.

pub mod planner;

pub use planner::{parse_plan_response, PlanProducer, PlanRequest};

use crate::config::Config;
use crate::plan::{PlanDocument, PlanError, PlanValidator, ValidatedPlan};
use crate::registry::{CapabilityListing, ModuleRegistry};
use crate::scheduler::{ExecutionResult, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Conductor {
    validator: PlanValidator,
    scheduler: Scheduler,
    planner: Option<Arc<dyn PlanProducer>>,
}

impl Conductor {
    /// Conductor with default validation and scheduling policies
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            validator: PlanValidator::new(),
            scheduler: Scheduler::new(registry),
            planner: None,
        }
    }

    /// Conductor using the permission and execution settings of `config`
    pub fn from_config(config: &Config, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            validator: PlanValidator::new().with_max_steps(config.execution.max_plan_steps),
            scheduler: Scheduler::new(registry)
                .with_policy(config.permissions.policy())
                .with_timeout(config.execution.timeout())
                .with_dependency_policy(config.execution.dependency_failure),
            planner: None,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn PlanProducer>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_confirmation<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.scheduler = self.scheduler.with_confirmation(confirm);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scheduler = self.scheduler.with_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.scheduler.registry()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Enabled capabilities, as offered to planners
    pub fn capabilities(&self) -> Vec<CapabilityListing> {
        self.registry().list_capabilities()
    }

    /// Parse and validate a plan document without running it
    pub fn validate_document(&self, json: &str) -> Result<ValidatedPlan, PlanError> {
        let document = PlanDocument::from_json(json)?;
        Ok(self.validator.validate(document)?)
    }

    /// Ask the planner for a plan and validate it
    pub async fn plan(&self, goal: &str) -> Result<ValidatedPlan, PlanError> {
        let planner = self
            .planner
            .as_ref()
            .ok_or_else(|| PlanError::Generation("no planner configured".to_string()))?;

        let request = PlanRequest::new(goal, self.capabilities());
        info!("Requesting plan for goal: {}", goal);
        let response = planner.produce(&request).await.map_err(|e| {
            warn!("Planner failed: {:#}", e);
            PlanError::Generation(format!("{:#}", e))
        })?;

        let document = parse_plan_response(&response)?;
        Ok(self.validator.validate(document)?)
    }

    /// Plan a goal and execute the result
    pub async fn run_goal(&self, goal: &str) -> Result<ExecutionResult, PlanError> {
        let plan = self.plan(goal).await?;
        Ok(self.scheduler.execute(plan).await)
    }

    /// Parse, validate and execute a plan document
    pub async fn run_document(&self, json: &str) -> Result<ExecutionResult, PlanError> {
        let plan = self.validate_document(json)?;
        Ok(self.scheduler.execute(plan).await)
    }

    /// Execute an already validated plan
    pub async fn execute(&self, plan: ValidatedPlan) -> ExecutionResult {
        self.scheduler.execute(plan).await
    }
}

impl std::fmt::Debug for Conductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor")
            .field("validator", &self.validator)
            .field("scheduler", &self.scheduler)
            .field("has_planner", &self.planner.is_some())
            .finish()
    }
}
