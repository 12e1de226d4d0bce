//! Step and execution results
//!
//! Results are recorded in completion order. Aggregation only counts and
//! appends, so the final counts do not depend on the order in which steps of
//! a group finish.

use crate::plan::StepId;
use sdk::errors::{ConductorErrorExt, EngineError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Terminal state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// The confirmation gate declined the step
    Denied,
    /// In flight when the plan timeout was exceeded
    Cancelled,
    /// Never started because the plan timeout was exceeded
    NotRun,
}

/// Outcome of one plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: StepId,
    /// Qualified capability reference of the step
    pub module: String,
    pub success: bool,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn succeeded(
        step_id: StepId,
        module: impl Into<String>,
        result: Value,
        elapsed: Duration,
    ) -> Self {
        Self {
            step_id,
            module: module.into(),
            success: true,
            status: StepStatus::Succeeded,
            error_kind: None,
            result: Some(result),
            error: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// A failure reported by the module through its output
    pub fn reported_failure(
        step_id: StepId,
        module: impl Into<String>,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            step_id,
            module: module.into(),
            success: false,
            status: StepStatus::Failed,
            error_kind: Some(ErrorKind::CapabilityFault),
            result: None,
            error: Some(error.into()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// A failure raised by the engine or the module
    pub fn from_error(
        step_id: StepId,
        module: impl Into<String>,
        error: &EngineError,
        elapsed: Duration,
    ) -> Self {
        let status = match error {
            EngineError::PermissionDenied(_) => StepStatus::Denied,
            EngineError::Cancelled => StepStatus::Cancelled,
            EngineError::NotRun => StepStatus::NotRun,
            _ => StepStatus::Failed,
        };
        Self {
            step_id,
            module: module.into(),
            success: false,
            status,
            error_kind: Some(error.kind()),
            result: None,
            error: Some(error.to_string()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Error entry of an execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub step_id: StepId,
    pub error: String,
}

/// Aggregate outcome of one plan execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: String,
    pub success: bool,
    pub steps_completed: usize,
    pub steps_failed: usize,
    /// Steps never started because the timeout was exceeded
    pub steps_not_run: usize,
    pub timed_out: bool,
    pub results: Vec<StepResult>,
    pub errors: Vec<StepError>,
    pub duration_seconds: f64,
}

impl ExecutionResult {
    /// Start an empty result for a run
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            success: true,
            steps_completed: 0,
            steps_failed: 0,
            steps_not_run: 0,
            timed_out: false,
            results: Vec::new(),
            errors: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    /// Record a terminal step result
    pub fn record(&mut self, result: StepResult) {
        match result.status {
            StepStatus::Succeeded => self.steps_completed += 1,
            StepStatus::NotRun => self.steps_not_run += 1,
            StepStatus::Failed | StepStatus::Denied | StepStatus::Cancelled => {
                self.steps_failed += 1
            }
        }
        if !result.success {
            self.errors.push(StepError {
                step_id: result.step_id,
                error: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "step failed".to_string()),
            });
        }
        self.success = self.steps_failed == 0 && self.steps_not_run == 0;
        self.results.push(result);
    }

    /// Close the result with the run's wall-clock duration
    pub fn finish(mut self, elapsed: Duration, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self.duration_seconds = elapsed.as_secs_f64();
        self
    }

    /// Result of a specific step, if it was recorded
    pub fn result_for(&self, step_id: StepId) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_id == step_id)
    }

    /// Error message recorded for a specific step
    pub fn error_for(&self, step_id: StepId) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.step_id == step_id)
            .map(|e| e.error.as_str())
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_counts_by_status() {
        let mut result = ExecutionResult::new("run");
        result.record(StepResult::succeeded(1, "a.b", json!(1), Duration::ZERO));
        assert!(result.success);

        result.record(StepResult::from_error(
            2,
            "a.c",
            &EngineError::PermissionDenied("no".into()),
            Duration::ZERO,
        ));
        result.record(StepResult::from_error(
            3,
            "a.d",
            &EngineError::NotRun,
            Duration::ZERO,
        ));

        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.steps_failed, 1);
        assert_eq!(result.steps_not_run, 1);
        assert!(!result.success);
        assert_eq!(result.result_for(2).unwrap().status, StepStatus::Denied);
        assert_eq!(result.error_for(3), Some("not run: plan timeout exceeded"));
    }

    #[test]
    fn test_unstarted_steps_are_not_counted_as_failed() {
        let mut result = ExecutionResult::new("run");
        result.record(StepResult::succeeded(1, "a.b", json!(1), Duration::ZERO));
        for id in 2..=3 {
            result.record(StepResult::from_error(id, "a.c", &EngineError::NotRun, Duration::ZERO));
        }
        let result = result.finish(Duration::ZERO, true);

        // Only step 1's group started
        assert_eq!(result.steps_completed + result.steps_failed, 1);
        assert_eq!(result.steps_not_run, 2);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let mut result = ExecutionResult::new("run");
        result.record(StepResult::from_error(
            2,
            "foo.bar",
            &EngineError::UnknownModule("foo".into()),
            Duration::ZERO,
        ));
        let result = result.finish(Duration::from_millis(1500), false);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["stepsCompleted"], 0);
        assert_eq!(json["stepsFailed"], 1);
        assert_eq!(json["durationSeconds"], 1.5);
        assert_eq!(
            json["errors"],
            json!([{"stepId": 2, "error": "unknown module: foo"}])
        );
        assert_eq!(json["results"][0]["errorKind"], "lookup");
        assert_eq!(json["results"][0]["status"], "failed");
    }
}
