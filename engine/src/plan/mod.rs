//! Plan documents
//!
//! A plan arrives as a JSON document from an untrusted producer. Parsing
//! only checks shape; structural invariants are checked by the
//! [`validator`], which is the only way to obtain a [`ValidatedPlan`] the
//! scheduler will accept.

pub mod validator;

pub use validator::{PlanValidator, ValidatedPlan, ValidationError, Violation};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Step identifier, unique within a plan
pub type StepId = i64;

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: StepId,
    /// Qualified capability reference, `module.capability`
    pub module: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<StepId>,
}

impl PlanStep {
    pub fn new(id: StepId, module: impl Into<String>) -> Self {
        Self {
            id,
            module: module.into(),
            description: String::new(),
            params: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn after(mut self, dependency: StepId) -> Self {
        self.depends_on.push(dependency);
        self
    }

    /// Text shown to the confirmation gate
    pub fn confirmation_prompt(&self) -> String {
        if self.description.is_empty() {
            format!("Run step {} ({})", self.id, self.module)
        } else {
            format!("{} ({})", self.description, self.module)
        }
    }
}

/// A candidate plan as produced by a planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub goal: String,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub parallel_groups: Vec<Vec<StepId>>,
}

impl PlanDocument {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            steps: Vec::new(),
            parallel_groups: Vec::new(),
        }
    }

    pub fn step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn group(mut self, ids: impl IntoIterator<Item = StepId>) -> Self {
        self.parallel_groups.push(ids.into_iter().collect());
        self
    }

    /// Parse a plan document from JSON.
    ///
    /// Only the document shape is checked here.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        serde_json::from_str(json).map_err(|e| PlanError::Malformed(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Errors that reject a plan as a whole.
///
/// None of these ever lets a step run.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("malformed plan document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("plan generation failed: {0}")]
    Generation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_document() {
        let plan = PlanDocument::from_json(
            r#"{"goal": "log", "steps": [{"id": 1, "module": "memory_tools.log_message",
                "params": {"message": "hi"}}], "parallel_groups": [[1]]}"#,
        )
        .unwrap();

        assert_eq!(plan.goal, "log");
        assert_eq!(plan.steps[0].params["message"], json!("hi"));
        assert!(plan.steps[0].depends_on.is_empty());
        assert_eq!(plan.parallel_groups, vec![vec![1]]);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = PlanDocument::from_json(r#"{"steps": []}"#).unwrap_err();
        assert!(matches!(err, PlanError::Malformed(_)));

        let err = PlanDocument::from_json(r#"{"goal": "g", "steps": [{"id": 1}]}"#).unwrap_err();
        assert!(matches!(err, PlanError::Malformed(_)));

        let err = PlanDocument::from_json(r#"{"goal": "g", "steps": [{"id": "one", "module": "a.b"}]}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("malformed plan document"));
    }

    #[test]
    fn test_builder_round_trip() {
        let plan = PlanDocument::new("goal")
            .step(PlanStep::new(1, "a.b").describe("first"))
            .step(PlanStep::new(2, "a.c").after(1))
            .group([1])
            .group([2]);

        let parsed = PlanDocument::from_json(&plan.to_json_pretty()).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn test_confirmation_prompt() {
        let step = PlanStep::new(3, "system_control.move_old_files");
        assert_eq!(
            step.confirmation_prompt(),
            "Run step 3 (system_control.move_old_files)"
        );
        let step = step.describe("Archive old downloads");
        assert_eq!(
            step.confirmation_prompt(),
            "Archive old downloads (system_control.move_old_files)"
        );
    }
}
