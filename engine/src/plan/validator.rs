//! Plan Validator
//!
//! Checks a candidate plan against its structural invariants before anything
//! runs:
//!
//! 1. Step ids are pairwise distinct
//! 2. Every `depends_on` id names an existing step
//! 3. `parallel_groups` partitions the step ids exactly once
//! 4. Every dependency sits in a strictly earlier group than its dependent
//! 5. The plan does not exceed the configured step limit
//!
//! Every violation is collected; a plan with any violation is rejected as a
//! whole.

use super::{PlanDocument, PlanStep, StepId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    DuplicateStepId { id: StepId },
    UnknownDependency { step: StepId, dependency: StepId },
    UngroupedStep { id: StepId },
    DuplicateGroupEntry { id: StepId },
    UnknownGroupEntry { group: usize, id: StepId },
    DependencyNotEarlier { step: StepId, dependency: StepId },
    TooManySteps { count: usize, max: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DuplicateStepId { id } => write!(f, "step id {} is used more than once", id),
            Violation::UnknownDependency { step, dependency } => {
                write!(f, "step {} depends on unknown step {}", step, dependency)
            }
            Violation::UngroupedStep { id } => {
                write!(f, "step {} is not in any parallel group", id)
            }
            Violation::DuplicateGroupEntry { id } => {
                write!(f, "step {} appears in parallel groups more than once", id)
            }
            Violation::UnknownGroupEntry { group, id } => {
                write!(f, "parallel group {} names unknown step {}", group, id)
            }
            Violation::DependencyNotEarlier { step, dependency } => write!(
                f,
                "step {} depends on step {} which is not in an earlier group",
                step, dependency
            ),
            Violation::TooManySteps { count, max } => {
                write!(f, "plan has {} steps, maximum is {}", count, max)
            }
        }
    }
}

/// A plan rejected by the validator, with every violation found
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plan failed validation with {} violation(s): ",
            self.violations.len()
        )?;
        let parts: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

/// A plan that passed validation.
///
/// Only [`PlanValidator::validate`] constructs this type.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    document: PlanDocument,
    index: HashMap<StepId, usize>,
}

impl ValidatedPlan {
    pub fn goal(&self) -> &str {
        &self.document.goal
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.document.steps
    }

    /// Groups in execution order
    pub fn groups(&self) -> &[Vec<StepId>] {
        &self.document.parallel_groups
    }

    pub fn step(&self, id: StepId) -> Option<&PlanStep> {
        self.index.get(&id).map(|&i| &self.document.steps[i])
    }

    pub fn len(&self) -> usize {
        self.document.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.steps.is_empty()
    }

    pub fn document(&self) -> &PlanDocument {
        &self.document
    }
}

/// Structural plan validator
#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    max_steps: Option<usize>,
}

impl PlanValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject plans with more than `max` steps
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = Some(max);
        self
    }

    /// Validate a plan, collecting every violation.
    pub fn validate(&self, plan: PlanDocument) -> Result<ValidatedPlan, ValidationError> {
        let violations = self.check(&plan);
        if !violations.is_empty() {
            warn!(
                "Rejected plan '{}' with {} violation(s)",
                plan.goal,
                violations.len()
            );
            return Err(ValidationError { violations });
        }

        let index = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| (step.id, i))
            .collect();
        debug!(
            "Validated plan '{}': {} steps in {} groups",
            plan.goal,
            plan.steps.len(),
            plan.parallel_groups.len()
        );
        Ok(ValidatedPlan {
            document: plan,
            index,
        })
    }

    fn check(&self, plan: &PlanDocument) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(max) = self.max_steps {
            if plan.steps.len() > max {
                violations.push(Violation::TooManySteps {
                    count: plan.steps.len(),
                    max,
                });
            }
        }

        // 1. Unique ids
        let mut known = HashSet::new();
        let mut reported = HashSet::new();
        for step in &plan.steps {
            if !known.insert(step.id) && reported.insert(step.id) {
                violations.push(Violation::DuplicateStepId { id: step.id });
            }
        }

        // 2. Dependencies exist
        for step in &plan.steps {
            for &dependency in &step.depends_on {
                if !known.contains(&dependency) {
                    violations.push(Violation::UnknownDependency {
                        step: step.id,
                        dependency,
                    });
                }
            }
        }

        // 3. Groups partition the ids
        let mut group_of: HashMap<StepId, usize> = HashMap::new();
        let mut repeated = HashSet::new();
        for (group, ids) in plan.parallel_groups.iter().enumerate() {
            for &id in ids {
                if !known.contains(&id) {
                    violations.push(Violation::UnknownGroupEntry { group, id });
                } else if group_of.contains_key(&id) {
                    if repeated.insert(id) {
                        violations.push(Violation::DuplicateGroupEntry { id });
                    }
                } else {
                    group_of.insert(id, group);
                }
            }
        }
        let mut seen = HashSet::new();
        for step in &plan.steps {
            if seen.insert(step.id) && !group_of.contains_key(&step.id) {
                violations.push(Violation::UngroupedStep { id: step.id });
            }
        }

        // 4. Dependencies run in earlier groups
        for step in &plan.steps {
            let Some(&own) = group_of.get(&step.id) else {
                continue;
            };
            for &dependency in &step.depends_on {
                if let Some(&dep_group) = group_of.get(&dependency) {
                    if dep_group >= own {
                        violations.push(Violation::DependencyNotEarlier {
                            step: step.id,
                            dependency,
                        });
                    }
                }
            }
        }

        violations
    }
}
