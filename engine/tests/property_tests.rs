use async_trait::async_trait;
use conductor_engine::plan::{PlanDocument, PlanStep, PlanValidator, Violation};
use conductor_engine::registry::ModuleRegistry;
use conductor_engine::scheduler::{Scheduler, StepStatus};
use proptest::prelude::*;
use sdk::errors::EngineError;
use sdk::module::{InvocationContext, Module};
use sdk::types::{CapabilityDescriptor, ModuleOutput, Params};
use serde_json::json;
use std::sync::Arc;

/// Layered plan: `layers[g]` steps in group `g`, each step depending on
/// every step of the previous group when `chain` is set
fn layered_plan(layers: &[usize], chain: bool, module: impl Fn(usize) -> String) -> PlanDocument {
    let mut plan = PlanDocument::new("generated");
    let mut next_id = 1;
    let mut previous: Vec<i64> = Vec::new();
    let mut index = 0;
    for &width in layers {
        let ids: Vec<i64> = (next_id..next_id + width as i64).collect();
        next_id += width as i64;
        for &id in &ids {
            let mut step = PlanStep::new(id, module(index));
            if chain {
                for &dep in &previous {
                    step = step.after(dep);
                }
            }
            plan = plan.step(step);
            index += 1;
        }
        plan = plan.group(ids.clone());
        previous = ids;
    }
    plan
}

// A layered plan partitions its ids and only depends backwards, so it is
// accepted; breaking the partition in any way gets it rejected
proptest! {
    #[test]
    fn test_layered_plans_validate(
        layers in prop::collection::vec(1usize..4, 1..5),
        chain in any::<bool>(),
    ) {
        let plan = layered_plan(&layers, chain, |_| "memory_tools.log_message".to_string());
        let total: usize = layers.iter().sum();

        let validated = PlanValidator::new().validate(plan).unwrap();
        prop_assert_eq!(validated.len(), total);
        prop_assert_eq!(validated.groups().len(), layers.len());
    }

    #[test]
    fn test_dropped_group_entry_rejected(
        layers in prop::collection::vec(1usize..4, 1..5),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut plan = layered_plan(&layers, false, |_| "memory_tools.log_message".to_string());
        let total: usize = layers.iter().sum();
        let victim = pick.index(total) as i64 + 1;
        for group in &mut plan.parallel_groups {
            group.retain(|&id| id != victim);
        }

        let err = PlanValidator::new().validate(plan).unwrap_err();
        let expected = Violation::UngroupedStep { id: victim };
        prop_assert!(err.violations.contains(&expected));
    }

    #[test]
    fn test_repeated_group_entry_rejected(
        layers in prop::collection::vec(1usize..4, 1..5),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut plan = layered_plan(&layers, false, |_| "memory_tools.log_message".to_string());
        let total: usize = layers.iter().sum();
        let victim = pick.index(total) as i64 + 1;
        plan.parallel_groups.push(vec![victim]);

        let err = PlanValidator::new().validate(plan).unwrap_err();
        let expected = Violation::DuplicateGroupEntry { id: victim };
        prop_assert!(err.violations.contains(&expected));
    }

    #[test]
    fn test_collapsed_chain_rejected(layers in prop::collection::vec(1usize..4, 2..5)) {
        // Every dependency ends up in the same group as its dependent
        let mut plan = layered_plan(&layers, true, |_| "memory_tools.log_message".to_string());
        let all: Vec<i64> = plan.parallel_groups.concat();
        plan.parallel_groups = vec![all];

        let err = PlanValidator::new().validate(plan).unwrap_err();
        prop_assert!(!err.violations.is_empty());
        let only_ordering = err
            .violations
            .iter()
            .all(|v| matches!(v, Violation::DependencyNotEarlier { .. }));
        prop_assert!(only_ordering);
    }
}

/// Succeeds on `ok`, reports failure on `fail`, raises on `raise`
struct Outcomes {
    capabilities: Vec<CapabilityDescriptor>,
}

impl Outcomes {
    fn new() -> Self {
        Self {
            capabilities: vec![
                CapabilityDescriptor::new("ok", "Succeed"),
                CapabilityDescriptor::new("fail", "Report failure"),
                CapabilityDescriptor::new("raise", "Return an error"),
            ],
        }
    }
}

#[async_trait]
impl Module for Outcomes {
    fn name(&self) -> &str {
        "outcomes"
    }

    fn description(&self) -> &str {
        "Deterministic outcomes"
    }

    fn requires_confirmation(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn capabilities(&self) -> &[CapabilityDescriptor] {
        &self.capabilities
    }

    async fn invoke(
        &self,
        capability: &str,
        _params: Params,
        ctx: &InvocationContext,
    ) -> Result<ModuleOutput, EngineError> {
        match capability {
            "ok" => Ok(ModuleOutput::json(json!({ "step": ctx.step_id }))),
            "fail" => Ok(ModuleOutput::error("nothing to do")),
            _ => Err(EngineError::CapabilityFault("raised".to_string())),
        }
    }
}

const TARGETS: [&str; 5] = [
    "outcomes.ok",
    "outcomes.fail",
    "outcomes.raise",
    "outcomes.missing",
    "ghost.ok",
];

// Without a timeout every step is started, and every started step is either
// completed or failed, whatever mix of outcomes the plan contains
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_aggregate_counts_match_outcomes(
        layers in prop::collection::vec(1usize..4, 1..4),
        picks in prop::collection::vec(0usize..TARGETS.len(), 12),
        chain in any::<bool>(),
    ) {
        let plan = layered_plan(&layers, chain, |i| TARGETS[picks[i % picks.len()]].to_string());
        let total: usize = layers.iter().sum();
        let expected_ok = (0..total)
            .filter(|&i| TARGETS[picks[i % picks.len()]] == "outcomes.ok")
            .count();

        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(Outcomes::new()));
        let scheduler = Scheduler::new(Arc::new(registry));
        let validated = PlanValidator::new().validate(plan).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(scheduler.execute(validated));

        prop_assert_eq!(result.steps_completed + result.steps_failed, total);
        prop_assert_eq!(result.steps_completed, expected_ok);
        prop_assert_eq!(result.steps_not_run, 0);
        prop_assert_eq!(result.errors.len(), result.steps_failed);
        prop_assert_eq!(result.results.len(), total);
        prop_assert_eq!(result.success, expected_ok == total);
        let failed_statuses = result
            .results
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .count();
        prop_assert_eq!(failed_statuses, result.steps_failed);
    }
}
