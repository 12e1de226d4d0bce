//! Planner hand-off
//!
//! Plan generation lives outside the engine. A [`PlanProducer`] receives a
//! [`PlanRequest`] (goal plus the enabled capabilities) and returns raw text;
//! [`parse_plan_response`] turns that text into a [`PlanDocument`] or a
//! generation error. The document still has to pass validation.

use crate::plan::{PlanDocument, PlanError};
use crate::registry::CapabilityListing;
use async_trait::async_trait;
use std::fmt::Write as _;

/// External plan generator, such as an LLM backend
#[async_trait]
pub trait PlanProducer: Send + Sync {
    /// Produce the raw text of a plan document for `request`
    async fn produce(&self, request: &PlanRequest) -> anyhow::Result<String>;
}

/// What a producer needs to know to plan a goal
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: String,
    pub capabilities: Vec<CapabilityListing>,
    pub prompt: String,
}

impl PlanRequest {
    pub fn new(goal: impl Into<String>, capabilities: Vec<CapabilityListing>) -> Self {
        let goal = goal.into();
        let prompt = render_prompt(&goal, &capabilities);
        Self {
            goal,
            capabilities,
            prompt,
        }
    }
}

fn render_prompt(goal: &str, capabilities: &[CapabilityListing]) -> String {
    let mut prompt = format!("Create an execution plan for: {}\n\nAvailable capabilities:\n", goal);
    for cap in capabilities {
        let _ = write!(prompt, "- {}: {}", cap.full_name, cap.description);
        if !cap.parameters.is_empty() {
            let params: Vec<String> = cap
                .parameters
                .iter()
                .map(|p| {
                    let req = if p.required { "" } else { "?" };
                    format!("{}{}: {}", p.name, req, p.param_type)
                })
                .collect();
            let _ = write!(prompt, " ({})", params.join(", "));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "\nSteps that do not depend on each other may share a parallel group. \
         Every step must appear in exactly one group, after the groups of its dependencies.\n\
         Return ONLY JSON, no explanation:\n\
         {\"goal\": \"...\", \"steps\": [{\"id\": 1, \"module\": \"module.capability\", \
         \"description\": \"...\", \"params\": {}, \"depends_on\": []}], \
         \"parallel_groups\": [[1]]}",
    );
    prompt
}

/// Extract a plan document from producer output.
///
/// Tolerates markdown code fences and prose around the JSON object. Anything
/// that still does not parse is a [`PlanError::Generation`].
pub fn parse_plan_response(response: &str) -> Result<PlanDocument, PlanError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(PlanError::Generation(
            "planner returned an empty response".to_string(),
        ));
    }

    let unfenced = strip_fences(trimmed);
    let json_str = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(PlanError::Generation(
                "planner response contains no JSON object".to_string(),
            ))
        }
    };

    serde_json::from_str(json_str).map_err(|e| {
        PlanError::Generation(format!("planner response is not a plan document: {}", e))
    })
}

/// Contents of the first ``` fenced block, or the input unchanged
fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let body = &text[open + 3..];
    // Skip the language tag line
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}
