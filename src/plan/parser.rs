use crate::error::PlanningError;
use crate::plan::types::ExecutionPlan;
use std::collections::BTreeSet;

pub struct PlanParser;

impl PlanParser {
    /// Format instruction embedded in the planning prompt.
    pub fn schema_prompt() -> &'static str {
        concat!(
            "Respond with a JSON object in this exact format:\n",
            "{\n",
            "  \"reasoning\": \"<why these steps answer the question>\",\n",
            "  \"steps\": [\n",
            "    {\n",
            "      \"id\": \"<step-id>\",\n",
            "      \"description\": \"<what this step does>\",\n",
            "      \"tool\": \"<tool name from the documentation>\",\n",
            "      \"parameters\": { \"path\": { ... }, \"query\": { ... } },\n",
            "      \"depends_on\": [\"<step-ids this depends on>\"]\n",
            "    }\n",
            "  ],\n",
            "  \"expected_outcome\": \"<what the results will contain>\"\n",
            "}\n\n",
            "A parameter string may reference an earlier step's result with a\n",
            "{{step-id.path}} token, e.g. \"{{search.results.0.id}}\".\n",
            "Steps with no dependencies use \"depends_on\": [].\n",
            "Wrap the JSON in a ```json code fence.",
        )
    }

    /// Parse model output into a structurally valid plan.
    pub fn parse(text: &str) -> Result<ExecutionPlan, PlanningError> {
        let json = Self::extract_json(text).ok_or(PlanningError::NoJson)?;
        let plan: ExecutionPlan =
            serde_json::from_str(json).map_err(|e| PlanningError::Parse(e.to_string()))?;
        Self::validate(&plan)?;
        Ok(plan)
    }

    /// Structural validation: non-empty reasoning, at least one step, every
    /// step fully named with object-shaped parameters, unique step ids.
    pub fn validate(plan: &ExecutionPlan) -> Result<(), PlanningError> {
        if plan.reasoning.trim().is_empty() {
            return Err(PlanningError::Structure("reasoning is empty".into()));
        }
        if plan.steps.is_empty() {
            return Err(PlanningError::Structure("plan has no steps".into()));
        }

        let mut ids = BTreeSet::new();
        for step in &plan.steps {
            if step.id.trim().is_empty() {
                return Err(PlanningError::Structure("step id is empty".into()));
            }
            if step.description.trim().is_empty() {
                return Err(PlanningError::Structure(format!(
                    "step {} has no description",
                    step.id
                )));
            }
            if step.tool.trim().is_empty() {
                return Err(PlanningError::Structure(format!(
                    "step {} names no tool",
                    step.id
                )));
            }
            if !step.parameters.is_object() {
                return Err(PlanningError::Structure(format!(
                    "step {} parameters are not an object",
                    step.id
                )));
            }
            if !ids.insert(step.id.as_str()) {
                return Err(PlanningError::Structure(format!(
                    "duplicate step id: {}",
                    step.id
                )));
            }
        }

        Ok(())
    }

    /// Pull a JSON candidate out of model text: a ```json fence first, then a
    /// bare fence opening on an object, then the outermost brace span.
    pub fn extract_json(text: &str) -> Option<&str> {
        if let Some(start) = text.find("```json") {
            let json_start = start + "```json".len();
            let rest = &text[json_start..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        if let Some(start) = text.find("```\n{") {
            let json_start = start + "```\n".len();
            let rest = &text[json_start..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        let open = text.find('{')?;
        let close = text.rfind('}')?;
        if close > open {
            return Some(&text[open..=close]);
        }

        None
    }
}
