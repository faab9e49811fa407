use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// One declared tool invocation inside a plan.
///
/// `parameters` is a tree of nested maps/sequences/scalars, conventionally
/// grouped into a `path` object and a `query` object. String leaves may carry
/// `{{step.path}}` tokens resolved against earlier step results at execution
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: String,
    pub description: String,
    pub tool: String,
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn empty_parameters() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A validated multi-step plan. Immutable once handed to the executor; the
/// declared step order is the tie-break among independently-ready steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub reasoning: String,
    pub steps: Vec<ExecutionStep>,
    pub expected_outcome: String,
}

impl ExecutionPlan {
    pub fn step_index(&self) -> BTreeMap<&str, &ExecutionStep> {
        self.steps
            .iter()
            .map(|step| (step.id.as_str(), step))
            .collect()
    }
}

/// One row of the execution trace. Appended when a step starts running and
/// mutated to its terminal status by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: String,
    pub status: StepStatus,
    pub details: serde_json::Value,
}

impl TraceEntry {
    pub fn running(step: impl Into<String>, tool: &str, parameters: &serde_json::Value) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Running,
            details: serde_json::json!({
                "tool": tool,
                "parameters": parameters,
            }),
        }
    }

    pub fn complete(&mut self, tool: &str, parameters: &serde_json::Value, result_size: usize) {
        self.status = StepStatus::Completed;
        self.details = serde_json::json!({
            "tool": tool,
            "parameters": parameters,
            "result_size": result_size,
        });
    }

    pub fn fail(&mut self, tool: &str, message: &str) {
        self.status = StepStatus::Error;
        self.details = serde_json::json!({
            "tool": tool,
            "error": message,
        });
    }
}
