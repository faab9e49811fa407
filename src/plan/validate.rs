use crate::llm::LanguageModel;
use crate::plan::parser::PlanParser;
use crate::plan::types::{ExecutionPlan, ExecutionStep};
use crate::storage::ConversationTurn;
use serde_json::json;

/// Plan generation is retried this many times before falling back.
pub const MAX_GENERATION_ATTEMPTS: usize = 3;
/// The fallback query carries at most this many characters of the message.
pub const FALLBACK_QUERY_MAX_CHARS: usize = 500;
/// Generic multi-category search used by the fallback plan.
pub const FALLBACK_TOOL: &str = "search_multi";

const PLANNER_SYSTEM: &str = "You plan API calls that answer a user's question. \
You only use the documented tools, and you keep plans as short as the question allows.";

/// Obtain a structurally valid plan for `message`, asking the model up to
/// [`MAX_GENERATION_ATTEMPTS`] times and substituting the deterministic
/// fallback plan when every attempt fails. Never surfaces an error: planning
/// failures are always recovered locally.
pub async fn generate_plan(
    model: &dyn LanguageModel,
    message: &str,
    documentation: &str,
    history: &[ConversationTurn],
) -> ExecutionPlan {
    let prompt = planning_prompt(message, documentation, history);

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        match model.complete(Some(PLANNER_SYSTEM), &prompt).await {
            Ok(text) => match PlanParser::parse(&text) {
                Ok(plan) => {
                    tracing::debug!(attempt, steps = plan.steps.len(), "plan accepted");
                    return plan;
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "discarding unusable plan");
                }
            },
            Err(error) => {
                tracing::warn!(attempt, %error, "plan generation request failed");
            }
        }
    }

    tracing::warn!("plan generation exhausted its attempts, using fallback plan");
    fallback_plan(message)
}

/// Deterministic single-step plan: one generic multi-category search with the
/// (truncated) user message as its query.
pub fn fallback_plan(message: &str) -> ExecutionPlan {
    let query: String = message.chars().take(FALLBACK_QUERY_MAX_CHARS).collect();
    ExecutionPlan {
        reasoning: "Plan generation did not produce a usable plan; running a generic search with the user's request instead.".into(),
        steps: vec![ExecutionStep {
            id: "search".into(),
            description: "Search movies, TV shows and people for the user's request".into(),
            tool: FALLBACK_TOOL.into(),
            parameters: json!({"query": {"query": query}}),
            depends_on: Vec::new(),
        }],
        expected_outcome: "A list of search results across all categories.".into(),
    }
}

fn planning_prompt(
    message: &str,
    documentation: &str,
    history: &[ConversationTurn],
) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in history {
            prompt.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str("Relevant API documentation:\n");
    prompt.push_str(documentation);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(message);
    prompt.push_str("\n\n");
    prompt.push_str(PlanParser::schema_prompt());
    prompt
}
