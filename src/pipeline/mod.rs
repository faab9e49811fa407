mod events;

pub use events::{channel, EventSink, StreamEvent, TraceFrame, EVENT_CHANNEL_CAPACITY};

use crate::error::{AgentError, Result};
use crate::llm::LanguageModel;
use crate::plan::{
    generate_plan, ExecutionObserver, ExecutionPlan, PlanExecutor, StepResults, StepStatus,
    TraceEntry,
};
use crate::retrieval::Retriever;
use crate::storage::{ConversationStore, ConversationTurn, ThreadSummary};
use crate::tools::ToolInvoker;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;

const SYNTHESIS_SYSTEM: &str = "You answer questions using API results gathered for the user. \
Be direct, cite titles, dates and numbers from the results, and do not invent data.";

/// One inbound chat turn bound to one conversation.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
}

/// Strictly linear pipeline over the four stages: Retrieval, Planning,
/// Execution, Synthesis. No stage begins before the previous stage's output
/// is fully materialized; every collaborator call is awaited in order.
pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn LanguageModel>,
    invoker: Arc<dyn ToolInvoker>,
    store: Arc<dyn ConversationStore>,
}

impl Pipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        invoker: Arc<dyn ToolInvoker>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            retriever,
            model,
            invoker,
            store,
        }
    }

    /// Run one turn, emitting frames to `sink`. Any stage failure after the
    /// stream has opened becomes a single `error` frame and the stream halts;
    /// no `done` follows an `error`.
    pub async fn run(&self, request: ChatRequest, sink: EventSink) {
        if let Err(error) = self.drive(&request, &sink).await {
            tracing::warn!(thread = %request.thread_id, %error, "pipeline run failed");
            sink.emit(StreamEvent::error(error.to_string())).await;
        }
    }

    async fn drive(&self, request: &ChatRequest, sink: &EventSink) -> Result<()> {
        // ── Retrieval ───────────────────────────────────────────────────
        sink.emit(StreamEvent::status("Searching the API documentation…"))
            .await;
        let chunks = self
            .retriever
            .search(&request.message)
            .await
            .map_err(AgentError::Other)?;
        tracing::debug!(thread = %request.thread_id, chunks = chunks.len(), "retrieval done");
        sink.emit(StreamEvent::trace(
            "retrieval",
            serde_json::to_value(&chunks).unwrap_or_default(),
        ))
        .await;

        // ── Planning ────────────────────────────────────────────────────
        sink.emit(StreamEvent::status("Planning API calls…")).await;
        let history = self
            .store
            .get_conversation(&request.thread_id)
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;
        let documentation = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let plan = generate_plan(
            self.model.as_ref(),
            &request.message,
            &documentation,
            &history,
        )
        .await;
        let declared: Vec<_> = plan
            .steps
            .iter()
            .map(|step| {
                serde_json::json!({
                    "id": step.id,
                    "description": step.description,
                    "tool": step.tool,
                    "status": StepStatus::Pending,
                })
            })
            .collect();
        sink.emit(StreamEvent::trace(
            "plan",
            serde_json::json!({
                "steps": plan.steps.len(),
                "reasoning": plan.reasoning,
                "plan": declared,
            }),
        ))
        .await;

        // ── Execution ───────────────────────────────────────────────────
        sink.emit(StreamEvent::status("Executing the plan…")).await;
        let observer = SinkObserver { sink: sink.clone() };
        let outcome = PlanExecutor::execute(&plan, self.invoker.as_ref(), &observer).await?;

        // ── Synthesis ───────────────────────────────────────────────────
        sink.emit(StreamEvent::status("Writing the answer…")).await;
        let prompt = synthesis_prompt(&request.message, &plan, &outcome.results);
        let mut answer_stream = self
            .model
            .complete_stream(Some(SYNTHESIS_SYSTEM), &prompt)
            .await
            .map_err(AgentError::Other)?;

        let mut answer = String::new();
        while let Some(chunk) = answer_stream.next().await {
            let chunk = chunk.map_err(AgentError::Other)?;
            answer.push_str(&chunk);
            sink.emit(StreamEvent::content(chunk)).await;
        }

        // ── Persist, then close the stream ──────────────────────────────
        self.persist(request, &answer, outcome.trace).await?;
        sink.emit(StreamEvent::Done).await;
        Ok(())
    }

    async fn persist(
        &self,
        request: &ChatRequest,
        answer: &str,
        trace: Vec<TraceEntry>,
    ) -> Result<()> {
        self.store
            .insert_turn(&ConversationTurn::user(
                &request.thread_id,
                &request.message,
            ))
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;
        self.store
            .insert_turn(&ConversationTurn::assistant(
                &request.thread_id,
                answer,
                trace,
            ))
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;
        self.store
            .upsert_thread(&ThreadSummary::from_answer(&request.thread_id, answer))
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Forwards each execution trace transition onto the frame channel as it
/// happens.
struct SinkObserver {
    sink: EventSink,
}

#[async_trait]
impl ExecutionObserver for SinkObserver {
    async fn on_trace(&self, entry: &TraceEntry) {
        let mut data = serde_json::Map::new();
        data.insert(
            "status".to_string(),
            serde_json::to_value(entry.status).unwrap_or_default(),
        );
        if let serde_json::Value::Object(details) = &entry.details {
            data.extend(details.clone());
        }
        self.sink
            .emit(StreamEvent::trace(
                entry.step.clone(),
                serde_json::Value::Object(data),
            ))
            .await;
    }
}

fn synthesis_prompt(message: &str, plan: &ExecutionPlan, results: &StepResults) -> String {
    let mut prompt = format!("Question: {message}\n\n");
    prompt.push_str(&format!("Expected outcome: {}\n\n", plan.expected_outcome));
    prompt.push_str("API results:\n");
    for (step_id, result) in results {
        prompt.push_str(&format!("{step_id}: {result}\n"));
    }
    prompt.push_str("\nAnswer the question using only these results.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn synthesis_prompt_embeds_results_per_step() {
        let plan = ExecutionPlan {
            reasoning: "r".into(),
            steps: Vec::new(),
            expected_outcome: "the best match".into(),
        };
        let mut results = StepResults::new();
        results.insert("search".into(), json!({"results": [{"id": 1}]}));

        let prompt = synthesis_prompt("best sci-fi?", &plan, &results);

        assert!(prompt.contains("Question: best sci-fi?"));
        assert!(prompt.contains("Expected outcome: the best match"));
        assert!(prompt.contains("search: {\"results\""));
    }
}
