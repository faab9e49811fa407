#![allow(dead_code)]

use async_trait::async_trait;
use docent::llm::LanguageModel;
use docent::pipeline::StreamEvent;
use docent::retrieval::{Retriever, ScoredChunk};
use docent::tools::{InvocationError, ToolInvoker};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Retriever returning fixed chunks regardless of the query.
pub struct StubRetriever {
    pub chunks: Vec<ScoredChunk>,
}

impl StubRetriever {
    pub fn with_chunks(texts: &[&str]) -> Self {
        let n = texts.len() as f64;
        Self {
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, text)| ScoredChunk {
                    text: (*text).to_string(),
                    score: (n - i as f64) / n,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn search(&self, _query: &str) -> anyhow::Result<Vec<ScoredChunk>> {
        Ok(self.chunks.clone())
    }
}

/// Model yielding canned responses in call order, repeating the last.
pub struct SequenceModel {
    responses: Vec<String>,
    calls: AtomicUsize,
}

impl SequenceModel {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for SequenceModel {
    fn name(&self) -> &str {
        "sequence"
    }

    async fn complete(&self, _system: Option<&str>, _prompt: &str) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.responses.len() - 1);
        Ok(self.responses[index].clone())
    }
}

/// Invoker with canned per-tool results, an optional failure set, and a call
/// log.
pub struct MockInvoker {
    outcomes: BTreeMap<String, Value>,
    failures: BTreeSet<String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self {
            outcomes: BTreeMap::new(),
            failures: BTreeSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, tool: &str, value: Value) -> Self {
        self.outcomes.insert(tool.to_string(), value);
        self
    }

    pub fn failing(mut self, tool: &str) -> Self {
        self.failures.insert(tool.to_string());
        self
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(tool, _)| tool.clone())
            .collect()
    }

    pub fn parameters_for(&self, tool: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl ToolInvoker for MockInvoker {
    async fn invoke(&self, tool: &str, parameters: Value) -> Result<Value, InvocationError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), parameters));

        if self.failures.contains(tool) {
            return Err(InvocationError::Api {
                status: 500,
                body: format!("{tool} is unavailable"),
            });
        }

        Ok(self
            .outcomes
            .get(tool)
            .cloned()
            .unwrap_or_else(|| json!({"ok": tool})))
    }
}

/// The two-step plan used by the happy-path scenarios: a discover search,
/// then a detail lookup interpolating the top result's id.
pub fn two_step_plan_text() -> String {
    json!({
        "reasoning": "discover the highest-rated 2023 sci-fi movie, then fetch its details",
        "steps": [
            {
                "id": "search",
                "description": "find 2023 sci-fi movies sorted by rating",
                "tool": "discover_movie",
                "parameters": {"query": {
                    "sort_by": "vote_average.desc",
                    "with_genres": "878",
                    "primary_release_year": 2023
                }},
                "depends_on": []
            },
            {
                "id": "detail",
                "description": "fetch details for the top result",
                "tool": "movie_details",
                "parameters": {"path": {"movie_id": "{{search.results.0.id}}"}},
                "depends_on": ["search"]
            }
        ],
        "expected_outcome": "full details for the highest-rated 2023 sci-fi movie"
    })
    .to_string()
}

/// Frame type discriminators, in emission order.
pub fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Trace { .. } => "trace",
            StreamEvent::Content { .. } => "content",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
        })
        .collect()
}
