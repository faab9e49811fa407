mod common;

use common::{kinds, two_step_plan_text, MockInvoker, SequenceModel, StubRetriever};
use docent::llm::LanguageModel;
use docent::pipeline::{self, ChatRequest, Pipeline, StreamEvent, TraceFrame};
use docent::retrieval::Retriever;
use docent::storage::{ConversationStore, Role, SqliteStore};
use docent::tools::ToolInvoker;
use serde_json::json;
use std::sync::Arc;

const QUESTION: &str = "Find the highest-rated sci-fi movie from 2023";

const ANSWER: &str = "The highest-rated science fiction movie of 2023 is Spider-Man: \
Across the Spider-Verse, with a vote average of 8.4 on more than 6000 votes.\n\n\
It was released on 31 May 2023 and runs 140 minutes.";

fn retriever() -> Arc<dyn Retriever> {
    Arc::new(StubRetriever::with_chunks(&[
        "discover_movie — GET /discover/movie\nDiscover movies by filters and sort order.",
        "movie_details — GET /movie/{movie_id}\nFetch full details for one movie.",
    ]))
}

fn happy_invoker() -> MockInvoker {
    MockInvoker::new()
        .returning(
            "discover_movie",
            json!({"results": [{"id": 569094, "title": "Spider-Man: Across the Spider-Verse"}]}),
        )
        .returning(
            "movie_details",
            json!({"id": 569094, "title": "Spider-Man: Across the Spider-Verse", "vote_average": 8.4}),
        )
}

async fn run(
    model: Arc<dyn LanguageModel>,
    invoker: Arc<dyn ToolInvoker>,
    store: Arc<dyn ConversationStore>,
) -> Vec<StreamEvent> {
    let pipeline = Pipeline::new(retriever(), model, invoker, store);
    let request = ChatRequest {
        thread_id: "t-test".into(),
        message: QUESTION.into(),
    };

    let (sink, mut rx) = pipeline::channel();
    let collector = async {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    };
    let ((), events) = tokio::join!(pipeline.run(request, sink), collector);
    events
}

fn trace_frames(events: &[StreamEvent]) -> Vec<&TraceFrame> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Trace { trace } => Some(trace),
            _ => None,
        })
        .collect()
}

fn concatenated_content(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Content { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn happy_path_streams_all_stages_and_persists() {
    let model = Arc::new(SequenceModel::new(vec![
        two_step_plan_text(),
        ANSWER.to_string(),
    ]));
    let invoker = Arc::new(happy_invoker());
    let store: Arc<dyn ConversationStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    let events = run(model, invoker.clone(), store.clone()).await;
    let kinds = kinds(&events);

    // Four stage announcements, a final done, and no error.
    assert_eq!(kinds[0], "status");
    assert_eq!(kinds.iter().filter(|k| **k == "status").count(), 4);
    assert_eq!(kinds.last(), Some(&"done"));
    assert_eq!(kinds.iter().filter(|k| **k == "done").count(), 1);
    assert!(!kinds.contains(&"error"));

    // Retrieval trace carries the scored chunks.
    let frames = trace_frames(&events);
    assert_eq!(frames[0].step, "retrieval");
    assert_eq!(frames[0].data.as_array().unwrap().len(), 2);

    // Plan trace carries the step count, reasoning, and the declared steps
    // still pending.
    assert_eq!(frames[1].step, "plan");
    assert_eq!(frames[1].data["steps"], 2);
    assert_eq!(frames[1].data["plan"][0]["status"], "pending");
    assert_eq!(frames[1].data["plan"][1]["id"], "detail");

    // Each step transitions running -> completed, search strictly first.
    let transitions: Vec<(&str, &str)> = frames[2..]
        .iter()
        .map(|frame| (frame.step.as_str(), frame.data["status"].as_str().unwrap()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("find 2023 sci-fi movies sorted by rating", "running"),
            ("find 2023 sci-fi movies sorted by rating", "completed"),
            ("fetch details for the top result", "running"),
            ("fetch details for the top result", "completed"),
        ]
    );

    // The token in step two resolved against step one's result.
    assert_eq!(
        invoker.parameters_for("movie_details").unwrap(),
        json!({"path": {"movie_id": 569094}})
    );

    // Content concatenation reproduces the synthesized answer.
    let answer = concatenated_content(&events);
    assert!(!answer.is_empty());
    assert_eq!(answer, ANSWER);

    // Both turns persisted, assistant turn carrying the trace.
    let conversation = store.get_conversation("t-test").await.unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0].role, Role::User);
    assert_eq!(conversation[0].content, QUESTION);
    assert_eq!(conversation[1].role, Role::Assistant);
    assert_eq!(conversation[1].content, ANSWER);
    assert_eq!(conversation[1].trace.as_ref().unwrap().len(), 2);

    // Thread title is the first 100 characters of the answer.
    let threads = store.list_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    let expected_title: String = ANSWER.chars().take(100).collect();
    assert_eq!(threads[0].title, expected_title);
}

#[tokio::test]
async fn failing_step_emits_one_error_and_no_done() {
    let model = Arc::new(SequenceModel::new(vec![
        two_step_plan_text(),
        ANSWER.to_string(),
    ]));
    let invoker = Arc::new(happy_invoker().failing("movie_details"));
    let store: Arc<dyn ConversationStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    let events = run(model, invoker, store.clone()).await;
    let kinds = kinds(&events);

    assert_eq!(kinds.iter().filter(|k| **k == "error").count(), 1);
    assert_eq!(kinds.last(), Some(&"error"));
    assert!(!kinds.contains(&"done"));
    assert!(!kinds.contains(&"content"));

    // The failing step's trace entry carries the captured message.
    let frames = trace_frames(&events);
    let failed = frames
        .iter()
        .find(|frame| frame.data["status"] == "error")
        .unwrap();
    assert_eq!(failed.step, "fetch details for the top result");
    assert!(failed.data["error"]
        .as_str()
        .unwrap()
        .contains("movie_details is unavailable"));

    // The error frame surfaces the execution failure verbatim.
    let message = events
        .iter()
        .find_map(|event| match event {
            StreamEvent::Error { message } => Some(message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(message.contains("detail"), "{message}");
    assert!(message.contains("status 500"), "{message}");

    // Failed runs persist nothing.
    assert!(store.get_conversation("t-test").await.unwrap().is_empty());
    assert!(store.list_threads().await.unwrap().is_empty());
}

#[tokio::test]
async fn unusable_plans_fall_back_to_generic_search() {
    let model = Arc::new(SequenceModel::new(vec![
        "I am unable to produce a plan for that.".to_string(),
    ]));
    let invoker = Arc::new(
        MockInvoker::new().returning("search_multi", json!({"results": [{"id": 1}]})),
    );
    let store: Arc<dyn ConversationStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    let events = run(model.clone(), invoker.clone(), store).await;
    let kinds = kinds(&events);

    // Planning failures never surface; the run still completes.
    assert!(!kinds.contains(&"error"));
    assert_eq!(kinds.last(), Some(&"done"));

    // Three generation attempts, then one synthesis call.
    assert_eq!(model.call_count(), 4);

    // The fallback plan ran the generic search with the raw question.
    assert_eq!(invoker.called_tools(), vec!["search_multi"]);
    assert_eq!(
        invoker.parameters_for("search_multi").unwrap()["query"]["query"],
        QUESTION
    );

    let frames = trace_frames(&events);
    assert_eq!(frames[1].step, "plan");
    assert_eq!(frames[1].data["steps"], 1);
}

#[tokio::test]
async fn dangling_dependency_fails_before_any_invocation() {
    let plan_text = json!({
        "reasoning": "broken plan",
        "steps": [
            {
                "id": "detail",
                "description": "fetch details",
                "tool": "movie_details",
                "parameters": {"path": {"movie_id": "{{searhc.results.0.id}}"}},
                "depends_on": ["searhc"]
            }
        ],
        "expected_outcome": "details"
    })
    .to_string();
    let model = Arc::new(SequenceModel::new(vec![plan_text]));
    let invoker = Arc::new(MockInvoker::new());
    let store: Arc<dyn ConversationStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    let events = run(model, invoker.clone(), store).await;
    let kinds = kinds(&events);

    assert_eq!(kinds.last(), Some(&"error"));
    assert!(!kinds.contains(&"done"));
    assert!(invoker.called_tools().is_empty());
}
