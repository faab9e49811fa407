use super::AppState;
use crate::pipeline::{self, ChatRequest};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::convert::Infallible;

/// Chat request body.
#[derive(serde::Deserialize)]
pub struct ChatBody {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /chat: run one pipeline turn, streaming frames as NDJSON.
///
/// Anything wrong with the request itself is rejected here with a
/// conventional status code; once the streaming body has started, failures
/// can only be communicated via an `error` frame.
pub(super) async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => {
            let err = serde_json::json!({
                "error": format!("Invalid JSON: {e}. Expected: {{\"message\": \"...\"}}")
            });
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    if body.message.trim().is_empty() {
        let err = serde_json::json!({"error": "message must not be empty"});
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }

    let thread_id = body
        .thread_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (sink, mut rx) = pipeline::channel();
    let request = ChatRequest {
        thread_id: thread_id.clone(),
        message: body.message,
    };
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.run(request, sink).await;
    });

    let frames = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(event.to_ndjson());
        }
    };

    let mut response = Response::new(Body::from_stream(frames));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    if let Ok(value) = HeaderValue::from_str(&thread_id) {
        response.headers_mut().insert("x-thread-id", value);
    }
    response
}

/// GET /threads
pub(super) async fn handle_list_threads(State(state): State<AppState>) -> Response {
    match state.store.list_threads().await {
        Ok(threads) => Json(threads).into_response(),
        Err(error) => storage_failure(error),
    }
}

/// GET /threads/{id}
pub(super) async fn handle_get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_conversation(&id).await {
        Ok(turns) => Json(turns).into_response(),
        Err(error) => storage_failure(error),
    }
}

fn storage_failure(error: anyhow::Error) -> Response {
    tracing::error!(%error, "storage request failed");
    let err = serde_json::json!({"error": "storage unavailable"});
    (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
}
