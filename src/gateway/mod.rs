//! Axum-based HTTP gateway.
//!
//! `POST /chat` answers with a newline-delimited JSON event stream; the side
//! routes expose health and the persisted conversation log. Body size limits
//! and request timeouts are applied to every route.

mod handlers;

use handlers::{handle_chat, handle_get_conversation, handle_health, handle_list_threads};

use crate::pipeline::Pipeline;
use crate::storage::ConversationStore;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout; streaming bodies are not covered once headers are out.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn ConversationStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .route("/threads", get(handle_list_threads))
        .route("/threads/{id}", get(handle_get_conversation))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Run the HTTP gateway.
pub async fn run_gateway(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid gateway address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind gateway address")?;
    run_gateway_with_listener(listener, state).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> Result<()> {
    let addr = listener.local_addr().context("listener has no address")?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, router(state))
        .await
        .context("gateway server failed")
}
