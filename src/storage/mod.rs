mod sqlite;

pub use sqlite::SqliteStore;

use crate::plan::TraceEntry;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Thread titles are the first 100 characters of the latest answer.
pub const THREAD_TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One persisted message of a conversation. Append-only; never deleted by
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub thread_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

impl ConversationTurn {
    pub fn user(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
            trace: None,
        }
    }

    pub fn assistant(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        trace: Vec<TraceEntry>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
            trace: Some(trace),
        }
    }
}

/// Upsertable per-thread summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub title: String,
    pub last_updated: String,
}

impl ThreadSummary {
    /// Summary derived from a freshly synthesized answer.
    pub fn from_answer(thread_id: impl Into<String>, answer: &str) -> Self {
        Self {
            thread_id: thread_id.into(),
            title: answer.chars().take(THREAD_TITLE_MAX_CHARS).collect(),
            last_updated: Utc::now().to_rfc3339(),
        }
    }
}

/// Durable conversation storage collaborator. `upsert_thread` is idempotent
/// by thread id; turns are an append-only log.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert_turn(&self, turn: &ConversationTurn) -> anyhow::Result<()>;
    async fn upsert_thread(&self, summary: &ThreadSummary) -> anyhow::Result<()>;
    async fn get_conversation(&self, thread_id: &str) -> anyhow::Result<Vec<ConversationTurn>>;
    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadSummary>>;
}
