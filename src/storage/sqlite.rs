use super::{ConversationStore, ConversationTurn, Role, ThreadSummary};
use crate::plan::TraceEntry;
use anyhow::{bail, Context};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// SQLite-backed conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create database directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("failed to open conversation database")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database, one connection so every query sees it.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to open in-memory database")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS turns (
                id          TEXT PRIMARY KEY,
                thread_id   TEXT NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                trace       TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_turns_thread
                ON turns(thread_id, created_at);

            CREATE TABLE IF NOT EXISTS threads (
                thread_id    TEXT PRIMARY KEY,
                title        TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .context("failed to initialize schema")?;
        Ok(())
    }
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    match raw {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        other => bail!("unknown role in turns table: {other}"),
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn insert_turn(&self, turn: &ConversationTurn) -> anyhow::Result<()> {
        let trace = turn
            .trace
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to encode trace")?;

        sqlx::query(
            "INSERT INTO turns (id, thread_id, role, content, created_at, trace)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&turn.id)
        .bind(&turn.thread_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(&turn.timestamp)
        .bind(trace)
        .execute(&self.pool)
        .await
        .context("failed to insert turn")?;
        Ok(())
    }

    async fn upsert_thread(&self, summary: &ThreadSummary) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO threads (thread_id, title, last_updated)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(thread_id) DO UPDATE SET
                 title = excluded.title,
                 last_updated = excluded.last_updated",
        )
        .bind(&summary.thread_id)
        .bind(&summary.title)
        .bind(&summary.last_updated)
        .execute(&self.pool)
        .await
        .context("failed to upsert thread")?;
        Ok(())
    }

    async fn get_conversation(&self, thread_id: &str) -> anyhow::Result<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            "SELECT id, thread_id, role, content, created_at, trace
             FROM turns
             WHERE thread_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load conversation")?;

        rows.into_iter()
            .map(|row| {
                let trace: Option<String> = row.try_get("trace")?;
                let trace = trace
                    .as_deref()
                    .map(serde_json::from_str::<Vec<TraceEntry>>)
                    .transpose()
                    .unwrap_or_default();
                Ok(ConversationTurn {
                    id: row.try_get("id")?,
                    thread_id: row.try_get("thread_id")?,
                    role: parse_role(&row.try_get::<String, _>("role")?)?,
                    content: row.try_get("content")?,
                    timestamp: row.try_get("created_at")?,
                    trace,
                })
            })
            .collect()
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadSummary>> {
        let rows = sqlx::query(
            "SELECT thread_id, title, last_updated
             FROM threads
             ORDER BY last_updated DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list threads")?;

        rows.into_iter()
            .map(|row| {
                Ok(ThreadSummary {
                    thread_id: row.try_get("thread_id")?,
                    title: row.try_get("title")?,
                    last_updated: row.try_get("last_updated")?,
                })
            })
            .collect()
    }
}
