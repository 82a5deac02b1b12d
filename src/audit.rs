//! Metadata store adapter for answer provenance.
//!
//! Each answered query produces one [`AnswerRecord`] persisted here for
//! audit/history. Persistence is best-effort: the query service logs a
//! failure and still returns the answer.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::AnswerRecord;

/// Persists provenance records; `insert` returns the generated id.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: &AnswerRecord) -> Result<String>;
}

/// SQLite-backed audit store with a single `answers` table.
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Open (creating if missing) the audit database and ensure the schema.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                sources_json TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn insert(&self, record: &AnswerRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let sources_json = serde_json::to_string(&record.sources)
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        sqlx::query(
            "INSERT INTO answers (id, question, answer, sources_json, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(&sources_json)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(id)
    }
}
