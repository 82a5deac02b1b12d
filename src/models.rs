//! Core data types that flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to every chunk and carried through the vector index
/// payload unchanged. Round-trips through JSON for remote backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Source PDF filename (not a path).
    pub source: String,
    /// 0-based page number within the source document.
    pub page: usize,
    /// Document-wide chunk position, continuing across pages.
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

/// A bounded span of extracted document text, the unit of embedding and
/// retrieval. Exists only transiently during ingestion.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub meta: ChunkMeta,
}

/// A chunk's embedding plus its text and metadata, as stored in the vector
/// index. Remote backends carry `text` inside the metadata payload.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Deterministic id (hash of source, page, and chunk index) so
    /// re-ingesting the same file overwrites rather than duplicates.
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub meta: ChunkMeta,
}

/// A nearest-neighbor match returned from the vector index, best-first.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub meta: ChunkMeta,
    pub text: String,
    pub score: f32,
}

/// The result of one retrieval-augmented query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Metadata of every retrieved chunk, rank order preserved.
    pub sources: Vec<ChunkMeta>,
}

/// Provenance record persisted to the audit store for each answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
    pub sources: Vec<ChunkMeta>,
    pub created_at: DateTime<Utc>,
}

/// Role tag for a message in a session's conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Provenance note rendered alongside an assistant message.
    Note,
}

/// One entry in a session-scoped conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn note(content: impl Into<String>) -> Self {
        Self {
            role: Role::Note,
            content: content.into(),
        }
    }
}
