//! Vector index adapters.
//!
//! The [`VectorIndex`] trait is the seam between the pipeline and the
//! similarity-search backend. Two implementations:
//! - **[`pinecone::PineconeIndex`]** — serverless Pinecone over its REST API.
//! - **[`memory::MemoryIndex`]** — in-process brute-force cosine scan, used
//!   in tests and offline runs.
//!
//! An index's vector dimensionality is fixed when it is created; a later
//! `ensure_index` with a different dimension is an explicit error rather
//! than silent undefined behavior.

pub mod memory;
pub mod pinecone;

use async_trait::async_trait;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::models::{SearchHit, VectorRecord};

/// A named store supporting similarity search over embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the named index if absent; no-op if present with the same
    /// dimension. Errors if the existing index has a different dimension.
    async fn ensure_index(&self, name: &str, dimension: usize, metric: &str) -> Result<()>;

    /// Whether the named index exists.
    async fn has_index(&self, name: &str) -> Result<bool>;

    /// Insert or overwrite records by id. No content deduplication beyond
    /// id identity.
    async fn upsert(&self, name: &str, records: &[VectorRecord]) -> Result<()>;

    /// Delete every vector whose `source` metadata matches, so reprocessing
    /// a document replaces its chunks instead of accumulating duplicates.
    async fn delete_by_source(&self, name: &str, source: &str) -> Result<()>;

    /// Up to `k` nearest neighbors, ranked best-first. An existing but empty
    /// index returns an empty list; a missing index is
    /// [`Error::IndexNotFound`].
    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Create the configured [`VectorIndex`] backend.
pub fn create_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
    match config.provider.as_str() {
        "pinecone" => Ok(Box::new(pinecone::PineconeIndex::new(config)?)),
        "memory" => Ok(Box::new(memory::MemoryIndex::new())),
        other => Err(Error::Config(format!("unknown index provider: {}", other))),
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or empty input.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
