//! Document ingestion pipeline.
//!
//! Transforms every PDF currently in the upload folder into vector records:
//! scan → per-page extraction → overlapping chunks → one batched embedding
//! call → ensure index (dimension probed once) → replace-then-upsert.
//!
//! The run is all-or-nothing in signal but not in effect: the first failure
//! aborts with a single [`Error::IngestionFailure`], and upserts already
//! applied are not rolled back.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::chunk::chunk_page;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::{Chunk, ChunkMeta, VectorRecord};
use crate::pdf;
use crate::uploads;

/// Fixed sentence embedded once per run to learn the model's output size.
const DIMENSION_PROBE: &str = "A test sentence for dimension calculation.";

/// Summary of one completed ingestion run.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

pub struct IngestionPipeline {
    config: Arc<Config>,
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        config: Arc<Config>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config,
            embeddings,
            index,
        }
    }

    /// Process every PDF in the upload folder. Any failure aborts the whole
    /// run; the caller receives a single failure signal.
    pub async fn run(&self) -> Result<IngestReport> {
        match self.run_inner().await {
            Ok(report) => Ok(report),
            Err(e @ Error::IngestionFailure(_)) => Err(e),
            Err(e) => Err(Error::IngestionFailure(e.to_string())),
        }
    }

    async fn run_inner(&self) -> Result<IngestReport> {
        let dir = &self.config.uploads.dir;
        let paths = uploads::pdf_paths(dir)?;

        let mut documents: Vec<(String, Vec<Chunk>)> = Vec::new();
        for path in &paths {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let chunks = self.load_document(path, &source)?;
            tracing::info!(source = %source, chunks = chunks.len(), "extracted document");
            documents.push((source, chunks));
        }

        let all_chunks: Vec<&Chunk> = documents.iter().flat_map(|(_, c)| c.iter()).collect();
        if all_chunks.is_empty() {
            return Err(Error::IngestionFailure(
                "upload folder contains no PDF text to index".to_string(),
            ));
        }

        // One batch call amortizes provider round-trips.
        let texts: Vec<String> = all_chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed(&texts).await?;
        if vectors.len() != all_chunks.len() {
            return Err(Error::IngestionFailure(format!(
                "embedding count mismatch: {} texts, {} vectors",
                all_chunks.len(),
                vectors.len()
            )));
        }

        let dimension = self.embeddings.embed_one(DIMENSION_PROBE).await?.len();
        let index_name = &self.config.index.name;
        self.index
            .ensure_index(index_name, dimension, &self.config.index.metric)
            .await?;

        // Replace before upsert so reprocessing a file never accumulates
        // stale chunks from an earlier version.
        for (source, _) in &documents {
            self.index.delete_by_source(index_name, source).await?;
        }

        let records: Vec<VectorRecord> = all_chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorRecord {
                id: record_id(&chunk.meta),
                values,
                text: chunk.text.clone(),
                meta: chunk.meta.clone(),
            })
            .collect();
        self.index.upsert(index_name, &records).await?;

        let report = IngestReport {
            documents: documents.len(),
            chunks: records.len(),
            dimension,
        };
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            dimension = report.dimension,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Delete every vector belonging to one source document, so a removed
    /// file stops contributing to answers. A missing index means nothing
    /// was ever ingested — not an error.
    pub async fn purge_source(&self, source: &str) -> Result<()> {
        match self
            .index
            .delete_by_source(&self.config.index.name, source)
            .await
        {
            Ok(()) | Err(Error::IndexNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn load_document(&self, path: &Path, source: &str) -> Result<Vec<Chunk>> {
        let bytes = std::fs::read(path)?;
        let doc = pdf::extract(&bytes)?;

        let base = ChunkMeta {
            source: source.to_string(),
            page: 0,
            chunk_index: 0,
            title: doc.title,
            author: doc.author,
            created: doc.created,
        };

        let size = self.config.chunking.chunk_size;
        let overlap = self.config.chunking.chunk_overlap;

        let mut chunks = Vec::new();
        let mut next_index = 0;
        for (page, text) in doc.pages.iter().enumerate() {
            let page_meta = ChunkMeta {
                page,
                ..base.clone()
            };
            let page_chunks = chunk_page(text, &page_meta, size, overlap, next_index);
            next_index += page_chunks.len();
            chunks.extend(page_chunks);
        }
        Ok(chunks)
    }
}

/// Deterministic record id: the same chunk position in the same file always
/// maps to the same id, so repeated ingestion overwrites in place.
fn record_id(meta: &ChunkMeta) -> String {
    let mut hasher = Sha256::new();
    hasher.update(meta.source.as_bytes());
    hasher.update([0]);
    hasher.update(meta.page.to_le_bytes());
    hasher.update(meta.chunk_index.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, page: usize, chunk_index: usize) -> ChunkMeta {
        ChunkMeta {
            source: source.to_string(),
            page,
            chunk_index,
            title: None,
            author: None,
            created: None,
        }
    }

    #[test]
    fn record_id_is_deterministic() {
        assert_eq!(record_id(&meta("a.pdf", 1, 2)), record_id(&meta("a.pdf", 1, 2)));
    }

    #[test]
    fn record_id_distinguishes_position_and_source() {
        let base = record_id(&meta("a.pdf", 0, 0));
        assert_ne!(base, record_id(&meta("a.pdf", 0, 1)));
        assert_ne!(base, record_id(&meta("a.pdf", 1, 0)));
        assert_ne!(base, record_id(&meta("b.pdf", 0, 0)));
    }
}
