//! In-process [`VectorIndex`] backend.
//!
//! Brute-force cosine scan over vectors held in a `RwLock`ed map. Mirrors
//! the remote backend's contract exactly — including [`Error::IndexNotFound`]
//! for absent indexes and dimension checks on `ensure_index` and `upsert` —
//! so tests and
//! offline runs exercise the same code paths as production.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{SearchHit, VectorRecord};

use super::{cosine_similarity, VectorIndex};

struct Index {
    dimension: usize,
    records: HashMap<String, VectorRecord>,
}

#[derive(Default)]
pub struct MemoryIndex {
    indexes: RwLock<HashMap<String, Index>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_index(&self, name: &str, dimension: usize, _metric: &str) -> Result<()> {
        let mut indexes = self.indexes.write().unwrap();
        match indexes.get(name) {
            Some(existing) if existing.dimension != dimension => {
                Err(Error::IngestionFailure(format!(
                    "index '{}' has dimension {} but the embedding model produces {}",
                    name, existing.dimension, dimension
                )))
            }
            Some(_) => Ok(()),
            None => {
                indexes.insert(
                    name.to_string(),
                    Index {
                        dimension,
                        records: HashMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.read().unwrap().contains_key(name))
    }

    async fn upsert(&self, name: &str, records: &[VectorRecord]) -> Result<()> {
        let mut indexes = self.indexes.write().unwrap();
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))?;
        for record in records {
            if record.values.len() != index.dimension {
                return Err(Error::IngestionFailure(format!(
                    "record '{}' has dimension {} but index '{}' expects {}",
                    record.id,
                    record.values.len(),
                    name,
                    index.dimension
                )));
            }
        }
        for record in records {
            index.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn delete_by_source(&self, name: &str, source: &str) -> Result<()> {
        let mut indexes = self.indexes.write().unwrap();
        if let Some(index) = indexes.get_mut(name) {
            index.records.retain(|_, r| r.meta.source != source);
        }
        Ok(())
    }

    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let indexes = self.indexes.read().unwrap();
        let index = indexes
            .get(name)
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))?;

        let mut hits: Vec<SearchHit> = index
            .records
            .values()
            .map(|record| SearchHit {
                meta: record.meta.clone(),
                text: record.text.clone(),
                score: cosine_similarity(query, &record.values),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMeta;

    fn record(id: &str, source: &str, page: usize, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            text: String::new(),
            meta: ChunkMeta {
                source: source.to_string(),
                page,
                chunk_index: 0,
                title: None,
                author: None,
                created: None,
            },
        }
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 3, "cosine").await.unwrap();
        index.ensure_index("kb", 3, "cosine").await.unwrap();
        assert!(index.has_index("kb").await.unwrap());
        assert_eq!(index.indexes.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ensure_index_rejects_dimension_change() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 3, "cosine").await.unwrap();
        let err = index.ensure_index("kb", 5, "cosine").await.unwrap_err();
        assert!(matches!(err, Error::IngestionFailure(_)));
    }

    #[tokio::test]
    async fn upsert_rejects_mismatched_dimension() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 3, "cosine").await.unwrap();

        let err = index
            .upsert("kb", &[record("r1", "a.pdf", 0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IngestionFailure(_)));

        // Nothing was stored; the bad record is not silently unreachable.
        let hits = index.search("kb", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_on_empty_index_returns_empty_list() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 2, "cosine").await.unwrap();
        let hits = index.search("kb", &[1.0, 0.0], 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_on_missing_index_is_not_found() {
        let index = MemoryIndex::new();
        let err = index.search("kb", &[1.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn metadata_survives_upsert_and_search() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 2, "cosine").await.unwrap();
        index
            .upsert("kb", &[record("r1", "a.pdf", 2, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = index.search("kb", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.source, "a.pdf");
        assert_eq!(hits[0].meta.page, 2);
    }

    #[tokio::test]
    async fn search_ranks_best_first_and_truncates() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 2, "cosine").await.unwrap();
        index
            .upsert(
                "kb",
                &[
                    record("r1", "a.pdf", 0, vec![1.0, 0.0]),
                    record("r2", "b.pdf", 0, vec![0.0, 1.0]),
                    record("r3", "c.pdf", 0, vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = index.search("kb", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].meta.source, "a.pdf");
        assert_eq!(hits[1].meta.source, "c.pdf");
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 2, "cosine").await.unwrap();
        index
            .upsert("kb", &[record("r1", "a.pdf", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert("kb", &[record("r1", "a.pdf", 1, vec![0.0, 1.0])])
            .await
            .unwrap();

        let hits = index.search("kb", &[0.0, 1.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.page, 1);
    }

    #[tokio::test]
    async fn delete_by_source_removes_only_matching_records() {
        let index = MemoryIndex::new();
        index.ensure_index("kb", 2, "cosine").await.unwrap();
        index
            .upsert(
                "kb",
                &[
                    record("r1", "a.pdf", 0, vec![1.0, 0.0]),
                    record("r2", "b.pdf", 0, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        index.delete_by_source("kb", "a.pdf").await.unwrap();
        let hits = index.search("kb", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.source, "b.pdf");
    }
}
