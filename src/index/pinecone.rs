//! Serverless Pinecone backend for [`VectorIndex`].
//!
//! Control-plane calls (list/create/describe) go to `api.pinecone.io`;
//! data-plane calls (upsert/query/delete) go to the per-index host returned
//! by describe, which is cached after the first lookup. Requires the
//! `PINECONE_API_KEY` environment variable.
//!
//! Chunk text rides inside the metadata payload under a `text` key, the
//! rest of the payload round-trips as [`ChunkMeta`].

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::models::{ChunkMeta, SearchHit, VectorRecord};

use super::VectorIndex;

const CONTROL_PLANE: &str = "https://api.pinecone.io";

pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    cloud: String,
    region: String,
    /// name → data-plane host, filled lazily by describe.
    hosts: RwLock<HashMap<String, String>>,
}

fn index_err(reason: impl ToString) -> Error {
    Error::ProviderUnavailable {
        provider: "vector index",
        reason: reason.to_string(),
    }
}

#[derive(Deserialize)]
struct DescribeResponse {
    host: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    score: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| index_err("PINECONE_API_KEY not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(index_err)?;
        Ok(Self {
            client,
            api_key,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    /// Describe the index; `Ok(None)` when it does not exist.
    async fn describe(&self, name: &str) -> Result<Option<DescribeResponse>> {
        let response = self
            .client
            .get(format!("{}/indexes/{}", CONTROL_PLANE, name))
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(index_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(index_err(format!("describe index {}: {}", status, body)));
        }

        let described: DescribeResponse = response.json().await.map_err(index_err)?;
        self.hosts
            .write()
            .unwrap()
            .insert(name.to_string(), described.host.clone());
        Ok(Some(described))
    }

    /// Data-plane host for an index; [`Error::IndexNotFound`] when absent.
    async fn host(&self, name: &str) -> Result<String> {
        if let Some(host) = self.hosts.read().unwrap().get(name) {
            return Ok(host.clone());
        }
        match self.describe(name).await? {
            Some(described) => Ok(described.host),
            None => Err(Error::IndexNotFound(name.to_string())),
        }
    }

    async fn data_plane_post(
        &self,
        name: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let host = self.host(name).await?;
        let response = self
            .client
            .post(format!("https://{}{}", host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(index_err)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // Host cache may be stale after an index was deleted remotely.
            self.hosts.write().unwrap().remove(name);
            return Err(Error::IndexNotFound(name.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(index_err(format!("{} {}: {}", path, status, text)));
        }
        Ok(response)
    }
}

fn record_metadata(record: &VectorRecord) -> Result<serde_json::Value> {
    let mut metadata = serde_json::to_value(&record.meta).map_err(index_err)?;
    metadata["text"] = serde_json::Value::String(record.text.clone());
    Ok(metadata)
}

fn parse_hit(m: QueryMatch) -> Result<SearchHit> {
    let text = m
        .metadata
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();
    let meta: ChunkMeta = serde_json::from_value(m.metadata)
        .map_err(|e| index_err(format!("malformed metadata payload: {}", e)))?;
    Ok(SearchHit {
        meta,
        text,
        score: m.score,
    })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn ensure_index(&self, name: &str, dimension: usize, metric: &str) -> Result<()> {
        if let Some(existing) = self.describe(name).await? {
            if existing.dimension != dimension {
                return Err(Error::IngestionFailure(format!(
                    "index '{}' has dimension {} but the embedding model produces {}",
                    name, existing.dimension, dimension
                )));
            }
            return Ok(());
        }

        tracing::info!(index = name, dimension, metric, "creating vector index");
        let body = serde_json::json!({
            "name": name,
            "dimension": dimension,
            "metric": metric,
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });
        let response = self
            .client
            .post(format!("{}/indexes", CONTROL_PLANE))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(index_err)?;

        let status = response.status();
        // 409: another run created it between describe and create.
        if !status.is_success() && status != reqwest::StatusCode::CONFLICT {
            let text = response.text().await.unwrap_or_default();
            return Err(index_err(format!("create index {}: {}", status, text)));
        }
        Ok(())
    }

    async fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.describe(name).await?.is_some())
    }

    async fn upsert(&self, name: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let vectors: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                Ok(serde_json::json!({
                    "id": r.id,
                    "values": r.values,
                    "metadata": record_metadata(r)?,
                }))
            })
            .collect::<Result<_>>()?;

        let body = serde_json::json!({ "vectors": vectors });
        self.data_plane_post(name, "/vectors/upsert", &body).await?;
        Ok(())
    }

    async fn delete_by_source(&self, name: &str, source: &str) -> Result<()> {
        let body = serde_json::json!({
            "filter": { "source": { "$eq": source } }
        });
        self.data_plane_post(name, "/vectors/delete", &body).await?;
        Ok(())
    }

    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let body = serde_json::json!({
            "vector": query,
            "topK": k,
            "includeMetadata": true,
        });
        let response = self.data_plane_post(name, "/query", &body).await?;
        let parsed: QueryResponse = response.json().await.map_err(index_err)?;
        parsed.matches.into_iter().map(parse_hit).collect()
    }
}
