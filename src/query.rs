//! Retrieval-augmented query service.
//!
//! One synchronous chain per question: index existence check → question
//! embedding → top-k retrieval → prompt render → completion → best-effort
//! audit insert. Stateless across queries; every adapter is injected so
//! tests can substitute fakes.

use std::sync::Arc;

use crate::audit::AuditStore;
use crate::completion::CompletionProvider;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::{Answer, AnswerRecord};

const PROMPT_TEMPLATE: &str = "Answer the following question in brief using only the information provided in the context

Context: {context}

Question: {question}

Answer:
";

pub struct QueryService {
    config: Arc<Config>,
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionProvider>,
    audit: Arc<dyn AuditStore>,
}

impl QueryService {
    pub fn new(
        config: Arc<Config>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionProvider>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            embeddings,
            index,
            completion,
            audit,
        }
    }

    /// Answer a question against the indexed documents.
    ///
    /// Returns [`Error::KnowledgeBaseEmpty`] when nothing has been ingested
    /// yet — callers present this as "no documents indexed", not a failure.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let index_name = &self.config.index.name;
        if !self.index.has_index(index_name).await? {
            return Err(Error::KnowledgeBaseEmpty);
        }

        let query_vector = self.embeddings.embed_one(question).await?;

        let hits = match self
            .index
            .search(index_name, &query_vector, self.config.retrieval.top_k)
            .await
        {
            Ok(hits) => hits,
            Err(Error::IndexNotFound(_)) => return Err(Error::KnowledgeBaseEmpty),
            Err(e) => return Err(e),
        };

        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render_prompt(&context, question);

        let answer_text = self.completion.complete(&prompt).await?;

        let sources: Vec<_> = hits.into_iter().map(|h| h.meta).collect();

        // Best-effort audit: a failed insert is logged, never surfaced.
        let record = AnswerRecord {
            question: question.to_string(),
            answer: answer_text.clone(),
            sources: sources.clone(),
            created_at: chrono::Utc::now(),
        };
        if let Err(e) = self.audit.insert(&record).await {
            tracing::warn!("failed to persist answer record: {}", e);
        }

        Ok(Answer {
            text: answer_text,
            sources,
        })
    }
}

fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}
