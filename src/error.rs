//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Every external-service boundary maps its failures into one of these
//! variants so callers can distinguish "no documents indexed yet"
//! ([`Error::KnowledgeBaseEmpty`]) from a misconfigured or unreachable
//! provider ([`Error::ProviderUnavailable`]).
//!
//! User-facing text never carries raw provider output: [`Error::user_message`]
//! returns a fixed string per kind, and the full detail is routed to the
//! tracing log at the call site.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Embedding or completion service unreachable or misconfigured.
    #[error("{provider} provider unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// The named vector index does not exist. Expected before the first
    /// ingestion run; callers treat this as "no knowledge yet".
    #[error("vector index '{0}' not found")]
    IndexNotFound(String),

    /// Query-time form of [`Error::IndexNotFound`]: nothing has been
    /// ingested for the configured index.
    #[error("no documents have been indexed yet")]
    KnowledgeBaseEmpty,

    /// Audit store connection or insert failed. Non-fatal to the answer path.
    #[error("metadata store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any step of the ingestion pipeline failed; the whole run aborts.
    #[error("ingestion failed: {0}")]
    IngestionFailure(String),

    /// An upload batch violated the validation rules (count, extension,
    /// aggregate size). The entire batch is rejected.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// A removal request named a file that is not in the upload folder.
    #[error("document '{0}' not found")]
    DocumentNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code used in HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ProviderUnavailable { .. } => "provider_unavailable",
            Error::IndexNotFound(_) => "index_not_found",
            Error::KnowledgeBaseEmpty => "knowledge_base_empty",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::IngestionFailure(_) => "ingestion_failure",
            Error::InvalidUpload(_) => "invalid_upload",
            Error::DocumentNotFound(_) => "document_not_found",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
        }
    }

    /// Sanitized message safe to show in a chat transcript.
    ///
    /// Raw provider error text stays in the operator log.
    pub fn user_message(&self) -> String {
        match self {
            Error::ProviderUnavailable { provider, .. } => format!(
                "The {} service is currently unavailable. Please try again later.",
                provider
            ),
            Error::IndexNotFound(_) | Error::KnowledgeBaseEmpty => {
                "No documents have been indexed yet. Upload a PDF to get started.".to_string()
            }
            Error::StoreUnavailable(_) => {
                "The answer was produced but could not be recorded for audit.".to_string()
            }
            Error::IngestionFailure(_) => {
                "Processing the uploaded documents failed. Please try again.".to_string()
            }
            Error::InvalidUpload(reason) => reason.clone(),
            Error::DocumentNotFound(name) => format!("File '{}' not found.", name),
            Error::Config(_) | Error::Io(_) => "An internal error occurred.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_knowledge_base_distinct_from_provider_failure() {
        let a = Error::KnowledgeBaseEmpty;
        let b = Error::ProviderUnavailable {
            provider: "embedding",
            reason: "connection refused".to_string(),
        };
        assert_ne!(a.code(), b.code());
    }

    #[test]
    fn user_message_hides_provider_detail() {
        let err = Error::ProviderUnavailable {
            provider: "completion",
            reason: "401 invalid api key sk-abc123".to_string(),
        };
        assert!(!err.user_message().contains("sk-abc123"));
    }
}
