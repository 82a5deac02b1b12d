//! HTTP surface for the chat service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/chat` | Conversation history for the caller's session |
//! | `POST` | `/chat` | Ask a question against the indexed documents |
//! | `POST` | `/upload_document` | Upload up to 20 PDFs and reindex the folder |
//! | `POST` | `/remove_document` | Remove one PDF and reindex the remainder |
//! | `GET`  | `/clear` | Clear the caller's conversation history |
//! | `GET`  | `/documents` | List uploaded PDFs |
//!
//! Sessions are keyed by the `x-session-id` header; callers without one
//! share the `default` session. Error responses use a JSON envelope
//! `{"error": {"code", "message"}}` where the message is always the
//! sanitized user-facing text — raw provider detail goes to the log only.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Error;
use crate::ingest::IngestionPipeline;
use crate::models::ChatMessage;
use crate::query::QueryService;
use crate::uploads::{self, IncomingFile, UploadedFile};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: Arc<IngestionPipeline>,
    query: Arc<QueryService>,
    sessions: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

/// Start the HTTP server with explicitly constructed services.
///
/// Runs until the process is terminated.
pub async fn run_server(
    config: Arc<Config>,
    pipeline: Arc<IngestionPipeline>,
    query: Arc<QueryService>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let max_body = config.server.max_upload_bytes;

    let state = AppState {
        config,
        pipeline,
        query,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/chat", get(handle_history).post(handle_chat))
        .route("/upload_document", post(handle_upload))
        .route("/remove_document", post(handle_remove))
        .route("/clear", get(handle_clear))
        .route("/documents", get(handle_documents))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .with_state(state);

    tracing::info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("default")
        .to_string()
}

// ============ Handlers ============

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Vec<ChatMessage>> {
    let sessions = state.sessions.read().await;
    let messages = sessions.get(&session_id(&headers)).cloned().unwrap_or_default();
    Json(messages)
}

#[derive(Deserialize)]
struct ChatRequest {
    prompt: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<crate::models::ChunkMeta>,
}

async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let prompt = request.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }

    let session = session_id(&headers);
    {
        let mut sessions = state.sessions.write().await;
        sessions
            .entry(session.clone())
            .or_default()
            .push(ChatMessage::user(&prompt));
    }

    let answer = state.query.ask(&prompt).await.map_err(|e| {
        tracing::error!(session = %session, "query failed: {}", e);
        AppError::from(e)
    })?;

    {
        let mut sessions = state.sessions.write().await;
        let history = sessions.entry(session).or_default();
        history.push(ChatMessage::assistant(&answer.text));
        if !answer.sources.is_empty() {
            let note = answer
                .sources
                .iter()
                .map(|s| format!("Source: {}, Page: {}", s.source, s.page))
                .collect::<Vec<_>>()
                .join("; ");
            history.push(ChatMessage::note(note));
        }
    }

    Ok(Json(ChatResponse {
        answer: answer.text,
        sources: answer.sources,
    }))
}

#[derive(Serialize)]
struct UploadResponse {
    saved: Vec<String>,
    documents_indexed: usize,
    chunks_indexed: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files: Vec<IncomingFile> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("document") {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        files.push(IncomingFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    uploads::validate_batch(
        &files,
        state.config.server.max_upload_files,
        state.config.server.max_upload_bytes,
    )?;
    let saved = uploads::save_batch(&state.config.uploads.dir, &files)?;
    tracing::info!(files = saved.len(), "uploaded documents saved");

    let report = state.pipeline.run().await.map_err(|e| {
        tracing::error!("ingestion failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(UploadResponse {
        saved,
        documents_indexed: report.documents,
        chunks_indexed: report.chunks,
    }))
}

#[derive(Deserialize)]
struct RemoveRequest {
    filename: String,
}

#[derive(Serialize)]
struct RemoveResponse {
    removed: String,
    reprocessed: bool,
}

async fn handle_remove(
    State(state): State<AppState>,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<RemoveResponse>, AppError> {
    let dir = &state.config.uploads.dir;
    let removed = uploads::sanitize_filename(&request.filename)?;
    uploads::remove_document(dir, &removed)?;

    // Purge the removed document's vectors; reprocessing alone only touches
    // sources still present in the folder.
    state.pipeline.purge_source(&removed).await.map_err(|e| {
        tracing::error!("purging vectors after removal failed: {}", e);
        AppError::from(e)
    })?;

    let remaining = uploads::pdf_paths(dir)?;
    let reprocessed = if remaining.is_empty() {
        false
    } else {
        state.pipeline.run().await.map_err(|e| {
            tracing::error!("reprocessing after removal failed: {}", e);
            AppError::from(e)
        })?;
        true
    };

    Ok(Json(RemoveResponse {
        removed,
        reprocessed,
    }))
}

async fn handle_clear(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let mut sessions = state.sessions.write().await;
    sessions.remove(&session_id(&headers));
    StatusCode::NO_CONTENT
}

async fn handle_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<UploadedFile>>, AppError> {
    let files = uploads::list_documents(&state.config.uploads.dir)?;
    Ok(Json(files))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::KnowledgeBaseEmpty | Error::IndexNotFound(_) => StatusCode::CONFLICT,
            Error::ProviderUnavailable { .. } | Error::StoreUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::IngestionFailure(_) | Error::Config(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_header_respected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", "alice".parse().unwrap());
        assert_eq!(session_id(&headers), "alice");
    }

    #[test]
    fn missing_session_header_uses_default() {
        assert_eq!(session_id(&HeaderMap::new()), "default");
    }

    #[test]
    fn domain_errors_map_to_sanitized_envelope() {
        let app_err = AppError::from(Error::ProviderUnavailable {
            provider: "embedding",
            reason: "401 key sk-secret".to_string(),
        });
        assert_eq!(app_err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(app_err.code, "provider_unavailable");
        assert!(!app_err.message.contains("sk-secret"));
    }

    #[test]
    fn empty_knowledge_base_is_not_a_server_error() {
        let app_err = AppError::from(Error::KnowledgeBaseEmpty);
        assert_eq!(app_err.status, StatusCode::CONFLICT);
        assert!(app_err.message.contains("Upload a PDF"));
    }
}
