//! HTTP API server.
//!
//! Exposes the document Q&A pipeline as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload` | Upload and index a document (multipart `file` field) |
//! | `GET`  | `/documents` | List uploaded document names |
//! | `POST` | `/ask` | Ask a question (`{"query": "..."}`) |
//! | `DELETE` | `/reset` | Clear the knowledge base and uploaded files |
//! | `GET`  | `/health` | Health probe (store availability, provider key presence) |
//!
//! # Error Contract
//!
//! All error responses use a JSON envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_format` (400),
//! `timeout` (408), `extraction_failed`, `store_corruption`,
//! `provider_error`, `internal` (500).
//!
//! # CORS
//!
//! Origins come from `[server].allowed_origins`; the default `["*"]`
//! permits any origin for browser-based clients.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::extract::{self, ExtractError};
use crate::generation::GenerationClient;
use crate::models::Answer;
use crate::rag::{self, PipelineError};
use crate::storage::UploadStore;
use crate::store::{StoreError, VectorStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<RwLock<VectorStore>>,
    embedder: Arc<EmbeddingClient>,
    generator: Arc<GenerationClient>,
    uploads: Arc<UploadStore>,
}

/// Starts the HTTP server.
///
/// Opens the vector store (corrupted state fails startup loudly rather
/// than silently resetting), constructs the provider clients, and serves
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = VectorStore::open(&config.store.path)?;
    let uploads = UploadStore::open(&config.uploads.dir)?;
    let embedder = EmbeddingClient::new(&config.provider)?;
    let generator = GenerationClient::new(&config.provider)?;

    if !config.provider.api_key_present() {
        eprintln!(
            "WARNING: {} not set; upload and ask requests will fail until it is provided.",
            config.provider.api_key_env
        );
    }

    let bind_addr = config.server.bind.clone();
    let cors = cors_layer(&config.server.allowed_origins);

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(RwLock::new(store)),
        embedder: Arc::new(embedder),
        generator: Arc::new(generator),
        uploads: Arc::new(uploads),
    };

    let app = Router::new()
        .route("/upload", post(handle_upload))
        .route("/documents", get(handle_documents))
        .route("/ask", post(handle_ask))
        .route("/reset", delete(handle_reset))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("Doc QA server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|o| o == "*") {
        base.allow_origin(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(AllowOrigin::list(origins))
    }
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
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

fn internal_error(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: code.to_string(),
        message: message.into(),
    }
}

/// Map pipeline failures onto the most appropriate status and code.
/// Extraction, store, validation, and timeout failures are all typed and
/// inspected directly; only provider errors are recognized by message.
fn classify_error(operation: &str, err: anyhow::Error) -> AppError {
    if let Some(pipeline_err) = err.downcast_ref::<PipelineError>() {
        return bad_request(format!("{}: {}", operation, pipeline_err));
    }

    if let Some(extract_err) = err.downcast_ref::<ExtractError>() {
        return match extract_err {
            ExtractError::UnsupportedFormat(_) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "unsupported_format".to_string(),
                message: format!("{}: {}", operation, extract_err),
            },
            ExtractError::ExtractionFailed(_) => {
                internal_error("extraction_failed", format!("{}: {}", operation, extract_err))
            }
        };
    }

    if let Some(store_err) = err.downcast_ref::<StoreError>() {
        return match store_err {
            StoreError::Input(_) => bad_request(format!("{}: {}", operation, store_err)),
            StoreError::Corruption(_) => {
                internal_error("store_corruption", format!("{}: {}", operation, store_err))
            }
            _ => internal_error("internal", format!("{}: {}", operation, store_err)),
        };
    }

    // Request timeouts surface as reqwest errors somewhere in the chain.
    let timed_out = err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map_or(false, |e| e.is_timeout())
    });
    if timed_out {
        return AppError {
            status: StatusCode::REQUEST_TIMEOUT,
            code: "timeout".to_string(),
            message: format!("{}: {:#}", operation, err),
        };
    }

    let msg = format!("{:#}", err);
    if msg.contains("provider error")
        || msg.contains("environment variable not set")
        || msg.contains("failed to embed")
        || msg.contains("generation request failed")
    {
        internal_error("provider_error", format!("{}: {}", operation, msg))
    } else {
        internal_error("internal", format!("{}: {}", operation, msg))
    }
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    status: String,
    chunks: usize,
}

/// Handler for `POST /upload`.
///
/// Expects a multipart body with a `file` field carrying the document.
/// The extension is checked before any work begins; extraction or
/// embedding failures abort the request with nothing indexed (the saved
/// original is kept, matching upload-then-index semantics).
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| bad_request("file field must carry a filename"))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| bad_request("multipart body must contain a 'file' field"))?;

    let extension = extract::supported_extension(&filename).ok_or_else(|| {
        bad_request(format!(
            "Only {} files are supported.",
            extract::SUPPORTED_EXTENSIONS.join(", ")
        ))
    })?;

    state
        .uploads
        .save(&filename, &bytes)
        .map_err(|e| classify_error("upload", e))?;

    let text = extract::extract_text(&bytes, &extension)
        .map_err(|e| classify_error("upload", e.into()))?;

    let chunks = rag::ingest_document(&state.store, &state.embedder, &state.config, &text, &filename)
        .await
        .map_err(|e| classify_error("upload", e))?;

    Ok(Json(UploadResponse {
        filename,
        status: "indexed".to_string(),
        chunks,
    }))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<String>,
}

async fn handle_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let documents = state
        .uploads
        .list()
        .map_err(|e| classify_error("documents", e))?;
    Ok(Json(DocumentsResponse { documents }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

/// Handler for `POST /ask`.
///
/// Empty or whitespace-only questions are rejected with `400` before the
/// pipeline runs.
async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = rag::query_documents(
        &state.store,
        &state.embedder,
        &state.generator,
        &state.config,
        &request.query,
    )
    .await
    .map_err(|e| classify_error("ask", e))?;

    Ok(Json(answer))
}

// ============ DELETE /reset ============

#[derive(Serialize)]
struct ResetResponse {
    status: String,
    message: String,
}

async fn handle_reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    rag::reset_knowledge_base(&state.store, &state.uploads)
        .map_err(|e| classify_error("reset", e))?;

    Ok(Json(ResetResponse {
        status: "success".to_string(),
        message: "Knowledge base cleared.".to_string(),
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    backend: String,
    vector_store: String,
    records: usize,
    llm_key: String,
    version: String,
}

/// Handler for `GET /health`.
///
/// Reports store availability (with record count) and whether the
/// provider API key is present in the environment.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (vector_store, records) = match state.store.read() {
        Ok(guard) => ("available".to_string(), guard.len()),
        Err(_) => ("unavailable: lock poisoned".to_string(), 0),
    };

    let llm_key = if state.config.provider.api_key_present() {
        "present".to_string()
    } else {
        format!("missing ({})", state.config.provider.api_key_env)
    };

    Json(HealthResponse {
        backend: "running".to_string(),
        vector_store,
        records,
        llm_key,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_question_classified_as_bad_request() {
        let err = anyhow::Error::new(PipelineError::EmptyQuestion);
        let app_err = classify_error("ask", err);
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.code, "bad_request");
        assert!(app_err.message.contains("question must not be empty"));
    }

    #[test]
    fn typed_classification_survives_context_wrapping() {
        let err = anyhow::Error::new(PipelineError::EmptyQuestion).context("ask failed");
        let app_err = classify_error("ask", err);
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.code, "bad_request");
    }

    #[test]
    fn store_input_error_classified_as_bad_request() {
        let err = anyhow::Error::new(StoreError::Input("dimensionality mismatch".to_string()));
        let app_err = classify_error("upload", err);
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.code, "bad_request");
    }

    #[test]
    fn corruption_classified_as_store_corruption() {
        let err = anyhow::Error::new(StoreError::Corruption("row mismatch".to_string()));
        let app_err = classify_error("ask", err);
        assert_eq!(app_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.code, "store_corruption");
    }

    #[test]
    fn unsupported_format_classified_as_bad_request() {
        let err = anyhow::Error::new(ExtractError::UnsupportedFormat("png".to_string()));
        let app_err = classify_error("upload", err);
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.code, "unsupported_format");
    }
}
