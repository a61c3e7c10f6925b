use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    routing::{get, post},
};
use docqa_rag::{PipelineStatus, RagError, RagPipeline};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    backend::build_pipeline,
    config::{DEFAULT_MAX_UPLOAD_BYTES, ServerConfig},
    protocol::{
        AskRequest, AskResponse, ErrorResponse, HealthResponse, RootResponse, UploadResponse,
    },
    storage::UploadStore,
};

/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub uploads: UploadStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: RagPipeline, uploads: UploadStore) -> Self {
        Self { pipeline: Arc::new(pipeline), uploads, max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/upload", post(upload).layer(upload_limit))
        .route("/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&config).context("failed to configure the pipeline")?;
    let state = AppState::new(pipeline, UploadStore::new(config.upload_dir.clone()))
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docqa server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(upload_dir = %config.upload_dir.display(), "docqa listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c; shutdown only by process signal");
        std::future::pending::<()>().await;
    }
    info!("docqa shutting down");
}

/// HTTP status for a pipeline failure.
pub fn status_for(error: &RagError) -> StatusCode {
    match error {
        RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RagError::NotReady => StatusCode::CONFLICT,
        RagError::NoTextExtracted | RagError::ExtractionError(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        e if e.is_service_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_failure(route: &str, status: StatusCode, message: &str) {
    if status.is_server_error() {
        error!(route, status = status.as_u16(), error = %message, "request failed");
    } else {
        warn!(route, status = status.as_u16(), error = %message, "request rejected");
    }
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse { status: "running".to_string() })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), service: "docqa".to_string() })
}

async fn status(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(state.pipeline.status().await)
}

type UploadFailure = (StatusCode, Json<UploadResponse>);

fn upload_failure(status: StatusCode, message: String) -> UploadFailure {
    log_failure("/upload", status, &message);
    (status, Json(UploadResponse::Error { message }))
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadFailure> {
    let mut multipart =
        multipart.map_err(|rejection| upload_failure(rejection.status(), rejection.body_text()))?;
    let (filename, bytes) = read_file_field(&mut multipart)
        .await
        .map_err(|(status, message)| upload_failure(status, message))?;

    let stored = state.uploads.save(&bytes, &filename).await.map_err(|e| {
        upload_failure(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to store upload: {e}"))
    })?;
    info!(filename = %filename, bytes = bytes.len(), path = %stored.display(), "upload stored");

    let summary = state
        .pipeline
        .upload(&bytes, &filename)
        .await
        .map_err(|e| upload_failure(status_for(&e), e.to_string()))?;

    Ok(Json(UploadResponse::Ok { chunks: summary.chunks, characters: summary.characters }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), (StatusCode, String)> {
    let multipart_error = |e: MultipartError| (e.status(), e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((filename, bytes));
    }

    Err((StatusCode::BAD_REQUEST, format!("missing multipart field '{FILE_FIELD}'")))
}

type AskFailure = (StatusCode, Json<ErrorResponse>);

fn ask_failure(status: StatusCode, message: String) -> AskFailure {
    log_failure("/ask", status, &message);
    (status, Json(ErrorResponse::new(message)))
}

async fn ask(
    State(state): State<AppState>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AskFailure> {
    let Json(request) =
        request.map_err(|rejection| ask_failure(rejection.status(), rejection.body_text()))?;

    let answer = state
        .pipeline
        .ask(&request.question)
        .await
        .map_err(|e| ask_failure(status_for(&e), e.to_string()))?;

    Ok(Json(answer.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_http_statuses() {
        assert_eq!(status_for(&RagError::NotReady), StatusCode::CONFLICT);
        assert_eq!(status_for(&RagError::InvalidRequest("blank".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&RagError::NoTextExtracted), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&RagError::ExtractionError("tesseract missing".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&RagError::EmbeddingError { provider: "Gemini".into(), message: "timeout".into() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&RagError::DimensionMismatch { expected: 768, actual: 3 }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
