//! # API REST
//!
//! REST API implementation for omstorage.
//!
//! Handles:
//! - HTTP endpoints with axum, including multipart uploads
//! - Static serving of stored files under the public URL prefix
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, body limits, request tracing)
//!
//! Upload and lookup semantics live in `omstorage-core`; this crate only maps HTTP onto
//! [`UploadService`].

#![warn(rust_2018_idioms)]

pub mod models;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use models::{
    ErrorRes, FileRecordRes, FolderQuery, HealthRes, MultipleUploadForm, SingleUploadForm,
    UploadMultipleRes, UploadSingleRes, UploadedFileRes,
};
use omstorage_core::{
    AppConfig, FileRepository, IncomingFile, UploadError, UploadRequest,
    UploadService,
};
use omstorage_files::LocalBlobStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Content type recorded when a multipart part does not declare one.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

type ApiError = (StatusCode, Json<ErrorRes>);

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    uploads: UploadService,
}

impl AppState {
    pub fn new(uploads: UploadService) -> Self {
        Self { uploads }
    }

    pub fn uploads(&self) -> &UploadService {
        &self.uploads
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, upload_single, upload_multiple, list_files, get_file),
    components(schemas(
        HealthRes,
        ErrorRes,
        SingleUploadForm,
        MultipleUploadForm,
        UploadSingleRes,
        UploadedFileRes,
        UploadMultipleRes,
        FileRecordRes,
    ))
)]
pub struct ApiDoc;

/// Prepares the blob store under the configured root and wires the upload service.
///
/// The storage root is created if it does not exist yet.
///
/// # Errors
/// Returns an error if the storage root cannot be created or is not a directory.
pub async fn bootstrap(
    config: &AppConfig,
    repository: Arc<dyn FileRepository>,
) -> anyhow::Result<AppState> {
    let root = config.core.storage_root();
    tokio::fs::create_dir_all(root).await.map_err(|e| {
        anyhow::anyhow!("failed to create storage root {}: {}", root.display(), e)
    })?;

    let store = LocalBlobStore::new(root)?;
    let core = config
        .core
        .with_storage_root(store.root_directory().to_path_buf());

    Ok(AppState::new(UploadService::new(
        Arc::new(core),
        Arc::new(store),
        repository,
    )))
}

/// Builds the full router: API routes, static files, Swagger UI and the shared layers.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let config = state.uploads.config();
    let static_files = ServeDir::new(config.storage_root());
    let static_route = config.static_route().to_owned();

    let upload_routes = Router::new()
        .route("/v1/upload/single/:project_id", post(upload_single))
        .route("/v1/upload/multiple/:project_id", post(upload_multiple))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/files/:project_id", get(list_files))
        .route("/v1/file/:id", get(get_file))
        .merge(upload_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // axum cannot nest at the root; serve from the fallback instead.
    let app = if static_route == "/" {
        app.fallback_service(static_files)
    } else {
        app.nest_service(&static_route, static_files)
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the REST API on `0.0.0.0:{SERVER_PORT}` until the process is stopped.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));

    tracing::info!("++ Starting omstorage REST on {}", addr);
    tracing::info!(
        storage_root = %state.uploads.config().storage_root().display(),
        public_url_prefix = %state.uploads.config().static_route(),
        "serving stored files"
    );

    let app = router(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used by monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "omstorage REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/upload/single/{project_id}",
    params(
        ("project_id" = String, Path, description = "Project the file belongs to"),
        FolderQuery
    ),
    request_body(content = SingleUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadSingleRes),
        (status = 400, description = "Invalid project, folder or missing file", body = ErrorRes),
        (status = 413, description = "Request body too large", body = ErrorRes),
        (status = 500, description = "Storage unavailable", body = ErrorRes)
    )
)]
/// Upload one file from the multipart field `file`
///
/// Only the first `file` part is stored; later ones are not read.
///
/// Image uploads also get a blur thumbnail and a low-resolution preview when the image decodes.
/// Preview and metadata failures do not fail the request; they are listed in `warnings`.
///
/// # Errors
/// - `400 Bad Request` for an invalid project id or folder, a malformed body, or no `file` part
/// - `500 Internal Server Error` if the original cannot be written to storage
#[axum::debug_handler]
async fn upload_single(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    query: Result<Query<FolderQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadSingleRes>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let mut multipart = multipart.map_err(multipart_rejection)?;

    let file = next_file(&mut multipart, "file")
        .await
        .map_err(multipart_error)?;

    let outcome = state
        .uploads
        .upload(UploadRequest {
            project_id,
            folder: query.folder,
            file,
        })
        .await
        .map_err(upload_error)?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/v1/upload/multiple/{project_id}",
    params(
        ("project_id" = String, Path, description = "Project the files belong to"),
        FolderQuery
    ),
    request_body(content = MultipleUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Files that were stored; failed files are omitted", body = UploadMultipleRes),
        (status = 400, description = "Malformed multipart body", body = ErrorRes)
    )
)]
/// Upload every part of the repeated multipart field `files`
///
/// Each file is processed independently. A file that cannot be stored is left out of the
/// response without failing its siblings, so the response is `200` even when `count` is 0.
#[axum::debug_handler]
async fn upload_multiple(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    query: Result<Query<FolderQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadMultipleRes>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let multipart = multipart.map_err(multipart_rejection)?;

    let files = read_files(multipart, "files")
        .await
        .map_err(multipart_error)?;

    let batch = state
        .uploads
        .upload_many(&project_id, query.folder.as_deref(), files)
        .await;

    let files: Vec<UploadedFileRes> = batch.uploaded.into_iter().map(Into::into).collect();
    Ok(Json(UploadMultipleRes {
        message: "Files uploaded successfully".into(),
        count: files.len(),
        files,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/files/{project_id}",
    params(
        ("project_id" = String, Path, description = "Project to list"),
        FolderQuery
    ),
    responses(
        (status = 200, description = "Matching files, newest first", body = [FileRecordRes]),
        (status = 400, description = "Invalid project id or folder", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List a project's files, optionally restricted to one folder
#[axum::debug_handler]
async fn list_files(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    query: Result<Query<FolderQuery>, QueryRejection>,
) -> Result<Json<Vec<FileRecordRes>>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let records = state
        .uploads
        .list_files(&project_id, query.folder.as_deref())
        .await
        .map_err(upload_error)?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/file/{id}",
    params(("id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "File metadata", body = FileRecordRes),
        (status = 404, description = "No file with this id", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Fetch one file's metadata
#[axum::debug_handler]
async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecordRes>, ApiError> {
    let record = state.uploads.find_file(&id).await.map_err(upload_error)?;
    Ok(Json(record.into()))
}

/// Reads parts until one named `field_name` arrives and returns it as an incoming file.
///
/// Parts with other names are skipped. Returns `None` once the body is exhausted.
async fn next_file(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<IncomingFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_owned();
        let bytes = field.bytes().await?;

        return Ok(Some(IncomingFile {
            original_name,
            mime_type,
            bytes,
        }));
    }

    Ok(None)
}

/// Collects every part named `field_name` as an incoming file, skipping other parts.
async fn read_files(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<IncomingFile>, MultipartError> {
    let mut files = Vec::new();
    while let Some(file) = next_file(&mut multipart, field_name).await? {
        files.push(file);
    }
    Ok(files)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn multipart_error(err: MultipartError) -> ApiError {
    tracing::warn!("Multipart error: {}", err);
    error_body(err.status(), err.body_text())
}

fn multipart_rejection(rejection: MultipartRejection) -> ApiError {
    tracing::warn!("Multipart rejected: {}", rejection);
    error_body(rejection.status(), rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    tracing::warn!("Query rejected: {}", rejection);
    error_body(rejection.status(), rejection.body_text())
}

fn upload_error(err: UploadError) -> ApiError {
    match err {
        UploadError::InvalidRequest(message) => error_body(StatusCode::BAD_REQUEST, message),
        UploadError::NotFound(_) => error_body(StatusCode::NOT_FOUND, "file not found"),
        UploadError::StorageUnavailable(e) => {
            tracing::error!("Storage error: {:?}", e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
        }
        UploadError::Repository(e) => {
            tracing::error!("Repository error: {:?}", e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}
