use crate::config::AppConfig;
use crate::error::{RenderError, SessionError, ValidationError};
use crate::html::INDEX_HTML;
use crate::selector::VisualizationRequest;
use crate::session::{LayerRecord, Session};
use crate::types::{DatasetSummary, Properties};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The single shared session. Reads (listing, map page, PNG) share the lock;
/// uploads and layer changes take it exclusively.
pub struct AppState {
    pub session: RwLock<Session>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            session: RwLock::new(Session::new(&config)),
            config,
        }
    }
}

type SharedState = Arc<AppState>;

// ----------------------------------------------------------------------------
// Response envelopes
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    status: &'static str,
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess {
        status: "success",
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    status: &'static str,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: &'static str,
    /// Request field the error belongs to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<SessionError> for ApiErrorResponse {
    fn from(err: SessionError) -> Self {
        let (status, error_type, field) = match &err {
            SessionError::Load(_) => (StatusCode::BAD_REQUEST, "LoadError", None),
            SessionError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError", Some(e.field())),
            SessionError::UnknownDataset(_) | SessionError::UnknownLayer(_) => {
                (StatusCode::NOT_FOUND, "NotFound", None)
            }
            SessionError::NoDataset => (StatusCode::BAD_REQUEST, "BadRequest", Some("dataset")),
            SessionError::EmptyLayerName => (StatusCode::BAD_REQUEST, "BadRequest", Some("layer_name")),
            SessionError::Render(RenderError::Draw(_) | RenderError::Image(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RenderError", None)
            }
            SessionError::Render(_) => (StatusCode::UNPROCESSABLE_ENTITY, "RenderError", None),
            SessionError::Export { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "ExportError", None),
        };

        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }

        ApiErrorResponse {
            status,
            error: ApiError {
                status: "error",
                error: ErrorDetails {
                    message: err.to_string(),
                    error_type,
                    field,
                },
            },
        }
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(err: ValidationError) -> Self {
        SessionError::from(err).into()
    }
}

type ApiResult<T> = Result<Json<ApiSuccess<T>>, ApiErrorResponse>;

// ----------------------------------------------------------------------------
// Request types
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    filename: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLayer {
    /// Defaults to the most recently loaded dataset.
    #[serde(default)]
    dataset: Option<String>,
    /// Defaults to `Layer_<dataset>`.
    #[serde(default)]
    layer_name: Option<String>,
    #[serde(default)]
    request: VisualizationRequest,
}

#[derive(Debug, Deserialize)]
pub struct ExportPng {
    layer: String,
}

#[derive(Debug, Serialize)]
pub struct Identified {
    index: usize,
    properties: Properties,
}

#[derive(Debug, Serialize)]
pub struct Exported {
    path: String,
}

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn map_handler(State(state): State<SharedState>) -> Html<String> {
    Html(state.session.read().await.map_html())
}

async fn health_handler() -> Json<ApiSuccess<serde_json::Value>> {
    success(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_datasets_handler(State(state): State<SharedState>) -> Json<ApiSuccess<Vec<DatasetSummary>>> {
    let session = state.session.read().await;
    success(session.datasets().iter().map(|d| d.summary()).collect())
}

async fn upload_handler(
    State(state): State<SharedState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<DatasetSummary> {
    info!("Upload of {} ({} bytes)", params.filename, body.len());
    let mut session = state.session.write().await;
    let dataset = session.load_dataset(&params.filename, &body)?;
    Ok(success(dataset.summary()))
}

async fn get_dataset_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<DatasetSummary> {
    let session = state.session.read().await;
    Ok(success(session.dataset(&name)?.summary()))
}

async fn column_values_handler(
    State(state): State<SharedState>,
    Path((name, column)): Path<(String, String)>,
) -> ApiResult<Vec<String>> {
    let session = state.session.read().await;
    let dataset = session.dataset(&name)?;
    if dataset.schema.get(&column).is_none() {
        return Err(ValidationError::UnknownColumn(column).into());
    }
    Ok(success(dataset.unique_values(&column)))
}

async fn identify_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(params): Query<IdentifyParams>,
) -> ApiResult<Option<Identified>> {
    let session = state.session.read().await;
    let dataset = session.dataset(&name)?;
    let hit = dataset
        .identify(params.lon, params.lat)
        .map(|(index, feature)| Identified {
            index,
            properties: feature.properties.clone(),
        });
    Ok(success(hit))
}

async fn list_layers_handler(State(state): State<SharedState>) -> Json<ApiSuccess<Vec<LayerRecord>>> {
    success(state.session.read().await.layers().to_vec())
}

async fn create_layer_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateLayer>,
) -> ApiResult<LayerRecord> {
    let mut session = state.session.write().await;
    let record = session.visualize(
        payload.dataset.as_deref(),
        payload.layer_name.as_deref(),
        payload.request,
    )?;
    Ok(success(record))
}

async fn layer_png_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Response, ApiErrorResponse> {
    let bytes = state.session.read().await.layer_png(&name)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

async fn export_html_handler(State(state): State<SharedState>) -> ApiResult<Exported> {
    let path = state.session.read().await.export_html()?;
    Ok(success(Exported {
        path: path.display().to_string(),
    }))
}

async fn export_png_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ExportPng>,
) -> ApiResult<Exported> {
    let path = state.session.read().await.export_layer_png(&payload.layer)?;
    Ok(success(Exported {
        path: path.display().to_string(),
    }))
}

async fn clear_handler(State(state): State<SharedState>) -> Json<ApiSuccess<serde_json::Value>> {
    state.session.write().await.clear();
    success(serde_json::json!({ "cleared": true }))
}

// ----------------------------------------------------------------------------
// Router
// ----------------------------------------------------------------------------

pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/map", get(map_handler))
        .route("/api/health", get(health_handler))
        .route("/api/datasets", get(list_datasets_handler).post(upload_handler))
        .route("/api/datasets/:name", get(get_dataset_handler))
        .route("/api/datasets/:name/columns/:column/values", get(column_values_handler))
        .route("/api/datasets/:name/identify", get(identify_handler))
        .route("/api/layers", get(list_layers_handler).post(create_layer_handler))
        .route("/api/layers/:name/png", get(layer_png_handler))
        .route("/api/export/html", post(export_html_handler))
        .route("/api/export/png", post(export_png_handler))
        .route("/api/clear", post(clear_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Serving on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
