use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use charges_core::{Applicant, Artifact, ChargePredictor};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// What `/health` reports about the loaded artifact
#[derive(Clone, Debug, Serialize)]
pub struct ModelInfo {
    pub model_hash: String,
    pub num_trees: usize,
    pub feature_names: Vec<String>,
    pub created_at: i64,
}

impl From<&Artifact> for ModelInfo {
    fn from(artifact: &Artifact) -> Self {
        Self {
            model_hash: artifact.model_hash.clone(),
            num_trees: artifact.pipeline.regressor.num_trees(),
            feature_names: artifact.pipeline.feature_names.clone(),
            created_at: artifact.metadata.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn ChargePredictor>,
    pub model: ModelInfo,
    pub start_time: Instant,
    pub static_dir: Option<PathBuf>,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn ChargePredictor>, model: ModelInfo) -> Self {
        Self {
            predictor,
            model,
            start_time: Instant::now(),
            static_dir: None,
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build state around a verified artifact
    pub fn from_artifact(artifact: Artifact) -> Self {
        let model = ModelInfo::from(&artifact);
        Self::new(Arc::new(artifact.into_pipeline()), model)
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct PredictionResponse {
    predicted_charge: f64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: ModelInfo,
    uptime_secs: u64,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: &'static str,
    core_version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// 422 for well-formed JSON of the wrong shape, 400 for broken JSON,
/// 415 for a missing JSON content type
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

/// Load and verify the artifact. Any failure here is fatal for the service.
pub fn load_artifact(path: &Path) -> Result<Artifact> {
    let artifact = Artifact::load(path)
        .with_context(|| format!("failed to load model artifact from {}", path.display()))?;
    info!(
        path = %path.display(),
        hash = %artifact.model_hash,
        trees = artifact.pipeline.regressor.num_trees(),
        "model artifact loaded"
    );
    Ok(artifact)
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("Prediction service listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("prediction server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(err) => {
            warn!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/predict", post(handle_predict))
        .route("/health", get(handle_health))
        .route("/version", get(handle_version));

    if let Some(static_root) = &state.static_dir {
        if static_root.exists() {
            info!("Serving landing page from {:?}", static_root);
            router = router.fallback(serve_static_assets);
        } else {
            warn!("Static directory {:?} does not exist", static_root);
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn serve_static_assets(State(state): State<SharedState>, req: Request<Body>) -> Response {
    let Some(static_root) = state.static_dir.clone() else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    let service = ServeDir::new(static_root).append_index_html_on_directories(true);
    match service.oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            warn!("Static asset error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to serve static asset: {err}"),
            )
                .into_response()
        }
    }
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: Result<Json<Applicant>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    state.record_request();
    let Json(applicant) = payload.map_err(|rejection| {
        debug!("Rejected prediction request: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    let predicted_charge = state.predictor.predict(&applicant).map_err(|err| {
        warn!("Prediction failed: {}", err);
        ApiError::internal(format!("prediction failed: {err}"))
    })?;

    Ok(Json(PredictionResponse { predicted_charge }))
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        model: state.model.clone(),
        uptime_secs: state.uptime_seconds(),
        req_total,
    })
}

async fn handle_version(State(state): State<SharedState>) -> Json<VersionResponse> {
    state.record_request();
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        core_version: charges_core::VERSION,
    })
}
