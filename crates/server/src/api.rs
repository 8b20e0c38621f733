//! HTTP API for predictions, scoring, health checks and Prometheus metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    ErrorResponse, HealthAggregator, HealthResponse, PredictionRequest, PredictorError, Schema,
    SelectionError, ServiceMetrics, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: HealthAggregator,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(health: HealthAggregator, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        Self {
            health,
            metrics,
            logger,
        }
    }
}

/// Errors surfaced at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error("{0}")]
    NotReady(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Selection(SelectionError::NotFound(_)) => "not_found",
            ApiError::Selection(SelectionError::Ambiguous { .. }) => "ambiguous",
            ApiError::Predictor(err) => err.kind(),
            ApiError::NotReady(_) => "not_ready",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Selection(SelectionError::NotFound(_)) => {
                (StatusCode::BAD_REQUEST, "NOT_FOUND")
            }
            ApiError::Selection(SelectionError::Ambiguous { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AMBIGUOUS")
            }
            ApiError::Predictor(PredictorError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            ApiError::Predictor(PredictorError::Misconfigured(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "MISCONFIGURED")
            }
            ApiError::Predictor(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PREDICTOR_ERROR"),
            ApiError::NotReady(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub model: String,
}

/// Always 200; the body says whether startup has completed
async fn health_live(State(state): State<Arc<AppState>>) -> Json<&'static str> {
    if state.health.liveness() {
        Json("LIVE")
    } else {
        Json("STARTING")
    }
}

fn record_self_test_failure(state: &AppState, predictor: &str) {
    state.metrics.inc_self_test_failures(predictor);
    state.logger.log_self_test_failed(predictor);
}

async fn health_ready(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<Json<&'static str>> {
    let readiness = state.health.readiness(&query.model)?;
    if readiness.ready {
        Ok(Json("READY"))
    } else {
        record_self_test_failure(&state, &query.model);
        Err(ApiError::NotReady("NOT_READY".to_string()))
    }
}

/// Returns 200 if every predictor passes its self-test, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> ApiResult<Json<&'static str>> {
    let readiness = state.health.readiness_all();
    if readiness.ready {
        Ok(Json("READY"))
    } else {
        for name in &readiness.failing {
            record_self_test_failure(&state, name);
        }
        let reason = readiness
            .reason
            .unwrap_or_else(|| "Predictor(s) not ready".to_string());
        Err(ApiError::NotReady(reason))
    }
}

async fn health_uptime(State(state): State<Arc<AppState>>) -> Json<f64> {
    Json(state.health.uptime().as_secs_f64())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.health.summary())
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.health.registry().list())
}

async fn prediction_schema(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<Json<Schema>> {
    let predictor = state.health.registry().select(&query.model)?;
    Ok(Json(predictor.prediction_schema().clone()))
}

async fn score_schema(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<Json<Schema>> {
    let predictor = state.health.registry().select(&query.model)?;
    Ok(Json(predictor.score_schema().clone()))
}

async fn version(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<Json<String>> {
    let predictor = state.health.registry().select(&query.model)?;
    Ok(Json(predictor.version().to_string()))
}

async fn creation_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<Json<String>> {
    let predictor = state.health.registry().select(&query.model)?;
    Ok(Json(predictor.created().to_rfc3339()))
}

fn record_failure(state: &AppState, operation: &str, predictor: &str, err: &ApiError) {
    state.metrics.inc_request_errors(err.kind());
    state
        .logger
        .log_request_failed(operation, predictor, err.kind(), &err.to_string());
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<Json<Value>> {
    let start = Instant::now();
    let result = state
        .health
        .registry()
        .select(&request.predictor)
        .map_err(ApiError::from)
        .and_then(|p| p.predict(&request.payload).map_err(ApiError::from));

    match result {
        Ok(output) => {
            state
                .metrics
                .observe_prediction_latency(&request.predictor, start.elapsed().as_secs_f64());
            Ok(Json(output))
        }
        Err(err) => {
            record_failure(&state, "predict", &request.predictor, &err);
            Err(err)
        }
    }
}

async fn score(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<Json<Value>> {
    let start = Instant::now();
    let result = state
        .health
        .registry()
        .select(&request.predictor)
        .map_err(ApiError::from)
        .and_then(|p| p.score(&request.payload).map_err(ApiError::from));

    match result {
        Ok(metric) => {
            state
                .metrics
                .observe_score_latency(&request.predictor, start.elapsed().as_secs_f64());
            Ok(Json(metric))
        }
        Err(err) => {
            record_failure(&state, "score", &request.predictor, &err);
            Err(err)
        }
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/livez", get(health_live))
        .route("/health/ready", get(health_ready))
        .route("/health/ready/", get(health_ready))
        .route("/readyz", get(readyz))
        .route("/healthz", get(readyz))
        .route("/health/uptime", get(health_uptime))
        .route("/health", get(health))
        .route("/list", get(list))
        .route("/predict_schema", get(prediction_schema))
        .route("/predict_schema/", get(prediction_schema))
        .route("/score_schema", get(score_schema))
        .route("/score_schema/", get(score_schema))
        .route("/version", get(version))
        .route("/version/", get(version))
        .route("/creation_time", get(creation_time))
        .route("/creation_time/", get(creation_time))
        .route("/predict", post(predict))
        .route("/predict/", post(predict))
        .route("/score", post(score))
        .route("/score/", post(score))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
