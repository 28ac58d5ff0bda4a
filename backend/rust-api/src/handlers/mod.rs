use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics;
use crate::models::quiz::QuizError;
use crate::services::practice_service::PracticeSyncError;
use crate::services::quiz_service::QuizServiceError;
use crate::services::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut status = "healthy";
    let mut dependencies = serde_json::Map::new();
    let mut all_healthy = true;

    let gateway = match tokio::time::timeout(Duration::from_secs(1), state.gateway.ping()).await {
        Ok(Ok(())) => json!({ "status": "healthy" }),
        Ok(Err(e)) => json!({ "status": "unhealthy", "error": format!("Database error: {}", e) }),
        Err(_) => json!({ "status": "unhealthy", "error": "Database timeout after 1s" }),
    };
    if gateway["status"] != "healthy" {
        all_healthy = false;
        status = "degraded";
    }
    dependencies.insert("database".to_string(), gateway);

    let sessions =
        match tokio::time::timeout(Duration::from_millis(500), state.sessions.ping()).await {
            Ok(Ok(())) => json!({ "status": "healthy" }),
            Ok(Err(e)) => {
                json!({ "status": "unhealthy", "error": format!("Session store error: {}", e) })
            }
            Err(_) => json!({ "status": "unhealthy", "error": "Session store timeout after 500ms" }),
        };
    if sessions["status"] != "healthy" {
        all_healthy = false;
        status = "degraded";
    }
    dependencies.insert("session_store".to_string(), sessions);

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "sentinel-prep-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// HTTP Basic auth for `/metrics` against `metrics.auth`. Without that
/// setting the endpoint answers 404.
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = state
        .config
        .metrics_auth
        .as_deref()
        .ok_or(StatusCode::NOT_FOUND)?;

    let encoded = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        ApiError::Internal("Internal server error".to_string())
    }
}

impl From<QuizServiceError> for ApiError {
    fn from(err: QuizServiceError) -> Self {
        match err {
            QuizServiceError::NotFound => ApiError::not_found("Quiz session not found"),
            QuizServiceError::Quiz(
                e @ (QuizError::NoSelection | QuizError::OptionOutOfRange(_)),
            ) => ApiError::BadRequest(e.to_string()),
            QuizServiceError::Quiz(e) => ApiError::Conflict(e.to_string()),
            QuizServiceError::Internal(e) => ApiError::from(e),
        }
    }
}

impl From<PracticeSyncError> for ApiError {
    fn from(err: PracticeSyncError) -> Self {
        match err {
            PracticeSyncError::MissingUsername => ApiError::bad_request("A username is required"),
            PracticeSyncError::Upstream(reason) => {
                ApiError::BadGateway(format!("Sync failed: {}", reason))
            }
            PracticeSyncError::Internal(e) => ApiError::from(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (
            status,
            Json(json!({ "message": message, "status": status.as_u16() })),
        )
            .into_response()
    }
}

pub mod admin;
pub mod dashboard;
pub mod practice;
pub mod profile;
pub mod quiz;
pub mod reports;
pub mod sse;
pub mod tasks;
