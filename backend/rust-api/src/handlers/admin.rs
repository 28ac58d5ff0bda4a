use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::activity::{ConsoleHealth, ConsoleResponse},
    models::settings::{SettingsResponse, UpdateSettingsRequest},
    services::{settings_service::SettingsService, AppState},
};

use super::ApiError;

/// GET /api/v1/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let service = SettingsService::new(state.gateway.clone(), state.activity.clone());
    Ok(Json(service.get().await?))
}

/// PUT /api/v1/admin/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(payload): AppJson<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let service = SettingsService::new(state.gateway.clone(), state.activity.clone());
    Ok(Json(service.update(payload, &claims.actor()).await?))
}

/// GET /api/v1/admin/console
pub async fn get_console(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConsoleResponse>, ApiError> {
    let (events, requests) = tokio::try_join!(state.activity.events(), state.activity.requests())?;
    let health = ConsoleHealth::from_requests(&requests);

    let mut requests = requests;
    requests.reverse();

    Ok(Json(ConsoleResponse {
        events,
        requests,
        health,
    }))
}
