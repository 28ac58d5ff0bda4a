use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::practice::{PracticeStat, SyncPracticeRequest, SyncPracticeResponse},
    services::{practice_service::PracticeService, AppState},
};

use super::ApiError;

fn service(state: &AppState) -> PracticeService {
    PracticeService::new(
        state.gateway.clone(),
        state.activity.clone(),
        state.http.clone(),
        &state.config,
    )
}

/// GET /api/v1/practice
pub async fn get_practice(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<PracticeStat>, ApiError> {
    let stat = service(&state).current(&claims.sub).await?;
    Ok(Json(stat.unwrap_or_default()))
}

/// POST /api/v1/practice/sync
pub async fn sync_practice(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(payload): AppJson<SyncPracticeRequest>,
) -> Result<Json<SyncPracticeResponse>, ApiError> {
    let stats = service(&state)
        .sync(&claims.sub, &claims.actor(), &payload.username)
        .await?;
    Ok(Json(SyncPracticeResponse {
        message: "Stats synced successfully".to_string(),
        stats,
    }))
}
