use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::ValidJson,
    middlewares::auth::JwtClaims,
    models::profile::{ProfileResponse, ProfileSettings},
    services::{profile_service::ProfileService, AppState},
};

use super::ApiError;

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = ProfileService::new(state.gateway.clone())
        .get(&claims.sub)
        .await?;
    Ok(Json(ProfileResponse {
        user_id: claims.sub,
        email: claims.email,
        profile,
    }))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidJson(payload): ValidJson<ProfileSettings>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = ProfileService::new(state.gateway.clone())
        .update(&claims.sub, payload)
        .await?;
    Ok(Json(ProfileResponse {
        user_id: claims.sub,
        email: claims.email,
        profile,
    }))
}
