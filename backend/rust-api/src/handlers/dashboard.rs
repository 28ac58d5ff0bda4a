use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::UserDay,
    middlewares::auth::JwtClaims,
    models::view::{Page, ViewUpdate},
    services::{live_view::LiveViewSynchronizer, AppState},
};

use super::ApiError;

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    UserDay(day): UserDay,
) -> Result<Json<ViewUpdate>, ApiError> {
    let synchronizer = LiveViewSynchronizer::new(state.gateway.clone());
    let view = synchronizer
        .snapshot(&claims.sub, &day, Page::Dashboard)
        .await?;
    Ok(Json(view))
}
