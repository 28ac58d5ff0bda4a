use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    middlewares::auth::JwtClaims,
    models::report::ProgressReport,
    services::{report_service::ReportService, AppState},
};

use super::ApiError;

/// GET /api/v1/reports
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<ProgressReport>, ApiError> {
    let report = ReportService::new(state.gateway.clone())
        .generate(&claims.sub)
        .await?;
    Ok(Json(report))
}
