use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::quiz::{QuizView, SelectOptionRequest, StartQuizRequest},
    models::test_record::{TestHistoryEntry, TestQuery},
    services::{quiz_service::QuizService, AppState},
};

use super::ApiError;

/// Most recent results shown on the quiz page.
const HISTORY_LIMIT: usize = 20;

/// POST /api/v1/quiz
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(payload): AppJson<StartQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuizService::new(&state);
    let view = service
        .start(&claims.sub, &claims.actor(), payload.subject)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/quiz/{id}
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<Json<QuizView>, ApiError> {
    let service = QuizService::new(&state);
    Ok(Json(service.get(&session_id, &claims.sub).await?))
}

/// POST /api/v1/quiz/{id}/select
pub async fn select_option(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    AppJson(payload): AppJson<SelectOptionRequest>,
) -> Result<Json<QuizView>, ApiError> {
    let service = QuizService::new(&state);
    Ok(Json(
        service
            .select(&session_id, &claims.sub, payload.option)
            .await?,
    ))
}

/// POST /api/v1/quiz/{id}/confirm
pub async fn confirm_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<Json<QuizView>, ApiError> {
    let service = QuizService::new(&state);
    Ok(Json(service.confirm(&session_id, &claims.sub).await?))
}

/// DELETE /api/v1/quiz/{id}
pub async fn abandon_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = QuizService::new(&state);
    service.abandon(&session_id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tests/history
pub async fn test_history(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<Vec<TestHistoryEntry>>, ApiError> {
    let records = state
        .gateway
        .query_tests(&TestQuery::latest_for(claims.sub.as_str(), HISTORY_LIMIT))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(Json(records.iter().map(TestHistoryEntry::from).collect()))
}
