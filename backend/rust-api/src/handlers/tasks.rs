use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    extractors::{AppJson, UserDay, ValidJson},
    middlewares::auth::JwtClaims,
    models::task::{CreateTaskRequest, TodayTasksResponse, UpdateTaskRequest},
    services::{task_service::TaskService, AppState},
};

use super::ApiError;

/// GET /api/v1/tasks
pub async fn list_today(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    UserDay(day): UserDay,
) -> Result<Json<TodayTasksResponse>, ApiError> {
    let service = TaskService::new(state.gateway.clone());
    Ok(Json(service.list_day(&claims.sub, &day).await?))
}

/// POST /api/v1/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    UserDay(day): UserDay,
    ValidJson(payload): ValidJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title must not be blank"));
    }
    let service = TaskService::new(state.gateway.clone());
    let task = service.create(&claims.sub, &day, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/v1/tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(task_id): Path<String>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service = TaskService::new(state.gateway.clone());
    if !service
        .set_completed(&claims.sub, &task_id, payload.completed)
        .await?
    {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(Json(json!({ "id": task_id, "completed": payload.completed })))
}

/// DELETE /api/v1/tasks/{id}
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = TaskService::new(state.gateway.clone());
    if !service.delete(&claims.sub, &task_id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
