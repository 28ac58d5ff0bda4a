use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::utils::time::{is_current_day_key, today_key, today_key_at_offset};

/// Client UTC offset in minutes east of UTC (IST is `330`).
pub const TIMEZONE_OFFSET_HEADER: &str = "x-timezone-offset";

/// JSON body extractor whose rejections are JSON, not plain text.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                Err(bad_request(message))
            }
        }
    }
}

/// `AppJson` followed by `validator` checks on the payload.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        if let Err(errors) = value.validate() {
            tracing::debug!("Rejected payload: {}", errors);
            return Err(bad_request(format!("Validation failed: {}", errors)));
        }
        Ok(ValidJson(value))
    }
}

#[derive(Debug, Deserialize)]
struct DayParams {
    day: Option<String>,
}

/// The user's current calendar day as a `YYYY-MM-DD` key.
///
/// Taken from a `?day=` query parameter, else from the
/// `X-Timezone-Offset` header, else the server's local day. EventSource
/// clients cannot set headers, so the live stream relies on `?day=`.
pub struct UserDay(pub String);

impl<S> FromRequestParts<S> for UserDay
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<DayParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| bad_request(format!("Invalid query string: {}", rejection)))?;

        if let Some(day) = params.day {
            if !is_current_day_key(&day) {
                return Err(bad_request(format!("Invalid day: {}", day)));
            }
            return Ok(UserDay(day));
        }

        if let Some(value) = parts.headers.get(TIMEZONE_OFFSET_HEADER) {
            let day = value
                .to_str()
                .ok()
                .and_then(|raw| raw.trim().parse::<i32>().ok())
                .and_then(today_key_at_offset)
                .ok_or_else(|| bad_request("Invalid X-Timezone-Offset header".to_string()))?;
            return Ok(UserDay(day));
        }

        Ok(UserDay(today_key()))
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message, "status": 400 })),
    )
        .into_response()
}
