#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use sentinel_prep_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService, Role},
    services::{gateway::DataGateway, AppState},
};

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        // Nothing listens here; outbound calls fail fast.
        question_api_url: "http://127.0.0.1:9".to_string(),
        practice_api_url: "http://127.0.0.1:9".to_string(),
        question_timeout_secs: 2,
        practice_timeout_secs: 2,
        ..Config::default()
    }
}

pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let state = Arc::new(AppState::in_memory(config));
    (create_router(state.clone()), state)
}

/// In-memory app whose data gateway is replaced by `gateway`.
pub fn create_test_app_with_gateway(gateway: Arc<dyn DataGateway>) -> (Router, Arc<AppState>) {
    let (_, state) = create_test_app();
    let state = Arc::new(AppState {
        gateway,
        sessions: state.sessions.clone(),
        activity: state.activity.clone(),
        session_locks: state.session_locks.clone(),
        http: state.http.clone(),
        config: state.config.clone(),
    });
    (create_router(state.clone()), state)
}

pub fn token_for(user_id: &str, role: Role) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        email_verified: true,
        role,
        exp: now + 3600,
        iat: now,
    };
    JwtService::new(TEST_SECRET)
        .generate_token(&claims)
        .expect("token")
}

pub fn student_token(user_id: &str) -> String {
    token_for(user_id, Role::Student)
}

pub fn admin_token() -> String {
    token_for("admin-1", Role::Admin)
}

/// Sends one request and returns the status with the JSON body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
