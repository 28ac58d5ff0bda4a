use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::trace::TRACE_ID_HEADER),
            HeaderName::from_static(extractors::TIMEZONE_OFFSET_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        // Everything else requires a JWT; guests are read-only
        .nest(
            "/api/v1",
            api_routes()
                .merge(admin_routes())
                .layer(middleware::from_fn(
                    middlewares::auth::read_only_guard_middleware,
                ))
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Dashboard and live readiness
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/live/{page}", get(handlers::sse::live_view_stream))
        // Daily schedule
        .route(
            "/tasks",
            get(handlers::tasks::list_today).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/{id}",
            patch(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        // Assessments
        .route("/quiz", post(handlers::quiz::start_quiz))
        .route(
            "/quiz/{id}",
            get(handlers::quiz::get_quiz).delete(handlers::quiz::abandon_quiz),
        )
        .route("/quiz/{id}/select", post(handlers::quiz::select_option))
        .route("/quiz/{id}/confirm", post(handlers::quiz::confirm_answer))
        .route("/quiz/{id}/stream", get(handlers::sse::quiz_timer_stream))
        .route("/tests/history", get(handlers::quiz::test_history))
        // Coding practice
        .route("/practice", get(handlers::practice::get_practice))
        .route("/practice/sync", post(handlers::practice::sync_practice))
        // Reports and profile
        .route("/reports", get(handlers::reports::get_report))
        .route(
            "/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/settings",
            get(handlers::admin::get_settings).put(handlers::admin::update_settings),
        )
        .route("/admin/console", get(handlers::admin::get_console))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}
