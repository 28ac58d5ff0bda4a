use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Remote data gateway
    pub static ref GATEWAY_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_operations_total",
        "Total number of data gateway operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref GATEWAY_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "gateway_operation_duration_seconds",
        "Data gateway operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Session store (Redis)
    pub static ref SESSION_STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "session_store_operations_total",
        "Total number of quiz session store operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref SESSION_STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "session_store_operation_duration_seconds",
        "Quiz session store operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // Quiz
    pub static ref QUIZ_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Quiz sessions by outcome",
        &["status"]
    )
    .unwrap();

    pub static ref QUESTION_SOURCE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "question_source_total",
        "Question sets served, by source",
        &["source"]
    )
    .unwrap();

    // Practice sync
    pub static ref PRACTICE_SYNCS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "practice_syncs_total",
        "Practice stat sync attempts",
        &["status"]
    )
    .unwrap();

    // Live view
    pub static ref READINESS_RECOMPUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "readiness_recomputations_total",
        "Readiness recomputations, by triggering source",
        &["source"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Times a gateway call and records its outcome.
pub async fn track_gateway_operation<F, T, E>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    GATEWAY_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    GATEWAY_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

/// Times a session store call and records its outcome.
pub async fn track_session_store_operation<F, T>(
    operation: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    SESSION_STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    SESSION_STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}
