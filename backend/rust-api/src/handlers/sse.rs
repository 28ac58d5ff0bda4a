use axum::{
    extract::{Extension, Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    extractors::UserDay,
    metrics::SSE_CONNECTIONS_ACTIVE,
    middlewares::auth::JwtClaims,
    models::quiz::{QuizSession, QuizState},
    models::timer::TimerEvent,
    models::view::Page,
    services::{live_view::LiveViewSynchronizer, quiz_service::QuizService, AppState},
};

use super::ApiError;

/// Keeps the active-connection gauge honest; dropped with the stream.
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Live readiness values for one page
/// GET /api/v1/live/{page}
pub async fn live_view_stream(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(page): Path<String>,
    UserDay(day): UserDay,
) -> Result<impl IntoResponse, ApiError> {
    let page: Page = page.parse().map_err(ApiError::not_found)?;

    let synchronizer = LiveViewSynchronizer::new(state.gateway.clone());
    let updates = synchronizer
        .updates(&claims.sub, &day, page)
        .await?;
    tracing::info!(user_id = %claims.sub, ?page, "Client connected to live view");

    let guard = ConnectionGuard::open();
    let stream = updates
        .filter(|update| futures::future::ready(!update.is_empty()))
        .map(move |update| {
            let _connection = &guard;
            let data = serde_json::to_string(&update).unwrap_or_else(|_| "{}".to_string());
            Ok::<_, Infallible>(Event::default().event("view-update").data(data))
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Countdown for a running quiz
/// GET /api/v1/quiz/{id}/stream
pub async fn quiz_timer_stream(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = QuizService::new(&state)
        .refresh(&session_id, &claims.sub)
        .await?;

    let tick_interval = tick_interval_ms();
    tracing::info!(
        "Starting quiz timer stream: session={}, remaining={}s, tick_interval={}ms",
        session_id,
        session.time_remaining,
        tick_interval
    );

    let stream = create_timer_stream(state, session, claims.sub, tick_interval);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn tick_interval_ms() -> u64 {
    std::env::var("SSE_TICK_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(1000)
}

enum TimerStep {
    Emit(QuizSession),
    Refresh,
    Done,
}

struct TimerStream {
    state: Arc<AppState>,
    session_id: String,
    user_id: String,
    tick_interval: Duration,
    _guard: ConnectionGuard,
}

/// One event per refresh: `timer-tick` while the quiz runs, a single
/// `time-expired` if the clock ran out, nothing once it was answered through.
fn create_timer_stream(
    state: Arc<AppState>,
    first: QuizSession,
    user_id: String,
    tick_interval_ms: u64,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let ctx = TimerStream {
        state,
        session_id: first.id.clone(),
        user_id,
        tick_interval: Duration::from_millis(tick_interval_ms),
        _guard: ConnectionGuard::open(),
    };

    stream::unfold(
        (ctx, TimerStep::Emit(first)),
        |(ctx, step)| async move {
            let session = match step {
                TimerStep::Done => return None,
                TimerStep::Emit(session) => session,
                TimerStep::Refresh => {
                    sleep(ctx.tick_interval).await;
                    match QuizService::new(&ctx.state)
                        .refresh(&ctx.session_id, &ctx.user_id)
                        .await
                    {
                        Ok(session) => session,
                        Err(e) => {
                            tracing::info!(
                                "Quiz timer stream closed: session={}, {}",
                                ctx.session_id,
                                e
                            );
                            return None;
                        }
                    }
                }
            };

            let (event, next) = match session.state {
                QuizState::InProgress => (TimerEvent::tick(&session), TimerStep::Refresh),
                QuizState::Completed if session.time_remaining == 0 => {
                    tracing::info!("Timer expired: session={}", ctx.session_id);
                    (TimerEvent::expired(&session), TimerStep::Done)
                }
                _ => return None,
            };

            let event = Event::default()
                .event(event.event_name())
                .data(event.to_sse_data());
            Some((Ok(event), (ctx, next)))
        },
    )
}
