use chrono::{DateTime, Utc};
use serde::Serialize;

use super::quiz::{QuizResult, QuizSession};

/// Countdown events pushed on a quiz stream.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    TimeExpired(TimeExpired),
}

#[derive(Debug, Serialize, Clone)]
pub struct TimerTick {
    pub session_id: String,
    pub remaining_seconds: u32,
    pub elapsed_seconds: u32,
    pub total_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TimeExpired {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub result: Option<QuizResult>,
}

impl TimerEvent {
    pub fn tick(session: &QuizSession) -> Self {
        TimerEvent::TimerTick(TimerTick {
            session_id: session.id.clone(),
            remaining_seconds: session.time_remaining,
            elapsed_seconds: session.duration_secs.saturating_sub(session.time_remaining),
            total_seconds: session.duration_secs,
            timestamp: Utc::now(),
        })
    }

    pub fn expired(session: &QuizSession) -> Self {
        TimerEvent::TimeExpired(TimeExpired {
            session_id: session.id.clone(),
            timestamp: Utc::now(),
            message: "Time is up. Your answers have been submitted.".to_string(),
            result: session.result.clone(),
        })
    }

    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
        }
    }
}
