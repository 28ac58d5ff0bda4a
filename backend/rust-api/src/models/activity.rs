use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SYSTEM_LOG_CAPACITY: usize = 100;
pub const NETWORK_LOG_CAPACITY: usize = 50;
const MAX_LOGGED_URL_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

/// One line of the admin activity console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub description: String,
    pub status: ActivityStatus,
    pub actor: String,
}

impl ActivityEntry {
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        status: ActivityStatus,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            description: description.into(),
            status,
            actor: actor.into(),
        }
    }
}

/// External service an outbound request went to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutboundTarget {
    QuestionService,
    PracticeApi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkEntry {
    pub timestamp: DateTime<Utc>,
    pub target: OutboundTarget,
    pub url: String,
    pub method: String,
    /// 0 when the request never got a response.
    pub status: u16,
    pub response_time_ms: u64,
    pub success: bool,
}

impl NetworkEntry {
    pub fn new(
        target: OutboundTarget,
        url: &str,
        method: &str,
        status: u16,
        response_time_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            target,
            url: trim_url(url),
            method: method.to_string(),
            status,
            response_time_ms,
            success: (200..300).contains(&status),
        }
    }
}

/// Drops the query string (API keys travel there) and caps the length.
pub fn trim_url(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();
    without_query.chars().take(MAX_LOGGED_URL_LEN).collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionServiceHealth {
    Unknown,
    Online,
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PracticeSyncHealth {
    Unknown,
    Active,
    Faults,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ConsoleHealth {
    pub question_service: QuestionServiceHealth,
    pub practice_sync: PracticeSyncHealth,
}

impl ConsoleHealth {
    /// Derived from the most recent request to each target.
    pub fn from_requests(requests: &[NetworkEntry]) -> Self {
        let latest = |target: OutboundTarget| {
            requests
                .iter()
                .filter(|entry| entry.target == target)
                .max_by_key(|entry| entry.timestamp)
        };

        let question_service = match latest(OutboundTarget::QuestionService) {
            Some(entry) if entry.success => QuestionServiceHealth::Online,
            Some(_) => QuestionServiceHealth::Fallback,
            None => QuestionServiceHealth::Unknown,
        };
        let practice_sync = match latest(OutboundTarget::PracticeApi) {
            Some(entry) if entry.success => PracticeSyncHealth::Active,
            Some(_) => PracticeSyncHealth::Faults,
            None => PracticeSyncHealth::Unknown,
        };

        Self {
            question_service,
            practice_sync,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsoleResponse {
    /// Oldest first.
    pub events: Vec<ActivityEntry>,
    /// Newest first.
    pub requests: Vec<NetworkEntry>,
    pub health: ConsoleHealth,
}
