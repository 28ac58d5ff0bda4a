use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Solved-problem counts pulled from the coding-practice site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PracticeStat {
    pub username: String,
    pub total: u32,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SyncPracticeRequest {
    /// Plain username or a profile URL.
    pub username: String,
}

/// Upstream payload. Either the counters or an `errors` array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeApiResponse {
    pub total_solved: Option<u32>,
    pub easy_solved: Option<u32>,
    pub medium_solved: Option<u32>,
    pub hard_solved: Option<u32>,
    #[serde(default)]
    pub errors: Vec<PracticeApiError>,
}

#[derive(Debug, Deserialize)]
pub struct PracticeApiError {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncPracticeResponse {
    pub message: String,
    pub stats: PracticeStat,
}
