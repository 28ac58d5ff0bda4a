use serde::Serialize;

use super::view::ReadinessBand;
use super::{PracticeStat, Subject};

/// Number of most recent tests plotted on the score trend.
pub const TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubjectAverage {
    pub subject: Subject,
    pub average: f64,
    pub attempts: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrendPoint {
    pub label: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCompletion {
    pub date: String,
    pub completed: u32,
    pub total: u32,
    pub rate: u8,
}

/// Progress report over the user's full history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressReport {
    pub readiness: u8,
    pub band: ReadinessBand,
    pub test_average: f64,
    pub task_completion_rate: f64,
    pub practice_scaled_score: f64,
    pub subject_averages: Vec<SubjectAverage>,
    pub score_trend: Vec<TrendPoint>,
    pub daily_completion: Vec<DailyCompletion>,
    pub practice: Option<PracticeStat>,
}
