use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod activity;
pub mod practice;
pub mod profile;
pub mod quiz;
pub mod report;
pub mod settings;
pub mod task;
pub mod test_record;
pub mod timer;
pub mod view;

pub use practice::PracticeStat;
pub use profile::{ProfileSettings, UserDocument};
pub use task::TaskRecord;
pub use test_record::{Subject, TestRecord};

/// Which upstream measurement a [`MetricSnapshot`] came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    TestScore,
    TaskRate,
    PracticeStat,
}

impl MetricSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSource::TestScore => "test_score",
            MetricSource::TaskRate => "task_rate",
            MetricSource::PracticeStat => "practice_stat",
        }
    }
}

/// Latest value observed for one source. Never mutated once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSnapshot {
    pub source: MetricSource,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl MetricSnapshot {
    pub fn new(source: MetricSource, value: f64) -> Self {
        Self {
            source,
            value,
            observed_at: Utc::now(),
        }
    }
}
