use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::task::SortOrder;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Subject {
    Aptitude,
    #[serde(rename = "DSA")]
    Dsa,
    Cybersecurity,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Aptitude, Subject::Dsa, Subject::Cybersecurity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Aptitude => "Aptitude",
            Subject::Dsa => "DSA",
            Subject::Cybersecurity => "Cybersecurity",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aptitude" => Ok(Subject::Aptitude),
            "DSA" => Ok(Subject::Dsa),
            "Cybersecurity" => Ok(Subject::Cybersecurity),
            other => Err(format!("Unknown subject: {}", other)),
        }
    }
}

/// A scored assessment, written once when a quiz completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestRecord {
    pub id: String,
    pub user_id: String,
    pub subject: Subject,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    pub created_at: DateTime<Utc>,
}

/// Ordered by `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestQuery {
    pub user_id: String,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl TestQuery {
    pub fn all_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    pub fn latest_for(user_id: impl Into<String>, limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            order: SortOrder::Descending,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestHistoryEntry {
    pub subject: Subject,
    pub percentage: u8,
    pub passed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&TestRecord> for TestHistoryEntry {
    fn from(record: &TestRecord) -> Self {
        Self {
            subject: record.subject,
            percentage: record.percentage,
            passed: record.percentage >= super::quiz::PASS_PERCENTAGE,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_round_trips_through_its_wire_name() {
        for subject in Subject::ALL {
            assert_eq!(subject.as_str().parse::<Subject>(), Ok(subject));
        }
        assert_eq!(
            serde_json::to_string(&Subject::Dsa).unwrap(),
            "\"DSA\"".to_string()
        );
        assert!("Physics".parse::<Subject>().is_err());
    }
}
