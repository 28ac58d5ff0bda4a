use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::report::{
    DailyCompletion, ProgressReport, SubjectAverage, TrendPoint, TREND_WINDOW,
};
use crate::models::task::TaskQuery;
use crate::models::test_record::TestQuery;
use crate::models::view::ReadinessBand;
use crate::models::{PracticeStat, Subject, TaskRecord, TestRecord};
use crate::services::gateway::DataGateway;
use crate::services::readiness::{
    compute_readiness, practice_scaled_score, task_completion_rate, test_average,
};

pub struct ReportService {
    gateway: Arc<dyn DataGateway>,
}

impl ReportService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self { gateway }
    }

    pub async fn generate(&self, user_id: &str) -> Result<ProgressReport> {
        let test_query = TestQuery::all_for(user_id);
        let task_query = TaskQuery::for_user(user_id);
        let (tests, tasks, profile) = tokio::join!(
            self.gateway.query_tests(&test_query),
            self.gateway.query_tasks(&task_query),
            self.gateway.get_profile(user_id),
        );

        // Test history is a one-time fetch; losing it leaves that input at 0.
        let tests = tests.unwrap_or_else(|e| {
            tracing::error!(user_id, "Failed to load test history: {}", e);
            Vec::new()
        });
        let practice = profile?.and_then(|doc| doc.leetcode);
        let tasks = tasks?;
        Ok(build_report(&tests, &tasks, practice))
    }
}

/// Full-history report. Unlike the live dashboard, the task rate here spans
/// every recorded day.
pub fn build_report(
    tests: &[TestRecord],
    tasks: &[TaskRecord],
    practice: Option<PracticeStat>,
) -> ProgressReport {
    let subject_averages = Subject::ALL
        .iter()
        .map(|subject| {
            let scores: Vec<u8> = tests
                .iter()
                .filter(|t| t.subject == *subject)
                .map(|t| t.percentage)
                .collect();
            SubjectAverage {
                subject: *subject,
                attempts: scores.len(),
                average: test_average(scores),
            }
        })
        .collect();

    let mut chronological: Vec<&TestRecord> = tests.iter().collect();
    chronological.sort_by_key(|t| t.created_at);
    let skip = chronological.len().saturating_sub(TREND_WINDOW);
    let score_trend = chronological
        .into_iter()
        .skip(skip)
        .map(|t| TrendPoint {
            label: t.created_at.format("%Y-%m-%d").to_string(),
            percentage: t.percentage,
        })
        .collect();

    let mut by_day: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for task in tasks {
        let entry = by_day.entry(task.date.as_str()).or_default();
        entry.1 += 1;
        if task.completed {
            entry.0 += 1;
        }
    }
    let daily_completion = by_day
        .iter()
        .map(|(date, (completed, total))| DailyCompletion {
            date: date.to_string(),
            completed: *completed,
            total: *total,
            rate: task_completion_rate(*completed, *total),
        })
        .collect();

    let overall_test_average = test_average(tests.iter().map(|t| t.percentage));
    let completed = tasks.iter().filter(|t| t.completed).count();
    let overall_task_rate = if tasks.is_empty() {
        0.0
    } else {
        completed as f64 / tasks.len() as f64 * 100.0
    };
    let practice_score = practice_scaled_score(practice.as_ref().map_or(0, |p| p.total));
    let readiness = compute_readiness(overall_test_average, overall_task_rate, practice_score);

    ProgressReport {
        readiness,
        band: ReadinessBand::from_score(readiness),
        test_average: overall_test_average,
        task_completion_rate: overall_task_rate,
        practice_scaled_score: practice_score,
        subject_averages,
        score_trend,
        daily_completion,
        practice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn test(subject: Subject, percentage: u8, days_ago: i64) -> TestRecord {
        TestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            subject,
            score: u32::from(percentage) / 20,
            total: 5,
            percentage,
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn task(date: &str, completed: bool) -> TaskRecord {
        TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            title: "Revise".to_string(),
            category: "DSA".to_string(),
            date: date.to_string(),
            completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_scores_zero() {
        let report = build_report(&[], &[], None);
        assert_eq!(report.readiness, 0);
        assert_eq!(report.band, ReadinessBand::Weak);
        assert!(report.score_trend.is_empty());
        assert_eq!(report.subject_averages.len(), 3);
        assert!(report.subject_averages.iter().all(|s| s.average == 0.0));
    }

    #[test]
    fn aggregates_subjects_days_and_overall_rate() {
        let tests = vec![
            test(Subject::Dsa, 80, 3),
            test(Subject::Dsa, 60, 2),
            test(Subject::Aptitude, 100, 1),
        ];
        let tasks = vec![
            task("2026-10-15", true),
            task("2026-10-15", false),
            task("2026-10-16", true),
            task("2026-10-16", true),
            task("2026-10-16", true),
            task("2026-10-16", false),
        ];
        let practice = PracticeStat {
            username: "ada".to_string(),
            total: 300,
            ..Default::default()
        };

        let report = build_report(&tests, &tasks, Some(practice));

        let dsa = report
            .subject_averages
            .iter()
            .find(|s| s.subject == Subject::Dsa)
            .unwrap();
        assert_eq!(dsa.average, 70.0);
        assert_eq!(dsa.attempts, 2);

        assert_eq!(report.daily_completion.len(), 2);
        assert_eq!(report.daily_completion[0].rate, 50);
        assert_eq!(report.daily_completion[1].rate, 75);

        // 0.4*80 + 0.3*(4/6*100) + 0.3*100
        assert_eq!(report.readiness, 82);
    }

    #[test]
    fn trend_keeps_last_ten_oldest_first() {
        let tests: Vec<TestRecord> = (0..14)
            .map(|i| test(Subject::Cybersecurity, (i * 5) as u8, 20 - i))
            .collect();
        let report = build_report(&tests, &[], None);
        assert_eq!(report.score_trend.len(), TREND_WINDOW);
        assert_eq!(report.score_trend[0].percentage, 20);
        assert_eq!(report.score_trend[9].percentage, 65);
    }
}
