use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

use crate::metrics::READINESS_RECOMPUTATIONS_TOTAL;
use crate::models::task::{TaskCounts, TaskQuery};
use crate::models::test_record::TestQuery;
use crate::models::view::{
    DisplaySlot, Page, PracticeTotalsDisplay, ReadinessDisplay, TaskStatsDisplay, ViewUpdate,
};
use crate::models::{MetricSnapshot, MetricSource, PracticeStat};
use crate::services::gateway::DataGateway;
use crate::services::readiness::{
    compute_readiness, practice_scaled_score, task_completion_rate, test_average, ReadinessBand,
};

/// A new value from exactly one of the three sources.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUpdate {
    TestAverage(f64),
    TaskCounts(TaskCounts),
    PracticeTotals(Option<PracticeStat>),
}

impl SourceUpdate {
    pub fn source(&self) -> MetricSource {
        match self {
            SourceUpdate::TestAverage(_) => MetricSource::TestScore,
            SourceUpdate::TaskCounts(_) => MetricSource::TaskRate,
            SourceUpdate::PracticeTotals(_) => MetricSource::PracticeStat,
        }
    }
}

/// Latest value per source plus the score derived from them. Owned by the
/// single task driving one view; never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadinessCache {
    test_average: f64,
    tasks: TaskCounts,
    practice: Option<PracticeStat>,
    readiness: u8,
}

impl ReadinessCache {
    /// Replaces one source's value and recomputes the score from all three.
    pub fn apply(&mut self, update: SourceUpdate) -> MetricSnapshot {
        let source = update.source();
        let value = match update {
            SourceUpdate::TestAverage(average) => {
                self.test_average = average;
                average
            }
            SourceUpdate::TaskCounts(counts) => {
                self.tasks = counts;
                self.task_completion_rate()
            }
            SourceUpdate::PracticeTotals(stat) => {
                self.practice = stat;
                self.practice_scaled_score()
            }
        };

        self.readiness = compute_readiness(
            self.test_average,
            self.task_completion_rate(),
            self.practice_scaled_score(),
        );
        READINESS_RECOMPUTATIONS_TOTAL
            .with_label_values(&[source.as_str()])
            .inc();

        MetricSnapshot::new(source, value)
    }

    pub fn readiness(&self) -> u8 {
        self.readiness
    }

    fn task_completion_rate(&self) -> f64 {
        f64::from(task_completion_rate(self.tasks.completed, self.tasks.total))
    }

    fn practice_scaled_score(&self) -> f64 {
        practice_scaled_score(self.practice.as_ref().map_or(0, |p| p.total))
    }

    /// Fills exactly the slots `page` declares.
    pub fn render(&self, page: Page) -> ViewUpdate {
        let mut update = ViewUpdate::empty(page);
        for slot in page.slots() {
            match slot {
                DisplaySlot::ReadinessScore => {
                    update.readiness = Some(ReadinessDisplay {
                        score: self.readiness,
                        band: ReadinessBand::from_score(self.readiness),
                    });
                }
                DisplaySlot::TaskStats => {
                    update.task_stats = Some(TaskStatsDisplay {
                        completed: self.tasks.completed,
                        total: self.tasks.total,
                    });
                }
                DisplaySlot::TaskProgress => {
                    update.task_progress =
                        Some(task_completion_rate(self.tasks.completed, self.tasks.total));
                }
                DisplaySlot::PracticeTotals => {
                    let stat = self.practice.clone().unwrap_or_default();
                    update.practice_totals = Some(PracticeTotalsDisplay {
                        total: stat.total,
                        easy: stat.easy,
                        medium: stat.medium,
                        hard: stat.hard,
                    });
                }
            }
        }
        update
    }
}

/// Joins the profile subscription, the day's task subscription and a
/// one-time test history fetch into a stream of rendered view updates.
pub struct LiveViewSynchronizer {
    gateway: Arc<dyn DataGateway>,
}

impl LiveViewSynchronizer {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self { gateway }
    }

    pub async fn sources(&self, user_id: &str, day: &str) -> Result<BoxStream<'static, SourceUpdate>> {
        let profile = self
            .gateway
            .subscribe_profile(user_id)
            .await?
            .filter_map(|snapshot| async move {
                match snapshot {
                    // No document yet: nothing has been synced, keep the default.
                    Ok(None) => None,
                    Ok(Some(doc)) => Some(SourceUpdate::PracticeTotals(doc.leetcode)),
                    Err(e) => {
                        tracing::warn!("Profile subscription error: {}", e);
                        None
                    }
                }
            })
            .boxed();

        let tasks = self
            .gateway
            .subscribe_tasks(TaskQuery::for_user(user_id).on_day(day))
            .await?
            .filter_map(|snapshot| async move {
                match snapshot {
                    Ok(tasks) => Some(SourceUpdate::TaskCounts(TaskCounts::from_tasks(&tasks))),
                    Err(e) => {
                        tracing::warn!("Task subscription error: {}", e);
                        None
                    }
                }
            })
            .boxed();

        let gateway = self.gateway.clone();
        let query = TestQuery::all_for(user_id);
        let tests = stream::once(async move {
            match gateway.query_tests(&query).await {
                Ok(records) => Some(SourceUpdate::TestAverage(test_average(
                    records.iter().map(|r| r.percentage),
                ))),
                Err(e) => {
                    tracing::error!(user_id = %query.user_id, "Failed to load test history: {}", e);
                    None
                }
            }
        })
        .filter_map(|update| async move { update })
        .boxed();

        Ok(stream::select_all([profile, tasks, tests]).boxed())
    }

    /// Rendered updates for `page`, one per source change, until the
    /// consumer drops the stream.
    pub async fn updates(
        &self,
        user_id: &str,
        day: &str,
        page: Page,
    ) -> Result<BoxStream<'static, ViewUpdate>> {
        let sources = self.sources(user_id, day).await?;
        Ok(sources
            .scan(ReadinessCache::default(), move |cache, update| {
                let snapshot = cache.apply(update);
                tracing::debug!(
                    source = snapshot.source.as_str(),
                    value = snapshot.value,
                    readiness = cache.readiness(),
                    "Readiness recomputed"
                );
                futures::future::ready(Some(cache.render(page)))
            })
            .boxed())
    }

    /// One-shot render through the same cache path.
    pub async fn snapshot(&self, user_id: &str, day: &str, page: Page) -> Result<ViewUpdate> {
        let task_query = TaskQuery::for_user(user_id).on_day(day);
        let test_query = TestQuery::all_for(user_id);
        let (profile, tasks, tests) = tokio::join!(
            self.gateway.get_profile(user_id),
            self.gateway.query_tasks(&task_query),
            self.gateway.query_tests(&test_query),
        );

        let mut cache = ReadinessCache::default();
        if let Some(doc) = profile? {
            cache.apply(SourceUpdate::PracticeTotals(doc.leetcode));
        }
        cache.apply(SourceUpdate::TaskCounts(TaskCounts::from_tasks(&tasks?)));
        match tests {
            Ok(records) => {
                cache.apply(SourceUpdate::TestAverage(test_average(
                    records.iter().map(|r| r.percentage),
                )));
            }
            Err(e) => tracing::error!(user_id, "Failed to load test history: {}", e),
        }
        Ok(cache.render(page))
    }
}
