use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskRequest {
    pub completed: bool,
}

/// Completed / total counts over one day of tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub completed: u32,
    pub total: u32,
}

impl TaskCounts {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a TaskRecord>) -> Self {
        tasks.into_iter().fold(TaskCounts::default(), |mut acc, task| {
            acc.total += 1;
            if task.completed {
                acc.completed += 1;
            }
            acc
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TodayTasksResponse {
    pub date: String,
    pub tasks: Vec<TaskRecord>,
    pub completed: u32,
    pub total: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Equality / order / limit filters over a user's tasks. Ordered by `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub user_id: String,
    pub date: Option<String>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl TaskQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            date: None,
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    pub fn on_day(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn matches(&self, task: &TaskRecord) -> bool {
        task.user_id == self.user_id
            && self.date.as_deref().map_or(true, |d| d == task.date)
    }
}
