use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::task::{CreateTaskRequest, TaskCounts, TaskQuery, TodayTasksResponse};
use crate::models::TaskRecord;
use crate::services::gateway::DataGateway;
use crate::services::readiness::task_completion_rate;

/// Daily schedule: tasks are always created for, and listed from, one day.
pub struct TaskService {
    gateway: Arc<dyn DataGateway>,
}

impl TaskService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_day(&self, user_id: &str, day: &str) -> Result<TodayTasksResponse> {
        let tasks = self
            .gateway
            .query_tasks(&TaskQuery::for_user(user_id).on_day(day))
            .await?;
        let counts = TaskCounts::from_tasks(&tasks);

        Ok(TodayTasksResponse {
            date: day.to_string(),
            percentage: task_completion_rate(counts.completed, counts.total),
            completed: counts.completed,
            total: counts.total,
            tasks,
        })
    }

    pub async fn create(&self, user_id: &str, day: &str, req: CreateTaskRequest) -> Result<TaskRecord> {
        let task = TaskRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: req.title.trim().to_string(),
            category: req.category.trim().to_string(),
            date: day.to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        self.gateway.insert_task(&task).await?;
        tracing::info!(user_id, task_id = %task.id, "Task created");
        Ok(task)
    }

    /// `false` when the task does not exist for this user.
    pub async fn set_completed(&self, user_id: &str, task_id: &str, completed: bool) -> Result<bool> {
        let found = self
            .gateway
            .set_task_completed(user_id, task_id, completed)
            .await?;
        if found {
            tracing::debug!(user_id, task_id, completed, "Task updated");
        }
        Ok(found)
    }

    pub async fn delete(&self, user_id: &str, task_id: &str) -> Result<bool> {
        Ok(self.gateway.delete_task(user_id, task_id).await?)
    }
}
