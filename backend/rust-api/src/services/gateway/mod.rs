//! Remote data gateway: document reads, merge writes, filtered collection
//! queries and change subscriptions over the user-owned collections.
//!
//! Subscriptions yield the full current result set first and again after
//! every change that may affect it. Consumers never see diffs.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::profile::ProfilePatch;
use crate::models::settings::GlobalSettings;
use crate::models::task::TaskQuery;
use crate::models::test_record::TestQuery;
use crate::models::{TaskRecord, TestRecord, UserDocument};

mod memory;
mod mongo;

pub use memory::MemoryGateway;
pub use mongo::MongoGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
    #[error("failed to decode document: {0}")]
    Decoding(#[from] mongodb::bson::de::Error),
}

pub type Snapshots<T> = BoxStream<'static, Result<T, GatewayError>>;

#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserDocument>, GatewayError>;

    /// Upserts the user document, touching only the fields set in `patch`.
    async fn merge_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> Result<UserDocument, GatewayError>;

    async fn insert_task(&self, task: &TaskRecord) -> Result<(), GatewayError>;

    /// Returns `false` when the user has no task with that id.
    async fn set_task_completed(
        &self,
        user_id: &str,
        task_id: &str,
        completed: bool,
    ) -> Result<bool, GatewayError>;

    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, GatewayError>;

    async fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskRecord>, GatewayError>;

    async fn insert_test(&self, record: &TestRecord) -> Result<(), GatewayError>;

    async fn query_tests(&self, query: &TestQuery) -> Result<Vec<TestRecord>, GatewayError>;

    /// The singleton settings document; defaults when it was never written.
    async fn get_settings(&self) -> Result<GlobalSettings, GatewayError>;

    async fn put_settings(&self, settings: &GlobalSettings) -> Result<(), GatewayError>;

    async fn subscribe_profile(
        &self,
        user_id: &str,
    ) -> Result<Snapshots<Option<UserDocument>>, GatewayError>;

    async fn subscribe_tasks(
        &self,
        query: TaskQuery,
    ) -> Result<Snapshots<Vec<TaskRecord>>, GatewayError>;

    async fn ping(&self) -> Result<(), GatewayError>;
}

/// Applies order and limit to an already filtered, unordered set.
pub(crate) fn order_and_limit<T, K: Ord>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> K,
    order: crate::models::task::SortOrder,
    limit: Option<usize>,
) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    if order == crate::models::task::SortOrder::Descending {
        items.reverse();
    }
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}
