use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio_stream::wrappers::WatchStream;

use super::{order_and_limit, DataGateway, GatewayError, Snapshots};
use crate::models::profile::ProfilePatch;
use crate::models::settings::GlobalSettings;
use crate::models::task::TaskQuery;
use crate::models::test_record::TestQuery;
use crate::models::{TaskRecord, TestRecord, UserDocument};

#[derive(Default)]
struct Store {
    users: HashMap<String, UserDocument>,
    tasks: Vec<TaskRecord>,
    tests: Vec<TestRecord>,
    settings: GlobalSettings,
}

/// Process-local gateway for tests and local development. Each collection
/// carries a change counter; subscribers re-run their query whenever it moves.
#[derive(Clone)]
pub struct MemoryGateway {
    store: Arc<RwLock<Store>>,
    users_version: watch::Sender<u64>,
    tasks_version: watch::Sender<u64>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (users_version, _) = watch::channel(0);
        let (tasks_version, _) = watch::channel(0);
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            users_version,
            tasks_version,
        }
    }

    fn bump(version: &watch::Sender<u64>) {
        version.send_modify(|v| *v = v.wrapping_add(1));
    }

    async fn select_tasks(store: &RwLock<Store>, query: &TaskQuery) -> Vec<TaskRecord> {
        let store = store.read().await;
        let matching = store
            .tasks
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        order_and_limit(matching, |t| t.date.clone(), query.order, query.limit)
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserDocument>, GatewayError> {
        Ok(self.store.read().await.users.get(user_id).cloned())
    }

    async fn merge_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> Result<UserDocument, GatewayError> {
        let merged = {
            let mut store = self.store.write().await;
            let doc = store
                .users
                .entry(user_id.to_string())
                .or_insert_with(|| UserDocument {
                    user_id: user_id.to_string(),
                    ..Default::default()
                });
            doc.merge(patch);
            doc.clone()
        };
        Self::bump(&self.users_version);
        Ok(merged)
    }

    async fn insert_task(&self, task: &TaskRecord) -> Result<(), GatewayError> {
        self.store.write().await.tasks.push(task.clone());
        Self::bump(&self.tasks_version);
        Ok(())
    }

    async fn set_task_completed(
        &self,
        user_id: &str,
        task_id: &str,
        completed: bool,
    ) -> Result<bool, GatewayError> {
        let found = {
            let mut store = self.store.write().await;
            match store
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id && t.user_id == user_id)
            {
                Some(task) => {
                    task.completed = completed;
                    true
                }
                None => false,
            }
        };
        if found {
            Self::bump(&self.tasks_version);
        }
        Ok(found)
    }

    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, GatewayError> {
        let removed = {
            let mut store = self.store.write().await;
            let before = store.tasks.len();
            store
                .tasks
                .retain(|t| !(t.id == task_id && t.user_id == user_id));
            store.tasks.len() != before
        };
        if removed {
            Self::bump(&self.tasks_version);
        }
        Ok(removed)
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskRecord>, GatewayError> {
        Ok(Self::select_tasks(&self.store, query).await)
    }

    async fn insert_test(&self, record: &TestRecord) -> Result<(), GatewayError> {
        self.store.write().await.tests.push(record.clone());
        Ok(())
    }

    async fn query_tests(&self, query: &TestQuery) -> Result<Vec<TestRecord>, GatewayError> {
        let store = self.store.read().await;
        let matching = store
            .tests
            .iter()
            .filter(|t| t.user_id == query.user_id)
            .cloned()
            .collect();
        Ok(order_and_limit(
            matching,
            |t| t.created_at,
            query.order,
            query.limit,
        ))
    }

    async fn get_settings(&self) -> Result<GlobalSettings, GatewayError> {
        Ok(self.store.read().await.settings.clone())
    }

    async fn put_settings(&self, settings: &GlobalSettings) -> Result<(), GatewayError> {
        self.store.write().await.settings = settings.clone();
        Ok(())
    }

    async fn subscribe_profile(
        &self,
        user_id: &str,
    ) -> Result<Snapshots<Option<UserDocument>>, GatewayError> {
        let store = self.store.clone();
        let user_id = user_id.to_string();
        let stream = WatchStream::new(self.users_version.subscribe()).then(move |_| {
            let store = store.clone();
            let user_id = user_id.clone();
            async move { Ok::<_, GatewayError>(store.read().await.users.get(&user_id).cloned()) }
        });
        Ok(stream.boxed())
    }

    async fn subscribe_tasks(
        &self,
        query: TaskQuery,
    ) -> Result<Snapshots<Vec<TaskRecord>>, GatewayError> {
        let store = self.store.clone();
        let stream = WatchStream::new(self.tasks_version.subscribe()).then(move |_| {
            let store = store.clone();
            let query = query.clone();
            async move { Ok::<_, GatewayError>(Self::select_tasks(&store, &query).await) }
        });
        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}
