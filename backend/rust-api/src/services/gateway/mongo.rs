use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use mongodb::bson::{doc, to_bson, Document};
use mongodb::options::{FullDocumentType, ReturnDocument};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::{DataGateway, GatewayError, Snapshots};
use crate::metrics::track_gateway_operation;
use crate::models::practice::PracticeStat;
use crate::models::profile::{ProfilePatch, ProfileSettings};
use crate::models::settings::GlobalSettings;
use crate::models::task::{SortOrder, TaskQuery};
use crate::models::test_record::{Subject, TestQuery};
use crate::models::{TaskRecord, TestRecord, UserDocument};
use crate::utils::time::{bson_datetime, bson_datetime_option};

const USERS: &str = "users";
const TASKS: &str = "tasks";
const TESTS: &str = "tests";
const SETTINGS: &str = "settings";
const GLOBAL_SETTINGS_ID: &str = "global";

/// Change-stream stage keeping the user's own task writes. Delete events
/// carry only the document key, so every delete still triggers a re-query.
fn task_change_filter(user_id: &str) -> Document {
    doc! {
        "$match": {
            "$or": [
                { "fullDocument.user_id": user_id },
                { "operationType": "delete" },
            ]
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PracticeDoc {
    username: String,
    total: u32,
    easy: u32,
    medium: u32,
    hard: u32,
    #[serde(default, with = "bson_datetime_option")]
    last_synced: Option<DateTime<Utc>>,
}

impl From<PracticeStat> for PracticeDoc {
    fn from(stat: PracticeStat) -> Self {
        Self {
            username: stat.username,
            total: stat.total,
            easy: stat.easy,
            medium: stat.medium,
            hard: stat.hard,
            last_synced: stat.last_synced,
        }
    }
}

impl From<PracticeDoc> for PracticeStat {
    fn from(doc: PracticeDoc) -> Self {
        Self {
            username: doc.username,
            total: doc.total,
            easy: doc.easy,
            medium: doc.medium,
            hard: doc.hard,
            last_synced: doc.last_synced,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    profile: Option<ProfileSettings>,
    #[serde(default)]
    leetcode: Option<PracticeDoc>,
}

impl From<UserDoc> for UserDocument {
    fn from(doc: UserDoc) -> Self {
        Self {
            user_id: doc.id,
            profile: doc.profile,
            leetcode: doc.leetcode.map(PracticeStat::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskDoc {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    title: String,
    category: String,
    date: String,
    completed: bool,
    #[serde(with = "bson_datetime")]
    created_at: DateTime<Utc>,
}

impl From<&TaskRecord> for TaskDoc {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id.clone(),
            user_id: task.user_id.clone(),
            title: task.title.clone(),
            category: task.category.clone(),
            date: task.date.clone(),
            completed: task.completed,
            created_at: task.created_at,
        }
    }
}

impl From<TaskDoc> for TaskRecord {
    fn from(doc: TaskDoc) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            title: doc.title,
            category: doc.category,
            date: doc.date,
            completed: doc.completed,
            created_at: doc.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TestDoc {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    subject: Subject,
    score: u32,
    total: u32,
    percentage: u8,
    #[serde(with = "bson_datetime")]
    created_at: DateTime<Utc>,
}

impl From<&TestRecord> for TestDoc {
    fn from(record: &TestRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            subject: record.subject,
            score: record.score,
            total: record.total,
            percentage: record.percentage,
            created_at: record.created_at,
        }
    }
}

impl From<TestDoc> for TestRecord {
    fn from(doc: TestDoc) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            subject: doc.subject,
            score: doc.score,
            total: doc.total,
            percentage: doc.percentage,
            created_at: doc.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    question_api_key: Option<String>,
    #[serde(default, with = "bson_datetime_option")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_by: Option<String>,
}

fn sort_direction(order: SortOrder) -> i32 {
    match order {
        SortOrder::Ascending => 1,
        SortOrder::Descending => -1,
    }
}

/// MongoDB-backed gateway. Subscriptions ride on change streams, which
/// need a replica set; every change event triggers a fresh query.
#[derive(Clone)]
pub struct MongoGateway {
    db: Database,
    users: Collection<UserDoc>,
    tasks: Collection<TaskDoc>,
    tests: Collection<TestDoc>,
    settings: Collection<SettingsDoc>,
}

impl MongoGateway {
    pub fn new(db: Database) -> Self {
        Self {
            users: db.collection(USERS),
            tasks: db.collection(TASKS),
            tests: db.collection(TESTS),
            settings: db.collection(SETTINGS),
            db,
        }
    }

    /// Indexes backing the day and history queries.
    pub async fn ensure_indexes(&self) -> Result<(), GatewayError> {
        use mongodb::IndexModel;

        self.tasks
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "date": 1 })
                    .build(),
            )
            .await?;
        self.tests
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    fn task_filter(query: &TaskQuery) -> Document {
        let mut filter = doc! { "user_id": query.user_id.as_str() };
        if let Some(date) = &query.date {
            filter.insert("date", date.as_str());
        }
        filter
    }

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskRecord>, GatewayError> {
        let mut find = self
            .tasks
            .find(Self::task_filter(query))
            .sort(doc! { "date": sort_direction(query.order) });
        if let Some(limit) = query.limit {
            find = find.limit(limit as i64);
        }
        let docs: Vec<TaskDoc> = find.await?.try_collect().await?;
        Ok(docs.into_iter().map(TaskRecord::from).collect())
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserDocument>, GatewayError> {
        Ok(self
            .users
            .find_one(doc! { "_id": user_id })
            .await?
            .map(UserDocument::from))
    }
}

#[async_trait]
impl DataGateway for MongoGateway {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserDocument>, GatewayError> {
        track_gateway_operation("find_one", USERS, self.find_profile(user_id)).await
    }

    async fn merge_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> Result<UserDocument, GatewayError> {
        track_gateway_operation("merge", USERS, async {
            let mut set = Document::new();
            if let Some(profile) = patch.profile {
                set.insert("profile", to_bson(&profile)?);
            }
            if let Some(stat) = patch.leetcode {
                set.insert("leetcode", to_bson(&PracticeDoc::from(stat))?);
            }

            let updated = if set.is_empty() {
                self.users.find_one(doc! { "_id": user_id }).await?
            } else {
                self.users
                    .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .await?
            };

            Ok(updated.map(UserDocument::from).unwrap_or_else(|| UserDocument {
                user_id: user_id.to_string(),
                ..Default::default()
            }))
        })
        .await
    }

    async fn insert_task(&self, task: &TaskRecord) -> Result<(), GatewayError> {
        track_gateway_operation("insert_one", TASKS, async {
            self.tasks.insert_one(TaskDoc::from(task)).await?;
            Ok(())
        })
        .await
    }

    async fn set_task_completed(
        &self,
        user_id: &str,
        task_id: &str,
        completed: bool,
    ) -> Result<bool, GatewayError> {
        track_gateway_operation("update_one", TASKS, async {
            let result = self
                .tasks
                .update_one(
                    doc! { "_id": task_id, "user_id": user_id },
                    doc! { "$set": { "completed": completed } },
                )
                .await?;
            Ok(result.matched_count > 0)
        })
        .await
    }

    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, GatewayError> {
        track_gateway_operation("delete_one", TASKS, async {
            let result = self
                .tasks
                .delete_one(doc! { "_id": task_id, "user_id": user_id })
                .await?;
            Ok(result.deleted_count > 0)
        })
        .await
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskRecord>, GatewayError> {
        track_gateway_operation("find", TASKS, self.find_tasks(query)).await
    }

    async fn insert_test(&self, record: &TestRecord) -> Result<(), GatewayError> {
        track_gateway_operation("insert_one", TESTS, async {
            self.tests.insert_one(TestDoc::from(record)).await?;
            Ok(())
        })
        .await
    }

    async fn query_tests(&self, query: &TestQuery) -> Result<Vec<TestRecord>, GatewayError> {
        track_gateway_operation("find", TESTS, async {
            let mut find = self
                .tests
                .find(doc! { "user_id": query.user_id.as_str() })
                .sort(doc! { "created_at": sort_direction(query.order) });
            if let Some(limit) = query.limit {
                find = find.limit(limit as i64);
            }
            let docs: Vec<TestDoc> = find.await?.try_collect().await?;
            Ok(docs.into_iter().map(TestRecord::from).collect())
        })
        .await
    }

    async fn get_settings(&self) -> Result<GlobalSettings, GatewayError> {
        track_gateway_operation("find_one", SETTINGS, async {
            let settings = self
                .settings
                .find_one(doc! { "_id": GLOBAL_SETTINGS_ID })
                .await?
                .map(|doc| GlobalSettings {
                    question_api_key: doc.question_api_key,
                    updated_at: doc.updated_at,
                    updated_by: doc.updated_by,
                })
                .unwrap_or_default();
            Ok(settings)
        })
        .await
    }

    async fn put_settings(&self, settings: &GlobalSettings) -> Result<(), GatewayError> {
        track_gateway_operation("replace_one", SETTINGS, async {
            let doc = SettingsDoc {
                id: GLOBAL_SETTINGS_ID.to_string(),
                question_api_key: settings.question_api_key.clone(),
                updated_at: settings.updated_at,
                updated_by: settings.updated_by.clone(),
            };
            self.settings
                .replace_one(doc! { "_id": GLOBAL_SETTINGS_ID }, doc)
                .upsert(true)
                .await?;
            Ok(())
        })
        .await
    }

    async fn subscribe_profile(
        &self,
        user_id: &str,
    ) -> Result<Snapshots<Option<UserDocument>>, GatewayError> {
        // Open the stream before the first read so no change slips between them.
        let changes = self
            .users
            .watch()
            .pipeline([doc! { "$match": { "documentKey._id": user_id } }])
            .await?;
        let initial = self.find_profile(user_id).await?;

        let gateway = self.clone();
        let user_id = user_id.to_string();
        let updates = changes.then(move |event| {
            let gateway = gateway.clone();
            let user_id = user_id.clone();
            async move {
                event?;
                gateway.find_profile(&user_id).await
            }
        });

        Ok(stream::once(async move { Ok(initial) })
            .chain(updates)
            .boxed())
    }

    async fn subscribe_tasks(
        &self,
        query: TaskQuery,
    ) -> Result<Snapshots<Vec<TaskRecord>>, GatewayError> {
        let changes = self
            .tasks
            .watch()
            .pipeline([task_change_filter(&query.user_id)])
            .full_document(FullDocumentType::UpdateLookup)
            .await?;
        let initial = self.find_tasks(&query).await?;

        let gateway = self.clone();
        let updates = changes.then(move |event| {
            let gateway = gateway.clone();
            let query = query.clone();
            async move {
                event?;
                gateway.find_tasks(&query).await
            }
        });

        Ok(stream::once(async move { Ok(initial) })
            .chain(updates)
            .boxed())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_changes_are_scoped_to_owner_except_deletes() {
        let stage = task_change_filter("u1");
        let branches = stage
            .get_document("$match")
            .unwrap()
            .get_array("$or")
            .unwrap();

        assert_eq!(branches.len(), 2);
        assert!(branches.contains(&doc! { "fullDocument.user_id": "u1" }.into()));
        assert!(branches.contains(&doc! { "operationType": "delete" }.into()));
    }
}
