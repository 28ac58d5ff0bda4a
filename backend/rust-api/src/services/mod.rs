use crate::config::Config;
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;

use activity_log::{ActivityLog, MemoryActivityLog, RedisActivityLog};
use gateway::{DataGateway, MemoryGateway, MongoGateway};
use session_store::{MemorySessionStore, RedisSessionStore, SessionLocks, SessionStore};

pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn DataGateway>,
    pub sessions: Arc<dyn SessionStore>,
    pub activity: Arc<dyn ActivityLog>,
    pub session_locks: Arc<SessionLocks>,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let gateway = MongoGateway::new(mongo_client.database(&config.mongo_database));
        if let Err(e) = gateway.ensure_indexes().await {
            tracing::warn!("Failed to ensure MongoDB indexes: {}", e);
        }

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let mut conn = redis.clone();
        tokio::time::timeout(
            Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        Ok(Self {
            sessions: Arc::new(RedisSessionStore::new(redis.clone(), config.session_ttl_secs)),
            activity: Arc::new(RedisActivityLog::new(redis)),
            gateway: Arc::new(gateway),
            session_locks: Arc::new(SessionLocks::default()),
            http: reqwest::Client::new(),
            config,
        })
    }

    /// Process-local backends; nothing outlives the process.
    pub fn in_memory(config: Config) -> Self {
        Self {
            sessions: Arc::new(MemorySessionStore::new(config.session_ttl_secs)),
            activity: Arc::new(MemoryActivityLog::default()),
            gateway: Arc::new(MemoryGateway::new()),
            session_locks: Arc::new(SessionLocks::default()),
            http: reqwest::Client::new(),
            config,
        }
    }
}

pub mod activity_log;
pub mod gateway;
pub mod live_view;
pub mod practice_service;
pub mod profile_service;
pub mod question_bank;
pub mod question_service;
pub mod quiz_service;
pub mod readiness;
pub mod report_service;
pub mod session_store;
pub mod settings_service;
pub mod task_service;
