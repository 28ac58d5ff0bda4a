use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::models::activity::{
    ActivityEntry, NetworkEntry, NETWORK_LOG_CAPACITY, SYSTEM_LOG_CAPACITY,
};

/// Bounded system and network logs shown in the admin console. Oldest
/// entries are dropped once a log is full.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record_event(&self, entry: ActivityEntry) -> Result<()>;
    async fn record_request(&self, entry: NetworkEntry) -> Result<()>;
    /// Oldest first.
    async fn events(&self) -> Result<Vec<ActivityEntry>>;
    /// Oldest first.
    async fn requests(&self) -> Result<Vec<NetworkEntry>>;
}

const EVENTS_KEY: &str = "activity:events";
const REQUESTS_KEY: &str = "activity:requests";

pub struct RedisActivityLog {
    redis: ConnectionManager,
}

impl RedisActivityLog {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    async fn push_capped(&self, key: &str, payload: String, capacity: usize) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::pipe()
            .atomic()
            .cmd("RPUSH")
            .arg(key)
            .arg(payload)
            .ignore()
            .cmd("LTRIM")
            .arg(key)
            .arg(-(capacity as i64))
            .arg(-1)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .with_context(|| format!("Failed to append to {}", key))
    }

    async fn read_all<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let mut conn = self.redis.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Failed to read {}", key))?;

        // A single unreadable line should not hide the rest of the log.
        Ok(raw
            .iter()
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(key, "Skipping malformed log entry: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ActivityLog for RedisActivityLog {
    async fn record_event(&self, entry: ActivityEntry) -> Result<()> {
        self.push_capped(EVENTS_KEY, serde_json::to_string(&entry)?, SYSTEM_LOG_CAPACITY)
            .await
    }

    async fn record_request(&self, entry: NetworkEntry) -> Result<()> {
        self.push_capped(
            REQUESTS_KEY,
            serde_json::to_string(&entry)?,
            NETWORK_LOG_CAPACITY,
        )
        .await
    }

    async fn events(&self) -> Result<Vec<ActivityEntry>> {
        self.read_all(EVENTS_KEY).await
    }

    async fn requests(&self) -> Result<Vec<NetworkEntry>> {
        self.read_all(REQUESTS_KEY).await
    }
}

pub struct MemoryActivityLog {
    events: RwLock<VecDeque<ActivityEntry>>,
    requests: RwLock<VecDeque<NetworkEntry>>,
}

impl Default for MemoryActivityLog {
    fn default() -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(SYSTEM_LOG_CAPACITY)),
            requests: RwLock::new(VecDeque::with_capacity(NETWORK_LOG_CAPACITY)),
        }
    }
}

fn push_bounded<T>(log: &mut VecDeque<T>, entry: T, capacity: usize) {
    log.push_back(entry);
    while log.len() > capacity {
        log.pop_front();
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn record_event(&self, entry: ActivityEntry) -> Result<()> {
        push_bounded(&mut *self.events.write().await, entry, SYSTEM_LOG_CAPACITY);
        Ok(())
    }

    async fn record_request(&self, entry: NetworkEntry) -> Result<()> {
        push_bounded(
            &mut *self.requests.write().await,
            entry,
            NETWORK_LOG_CAPACITY,
        );
        Ok(())
    }

    async fn events(&self) -> Result<Vec<ActivityEntry>> {
        Ok(self.events.read().await.iter().cloned().collect())
    }

    async fn requests(&self) -> Result<Vec<NetworkEntry>> {
        Ok(self.requests.read().await.iter().cloned().collect())
    }
}

/// Logging must never fail the operation being logged.
pub async fn record_event_quietly(log: &dyn ActivityLog, entry: ActivityEntry) {
    if let Err(e) = log.record_event(entry).await {
        tracing::warn!("Failed to record activity event: {:#}", e);
    }
}

pub async fn record_request_quietly(log: &dyn ActivityLog, entry: NetworkEntry) {
    if let Err(e) = log.record_request(entry).await {
        tracing::warn!("Failed to record outbound request: {:#}", e);
    }
}
