use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::metrics::track_session_store_operation;
use crate::models::quiz::QuizSession;

/// Storage for in-flight quiz sessions between requests. Entries expire
/// after the configured TTL; an expired session is simply abandoned.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &QuizSession) -> Result<()>;
    async fn load(&self, session_id: &str) -> Result<Option<QuizSession>>;
    async fn remove(&self, session_id: &str) -> Result<bool>;
    async fn ping(&self) -> Result<()>;
}

fn session_key(session_id: &str) -> String {
    format!("quiz_session:{}", session_id)
}

pub struct RedisSessionStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &QuizSession) -> Result<()> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(session)?;

        track_session_store_operation("setex", async {
            redis::cmd("SETEX")
                .arg(session_key(&session.id))
                .arg(self.ttl_secs)
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await
                .context("Failed to save quiz session to Redis")
        })
        .await
    }

    async fn load(&self, session_id: &str) -> Result<Option<QuizSession>> {
        let mut conn = self.redis.clone();

        let payload: Option<String> = track_session_store_operation("get", async {
            redis::cmd("GET")
                .arg(session_key(session_id))
                .query_async(&mut conn)
                .await
                .context("Failed to read quiz session from Redis")
        })
        .await?;

        payload
            .map(|json| serde_json::from_str(&json).context("Corrupt quiz session payload"))
            .transpose()
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        let mut conn = self.redis.clone();

        let deleted: u64 = track_session_store_operation("del", async {
            redis::cmd("DEL")
                .arg(session_key(session_id))
                .query_async(&mut conn)
                .await
                .context("Failed to delete quiz session from Redis")
        })
        .await?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}

/// In-process store with the same expiry semantics.
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (Instant, QuizSession)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &QuizSession) -> Result<()> {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .write()
            .await
            .insert(session.id.clone(), (expires_at, session.clone()));
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<QuizSession>> {
        let mut entries = self.entries.write().await;
        match entries.get(session_id) {
            None => return Ok(None),
            Some((expires_at, session)) if *expires_at > Instant::now() => {
                return Ok(Some(session.clone()))
            }
            Some(_) => {}
        }
        entries.remove(session_id);
        Ok(None)
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(session_id).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Per-session mutexes so that a read-modify-write of one session never
/// interleaves with another request (or the timer stream) on the same id.
#[derive(Default)]
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Drop locks nobody holds any more.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
