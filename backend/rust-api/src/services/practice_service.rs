use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::metrics::PRACTICE_SYNCS_TOTAL;
use crate::models::activity::{ActivityEntry, ActivityStatus, NetworkEntry, OutboundTarget};
use crate::models::practice::{PracticeApiResponse, PracticeStat};
use crate::models::profile::ProfilePatch;
use crate::services::activity_log::{record_event_quietly, record_request_quietly, ActivityLog};
use crate::services::gateway::DataGateway;

const PROFILE_HOSTS: [&str; 4] = [
    "leetcode.com",
    "www.leetcode.com",
    "leetcode.cn",
    "www.leetcode.cn",
];

#[derive(Debug, Error)]
pub enum PracticeSyncError {
    #[error("A username is required")]
    MissingUsername,
    #[error("Sync failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Accepts a bare username or a profile URL on one of the known hosts and
/// returns the username. Slashes never survive.
pub fn normalize_username(input: &str) -> String {
    let input = input.trim();
    let candidate = match Url::parse(input) {
        Ok(url)
            if url
                .host_str()
                .is_some_and(|host| PROFILE_HOSTS.contains(&host)) =>
        {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(|s| s.to_string())
                .unwrap_or_else(|| input.to_string())
        }
        _ => input.to_string(),
    };
    candidate.replace('/', "")
}

pub struct PracticeService {
    gateway: Arc<dyn DataGateway>,
    activity: Arc<dyn ActivityLog>,
    http: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl PracticeService {
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        activity: Arc<dyn ActivityLog>,
        http: reqwest::Client,
        config: &Config,
    ) -> Self {
        Self {
            gateway,
            activity,
            http,
            api_url: config.practice_api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.practice_timeout_secs),
        }
    }

    pub async fn current(&self, user_id: &str) -> anyhow::Result<Option<PracticeStat>> {
        Ok(self
            .gateway
            .get_profile(user_id)
            .await?
            .and_then(|doc| doc.leetcode))
    }

    /// Fetches fresh counts and merges them into the user's document.
    pub async fn sync(
        &self,
        user_id: &str,
        actor: &str,
        raw_username: &str,
    ) -> Result<PracticeStat, PracticeSyncError> {
        let username = normalize_username(raw_username);
        if username.is_empty() {
            return Err(PracticeSyncError::MissingUsername);
        }

        let stat = match self.fetch(&username).await {
            Ok(stat) => stat,
            Err(reason) => {
                PRACTICE_SYNCS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(user_id, %username, "Practice sync failed: {}", reason);
                record_event_quietly(
                    self.activity.as_ref(),
                    ActivityEntry::new(
                        "PRACTICE_SYNC_FAILED",
                        format!("Sync for {} failed: {}", username, reason),
                        ActivityStatus::Error,
                        actor,
                    ),
                )
                .await;
                return Err(PracticeSyncError::Upstream(reason));
            }
        };

        self.gateway
            .merge_profile(
                user_id,
                ProfilePatch {
                    leetcode: Some(stat.clone()),
                    ..Default::default()
                },
            )
            .await
            .map_err(anyhow::Error::from)?;

        PRACTICE_SYNCS_TOTAL.with_label_values(&["success"]).inc();
        record_event_quietly(
            self.activity.as_ref(),
            ActivityEntry::new(
                "PRACTICE_SYNC",
                format!("Synced {} ({} solved)", username, stat.total),
                ActivityStatus::Success,
                actor,
            ),
        )
        .await;
        tracing::info!(user_id, %username, total = stat.total, "Practice stats synced");
        Ok(stat)
    }

    /// Errors are user-facing reasons.
    async fn fetch(&self, username: &str) -> Result<PracticeStat, String> {
        let url = format!("{}/{}", self.api_url, username);

        let started = Instant::now();
        let result = self.http.get(&url).timeout(self.timeout).send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = result.as_ref().map(|r| r.status().as_u16()).unwrap_or(0);
        record_request_quietly(
            self.activity.as_ref(),
            NetworkEntry::new(OutboundTarget::PracticeApi, &url, "GET", status, elapsed_ms),
        )
        .await;

        let response = result.map_err(|e| {
            if e.is_timeout() {
                "The practice API timed out.".to_string()
            } else {
                "Failed to fetch data. The API might be down.".to_string()
            }
        })?;
        if !response.status().is_success() {
            return Err("Failed to fetch data. The API might be down.".to_string());
        }

        let body: PracticeApiResponse = response
            .json()
            .await
            .map_err(|_| "Unexpected response from the practice API.".to_string())?;

        stat_from_response(username, body)
    }
}

pub fn stat_from_response(username: &str, body: PracticeApiResponse) -> Result<PracticeStat, String> {
    if let Some(first) = body.errors.first() {
        return Err(first
            .message
            .clone()
            .unwrap_or_else(|| "Invalid username.".to_string()));
    }
    let total = body
        .total_solved
        .ok_or_else(|| "Could not fetch data. Username might be invalid.".to_string())?;

    Ok(PracticeStat {
        username: username.to_string(),
        total,
        easy: body.easy_solved.unwrap_or(0),
        medium: body.medium_solved.unwrap_or(0),
        hard: body.hard_solved.unwrap_or(0),
        last_synced: Some(Utc::now()),
    })
}
