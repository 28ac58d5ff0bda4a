use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::models::activity::{ActivityEntry, ActivityStatus};
use crate::models::settings::{GlobalSettings, SettingsResponse, UpdateSettingsRequest};
use crate::services::activity_log::{record_event_quietly, ActivityLog};
use crate::services::gateway::DataGateway;

pub struct SettingsService {
    gateway: Arc<dyn DataGateway>,
    activity: Arc<dyn ActivityLog>,
}

impl SettingsService {
    pub fn new(gateway: Arc<dyn DataGateway>, activity: Arc<dyn ActivityLog>) -> Self {
        Self { gateway, activity }
    }

    pub async fn get(&self) -> Result<SettingsResponse> {
        let settings = self
            .gateway
            .get_settings()
            .await
            .context("Failed to load global settings")?;
        Ok(SettingsResponse::from(&settings))
    }

    pub async fn update(&self, req: UpdateSettingsRequest, actor: &str) -> Result<SettingsResponse> {
        let key = req.question_api_key.trim();
        let settings = GlobalSettings {
            question_api_key: (!key.is_empty()).then(|| key.to_string()),
            updated_at: Some(Utc::now()),
            updated_by: Some(actor.to_string()),
        };

        self.gateway
            .put_settings(&settings)
            .await
            .context("Failed to save global settings")?;

        let description = if settings.question_api_key.is_some() {
            "Question service key updated"
        } else {
            "Question service key cleared"
        };
        record_event_quietly(
            self.activity.as_ref(),
            ActivityEntry::new("SETTINGS_UPDATE", description, ActivityStatus::Warning, actor),
        )
        .await;
        tracing::info!(actor, "{}", description);

        Ok(SettingsResponse::from(&settings))
    }
}
