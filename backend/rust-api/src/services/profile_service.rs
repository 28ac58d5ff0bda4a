use anyhow::Result;
use std::sync::Arc;

use crate::models::profile::{ProfilePatch, ProfileSettings};
use crate::services::gateway::DataGateway;
use crate::services::question_service::escape_html;

pub struct ProfileService {
    gateway: Arc<dyn DataGateway>,
}

impl ProfileService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self { gateway }
    }

    pub async fn get(&self, user_id: &str) -> Result<ProfileSettings> {
        Ok(self
            .gateway
            .get_profile(user_id)
            .await?
            .and_then(|doc| doc.profile)
            .unwrap_or_default())
    }

    /// Stores the settings with markup neutralized. Practice stats on the
    /// same document are left alone.
    pub async fn update(&self, user_id: &str, settings: ProfileSettings) -> Result<ProfileSettings> {
        let cleaned = ProfileSettings {
            display_name: escape_html(settings.display_name.trim()),
            career_goal: escape_html(settings.career_goal.trim()),
            study_target: settings.study_target,
            bio: escape_html(settings.bio.trim()),
        };

        let doc = self
            .gateway
            .merge_profile(
                user_id,
                ProfilePatch {
                    profile: Some(cleaned),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(user_id, "Profile updated");
        Ok(doc.profile.unwrap_or_default())
    }
}
