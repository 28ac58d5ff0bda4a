use serde::{Deserialize, Serialize};
use validator::Validate;

use super::PracticeStat;

/// The per-user document. Fields are merged independently, a practice
/// sync never overwrites profile settings and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserDocument {
    pub user_id: String,
    pub profile: Option<ProfileSettings>,
    pub leetcode: Option<PracticeStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct ProfileSettings {
    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    #[serde(default)]
    pub display_name: String,
    #[validate(length(max = 200, message = "Career goal must be at most 200 characters"))]
    #[serde(default)]
    pub career_goal: String,
    #[serde(default)]
    pub study_target: u32,
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    #[serde(default)]
    pub bio: String,
}

/// Partial write for [`UserDocument`]; `None` leaves the stored field alone.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub profile: Option<ProfileSettings>,
    pub leetcode: Option<PracticeStat>,
}

impl UserDocument {
    pub fn merge(&mut self, patch: ProfilePatch) {
        if let Some(profile) = patch.profile {
            self.profile = Some(profile);
        }
        if let Some(stat) = patch.leetcode {
            self.leetcode = Some(stat);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub profile: ProfileSettings,
}
