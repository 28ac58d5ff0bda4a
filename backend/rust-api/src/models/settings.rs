use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton configuration edited from the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GlobalSettings {
    pub question_api_key: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Empty string clears the key.
    pub question_api_key: String,
}

/// What the admin panel gets back. The key itself never leaves the server.
#[derive(Debug, Serialize, PartialEq)]
pub struct SettingsResponse {
    pub question_api_key_configured: bool,
    pub question_api_key_hint: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl From<&GlobalSettings> for SettingsResponse {
    fn from(settings: &GlobalSettings) -> Self {
        let key = settings
            .question_api_key
            .as_deref()
            .filter(|k| !k.is_empty());
        Self {
            question_api_key_configured: key.is_some(),
            question_api_key_hint: key.map(mask_key),
            updated_at: settings.updated_at,
            updated_by: settings.updated_by.clone(),
        }
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
