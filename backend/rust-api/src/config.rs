use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub question_api_url: String,
    pub question_model: String,
    pub question_timeout_secs: u64,
    pub practice_api_url: String,
    pub practice_timeout_secs: u64,
    pub quiz_duration_secs: u32,
    pub session_ttl_secs: u64,
    /// `user:password` for Basic auth on `/metrics`; unset disables the endpoint.
    pub metrics_auth: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            mongo_database: "sentinel_prep".to_string(),
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            question_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            question_model: "gemini-flash-latest".to_string(),
            question_timeout_secs: 15,
            practice_api_url: "https://leetcode-api-faisalshohag.vercel.app".to_string(),
            practice_timeout_secs: 10,
            quiz_duration_secs: 300,
            session_ttl_secs: 900,
            metrics_auth: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| match env::var("REDIS_PASSWORD") {
                Ok(password) => {
                    let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                    let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                    format!("redis://:{}@{}:{}/0", password, host, port)
                }
                Err(_) => defaults.redis_uri,
            });

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if env == "prod" => {
                return Err(config::ConfigError::NotFound(
                    "JWT_SECRET must be set in production".to_string(),
                ));
            }
            Err(_) => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                defaults.jwt_secret
            }
        };

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let question_api_url = settings
            .get_string("questions.api_url")
            .or_else(|_| env::var("QUESTION_API_URL"))
            .unwrap_or(defaults.question_api_url);

        let question_model = settings
            .get_string("questions.model")
            .or_else(|_| env::var("QUESTION_MODEL"))
            .unwrap_or(defaults.question_model);

        let question_timeout_secs = settings
            .get_int("questions.timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.question_timeout_secs);

        let practice_api_url = settings
            .get_string("practice.api_url")
            .or_else(|_| env::var("PRACTICE_API_URL"))
            .unwrap_or(defaults.practice_api_url);

        let practice_timeout_secs = settings
            .get_int("practice.timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.practice_timeout_secs);

        let quiz_duration_secs = settings
            .get_int("quiz.duration_secs")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.quiz_duration_secs);

        // Sessions must outlive the quiz clock, otherwise auto-submit never happens
        let session_ttl_secs = settings
            .get_int("quiz.session_ttl_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(defaults.session_ttl_secs)
            .max(u64::from(quiz_duration_secs) + 60);

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .ok()
            .filter(|v| v.contains(':'));

        Ok(Config {
            mongo_uri,
            redis_uri,
            mongo_database,
            jwt_secret,
            bind_addr,
            question_api_url,
            question_model,
            question_timeout_secs,
            practice_api_url,
            practice_timeout_secs,
            quiz_duration_secs,
            session_ttl_secs,
            metrics_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_ttl_outlives_quiz_clock() {
        let config = Config::default();
        assert!(config.session_ttl_secs > u64::from(config.quiz_duration_secs));
        assert_eq!(config.quiz_duration_secs, 300);
    }
}
