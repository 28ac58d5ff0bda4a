use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::metrics::QUESTION_SOURCE_TOTAL;
use crate::models::activity::{ActivityEntry, ActivityStatus, NetworkEntry, OutboundTarget};
use crate::models::quiz::{
    Question, QuestionSet, QuestionSource, OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ,
};
use crate::models::Subject;
use crate::services::activity_log::{record_event_quietly, record_request_quietly, ActivityLog};
use crate::services::gateway::DataGateway;
use crate::services::question_bank;

pub const GENERATION_FAILED_NOTICE: &str =
    "AI Generation encountered an error. Switched to Offline Question Bank Mode.";
pub const NO_API_KEY_NOTICE: &str =
    "No Global API Key detected. Local Offline Question Bank Mode Active.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    q: String,
    options: Vec<String>,
    a: Value,
}

/// Resolves the question set for a quiz: generated when the service is
/// configured and answers well-formed, the static bank otherwise.
pub struct QuestionService {
    gateway: Arc<dyn DataGateway>,
    activity: Arc<dyn ActivityLog>,
    http: reqwest::Client,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl QuestionService {
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
            api_url: config.question_api_url.trim_end_matches('/').to_string(),
            model: config.question_model.clone(),
            timeout: Duration::from_secs(config.question_timeout_secs),
        }
    }

    pub async fn resolve(&self, subject: Subject, actor: &str) -> QuestionSet {
        let set = match self.api_key().await {
            None => {
                tracing::info!(%subject, "No question service key configured, using static bank");
                question_bank::fallback_set(subject, NO_API_KEY_NOTICE)
            }
            Some(key) => match self.generate(subject, &key).await {
                Ok(questions) => {
                    tracing::info!(%subject, "Generated question set");
                    QuestionSet {
                        questions,
                        source: QuestionSource::Generated,
                        notice: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(%subject, "Question generation failed, using static bank: {:#}", e);
                    record_event_quietly(
                        self.activity.as_ref(),
                        ActivityEntry::new(
                            "QUESTION_FALLBACK",
                            format!("{} assessment served from offline bank: {}", subject, e),
                            ActivityStatus::Warning,
                            actor,
                        ),
                    )
                    .await;
                    question_bank::fallback_set(subject, GENERATION_FAILED_NOTICE)
                }
            },
        };

        QUESTION_SOURCE_TOTAL
            .with_label_values(&[set.source.as_str()])
            .inc();
        set
    }

    async fn api_key(&self) -> Option<String> {
        match self.gateway.get_settings().await {
            Ok(settings) => settings.question_api_key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read global settings: {}", e);
                None
            }
        }
    }

    async fn generate(&self, subject: Subject, key: &str) -> Result<Vec<Question>> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let prompt = format!(
            "Generate exactly {count} multiple choice questions about {subject} for an entry-level \
             software engineering job interview. Return a JSON array containing objects. Each object \
             must have: \"q\" (the question string), \"options\" (array of {options} string options), \
             and \"a\" (integer 0-{max} representing the index of the correct option).",
            count = QUESTIONS_PER_QUIZ,
            subject = subject,
            options = OPTIONS_PER_QUESTION,
            max = OPTIONS_PER_QUESTION - 1,
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "responseMimeType": "application/json"
            }
        });

        let started = Instant::now();
        let result = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = result.as_ref().map(|r| r.status().as_u16()).unwrap_or(0);
        record_request_quietly(
            self.activity.as_ref(),
            NetworkEntry::new(OutboundTarget::QuestionService, &url, "POST", status, elapsed_ms),
        )
        .await;

        let response = result.context("Question service request failed")?;
        if !response.status().is_success() {
            bail!("Question service returned status: {}", response.status());
        }
        let raw = response
            .text()
            .await
            .context("Failed to read question service response")?;
        parse_generated(&raw)
    }
}

/// Unwraps the response envelope and validates the inner question array.
pub fn parse_generated(raw: &str) -> Result<Vec<Question>> {
    let envelope: GenerateResponse =
        serde_json::from_str(raw).context("Malformed response envelope")?;
    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| anyhow!("Invalid response structure"))?;

    let items: Vec<GeneratedQuestion> =
        serde_json::from_str(text.trim()).context("Generated text is not a question array")?;
    if items.len() != QUESTIONS_PER_QUIZ {
        bail!(
            "Expected {} questions, got {}",
            QUESTIONS_PER_QUIZ,
            items.len()
        );
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| validate_question(i, item))
        .collect()
}

fn validate_question(index: usize, item: GeneratedQuestion) -> Result<Question> {
    if item.q.trim().is_empty() {
        bail!("Question {} has no text", index + 1);
    }
    if item.options.len() != OPTIONS_PER_QUESTION {
        bail!(
            "Question {} has {} options",
            index + 1,
            item.options.len()
        );
    }
    let answer = answer_index(&item.a)
        .filter(|a| usize::from(*a) < OPTIONS_PER_QUESTION)
        .ok_or_else(|| anyhow!("Question {} has an invalid answer index", index + 1))?;

    Ok(Question {
        text: escape_html(&item.q),
        options: item.options.iter().map(|o| escape_html(o)).collect(),
        answer,
    })
}

/// Accepts `2` as well as `"2"`.
fn answer_index(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
