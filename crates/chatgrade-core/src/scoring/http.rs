//! HTTP scoring client for OpenAI-compatible chat-completion services.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::json;
use tracing::{debug, instrument};

use super::parse::{extract_content, parse_scores};
use super::{ScoringClient, ScoringError};
use crate::config::ScoringConfig;
use crate::domain::{EvaluationItem, Scores};

/// Scoring client that posts one chat-completion request per transcript.
pub struct HttpScoringClient {
    config: ScoringConfig,
    http_client: reqwest::Client,
}

impl HttpScoringClient {
    /// Create a new client. The configured timeout bounds every call.
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("chatgrade/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScoringError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self, ScoringError> {
        Self::new(ScoringConfig::from_env())
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Fill the prompt template for one item.
    ///
    /// Slots are filled in one pass; substituted text is never re-scanned.
    pub fn render_prompt(&self, item: &EvaluationItem) -> String {
        let template = &self.config.prompt_template;
        let Some(slots) = prompt_slots() else {
            return template.clone();
        };
        let scenario = item.scenario.as_deref().unwrap_or("unspecified");
        slots
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "transcript" => item.transcript.as_str(),
                "scenario" => scenario,
                _ => self.config.rubric.as_str(),
            })
            .into_owned()
    }

    fn request_body(&self, item: &EvaluationItem) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": self.config.rubric },
                { "role": "user", "content": self.render_prompt(item) },
            ],
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ScoringError {
        if err.is_timeout() {
            ScoringError::Timeout(self.config.timeout)
        } else {
            ScoringError::Transport(err.to_string())
        }
    }
}

fn prompt_slots() -> Option<&'static Regex> {
    static SLOTS: OnceLock<Option<Regex>> = OnceLock::new();
    SLOTS
        .get_or_init(|| Regex::new(r"\{(transcript|scenario|rubric)\}").ok())
        .as_ref()
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub(crate) fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn score(&self, item: &EvaluationItem) -> Result<Scores, ScoringError> {
        let mut request = self
            .http_client
            .post(&self.config.endpoint)
            .json(&self.request_body(item));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let retry_after = retry_after_header(response.headers());
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "scoring response received");

        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
                message: body,
                retry_after,
            });
        }

        let content = extract_content(&body)?;
        parse_scores(&content)
    }
}
