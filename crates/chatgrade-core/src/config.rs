//! Runtime configuration for the scoring client and the batch orchestrator.
//!
//! Both configs have code defaults and a `from_env()` constructor that
//! overrides individual values from `CHATGRADE_*` variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default chat-completions endpoint of the scoring service.
pub const DEFAULT_SCORING_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default prompt. `{transcript}`, `{scenario}` and `{rubric}` are substituted.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Evaluate the following customer-service conversation.\n\
Scenario: {scenario}\n\n\
Conversation:\n{transcript}\n\n\
Respond with only a JSON object of the form \
{\"coherence\": 1-5, \"politeness\": 1-5, \"relevance\": 1-5, \"resolution\": 0 or 1}.";

/// Default rubric sent as the system message.
pub const DEFAULT_RUBRIC: &str = "You grade customer-service agents. \
Coherence: is the agent's reasoning clear and consistent (1-5). \
Politeness: is the agent courteous and professional (1-5). \
Relevance: do the agent's replies address the customer's request (1-5). \
Resolution: was the customer's issue resolved by the end of the conversation (1) or not (0).";

/// Read and parse an environment variable, ignoring (with a warning) values
/// that do not parse.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

/// Connection and prompt settings for the remote scoring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Bearer token (optional for local/self-hosted services)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Prompt template with `{transcript}`, `{scenario}`, `{rubric}` slots
    pub prompt_template: String,
    /// Rubric text
    pub rubric: String,
    /// Upper bound on a single scoring call
    pub timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SCORING_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            rubric: DEFAULT_RUBRIC.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ScoringConfig {
    /// Create config from environment variables
    ///
    /// Reads:
    /// - CHATGRADE_SCORING_URL
    /// - CHATGRADE_API_KEY
    /// - CHATGRADE_MODEL
    /// - CHATGRADE_PROMPT_TEMPLATE
    /// - CHATGRADE_RUBRIC
    /// - CHATGRADE_TIMEOUT_SECS
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("CHATGRADE_SCORING_URL").unwrap_or(defaults.endpoint),
            api_key: std::env::var("CHATGRADE_API_KEY").ok(),
            model: std::env::var("CHATGRADE_MODEL").unwrap_or(defaults.model),
            prompt_template: std::env::var("CHATGRADE_PROMPT_TEMPLATE")
                .unwrap_or(defaults.prompt_template),
            rubric: std::env::var("CHATGRADE_RUBRIC").unwrap_or(defaults.rubric),
            timeout: env_parse::<u64>("CHATGRADE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Tunables of the batch pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Maximum admissions per sliding window
    pub rate_capacity: usize,
    /// Sliding window length
    pub rate_window: Duration,
    /// Extra delay added when waiting for the window to open
    pub admission_buffer: Duration,
    /// Wait used when a throttling response carries no hint
    pub default_throttle_wait: Duration,
    /// Extra delay added to every throttle wait
    pub throttle_buffer: Duration,
    /// Longest server-advised wait honoured before a retry
    pub max_throttle_wait: Duration,
    /// Pause after a terminal (non-throttling) remote failure
    pub failure_cooldown: Duration,
    /// Upper bound between pause re-checks
    pub pause_poll_interval: Duration,
    /// Minimum wall time between ETA recomputations
    pub eta_refresh_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rate_capacity: 30,
            rate_window: Duration::from_secs(60),
            admission_buffer: Duration::from_millis(100),
            default_throttle_wait: Duration::from_secs(60),
            throttle_buffer: Duration::from_millis(500),
            max_throttle_wait: Duration::from_secs(15 * 60),
            failure_cooldown: Duration::from_secs(2),
            pause_poll_interval: Duration::from_millis(500),
            eta_refresh_interval: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables
    ///
    /// Reads:
    /// - CHATGRADE_RATE_LIMIT (calls per window)
    /// - CHATGRADE_THROTTLE_WAIT_SECS
    /// - CHATGRADE_FAILURE_COOLDOWN_MS
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_capacity: env_parse::<usize>("CHATGRADE_RATE_LIMIT")
                .filter(|c| *c > 0)
                .unwrap_or(defaults.rate_capacity),
            default_throttle_wait: env_parse::<u64>("CHATGRADE_THROTTLE_WAIT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_throttle_wait),
            failure_cooldown: env_parse::<u64>("CHATGRADE_FAILURE_COOLDOWN_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.failure_cooldown),
            ..defaults
        }
    }

    pub fn with_rate_capacity(mut self, capacity: usize) -> Self {
        self.rate_capacity = capacity.max(1);
        self
    }
}
