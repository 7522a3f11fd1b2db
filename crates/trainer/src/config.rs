use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{AdviceOracle, ChatCompletionsOracle, DisabledOracle, HttpAdviceOracle};
use crate::error::AdviceError;

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    /// Proxy endpoint taking `{prompt}` and answering `{result}`.
    pub oracle_url: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub groq_model: String,
    /// Bound on a single oracle call.
    pub advice_timeout: Duration,
    /// Pause before the opponent replies.
    pub opponent_delay: Duration,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            oracle_url: None,
            groq_api_key: None,
            groq_api_url: DEFAULT_GROQ_API_URL.to_string(),
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            advice_timeout: Duration::from_secs(8),
            opponent_delay: Duration::from_millis(500),
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            oracle_url: env::var("ADVICE_ORACLE_URL").ok().filter(|v| !v.is_empty()),
            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|v| !v.is_empty()),
            groq_api_url: env::var("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            groq_model: env::var("GROQ_MODEL").unwrap_or(defaults.groq_model),
            advice_timeout: env::var("ADVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.advice_timeout),
            opponent_delay: env::var("OPPONENT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.opponent_delay),
        }
    }

    /// Proxy URL wins over a direct API key; with neither, advice is off and
    /// every suggestion comes from the heuristic.
    pub fn build_oracle(&self) -> Result<Arc<dyn AdviceOracle>, AdviceError> {
        if let Some(url) = &self.oracle_url {
            tracing::info!(url = %url, "Using HTTP advice oracle");
            return Ok(Arc::new(HttpAdviceOracle::new(url, self.advice_timeout)?));
        }
        if let Some(key) = &self.groq_api_key {
            tracing::info!(model = %self.groq_model, "Using chat-completions advice oracle");
            return Ok(Arc::new(ChatCompletionsOracle::new(
                &self.groq_api_url,
                key,
                &self.groq_model,
                self.advice_timeout,
            )?));
        }
        tracing::info!("No advice oracle configured - heuristic suggestions only");
        Ok(Arc::new(DisabledOracle))
    }

    /// The chat-completions backend alone, for the raw ask-ai proxy route.
    pub fn chat_oracle(&self) -> Result<Option<ChatCompletionsOracle>, AdviceError> {
        self.groq_api_key
            .as_deref()
            .map(|key| {
                ChatCompletionsOracle::new(
                    &self.groq_api_url,
                    key,
                    &self.groq_model,
                    self.advice_timeout,
                )
            })
            .transpose()
    }
}
