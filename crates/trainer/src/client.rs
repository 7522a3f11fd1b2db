//! Advice oracle backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AdviceError;

pub const COACH_SYSTEM_PROMPT: &str = "You are a helpful chess coach assistant.";

/// Anything that turns a prompt into free text.
#[async_trait]
pub trait AdviceOracle: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, AdviceError>;

    fn name(&self) -> &'static str;
}

/// Proxy speaking `POST {prompt}` → `{result}`.
pub struct HttpAdviceOracle {
    client: Client,
    url: String,
}

impl HttpAdviceOracle {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AdviceError> {
        let client = Client::builder()
            .user_agent("ChessTrainer/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl AdviceOracle for HttpAdviceOracle {
    async fn ask(&self, prompt: &str) -> Result<String, AdviceError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AdviceError::OracleUnavailable(format!("HTTP {}", resp.status())));
        }

        let body: Value = resp.json().await?;
        if let Some(result) = body.get("result").and_then(|v| v.as_str()) {
            return Ok(result.to_string());
        }
        match body.get("error") {
            Some(err) => Err(AdviceError::OracleUnavailable(err.to_string())),
            None => Err(AdviceError::MalformedResponse("missing `result`".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint (Groq by default).
pub struct ChatCompletionsOracle {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsOracle {
    pub fn new(url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, AdviceError> {
        let client = Client::builder()
            .user_agent("ChessTrainer/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl AdviceOracle for ChatCompletionsOracle {
    async fn ask(&self, prompt: &str) -> Result<String, AdviceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: COACH_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = %status, body = %body, "Chat completions error");
            return Err(AdviceError::OracleUnavailable(format!("HTTP {status}")));
        }

        let body: ChatResponse = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AdviceError::MalformedResponse("empty completion".to_string()))
    }

    fn name(&self) -> &'static str {
        "chat_completions"
    }
}

/// Stand-in when nothing is configured. Every call fails softly.
pub struct DisabledOracle;

#[async_trait]
impl AdviceOracle for DisabledOracle {
    async fn ask(&self, _prompt: &str) -> Result<String, AdviceError> {
        Err(AdviceError::OracleUnavailable("no advice oracle configured".to_string()))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
