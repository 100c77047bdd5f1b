//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use tycoon_core::OutputSchema;

use crate::client::{classify_status, parse_model_json, ModelClient, ModelError};
use crate::prompt::Prompt;

const SYSTEM_MESSAGE: &str = "You generate content for a phone-manufacturing business game. \
Always answer with JSON only.";

/// Connection settings for the HTTP model client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request transport timeout.
    pub timeout_ms: u64,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "TYCOON_MODEL_API_KEY".to_string(),
            timeout_ms: 30_000,
            temperature: 0.8,
        }
    }
}

impl ModelSettings {
    /// API key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

pub struct HttpModelClient {
    http: reqwest::Client,
    settings: ModelSettings,
    api_key: String,
}

impl HttpModelClient {
    pub fn new(settings: ModelSettings, api_key: String) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    fn request_body(&self, prompt: &Prompt, schema: &OutputSchema) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": prompt.text },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.to_json_schema(),
                },
            },
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value, ModelError> {
        debug!(feature = prompt.feature, model = %self.settings.model, "sending completion request");
        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, schema))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(Duration::from_millis(self.settings.timeout_ms))
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(classify_status(status, &body));
        }

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ModelError::MalformedResponse(format!("unexpected envelope: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::MalformedResponse("empty completion".to_string()))?;
        parse_model_json(&content)
    }
}
