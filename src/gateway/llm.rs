//! Response generation gateway client (OpenRouter chat completions)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::gateway::ResponseGenerator;
use crate::{Error, Result};

/// Chat completions request body
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completions response envelope
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Generates one reply per prompt via the OpenRouter chat completions API
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("OpenRouter API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ResponseGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "calling generation gateway");

        let request = ChatRequest {
            model: &self.model,
            stream: false,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", "Parley-Gateway")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "generation request failed");
                Error::Generation(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "generation API error");
            return Err(Error::Generation(format!(
                "OpenRouter API error {status}: {body}"
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse generation response");
            Error::Generation(e.to_string())
        })?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::Generation("response envelope missing choices".to_string()))?;

        tracing::info!(reply_chars = reply.len(), "generation complete");
        Ok(reply)
    }
}
