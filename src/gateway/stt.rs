//! Speech-to-text gateway client (OpenAI Whisper transcription API)

use async_trait::async_trait;

use crate::config::SttConfig;
use crate::gateway::SpeechToText;
use crate::{Error, Result};

/// Response envelope from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes a complete audio payload via the Whisper HTTP API
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl WhisperClient {
    /// Create a new Whisper client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &SttConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
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
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        // The inbound mic payload is a browser-recorded WebM container
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.webm")
                    .mime_str("audio/webm")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::Transcription(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received transcription response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            Error::Transcription(e.to_string())
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}
