//! Speech synthesis gateway client (Resemble streaming WebSocket protocol)
//!
//! One synthesis call opens one WebSocket to the stream endpoint, sends a
//! single JSON request, and then consumes interleaved frames: binary frames
//! are audio chunks, text frames are JSON metadata. The stream ends with an
//! explicit `audio_end` marker; an `error` marker or an abnormal close is a
//! synthesis failure.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use crate::config::TtsConfig;
use crate::gateway::{AudioChunkStream, SpeechSynthesizer};
use crate::{Error, Result};

/// Synthesis request sent as the first frame
#[derive(Serialize)]
struct SynthesisRequest<'a> {
    voice_uuid: &'a str,
    data: &'a str,
    binary_response: bool,
    output_format: &'a str,
    sample_rate: u32,
    precision: &'a str,
    language: &'a str,
}

/// Metadata frame interleaved with binary audio
#[derive(Deserialize)]
struct StreamMeta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

/// Streams synthesized speech from a Resemble-style WebSocket endpoint
pub struct ResembleClient {
    api_key: String,
    stream_endpoint: String,
}

impl ResembleClient {
    /// Create a new synthesis client
    ///
    /// # Errors
    ///
    /// Returns error if the API key or stream endpoint is missing
    pub fn new(config: &TtsConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.stream_endpoint.is_empty() {
            return Err(Error::Config(
                "Resemble API key and stream endpoint required".to_string(),
            ));
        }

        Ok(Self {
            api_key: config.api_key.clone(),
            stream_endpoint: config.stream_endpoint.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ResembleClient {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        locale: &str,
    ) -> Result<AudioChunkStream> {
        let mut request = self
            .stream_endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Synthesis(format!("invalid stream endpoint: {e}")))?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Token {}", self.api_key))
                .map_err(|e| Error::Synthesis(format!("invalid API key header: {e}")))?,
        );

        let (mut ws, _) = connect_async(request)
            .await
            .map_err(|e| Error::Synthesis(format!("failed to connect: {e}")))?;

        let body = serde_json::to_string(&SynthesisRequest {
            voice_uuid: voice_id,
            data: text,
            binary_response: true,
            output_format: "mp3",
            sample_rate: 48_000,
            precision: "PCM_16",
            language: locale,
        })?;

        ws.send(Message::Text(body.into()))
            .await
            .map_err(|e| Error::Synthesis(format!("failed to send request: {e}")))?;

        tracing::debug!(voice_id, locale, "synthesis stream opened");

        // Lazy pull-based stream: the socket lives inside the unfold state and
        // is dropped when the caller drops the stream, closing the connection.
        let stream = futures::stream::unfold(Some(ws), |state| async move {
            let mut ws = state?;
            loop {
                match ws.next().await {
                    Some(Ok(Message::Binary(chunk))) => {
                        return Some((Ok(chunk), Some(ws)));
                    }
                    Some(Ok(Message::Text(meta))) => {
                        match serde_json::from_str::<StreamMeta>(meta.as_str()) {
                            Ok(meta) if meta.kind == "audio_end" => return None,
                            Ok(meta) if meta.kind == "error" => {
                                let reason = meta.message.unwrap_or_else(|| {
                                    "unspecified synthesis error".to_string()
                                });
                                return Some((Err(Error::Synthesis(reason)), None));
                            }
                            // Other metadata frames carry nothing we act on
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        return Some((
                            Err(Error::Synthesis(
                                "stream closed before audio_end".to_string(),
                            )),
                            None,
                        ));
                    }
                    Some(Err(e)) => {
                        return Some((Err(Error::Synthesis(e.to_string())), None));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_request_serializes_wire_shape() {
        let body = serde_json::to_string(&SynthesisRequest {
            voice_uuid: "voice-1",
            data: "<speak>hi</speak>",
            binary_response: true,
            output_format: "mp3",
            sample_rate: 48_000,
            precision: "PCM_16",
            language: "en",
        })
        .unwrap();
        assert!(body.contains("\"voice_uuid\":\"voice-1\""));
        assert!(body.contains("\"binary_response\":true"));
        assert!(body.contains("\"language\":\"en\""));
    }

    #[test]
    fn audio_end_meta_parses() {
        let meta: StreamMeta = serde_json::from_str(r#"{"type":"audio_end"}"#).unwrap();
        assert_eq!(meta.kind, "audio_end");
        assert!(meta.message.is_none());
    }

    #[test]
    fn error_meta_carries_message() {
        let meta: StreamMeta =
            serde_json::from_str(r#"{"type":"error","message":"voice not found"}"#).unwrap();
        assert_eq!(meta.kind, "error");
        assert_eq!(meta.message.as_deref(), Some("voice not found"));
    }
}
