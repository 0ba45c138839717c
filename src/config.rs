//! Configuration management for the Parley gateway
//!
//! All configuration is read from the environment exactly once at startup.
//! Missing required entries prevent startup; nothing is resolved lazily
//! per-session.

use std::collections::HashMap;
use std::time::Duration;

use crate::{Error, Result};

/// Default ceiling on buffered inbound audio per session (10 MiB)
const DEFAULT_MAX_INGEST_BYTES: usize = 10 * 1024 * 1024;

/// Default per-call gateway timeout in seconds
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 60;

/// Parley gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech-to-text gateway settings
    pub stt: SttConfig,

    /// Response generation gateway settings
    pub llm: LlmConfig,

    /// Speech synthesis gateway settings
    pub tts: TtsConfig,

    /// Locale to synthesis voice mapping
    pub voices: VoiceMap,

    /// Per-session resource bounds
    pub limits: Limits,
}

/// Speech-to-text gateway settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// API key for the transcription service
    pub api_key: String,

    /// Transcription model (e.g. "whisper-1")
    pub model: String,

    /// Transcription endpoint URL
    pub endpoint: String,
}

/// Response generation gateway settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the generation service
    pub api_key: String,

    /// Model identifier (e.g. "mistralai/mistral-7b-instruct")
    pub model: String,

    /// Chat completions endpoint URL
    pub endpoint: String,
}

/// Speech synthesis gateway settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// API key for the synthesis service
    pub api_key: String,

    /// WebSocket streaming endpoint URL
    pub stream_endpoint: String,
}

/// Per-session resource bounds
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum buffered inbound audio bytes before the session is aborted
    pub max_ingest_bytes: usize,

    /// Timeout applied to each gateway call and each awaited synthesis chunk
    pub gateway_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_ingest_bytes: DEFAULT_MAX_INGEST_BYTES,
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
        }
    }
}

/// Fixed locale-code to synthesis-voice mapping, read-only after startup
#[derive(Debug, Clone, Default)]
pub struct VoiceMap {
    voices: HashMap<String, String>,
}

impl VoiceMap {
    /// Build a voice map from (locale code, voice id) pairs
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            voices: pairs.into_iter().collect(),
        }
    }

    /// Resolve a locale code to its synthesis voice identifier
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no voice is mapped for the locale.
    /// An unknown locale on an active session is an input-validation failure,
    /// never a panic.
    pub fn resolve(&self, locale: &str) -> Result<&str> {
        self.voices
            .get(locale)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("no synthesis voice configured for locale '{locale}'")))
    }
}

/// Normalize the `lang` query parameter into a locale code for synthesis
///
/// Recognized names follow the original client contract: "english"/"en" and
/// "japanese"/"ja". Anything else passes through lowercased and fails later
/// at voice resolution if unmapped.
#[must_use]
pub fn locale_code(lang: &str) -> String {
    match lang.trim().to_ascii_lowercase().as_str() {
        "japanese" | "ja" | "jp" => "ja".to_string(),
        "english" | "en" | "" => "en".to_string(),
        other => other.to_string(),
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if any required entry is missing, so a misconfigured
    /// process fails at startup rather than per-session.
    pub fn load() -> Result<Self> {
        let stt = SttConfig {
            api_key: require_env("OPENAI_API_KEY")?,
            model: std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string()),
            endpoint: std::env::var("WHISPER_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/audio/transcriptions".to_string()),
        };

        let llm = LlmConfig {
            api_key: require_env("OPENROUTER_API_KEY")?,
            model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "mistralai/mistral-7b-instruct".to_string()),
            endpoint: std::env::var("OPENROUTER_API_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".to_string()),
        };

        let tts = TtsConfig {
            api_key: require_env("RESEMBLE_API_KEY")?,
            stream_endpoint: require_env("RESEMBLE_STREAM_ENDPOINT")?,
        };

        let voices = VoiceMap::new([
            ("en".to_string(), require_env("RESEMBLE_VOICE_UUID_EN")?),
            ("ja".to_string(), require_env("RESEMBLE_VOICE_UUID_JP")?),
        ]);

        let limits = Limits {
            max_ingest_bytes: std::env::var("MAX_INGEST_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_INGEST_BYTES),
            gateway_timeout: Duration::from_secs(
                std::env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            stt,
            llm,
            tts,
            voices,
            limits,
        })
    }
}

/// Read a required environment variable
fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("missing required env var {name}"))),
    }
}
