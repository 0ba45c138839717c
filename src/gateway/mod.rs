//! External gateway contracts for the conversation pipeline
//!
//! The three collaborators are black boxes behind narrow call contracts. The
//! concrete clients are constructed once at process start and injected into
//! the connection endpoint; nothing here is a lazily-initialized singleton.

pub mod llm;
pub mod stt;
pub mod tts;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::Result;

pub use llm::OpenRouterClient;
pub use stt::WhisperClient;
pub use tts::ResembleClient;

/// A lazy, finite, non-restartable sequence of synthesized audio chunks
///
/// Yields chunks in synthesis order until the gateway signals end-of-stream
/// (the stream ends) or an error item surfaces a [`crate::Error::Synthesis`].
pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Speech-to-Text gateway: one finite audio payload in, one transcript out
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a complete audio payload
    ///
    /// Takes the payload by value so its backing storage is released when the
    /// call returns, success or failure alike.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transcription`] on unreadable input or
    /// service unavailability.
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String>;
}

/// Response Generation gateway: one prompt in, one reply out
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply for a single self-contained prompt
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Generation`] on service error or a malformed
    /// response envelope.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Speech Synthesis gateway: text in, ordered lazy audio chunk stream out
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Open one streaming synthesis call for the resolved voice and locale
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if the stream cannot be opened;
    /// mid-stream failures arrive as error items on the returned stream.
    async fn synthesize(&self, text: &str, voice_id: &str, locale: &str)
    -> Result<AudioChunkStream>;
}

/// The injected gateway bundle shared by all sessions
#[derive(Clone)]
pub struct Gateways {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn ResponseGenerator>,
    pub tts: Arc<dyn SpeechSynthesizer>,
}
