//! Error types for the Parley gateway

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Parley gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text gateway failure
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Response generation gateway failure
    #[error("generation failed: {0}")]
    Generation(String),

    /// Speech synthesis gateway failure
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Client transport failure (send/receive on the duplex connection)
    #[error("transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
