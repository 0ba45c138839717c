//! Wire protocol for the duplex conversation connection
//!
//! One connection carries two kinds of traffic: opaque binary audio frames
//! and small type-tagged JSON control messages. The tagged-enum envelope is
//! validated at the transport boundary; unknown inbound tags are ignored for
//! forward compatibility rather than rejected.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Inbound control message from the client
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundControl {
    /// Audio ingestion complete; no payload required
    End,
    /// Any unrecognized tag, ignored by design
    #[serde(other)]
    Unknown,
}

/// Outbound control message to the client
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundControl {
    /// The transcript of what the user said
    UserTranscript { text: String },
    /// The generated reply, sent before its audio starts streaming
    AssistantText { text: String },
    /// Fatal session failure notice, sent once before close
    Error { text: String },
}

/// One received transport message, already split by frame kind
#[derive(Debug)]
pub enum TransportEvent {
    /// Raw binary audio frame
    Audio(Bytes),
    /// Text frame carrying a control payload, not yet parsed
    Text(String),
    /// The peer disconnected or the connection failed
    Closed,
}

/// The duplex frame transport a session reads and writes
///
/// Implemented over an axum WebSocket in production and by a scripted fake in
/// tests. A session owns its transport exclusively for its whole lifetime.
#[async_trait]
pub trait Transport: Send {
    /// Receive the next message, suspending until one arrives
    async fn recv(&mut self) -> TransportEvent;

    /// Send a control message as a text frame
    ///
    /// # Errors
    ///
    /// Returns a transport error if the peer is no longer writable.
    async fn send_control(&mut self, message: &OutboundControl) -> Result<()>;

    /// Send one audio chunk as a binary frame
    ///
    /// # Errors
    ///
    /// Returns a transport error if the peer is no longer writable.
    async fn send_audio(&mut self, chunk: Bytes) -> Result<()>;

    /// Close the connection; idempotence is the caller's responsibility
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_control_deserializes() {
        let msg: InboundControl = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert_eq!(msg, InboundControl::End);
    }

    #[test]
    fn unknown_tag_is_ignored_not_rejected() {
        let msg: InboundControl =
            serde_json::from_str(r#"{"type":"resume","turn":3}"#).unwrap();
        assert_eq!(msg, InboundControl::Unknown);
    }

    #[test]
    fn malformed_control_is_an_error() {
        assert!(serde_json::from_str::<InboundControl>("not json").is_err());
        assert!(serde_json::from_str::<InboundControl>(r#"{"kind":"end"}"#).is_err());
    }

    #[test]
    fn user_transcript_serializes() {
        let msg = OutboundControl::UserTranscript {
            text: "hello there".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"user_transcript\""));
        assert!(json.contains("\"text\":\"hello there\""));
    }

    #[test]
    fn assistant_text_serializes() {
        let msg = OutboundControl::AssistantText {
            text: "hi".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"assistant_text\""));
    }

    #[test]
    fn error_serializes() {
        let msg = OutboundControl::Error {
            text: "transcription failed".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }
}
