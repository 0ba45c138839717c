//! Parley Gateway - streaming voice conversation server
//!
//! A client streams microphone audio over one persistent WebSocket; the
//! gateway transcribes the utterance, generates a spoken-style reply, and
//! streams synthesized speech back as it becomes available.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Client                           │
//! │   mic frames ──▶            ◀── transcript/reply/audio│
//! └──────────────────────┬───────────────────────────────┘
//!                        │ one WebSocket per turn
//! ┌──────────────────────▼───────────────────────────────┐
//! │                 Session Pipeline                      │
//! │   INGEST → TRANSCRIBE → GENERATE → SYNTHESIZE → CLOSE │
//! └──────┬───────────────┬────────────────┬──────────────┘
//!        │               │                │
//! ┌──────▼─────┐  ┌──────▼──────┐  ┌──────▼──────┐
//! │  Whisper   │  │ OpenRouter  │  │  Resemble   │
//! │   (STT)    │  │   (LLM)     │  │ (TTS stream)│
//! └────────────┘  └─────────────┘  └─────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod prompt;
pub mod protocol;
pub mod server;

pub use config::{Config, Limits, VoiceMap};
pub use error::{Error, Result};
pub use gateway::{Gateways, OpenRouterClient, ResembleClient, WhisperClient};
pub use pipeline::{Session, SessionOutcome, SessionState};
pub use protocol::{InboundControl, OutboundControl, Transport, TransportEvent};
pub use server::{AppState, GatewayServer};
