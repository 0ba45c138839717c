//! Shared test doubles: scripted transport and canned gateways

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parley_gateway::gateway::{
    AudioChunkStream, Gateways, ResponseGenerator, SpeechSynthesizer, SpeechToText,
};
use parley_gateway::{
    Error, Limits, OutboundControl, Result, Transport, TransportEvent, VoiceMap,
};

/// One frame recorded on the outbound side of the fake transport
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Control(OutboundControl),
    Audio(Vec<u8>),
}

/// Scripted transport: replays a fixed inbound sequence, records what is sent
pub struct FakeTransport {
    inbound: VecDeque<TransportEvent>,
    sent: Arc<Mutex<Vec<Sent>>>,
    close_count: Arc<Mutex<usize>>,
    fail_audio_sends: bool,
}

impl FakeTransport {
    pub fn new(inbound: Vec<TransportEvent>) -> Self {
        Self {
            inbound: inbound.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            close_count: Arc::new(Mutex::new(0)),
            fail_audio_sends: false,
        }
    }

    /// Make every audio send fail, simulating a peer that stopped reading
    pub fn failing_audio_sends(mut self) -> Self {
        self.fail_audio_sends = true;
        self
    }

    /// Handle to the outbound recording, valid after the session consumed us
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<Sent>>> {
        Arc::clone(&self.sent)
    }

    /// Handle to the close counter
    pub fn close_handle(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.close_count)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn recv(&mut self) -> TransportEvent {
        // An exhausted script reads as a peer disconnect
        self.inbound.pop_front().unwrap_or(TransportEvent::Closed)
    }

    async fn send_control(&mut self, message: &OutboundControl) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Control(message.clone()));
        Ok(())
    }

    async fn send_audio(&mut self, chunk: Bytes) -> Result<()> {
        if self.fail_audio_sends {
            return Err(Error::Transport("peer gone".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Audio(chunk.to_vec()));
        Ok(())
    }

    async fn close(&mut self) {
        *self.close_count.lock().unwrap() += 1;
    }
}

/// STT double returning a fixed transcript or failure
pub struct FakeStt {
    outcome: std::result::Result<String, String>,
}

impl FakeStt {
    pub fn transcript(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
        }
    }
}

#[async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String> {
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(Error::Transcription(reason.clone())),
        }
    }
}

/// STT double that never resolves, for timeout coverage
pub struct HangingStt;

#[async_trait]
impl SpeechToText for HangingStt {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String> {
        futures::future::pending().await
    }
}

/// LLM double returning a fixed reply or failure, recording every prompt
pub struct FakeLlm {
    outcome: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeLlm {
    pub fn reply(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl ResponseGenerator for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(Error::Generation(reason.clone())),
        }
    }
}

/// TTS double yielding canned chunks, optionally ending with an error item
pub struct FakeTts {
    chunks: Vec<Vec<u8>>,
    mid_stream_error: Option<String>,
    calls: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl FakeTts {
    pub fn chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            mid_stream_error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Yield the chunks, then surface a mid-stream error signal
    pub fn erroring_after(chunks: Vec<Vec<u8>>, reason: &str) -> Self {
        Self {
            chunks,
            mid_stream_error: Some(reason.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// (text, voice_id, locale) tuples for every synthesis call
    pub fn calls_handle(&self) -> Arc<Mutex<Vec<(String, String, String)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        locale: &str,
    ) -> Result<AudioChunkStream> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string(), locale.to_string()));

        let mut items: Vec<Result<Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        if let Some(reason) = &self.mid_stream_error {
            items.push(Err(Error::Synthesis(reason.clone())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Gateway bundle with a working STT/LLM/TTS happy path
pub fn happy_gateways() -> Gateways {
    Gateways {
        stt: Arc::new(FakeStt::transcript("what is rust")),
        llm: Arc::new(FakeLlm::reply("<speak>Rust is a systems language.</speak>")),
        tts: Arc::new(FakeTts::chunks(vec![vec![1, 2, 3], vec![4, 5]])),
    }
}

/// Voice map covering the two shipped locales
pub fn test_voices() -> VoiceMap {
    VoiceMap::new([
        ("en".to_string(), "voice-en".to_string()),
        ("ja".to_string(), "voice-ja".to_string()),
    ])
}

/// Limits generous enough for the fakes
pub fn test_limits() -> Limits {
    Limits {
        max_ingest_bytes: 1024,
        gateway_timeout: Duration::from_secs(5),
    }
}

/// The standard inbound script: two audio frames then the end signal
pub fn inbound_with_end() -> Vec<TransportEvent> {
    vec![
        TransportEvent::Audio(Bytes::from_static(b"frame-one")),
        TransportEvent::Audio(Bytes::from_static(b"frame-two")),
        TransportEvent::Text(r#"{"type":"end"}"#.to_string()),
    ]
}
