//! Per-session conversation pipeline
//!
//! One session owns one conversation turn end-to-end: ingest the caller's
//! audio, transcribe it, generate a reply, synthesize speech, and stream it
//! back, then close the connection exactly once. Stages run strictly in
//! order with no intra-session parallelism; the session suspends at every
//! I/O boundary so other sessions keep making progress.

use std::sync::Arc;

use futures::StreamExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Limits, VoiceMap, locale_code};
use crate::gateway::Gateways;
use crate::prompt;
use crate::protocol::{InboundControl, OutboundControl, Transport, TransportEvent};
use crate::{Error, Result};

/// Substituted transcript when speech produced no recognizable words
pub const UNRECOGNIZED_SPEECH_TEXT: &str =
    "Sorry, I couldn't make out any words. Could you say that again?";

/// Fallback reply when the generation gateway fails; the turn still completes
pub const GENERATION_FALLBACK_TEXT: &str = "Sorry, something went wrong.";

/// Pipeline stage, strictly ordered, no backward transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Ingesting,
    Transcribing,
    Generating,
    Synthesizing,
    /// Terminal: the turn completed and the connection was closed
    Closed,
    /// Terminal: the session was abandoned or failed; connection closed
    Errored,
}

/// How a session ended, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Full turn delivered: transcript, reply, and audio stream
    Completed,
    /// The caller disconnected before completion; silent close, no notice
    Abandoned,
    /// Fatal stage failure; one `error` notice sent if still writable
    Failed,
}

/// How the ingestion loop ended
enum Ingested {
    Complete(Vec<u8>),
    Abandoned,
    Overflow,
}

/// One conversation turn bound to one duplex connection
pub struct Session<T: Transport> {
    id: Uuid,
    transport: T,
    gateways: Gateways,
    voices: VoiceMap,
    locale: String,
    limits: Limits,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    /// Bind a new session to an accepted connection
    #[must_use]
    pub fn new(
        transport: T,
        lang: &str,
        gateways: Gateways,
        voices: VoiceMap,
        limits: Limits,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            gateways,
            voices,
            locale: locale_code(lang),
            limits,
            state: SessionState::Accepted,
        }
    }

    /// Session identifier, for log correlation
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current pipeline stage
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the state machine to completion or failure
    ///
    /// The connection is closed exactly once on entry to a terminal state,
    /// whatever the outcome.
    pub async fn run(&mut self) -> SessionOutcome {
        let span = tracing::info_span!("session", id = %self.id, locale = %self.locale);
        let outcome = self.drive().instrument(span).await;

        self.state = match outcome {
            SessionOutcome::Completed => SessionState::Closed,
            SessionOutcome::Abandoned | SessionOutcome::Failed => SessionState::Errored,
        };
        self.transport.close().await;

        match outcome {
            SessionOutcome::Completed => tracing::info!(id = %self.id, "session completed"),
            SessionOutcome::Abandoned => tracing::info!(id = %self.id, "session abandoned by caller"),
            SessionOutcome::Failed => tracing::warn!(id = %self.id, "session failed"),
        }
        outcome
    }

    /// Advance through the stages; terminal handling stays in `run`
    async fn drive(&mut self) -> SessionOutcome {
        // INGESTING: assemble the complete utterance before anything else
        self.state = SessionState::Ingesting;
        let audio = match self.ingest().await {
            Ingested::Complete(audio) => audio,
            Ingested::Abandoned => return SessionOutcome::Abandoned,
            Ingested::Overflow => {
                return self
                    .fail(&Error::Transport(format!(
                        "audio payload exceeded {} bytes",
                        self.limits.max_ingest_bytes
                    )))
                    .await;
            }
        };

        // TRANSCRIBING: the audio buffer moves into the gateway call and is
        // released on every exit path
        self.state = SessionState::Transcribing;
        let transcript = match self.transcribe(audio).await {
            Ok(text) => text,
            Err(e) => return self.fail(&e).await,
        };
        let notice = OutboundControl::UserTranscript {
            text: transcript.clone(),
        };
        if self.transport.send_control(&notice).await.is_err() {
            return SessionOutcome::Abandoned;
        }

        // GENERATING: failures are absorbed; the caller always gets a reply
        // once their speech was understood
        self.state = SessionState::Generating;
        let reply = self.generate(&transcript).await;
        let notice = OutboundControl::AssistantText {
            text: reply.clone(),
        };
        if self.transport.send_control(&notice).await.is_err() {
            return SessionOutcome::Abandoned;
        }

        // SYNTHESIZING: forward chunks as they arrive, never buffered
        self.state = SessionState::Synthesizing;
        self.synthesize(&reply).await
    }

    /// Receive binary frames until the `end` control message
    async fn ingest(&mut self) -> Ingested {
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match self.transport.recv().await {
                TransportEvent::Audio(frame) => {
                    if buffer.len() + frame.len() > self.limits.max_ingest_bytes {
                        tracing::warn!(
                            buffered = buffer.len(),
                            frame = frame.len(),
                            "inbound audio exceeded ingest limit"
                        );
                        return Ingested::Overflow;
                    }
                    buffer.extend_from_slice(&frame);
                }
                TransportEvent::Text(text) => match serde_json::from_str::<InboundControl>(&text) {
                    Ok(InboundControl::End) => {
                        tracing::debug!(bytes = buffer.len(), "audio ingestion complete");
                        return Ingested::Complete(buffer);
                    }
                    Ok(InboundControl::Unknown) => {
                        tracing::debug!("ignoring unrecognized control message");
                    }
                    // Malformed control payloads are treated as disconnects:
                    // terminate cleanly rather than fault back to the caller
                    Err(e) => {
                        tracing::debug!(error = %e, "malformed control payload, closing");
                        return Ingested::Abandoned;
                    }
                },
                TransportEvent::Closed => {
                    tracing::debug!("caller disconnected during ingestion");
                    return Ingested::Abandoned;
                }
            }
        }
    }

    /// Call the speech-to-text gateway; empty speech becomes the fixed apology
    async fn transcribe(&mut self, audio: Vec<u8>) -> Result<String> {
        if audio.is_empty() {
            tracing::debug!("empty audio payload, substituting apology transcript");
            return Ok(UNRECOGNIZED_SPEECH_TEXT.to_string());
        }

        let stt = Arc::clone(&self.gateways.stt);
        let text = match tokio::time::timeout(self.limits.gateway_timeout, stt.transcribe(audio))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Transcription(format!(
                    "gateway call timed out after {:?}",
                    self.limits.gateway_timeout
                )));
            }
        };

        if text.trim().is_empty() {
            tracing::debug!("transcript empty, substituting apology transcript");
            Ok(UNRECOGNIZED_SPEECH_TEXT.to_string())
        } else {
            Ok(text)
        }
    }

    /// Call the generation gateway; any failure is absorbed via fallback text
    async fn generate(&mut self, transcript: &str) -> String {
        let prompt = prompt::build_prompt(&self.locale, transcript);
        let llm = Arc::clone(&self.gateways.llm);

        match tokio::time::timeout(self.limits.gateway_timeout, llm.generate(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "generation failed, using fallback reply");
                GENERATION_FALLBACK_TEXT.to_string()
            }
            Err(_) => {
                tracing::warn!("generation timed out, using fallback reply");
                GENERATION_FALLBACK_TEXT.to_string()
            }
        }
    }

    /// Resolve the voice, open the synthesis stream, and forward every chunk
    async fn synthesize(&mut self, reply: &str) -> SessionOutcome {
        // Voice resolution happens before the stream is opened so a missing
        // mapping surfaces as a configuration error, not a mid-stream fault
        let voice_id = match self.voices.resolve(&self.locale) {
            Ok(voice) => voice.to_string(),
            Err(e) => return self.fail(&e).await,
        };

        let tts = Arc::clone(&self.gateways.tts);
        let open = tokio::time::timeout(
            self.limits.gateway_timeout,
            tts.synthesize(reply, &voice_id, &self.locale),
        )
        .await;

        let mut stream = match open {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return self.fail(&e).await,
            Err(_) => {
                return self
                    .fail(&Error::Synthesis(format!(
                        "gateway call timed out after {:?}",
                        self.limits.gateway_timeout
                    )))
                    .await;
            }
        };

        let mut frames = 0_u64;
        loop {
            match tokio::time::timeout(self.limits.gateway_timeout, stream.next()).await {
                // End-of-stream marker from the gateway: turn complete
                Ok(None) => break,
                Ok(Some(Ok(chunk))) => {
                    if let Err(e) = self.transport.send_audio(chunk).await {
                        // Do not retry: the reply is partially spoken already
                        tracing::debug!(error = %e, frames, "audio send failed, aborting stream");
                        return self.fail(&e).await;
                    }
                    frames += 1;
                }
                Ok(Some(Err(e))) => return self.fail(&e).await,
                Err(_) => {
                    return self
                        .fail(&Error::Synthesis(format!(
                            "no audio chunk within {:?}",
                            self.limits.gateway_timeout
                        )))
                        .await;
                }
            }
        }

        tracing::debug!(frames, "synthesis stream complete");
        SessionOutcome::Completed
    }

    /// Fatal stage failure: send one `error` notice if still writable
    async fn fail(&mut self, error: &Error) -> SessionOutcome {
        tracing::warn!(error = %error, state = ?self.state, "fatal stage failure");
        let notice = OutboundControl::Error {
            text: error.to_string(),
        };
        let _ = self.transport.send_control(&notice).await;
        SessionOutcome::Failed
    }
}
