//! HTTP client for the transcription service
//!
//! One multipart POST carries the finalized audio artifact plus `language`
//! and `beam_size`; the response yields transcript and summary together.
//! Transport failures and remote failures map onto the session's error
//! taxonomy, and at most one request is in flight per client.

use reqwest::multipart;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::session::{AudioArtifact, Session, SessionEvent};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_BEAM_SIZE: u32 = 5;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or timeout; the service was never reached (or never
    /// answered).
    #[error("transcription request failed: {0}")]
    Network(String),

    /// The service answered with a non-success status. `message` is the
    /// remote-provided detail when present, else a generic fallback.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A request for this session is already in flight; the call was
    /// suppressed rather than queued.
    #[error("a transcription request is already in flight")]
    RequestInFlight,
}

/// One transcription request.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub mime: String,
    pub file_name: String,
    pub language: String,
    pub beam_size: u32,
}

impl TranscriptionRequest {
    /// Request with the default language ("en") and beam size (5).
    pub fn new(audio: Vec<u8>) -> Self {
        Self {
            audio,
            mime: "audio/wav".to_string(),
            file_name: "recording.wav".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            beam_size: DEFAULT_BEAM_SIZE,
        }
    }

    pub fn from_artifact(artifact: &AudioArtifact) -> Self {
        let mut req = Self::new(artifact.bytes.clone());
        req.mime = artifact.mime.clone();
        req
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_beam_size(mut self, beam_size: u32) -> Self {
        self.beam_size = beam_size;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

/// Successful transcription round trip. Both fields are always present
/// together; `summary` may be an empty-string fallback but never missing.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResult {
    pub transcript: String,
    pub summary: String,
}

/// Shape of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub llm_configured: bool,
}

pub struct TranscribeClient {
    http: reqwest::Client,
    base_url: String,
    in_flight: Arc<AtomicBool>,
}

impl TranscribeClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Issue one transcription request.
    ///
    /// Rejected with [`ClientError::RequestInFlight`] while a previous call
    /// has not resolved.
    pub async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, ClientError> {
        let _slot = InFlightSlot::acquire(&self.in_flight)?;

        info!(
            "Transcribing {} bytes (language={}, beam_size={})",
            request.audio.len(),
            request.language,
            request.beam_size
        );

        let part = multipart::Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(&request.mime)
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let form = multipart::Form::new()
            .text("language", request.language)
            .text("beam_size", request.beam_size.to_string())
            .part("audio", part);

        let response = self
            .http
            .post(format!("{}/api/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        handle_response(response).await
    }

    /// Issue a request tagged with the session's current generation and feed
    /// the outcome through the reducer; a stale completion is discarded
    /// there. Returns the result so callers can display it directly.
    pub async fn transcribe_for_session(
        &self,
        session: &Session,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, ClientError> {
        let generation = session.generation();

        match self.transcribe(request).await {
            Ok(result) => {
                session.dispatch(SessionEvent::TranscriptionSucceeded {
                    generation,
                    transcript: result.transcript.clone(),
                    summary: result.summary.clone(),
                });
                Ok(result)
            }
            Err(ClientError::RequestInFlight) => {
                warn!("Transcription suppressed: request already in flight");
                Err(ClientError::RequestInFlight)
            }
            Err(e) => {
                session.dispatch(SessionEvent::TranscriptionFailed {
                    generation,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Probe the service. Reports whether the summarization backend is
    /// configured; both answers are valid and non-fatal.
    pub async fn health(&self) -> Result<ServiceHealth, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }
}

/// Holds the single in-flight slot; released on drop so every return path
/// frees it.
struct InFlightSlot(Arc<AtomicBool>);

impl InFlightSlot {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, ClientError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(ClientError::RequestInFlight);
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Network("request timed out contacting the transcription service".to_string())
    } else {
        ClientError::Network(err.to_string())
    }
}

async fn handle_response(response: reqwest::Response) -> Result<TranscriptionResult, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(service_error(status.as_u16(), &body));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))
}

fn service_error(status: u16, body: &str) -> ClientError {
    let message = extract_detail(body)
        .unwrap_or_else(|| format!("transcription service returned HTTP {}", status));
    ClientError::Service { status, message }
}

/// Pull the conventional `detail` field out of a structured error body.
fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .pointer("/detail")?
        .as_str()
        .map(|s| s.to_string())
}
