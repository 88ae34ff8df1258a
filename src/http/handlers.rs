use super::state::AppState;
use crate::stt::{ModelInfo, Segment, TranscribeOptions};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub whisper: ModelInfo,
    pub llm_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub language: String,
    pub duration: f32,
    pub transcript: String,
    pub segments: Vec<Segment>,
    pub summary: String,
}

/// Structured error body; clients surface `detail` verbatim.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

fn detail(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(Detail {
            detail: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
/// Always succeeds while the service is up; reports whether the
/// summarization backend is configured.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        whisper: state.speech.info(),
        llm_configured: state.summarizer.is_configured(),
    })
}

/// POST /api/transcribe
/// Multipart form with a required binary `audio` field plus optional
/// `language` (default "en") and `beam_size` (default 5) fields.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut audio: Option<(Vec<u8>, Option<String>)> = None;
    let mut language = "en".to_string();
    let mut beam_size: u32 = 5;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return detail(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e)),
        };

        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("audio") => {
                let file_name = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => audio = Some((bytes.to_vec(), file_name)),
                    Err(e) => {
                        return detail(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read audio field: {}", e),
                        )
                    }
                }
            }
            Some("language") => match field.text().await {
                Ok(text) if !text.trim().is_empty() => language = text.trim().to_string(),
                Ok(_) => {}
                Err(e) => {
                    return detail(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read language field: {}", e),
                    )
                }
            },
            Some("beam_size") => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        return detail(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read beam_size field: {}", e),
                        )
                    }
                };
                match text.trim().parse::<u32>() {
                    Ok(value) if value > 0 => beam_size = value,
                    _ => {
                        return detail(
                            StatusCode::UNPROCESSABLE_ENTITY,
                            "beam_size must be a positive integer",
                        )
                    }
                }
            }
            _ => {}
        }
    }

    let Some((bytes, file_name)) = audio else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "Missing audio field");
    };

    info!(
        "Transcription request: {} bytes, language={}, beam_size={}",
        bytes.len(),
        language,
        beam_size
    );

    // Spool the upload to a temp file for the model; removed on drop on
    // every path.
    let suffix = upload_suffix(file_name.as_deref());
    let spool = match tempfile::Builder::new().suffix(&suffix).tempfile() {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to create spool file: {}", e);
            return detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded audio",
            );
        }
    };
    if let Err(e) = tokio::fs::write(spool.path(), &bytes).await {
        error!("Failed to write spool file: {}", e);
        return detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store uploaded audio",
        );
    }

    let opts = TranscribeOptions {
        language,
        beam_size,
    };

    let transcription = match state.speech.transcribe(spool.path(), &opts).await {
        Ok(t) => t,
        Err(e) => {
            error!("Transcription failed: {}", e);
            return detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Transcription failed: {}", e),
            );
        }
    };

    if transcription.text.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "No speech detected in audio.");
    }

    let summary = state.summarizer.summarize(&transcription.text).await;

    (
        StatusCode::OK,
        Json(TranscribeResponse {
            language: transcription.language,
            duration: transcription.duration,
            transcript: transcription.text,
            segments: transcription.segments,
            summary,
        }),
    )
        .into_response()
}

/// File extension for the spool file, from the uploaded filename when
/// present (webm otherwise, matching what browsers record).
fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".webm".to_string())
}
