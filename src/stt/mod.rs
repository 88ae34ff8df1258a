//! Local speech-recognition model
//!
//! The service invokes the model through the [`SpeechModel`] trait; the
//! bundled implementation shells out to a whisper-cli binary and parses its
//! JSON output.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::WhisperConfig;

/// Per-request decoding options.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub language: String,
    pub beam_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

/// Output of one model invocation.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
    pub duration: f32,
}

/// Model selection reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub device: String,
    pub model_size: String,
    pub compute_type: String,
}

#[async_trait::async_trait]
pub trait SpeechModel: Send + Sync {
    /// Transcribe the audio file at `audio_path`.
    async fn transcribe(&self, audio_path: &Path, opts: &TranscribeOptions)
        -> Result<Transcription>;

    /// Model selection for health reporting.
    fn info(&self) -> ModelInfo;

    fn name(&self) -> &str;
}

/// Speech model backed by an external whisper-cli binary.
pub struct WhisperCli {
    binary: PathBuf,
    model_path: PathBuf,
    threads: u32,
    info: ModelInfo,
}

impl WhisperCli {
    pub fn new(config: &WhisperConfig) -> Result<Self> {
        let binary = match &config.binary_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    bail!("whisper binary not found at {:?}", path);
                }
                path
            }
            None => {
                let candidates = [
                    PathBuf::from("whisper/whisper-cli"),
                    PathBuf::from("../whisper/whisper-cli"),
                    PathBuf::from("/usr/local/bin/whisper-cli"),
                ];
                candidates
                    .iter()
                    .find(|p| p.exists())
                    .cloned()
                    .with_context(|| {
                        format!("whisper binary not found; tried {:?}", candidates)
                    })?
            }
        };

        info!("Found whisper binary at {:?}", binary);

        let model_dir = match &config.model_dir {
            Some(dir) => PathBuf::from(dir),
            None => binary
                .parent()
                .map(|p| p.join("models"))
                .unwrap_or_else(|| PathBuf::from("models")),
        };
        let model_path = model_dir.join(format!("ggml-{}.bin", config.model_size));

        if !model_path.exists() {
            warn!("Model {:?} not found; transcription will fail until it is fetched", model_path);
        }

        Ok(Self {
            binary,
            model_path,
            threads: config.threads,
            info: ModelInfo {
                device: config.device.clone(),
                model_size: config.model_size.clone(),
                compute_type: config.compute_type.clone(),
            },
        })
    }
}

#[async_trait::async_trait]
impl SpeechModel for WhisperCli {
    async fn transcribe(
        &self,
        audio_path: &Path,
        opts: &TranscribeOptions,
    ) -> Result<Transcription> {
        info!("Transcribing audio file: {:?}", audio_path);

        if !audio_path.exists() {
            bail!("audio file not found: {:?}", audio_path);
        }

        let output = tokio::process::Command::new(&self.binary)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--file")
            .arg(audio_path)
            .arg("--output-json")
            .arg("--language")
            .arg(&opts.language)
            .arg("--beam-size")
            .arg(opts.beam_size.to_string())
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg("--no-prints")
            .output()
            .await
            .context("Failed to execute whisper")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("whisper failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);

        // whisper-cli writes a JSON sidecar next to the input file.
        let json_path = audio_path.with_extension("json");
        if json_path.exists() {
            let json_content =
                std::fs::read_to_string(&json_path).context("Failed to read whisper output")?;
            std::fs::remove_file(&json_path).ok();

            let parsed: WhisperOutput =
                serde_json::from_str(&json_content).context("Failed to parse whisper output")?;
            Ok(transcription_from_output(parsed))
        } else {
            // Older builds only print the text.
            Ok(Transcription {
                text: stdout.trim().to_string(),
                segments: vec![],
                language: opts.language.clone(),
                duration: 0.0,
            })
        }
    }

    fn info(&self) -> ModelInfo {
        self.info.clone()
    }

    fn name(&self) -> &str {
        "whisper-cli"
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f32,
    end: f32,
    text: String,
}

fn transcription_from_output(output: WhisperOutput) -> Transcription {
    let segments: Vec<Segment> = output
        .segments
        .into_iter()
        .map(|s| Segment {
            start: s.start,
            end: s.end,
            text: s.text.trim().to_string(),
        })
        .collect();

    let duration = segments.last().map(|s| s.end).unwrap_or(0.0);
    let text = collapse_segments(&segments, &output.text);

    Transcription {
        text,
        segments,
        language: output.language.unwrap_or_else(|| "en".to_string()),
        duration,
    }
}

/// Join trimmed segment texts into the transcript; fall back to the full
/// text when no segments were produced.
fn collapse_segments(segments: &[Segment], fallback: &str) -> String {
    if segments.is_empty() {
        return fallback.trim().to_string();
    }
    segments
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whisper_json_output() {
        let raw = r#"{
            "text": " Hello world. ",
            "segments": [
                {"start": 0.0, "end": 1.2, "text": " Hello"},
                {"start": 1.2, "end": 2.0, "text": " world."}
            ],
            "language": "en"
        }"#;

        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        let transcription = transcription_from_output(parsed);

        assert_eq!(transcription.text, "Hello world.");
        assert_eq!(transcription.segments.len(), 2);
        assert_eq!(transcription.language, "en");
        assert!((transcription.duration - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tolerates_missing_segments() {
        let raw = r#"{"text": " just text "}"#;

        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        let transcription = transcription_from_output(parsed);

        assert_eq!(transcription.text, "just text");
        assert!(transcription.segments.is_empty());
        assert_eq!(transcription.language, "en");
        assert_eq!(transcription.duration, 0.0);
    }

    #[test]
    fn collapse_skips_empty_segment_texts() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 0.5,
                text: "one".to_string(),
            },
            Segment {
                start: 0.5,
                end: 1.0,
                text: String::new(),
            },
            Segment {
                start: 1.0,
                end: 1.5,
                text: "two".to_string(),
            },
        ];

        assert_eq!(collapse_segments(&segments, "unused"), "one two");
    }
}
