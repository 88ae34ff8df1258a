use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::events::SessionEvent;

/// Recording lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No recording yet, or state was reset by a new recording.
    Idle,
    /// Actively capturing audio.
    Recording,
    /// Capture suspended; elapsed time is not counting.
    Paused,
    /// Capture finished; the finalized artifact is available.
    Stopped,
}

/// The complete, immutable audio recording produced once capture stops.
#[derive(Clone)]
pub struct AudioArtifact {
    /// Encoded container bytes (WAV).
    pub bytes: Vec<u8>,
    pub mime: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_seconds: f64,
}

impl std::fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("bytes", &self.bytes.len())
            .field("mime", &self.mime)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_seconds", &self.duration_seconds)
            .finish()
    }
}

/// State of one recording session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,

    /// Identifier of the current recording (e.g. "note-<uuid>").
    pub note_id: Option<String>,

    /// When the current recording started.
    pub started_at: Option<DateTime<Utc>>,

    /// Whole seconds spent in `Recording`, excluding paused intervals.
    pub elapsed_seconds: u64,

    /// Set only once the session reaches `Stopped`.
    pub artifact: Option<AudioArtifact>,

    pub transcript: Option<String>,
    pub summary: Option<String>,

    /// Last user-visible error text. Cleared when a new recording starts.
    pub last_error: Option<String>,

    /// Bumped on every new recording. Transcription completions tagged with
    /// an older generation are discarded by the reducer.
    pub generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            note_id: None,
            started_at: None,
            elapsed_seconds: 0,
            artifact: None,
            transcript: None,
            summary: None,
            last_error: None,
            generation: 0,
        }
    }

    /// The reducer. The only place session state is mutated.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::RecordingStarted { note_id } => {
                info!("Recording started: {}", note_id);
                self.status = SessionStatus::Recording;
                self.note_id = Some(note_id);
                self.started_at = Some(Utc::now());
                self.elapsed_seconds = 0;
                self.artifact = None;
                self.transcript = None;
                self.summary = None;
                self.last_error = None;
                self.generation += 1;
            }

            SessionEvent::Tick => {
                // Ticks issued around a pause can still arrive afterwards.
                if self.status == SessionStatus::Recording {
                    self.elapsed_seconds += 1;
                }
            }

            SessionEvent::RecordingPaused => {
                if self.status == SessionStatus::Recording {
                    self.status = SessionStatus::Paused;
                }
            }

            SessionEvent::RecordingResumed => {
                if self.status == SessionStatus::Paused {
                    self.status = SessionStatus::Recording;
                }
            }

            SessionEvent::RecordingStopped { artifact } => {
                if matches!(self.status, SessionStatus::Recording | SessionStatus::Paused) {
                    info!(
                        "Recording stopped after {}s ({} bytes)",
                        self.elapsed_seconds,
                        artifact.bytes.len()
                    );
                    self.status = SessionStatus::Stopped;
                    self.artifact = Some(artifact);
                }
            }

            SessionEvent::TranscriptionSucceeded {
                generation,
                transcript,
                summary,
            } => {
                if generation != self.generation {
                    warn!(
                        "Discarding stale transcription result (generation {} != {})",
                        generation, self.generation
                    );
                    return;
                }
                // Written together; never one without the other.
                self.transcript = Some(transcript);
                self.summary = Some(summary);
                self.last_error = None;
            }

            SessionEvent::TranscriptionFailed {
                generation,
                message,
            } => {
                if generation != self.generation {
                    warn!(
                        "Discarding stale transcription failure (generation {} != {})",
                        generation, self.generation
                    );
                    return;
                }
                self.last_error = Some(message);
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
