use super::state::AudioArtifact;

/// Events fed to the session reducer.
///
/// The recorder, its one-second ticker, and transcription completion
/// callbacks all describe what happened with one of these; nothing mutates
/// [`super::SessionState`] any other way.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new recording began; prior transcript, summary, error, and artifact
    /// are invalidated and the generation advances.
    RecordingStarted { note_id: String },

    /// One whole second elapsed while recording.
    Tick,

    RecordingPaused,

    RecordingResumed,

    /// Capture finished and the accumulated chunks were finalized.
    RecordingStopped { artifact: AudioArtifact },

    /// The transcription round trip completed. `generation` is the session
    /// generation the request was issued under.
    TranscriptionSucceeded {
        generation: u64,
        transcript: String,
        summary: String,
    },

    /// The transcription round trip failed with a user-visible message.
    TranscriptionFailed { generation: u64, message: String },
}
