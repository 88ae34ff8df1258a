pub mod capture;
pub mod client;
pub mod config;
pub mod export;
pub mod http;
pub mod recorder;
pub mod session;
pub mod stt;
pub mod summarize;

pub use capture::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError, CaptureSource,
    MicrophoneBackend, ScriptedBackend, ScriptedFeed,
};
pub use client::{
    ClientError, ServiceHealth, TranscribeClient, TranscriptionRequest, TranscriptionResult,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use recorder::Recorder;
pub use session::{AudioArtifact, Session, SessionEvent, SessionState, SessionStatus};
pub use stt::{ModelInfo, SpeechModel, TranscribeOptions, Transcription, WhisperCli};
pub use summarize::Summarizer;
