use std::sync::Arc;

use crate::stt::SpeechModel;
use crate::summarize::Summarizer;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Local speech-recognition model, initialized once at startup.
    pub speech: Arc<dyn SpeechModel>,
    /// Summarization backend (remote LLM or local fallback).
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    pub fn new(speech: Arc<dyn SpeechModel>, summarizer: Arc<Summarizer>) -> Self {
        Self { speech, summarizer }
    }
}
