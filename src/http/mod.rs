//! HTTP API for the transcription service
//!
//! This module provides the REST API the recording client talks to:
//! - POST /api/transcribe - transcribe an uploaded recording and summarize it
//! - GET /api/health - service health and summarizer configuration
//!
//! Errors are returned as JSON objects with a `detail` field.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
