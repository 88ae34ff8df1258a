//! Recording session state
//!
//! This module provides the session state machine at the center of a voice
//! note's lifecycle:
//! - `SessionState` - status, elapsed time, finalized audio, transcript,
//!   summary, and the last user-visible error
//! - `SessionEvent` - the event vocabulary produced by the recorder, the
//!   one-second ticker, and transcription completions
//! - `Session` - shared handle routing every mutation through the single
//!   reducer

mod events;
mod state;

pub use events::SessionEvent;
pub use state::{AudioArtifact, SessionState, SessionStatus};

use std::sync::{Arc, Mutex};

/// Shared handle to one recording session.
///
/// All mutation goes through [`Session::dispatch`], which hands the event to
/// the reducer ([`SessionState::apply`]); producers never touch fields
/// directly. Completion events carry the generation they were issued under,
/// and the reducer discards stale ones.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    /// Apply one event through the reducer.
    pub fn dispatch(&self, event: SessionEvent) {
        let mut state = self.state.lock().unwrap();
        state.apply(event);
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().unwrap().status
    }

    /// Generation tag for the recording currently represented by the state.
    /// Requests issued on behalf of this session must carry it.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
