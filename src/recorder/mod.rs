//! Capture-side recording control
//!
//! The [`Recorder`] owns the capture backend (and with it the device
//! handle), accumulates PCM chunks while recording, gates accumulation while
//! paused, drives the one-second elapsed ticker, and finalizes the chunks
//! into an immutable WAV artifact on stop. Session state itself is only
//! touched through dispatched events.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::capture::{CaptureBackend, CaptureConfig, CaptureError};
use crate::session::{AudioArtifact, Session, SessionEvent, SessionStatus};

pub struct Recorder {
    session: Session,
    backend: Box<dyn CaptureBackend>,
    config: CaptureConfig,
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    samples: Arc<Mutex<Vec<i16>>>,
    paused: Arc<AtomicBool>,
    pump: JoinHandle<()>,
    ticker: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(session: Session, backend: Box<dyn CaptureBackend>, config: CaptureConfig) -> Self {
        Self {
            session,
            backend,
            config,
            active: None,
        }
    }

    /// Acquire the capture device and begin a new recording.
    ///
    /// On success the session transitions to `Recording` with elapsed time,
    /// transcript, summary, and error reset. On device failure the session is
    /// left untouched (`Idle` for a fresh session).
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            warn!("Recording already started");
            return Ok(());
        }

        let mut frames = self.backend.start().await?;

        let note_id = format!("note-{}", Uuid::new_v4());
        self.session
            .dispatch(SessionEvent::RecordingStarted { note_id });

        let samples = Arc::new(Mutex::new(Vec::new()));
        let paused = Arc::new(AtomicBool::new(false));

        let pump = tokio::spawn({
            let samples = Arc::clone(&samples);
            let paused = Arc::clone(&paused);
            async move {
                while let Some(frame) = frames.recv().await {
                    if paused.load(Ordering::SeqCst) {
                        // Accumulation is suspended; frames the device emits
                        // while paused never reach the artifact.
                        continue;
                    }
                    samples.lock().unwrap().extend_from_slice(&frame.samples);
                }
            }
        });

        let ticker = spawn_ticker(self.session.clone());

        self.active = Some(ActiveCapture {
            samples,
            paused,
            pump,
            ticker: Some(ticker),
        });

        Ok(())
    }

    /// Suspend accumulation and the elapsed-time counter. Valid only while
    /// `Recording`; otherwise a logged no-op.
    pub fn pause(&mut self) {
        let Some(active) = &mut self.active else {
            warn!("Pause ignored: no recording in progress");
            return;
        };
        if self.session.status() != SessionStatus::Recording {
            warn!("Pause ignored: not recording");
            return;
        }

        active.paused.store(true, Ordering::SeqCst);
        if let Some(ticker) = active.ticker.take() {
            ticker.abort();
        }
        self.session.dispatch(SessionEvent::RecordingPaused);
    }

    /// Resume accumulation and counting. Valid only while `Paused`.
    ///
    /// A fresh ticker starts here, so missed seconds are never caught up.
    pub fn resume(&mut self) {
        let Some(active) = &mut self.active else {
            warn!("Resume ignored: no recording in progress");
            return;
        };
        if self.session.status() != SessionStatus::Paused {
            warn!("Resume ignored: not paused");
            return;
        }

        active.paused.store(false, Ordering::SeqCst);
        active.ticker = Some(spawn_ticker(self.session.clone()));
        self.session.dispatch(SessionEvent::RecordingResumed);
    }

    /// Finalize the accumulated chunks into one immutable WAV artifact and
    /// release the device. Calling stop with no recording in progress is a
    /// no-op.
    pub async fn stop(&mut self) -> Result<Option<AudioArtifact>, CaptureError> {
        let Some(mut active) = self.active.take() else {
            warn!("Stop ignored: no recording in progress");
            return Ok(None);
        };

        if let Some(ticker) = active.ticker.take() {
            ticker.abort();
        }

        // Release the device first; the frame channel closes and the pump
        // drains whatever is still buffered.
        let stop_result = self.backend.stop().await;
        if let Err(e) = active.pump.await {
            error!("Frame pump panicked: {}", e);
        }
        stop_result?;

        let samples = {
            let mut locked = active.samples.lock().unwrap();
            std::mem::take(&mut *locked)
        };

        let artifact = encode_wav(&samples, &self.config)?;
        info!(
            "Recording finalized: {:.1}s, {} bytes",
            artifact.duration_seconds,
            artifact.bytes.len()
        );

        self.session.dispatch(SessionEvent::RecordingStopped {
            artifact: artifact.clone(),
        });

        Ok(Some(artifact))
    }

    /// Samples accumulated so far (for status display and tests).
    pub fn buffered_samples(&self) -> usize {
        self.active
            .as_ref()
            .map(|a| a.samples.lock().unwrap().len())
            .unwrap_or(0)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.pump.abort();
            if let Some(ticker) = active.ticker {
                ticker.abort();
            }
        }
    }
}

fn spawn_ticker(session: Session) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            session.dispatch(SessionEvent::Tick);
        }
    })
}

/// Encode accumulated PCM into an in-memory WAV container.
fn encode_wav(samples: &[i16], config: &CaptureConfig) -> Result<AudioArtifact, CaptureError> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Finalize(e.to_string()))?;
    }

    let duration_seconds =
        samples.len() as f64 / (config.sample_rate as f64 * config.channels as f64);

    Ok(AudioArtifact {
        bytes: cursor.into_inner(),
        mime: "audio/wav".to_string(),
        sample_rate: config.sample_rate,
        channels: config.channels,
        duration_seconds,
    })
}
