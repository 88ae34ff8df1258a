pub mod microphone;
pub mod scripted;

pub use microphone::MicrophoneBackend;
pub use scripted::{ScriptedBackend, ScriptedFeed};

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the capture device layer.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device missing, busy, or permission denied. Recording never starts.
    #[error("capture device unavailable: {0}")]
    DeviceAccess(String),

    /// The device was acquired but the stream failed afterwards.
    #[error("capture stream failed: {0}")]
    Stream(String),

    /// Accumulated chunks could not be encoded into the final artifact.
    #[error("failed to finalize recording: {0}")]
    Finalize(String),
}

/// Audio sample data (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input device name; `None` picks the system default.
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: 16000, // what the speech model expects
            channels: 1,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream on a dedicated thread
/// - Scripted: replays frames pushed by hand (tests)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closes when capture stops.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the backend currently holds the device.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture source selection.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Microphone input (all platforms).
    Microphone,
}

/// Capture backend factory.
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            CaptureSource::Microphone => Ok(Box::new(MicrophoneBackend::new(config))),
        }
    }
}
