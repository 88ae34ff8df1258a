use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};

const FRAME_CHANNEL_CAPACITY: usize = 100;

/// Pushes frames into a [`ScriptedBackend`] by hand.
///
/// Dropping the feed closes the stream, which lets a test wait for every
/// pushed frame to drain before stopping the recorder.
pub struct ScriptedFeed {
    tx: mpsc::Sender<AudioFrame>,
}

impl ScriptedFeed {
    pub async fn push(&self, frame: AudioFrame) {
        let _ = self.tx.send(frame).await;
    }

    /// Convenience: a frame of silence at the given position.
    pub fn silence(config: &CaptureConfig, samples: usize, timestamp_ms: u64) -> AudioFrame {
        AudioFrame {
            samples: vec![0i16; samples],
            sample_rate: config.sample_rate,
            channels: config.channels,
            timestamp_ms,
        }
    }
}

/// Capture backend that replays externally pushed frames.
///
/// Stands in for the microphone in tests, the way a file source would for
/// batch processing. `denied()` simulates a missing device or refused
/// permission.
pub struct ScriptedBackend {
    feed: Option<mpsc::Receiver<AudioFrame>>,
    forwarder: Option<JoinHandle<()>>,
    deny: bool,
    capturing: bool,
}

impl ScriptedBackend {
    pub fn new() -> (ScriptedFeed, Self) {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        (
            ScriptedFeed { tx },
            Self {
                feed: Some(rx),
                forwarder: None,
                deny: false,
                capturing: false,
            },
        )
    }

    /// A backend whose device can never be acquired.
    pub fn denied() -> Self {
        Self {
            feed: None,
            forwarder: None,
            deny: true,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.deny {
            return Err(CaptureError::DeviceAccess(
                "microphone permission denied".to_string(),
            ));
        }

        let mut feed = self
            .feed
            .take()
            .ok_or_else(|| CaptureError::DeviceAccess("scripted feed exhausted".to_string()))?;

        let (out_tx, out_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(frame) = feed.recv().await {
                if out_tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        self.capturing = true;
        Ok(out_rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(forwarder) = self.forwarder.take() {
            // Closing the forwarder drops the outbound sender, which ends the
            // consumer's recv loop.
            forwarder.abort();
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
