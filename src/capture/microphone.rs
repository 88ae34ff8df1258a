use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};

const FRAME_CHANNEL_CAPACITY: usize = 100;
const STREAM_READY_TIMEOUT: Duration = Duration::from_secs(3);

/// Microphone capture via cpal.
///
/// The cpal stream is not `Send`, so a dedicated thread owns it: the thread
/// builds the stream, reports readiness over a oneshot, forwards frames into
/// the tokio channel from the audio callback, and drops the stream (releasing
/// the device) when the stop signal arrives.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    active: Option<StreamThread>,
}

struct StreamThread {
    stop_tx: std::sync::mpsc::Sender<()>,
    join: thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::DeviceAccess(
                "capture already in progress".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let config = self.config.clone();
        let join = thread::spawn(move || run_stream(config, frame_tx, ready_tx, stop_rx));

        match tokio::time::timeout(STREAM_READY_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("Microphone capture started");
                self.active = Some(StreamThread { stop_tx, join });
                Ok(frame_rx)
            }
            Ok(Ok(Err(msg))) => {
                let _ = join.join();
                Err(CaptureError::DeviceAccess(msg))
            }
            Ok(Err(_)) => Err(CaptureError::DeviceAccess(
                "capture thread exited before the stream started".to_string(),
            )),
            Err(_) => {
                let _ = stop_tx.send(());
                Err(CaptureError::DeviceAccess(
                    "timed out waiting for the capture device".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(thread) = self.active.take() else {
            return Ok(());
        };

        let _ = thread.stop_tx.send(());
        let join = thread.join;
        if tokio::task::spawn_blocking(move || join.join())
            .await
            .map(|r| r.is_err())
            .unwrap_or(true)
        {
            warn!("Capture thread did not shut down cleanly");
        }

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // The device must not stay acquired past the backend's lifetime.
        if let Some(thread) = self.active.take() {
            let _ = thread.stop_tx.send(());
        }
    }
}

fn run_stream(
    config: CaptureConfig,
    frames: mpsc::Sender<AudioFrame>,
    ready: oneshot::Sender<Result<(), String>>,
    stop: std::sync::mpsc::Receiver<()>,
) {
    let outcome = (|| -> Result<cpal::Stream, String> {
        let host = cpal::default_host();

        let device = match &config.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| e.to_string())?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| format!("input device '{}' not found", name))?,
            None => host
                .default_input_device()
                .ok_or_else(|| "no input device available".to_string())?,
        };

        let default_config = device.default_input_config().map_err(|e| e.to_string())?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match default_config.sample_format() {
            SampleFormat::F32 => build_stream_f32(&device, &stream_config, frames)?,
            SampleFormat::I16 => build_stream_i16(&device, &stream_config, frames)?,
            other => return Err(format!("unsupported sample format: {:?}", other)),
        };

        stream.play().map_err(|e| e.to_string())?;
        Ok(stream)
    })();

    match outcome {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            // Hold the stream until asked to stop; dropping it releases the device.
            let _ = stop.recv();
            drop(stream);
        }
        Err(msg) => {
            let _ = ready.send(Err(msg));
        }
    }
}

fn build_stream_f32(
    device: &cpal::Device,
    config: &StreamConfig,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, String> {
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut sent_samples: u64 = 0;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                let frame = make_frame(samples, sample_rate, channels, sent_samples);
                sent_samples += data.len() as u64;
                if frames.try_send(frame).is_err() {
                    warn!("Dropping audio frame: channel full or closed");
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| e.to_string())
}

fn build_stream_i16(
    device: &cpal::Device,
    config: &StreamConfig,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, String> {
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut sent_samples: u64 = 0;

    device
        .build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let frame = make_frame(data.to_vec(), sample_rate, channels, sent_samples);
                sent_samples += data.len() as u64;
                if frames.try_send(frame).is_err() {
                    warn!("Dropping audio frame: channel full or closed");
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| e.to_string())
}

fn make_frame(samples: Vec<i16>, sample_rate: u32, channels: u16, sent_samples: u64) -> AudioFrame {
    let timestamp_ms = sent_samples * 1000 / (sample_rate as u64 * channels as u64);
    AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms,
    }
}

/// List available input devices to stdout.
pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();

    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_else(|| "none".to_string());

    println!("Available capture devices:");
    for device in host.input_devices()? {
        let name = device.name()?;
        let marker = if name == default_name { " (default)" } else { "" };
        println!("  {}{}", name, marker);
    }

    Ok(())
}
