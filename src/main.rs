use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use voxnote::{
    export, AppState, CaptureBackendFactory, CaptureConfig, CaptureSource, Config, Recorder,
    Session, SessionStatus, Summarizer, TranscribeClient, TranscriptionRequest, WhisperCli,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Record, transcribe, summarize, and export voice notes")]
struct Cli {
    /// Config file (extension optional); VOXNOTE_* env vars override it
    #[arg(long, default_value = "config/voxnote")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the transcription HTTP service
    Serve,
    /// Record a voice note interactively, then transcribe and export it
    Record {
        /// Capture device name (default input device if not set)
        #[arg(long)]
        device: Option<String>,
    },
    /// Send an existing recording for transcription
    Transcribe {
        file: PathBuf,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        beam_size: Option<u32>,
        /// Also export transcript + summary as a text document
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxnote=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record { device } => record(cfg, device).await,
        Command::Transcribe {
            file,
            language,
            beam_size,
            output,
        } => transcribe_file(cfg, file, language, beam_size, output).await,
        Command::Devices => voxnote::capture::microphone::list_input_devices(),
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let speech = Arc::new(WhisperCli::new(&cfg.whisper)?);
    let summarizer = Arc::new(Summarizer::new(&cfg.summarizer)?);

    let state = AppState::new(speech, summarizer);
    let app = voxnote::create_router(state, &cfg.service.allowed_origins);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("{} listening on {}", cfg.service.name, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn record(cfg: Config, device: Option<String>) -> Result<()> {
    let session = Session::new();
    let capture_config = CaptureConfig {
        device_name: device,
        ..CaptureConfig::default()
    };
    let backend =
        CaptureBackendFactory::create(CaptureSource::Microphone, capture_config.clone())?;
    let mut recorder = Recorder::new(session.clone(), backend, capture_config);
    let client = TranscribeClient::new(&cfg.client)?;

    match client.health().await {
        Ok(health) => info!(
            "Transcription service up (summarization configured: {})",
            health.llm_configured
        ),
        Err(e) => warn!("Transcription service not reachable yet: {}", e),
    }

    println!("Commands: start, pause, resume, stop, transcribe, export [path], status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");

        match command {
            "start" => {
                if let Err(e) = recorder.start().await {
                    // Recording never started; the session stays as it was.
                    eprintln!("error: {}", e);
                } else {
                    println!("recording");
                }
            }
            "pause" => recorder.pause(),
            "resume" => recorder.resume(),
            "stop" => {
                if let Some(artifact) = recorder.stop().await? {
                    println!(
                        "stopped: {:.1}s of audio ({} bytes)",
                        artifact.duration_seconds,
                        artifact.bytes.len()
                    );
                }
            }
            "transcribe" => {
                let snapshot = session.snapshot();
                let Some(artifact) = snapshot.artifact else {
                    println!("no finished recording; stop first");
                    continue;
                };

                let request = TranscriptionRequest::from_artifact(&artifact)
                    .with_language(cfg.client.language.clone())
                    .with_beam_size(cfg.client.beam_size);

                match client.transcribe_for_session(&session, request).await {
                    Ok(result) => {
                        println!("\nTranscript:\n{}\n", result.transcript);
                        println!("Summary:\n{}\n", result.summary);
                    }
                    // The artifact is retained; the user may retry.
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            "export" => {
                let path = words
                    .next()
                    .map(PathBuf::from)
                    .unwrap_or_else(default_export_path);
                let snapshot = session.snapshot();
                export::write_document(
                    &path,
                    snapshot.transcript.as_deref().unwrap_or(""),
                    snapshot.summary.as_deref().unwrap_or(""),
                )?;
                println!("exported to {}", path.display());
            }
            "status" => {
                let snapshot = session.snapshot();
                println!(
                    "status: {:?} | elapsed: {}s | buffered samples: {}",
                    snapshot.status,
                    snapshot.elapsed_seconds,
                    recorder.buffered_samples()
                );
                if let Some(err) = snapshot.last_error {
                    println!("last error: {}", err);
                }
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {}", other),
        }
    }

    // Leaving mid-recording still releases the device.
    if session.status() != SessionStatus::Idle {
        let _ = recorder.stop().await;
    }

    Ok(())
}

async fn transcribe_file(
    cfg: Config,
    file: PathBuf,
    language: Option<String>,
    beam_size: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = std::fs::read(&file)?;
    let client = TranscribeClient::new(&cfg.client)?;

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "recording.wav".to_string());

    let request = TranscriptionRequest::new(bytes)
        .with_file_name(file_name)
        .with_language(language.unwrap_or_else(|| cfg.client.language.clone()))
        .with_beam_size(beam_size.unwrap_or(cfg.client.beam_size));

    let result = client.transcribe(request).await?;

    println!("Transcript:\n{}\n", result.transcript);
    println!("Summary:\n{}", result.summary);

    if let Some(path) = output {
        export::write_document(&path, &result.transcript, &result.summary)?;
        println!("exported to {}", path.display());
    }

    Ok(())
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "note-{}.txt",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}
