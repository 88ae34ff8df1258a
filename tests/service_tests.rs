// End-to-end tests for the transcription service API
//
// A stub speech model stands in for whisper; the service runs on an
// ephemeral port and is exercised through the real client, so the wire
// contract (multipart fields, defaults, detail errors) is covered on both
// sides.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{http::StatusCode, response::Json, routing::post, Router};
use serde_json::json;
use voxnote::config::{ClientConfig, SummarizerConfig};
use voxnote::stt::{ModelInfo, Segment, SpeechModel, TranscribeOptions, Transcription};
use voxnote::{AppState, ClientError, Summarizer, TranscribeClient, TranscriptionRequest};

struct StubModel {
    text: String,
    fail_with: Option<String>,
    seen_opts: Arc<Mutex<Option<TranscribeOptions>>>,
}

impl StubModel {
    fn returning(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail_with: None,
            seen_opts: Arc::new(Mutex::new(None)),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            text: String::new(),
            fail_with: Some(message.to_string()),
            seen_opts: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait::async_trait]
impl SpeechModel for StubModel {
    async fn transcribe(
        &self,
        _audio_path: &Path,
        opts: &TranscribeOptions,
    ) -> anyhow::Result<Transcription> {
        *self.seen_opts.lock().unwrap() = Some(opts.clone());

        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }

        Ok(Transcription {
            text: self.text.clone(),
            segments: vec![Segment {
                start: 0.0,
                end: 1.0,
                text: self.text.clone(),
            }],
            language: opts.language.clone(),
            duration: 1.0,
        })
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            device: "cpu".to_string(),
            model_size: "base".to_string(),
            compute_type: "int8".to_string(),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn unconfigured_summarizer() -> Summarizer {
    Summarizer::new(&SummarizerConfig {
        api_url: None,
        api_key: None,
        model: "gpt-4o-mini".to_string(),
    })
    .unwrap()
}

fn service_app(model: StubModel) -> Router {
    let state = AppState::new(Arc::new(model), Arc::new(unconfigured_summarizer()));
    voxnote::create_router(state, &["*".to_string()])
}

async fn spawn_app(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> TranscribeClient {
    TranscribeClient::new(&ClientConfig {
        backend_url: base_url.to_string(),
        language: "en".to_string(),
        beam_size: 5,
        timeout_secs: 10,
    })
    .unwrap()
}

#[tokio::test]
async fn health_reports_summarizer_unconfigured() {
    let base = spawn_app(service_app(StubModel::returning("hello"))).await;
    let client = client_for(&base);

    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert!(!health.llm_configured);
}

#[tokio::test]
async fn transcribe_applies_defaults_and_returns_both_fields() {
    let model = StubModel::returning("First point. Second point. Third point. Fourth.");
    let seen_opts = Arc::clone(&model.seen_opts);
    let base = spawn_app(service_app(model)).await;
    let client = client_for(&base);

    let result = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 64]))
        .await
        .unwrap();

    assert_eq!(
        result.transcript,
        "First point. Second point. Third point. Fourth."
    );
    // Summarization is unconfigured; the deterministic fallback still
    // populates the field.
    assert_eq!(result.summary, "First point  Second point  Third point");

    let opts = seen_opts.lock().unwrap().clone().expect("model invoked");
    assert_eq!(opts.language, "en");
    assert_eq!(opts.beam_size, 5);
}

#[tokio::test]
async fn explicit_language_and_beam_size_reach_the_model() {
    let model = StubModel::returning("hallo");
    let seen_opts = Arc::clone(&model.seen_opts);
    let base = spawn_app(service_app(model)).await;
    let client = client_for(&base);

    client
        .transcribe(
            TranscriptionRequest::new(vec![0u8; 64])
                .with_language("de")
                .with_beam_size(8),
        )
        .await
        .unwrap();

    let opts = seen_opts.lock().unwrap().clone().expect("model invoked");
    assert_eq!(opts.language, "de");
    assert_eq!(opts.beam_size, 8);
}

#[tokio::test]
async fn omitted_fields_default_on_the_service_side() {
    let model = StubModel::returning("hello");
    let seen_opts = Arc::clone(&model.seen_opts);
    let base = spawn_app(service_app(model)).await;

    // Raw form with only the audio field; the service fills in the defaults.
    let form = reqwest::multipart::Form::new().part(
        "audio",
        reqwest::multipart::Part::bytes(vec![0u8; 32])
            .file_name("recording.webm")
            .mime_str("audio/webm")
            .unwrap(),
    );
    let response = reqwest::Client::new()
        .post(format!("{}/api/transcribe", base))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let opts = seen_opts.lock().unwrap().clone().expect("model invoked");
    assert_eq!(opts.language, "en");
    assert_eq!(opts.beam_size, 5);
}

#[tokio::test]
async fn empty_transcript_is_a_400_with_detail() {
    let base = spawn_app(service_app(StubModel::returning(""))).await;
    let client = client_for(&base);

    let err = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 64]))
        .await
        .unwrap_err();

    match err {
        ClientError::Service { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "No speech detected in audio.");
        }
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_audio_field_is_rejected() {
    let base = spawn_app(service_app(StubModel::returning("hello"))).await;

    let form = reqwest::multipart::Form::new().text("language", "en");
    let response = reqwest::Client::new()
        .post(format!("{}/api/transcribe", base))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Missing audio field");
}

#[tokio::test]
async fn model_failure_surfaces_as_500_detail() {
    let base = spawn_app(service_app(StubModel::failing("model exploded"))).await;
    let client = client_for(&base);

    let err = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 64]))
        .await
        .unwrap_err();

    match err {
        ClientError::Service { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Transcription failed: model exploded");
        }
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn zero_beam_size_is_rejected() {
    let base = spawn_app(service_app(StubModel::returning("hello"))).await;
    let client = client_for(&base);

    let err = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 64]).with_beam_size(0))
        .await
        .unwrap_err();

    match err {
        ClientError::Service { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "beam_size must be a positive integer");
        }
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn client_surfaces_remote_detail_verbatim() {
    // Remote service shape only; the body's detail field must come through
    // untouched.
    let app = Router::new().route(
        "/api/transcribe",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "model overloaded"})),
            )
        }),
    );
    let base = spawn_app(app).await;
    let client = client_for(&base);

    let err = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 16]))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "model overloaded");
    match err {
        ClientError::Service { status, .. } => assert_eq!(status, 500),
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    // Reserve a port, then release it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}", addr));

    let err = client
        .transcribe(TranscriptionRequest::new(vec![0u8; 16]))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Network(_)));
}
