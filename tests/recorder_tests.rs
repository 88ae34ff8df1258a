// Integration tests for the recorder
//
// These tests drive the recorder with the scripted capture backend and
// verify device acquisition, accumulation, the pause gate, and WAV
// finalization.

use std::time::Duration;
use voxnote::{
    CaptureConfig, CaptureError, Recorder, ScriptedBackend, ScriptedFeed, Session, SessionStatus,
};

fn test_config() -> CaptureConfig {
    CaptureConfig::default()
}

/// Wait until the pump has consumed at least `at_least` samples.
async fn wait_for_samples(recorder: &Recorder, at_least: usize) {
    for _ in 0..200 {
        if recorder.buffered_samples() >= at_least {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {} buffered samples", at_least);
}

#[tokio::test]
async fn recording_produces_wav_artifact() {
    let session = Session::new();
    let (feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    recorder.start().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Recording);

    feed.push(ScriptedFeed::silence(&test_config(), 1600, 0)).await;
    feed.push(ScriptedFeed::silence(&test_config(), 1600, 100))
        .await;
    // Closing the feed lets every pushed frame drain before stop.
    drop(feed);

    let artifact = recorder.stop().await.unwrap().expect("artifact");
    assert_eq!(session.status(), SessionStatus::Stopped);
    assert_eq!(artifact.mime, "audio/wav");

    let reader = hound::WavReader::new(std::io::Cursor::new(artifact.bytes.clone())).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 3200);

    // The session holds the same finalized artifact.
    let stored = session.snapshot().artifact.expect("session artifact");
    assert_eq!(stored.bytes, artifact.bytes);
}

#[tokio::test]
async fn pause_drops_frames_until_resume() {
    let session = Session::new();
    let (feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    recorder.start().await.unwrap();

    feed.push(ScriptedFeed::silence(&test_config(), 1600, 0)).await;
    wait_for_samples(&recorder, 1600).await;

    recorder.pause();
    assert_eq!(session.status(), SessionStatus::Paused);

    // Pushed after the pause gate is set; must never reach the artifact.
    feed.push(ScriptedFeed::silence(&test_config(), 1600, 100))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(feed);

    let artifact = recorder.stop().await.unwrap().expect("artifact");
    let reader = hound::WavReader::new(std::io::Cursor::new(artifact.bytes)).unwrap();
    assert_eq!(reader.len(), 1600);
}

#[tokio::test]
async fn resume_restores_accumulation() {
    let session = Session::new();
    let (feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    recorder.start().await.unwrap();
    feed.push(ScriptedFeed::silence(&test_config(), 1600, 0)).await;
    wait_for_samples(&recorder, 1600).await;

    recorder.pause();
    recorder.resume();
    assert_eq!(session.status(), SessionStatus::Recording);

    feed.push(ScriptedFeed::silence(&test_config(), 800, 100)).await;
    drop(feed);

    let artifact = recorder.stop().await.unwrap().expect("artifact");
    let reader = hound::WavReader::new(std::io::Cursor::new(artifact.bytes)).unwrap();
    assert_eq!(reader.len(), 2400);
}

#[tokio::test]
async fn denied_device_leaves_session_idle() {
    let session = Session::new();
    let backend = ScriptedBackend::denied();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    let err = recorder.start().await.unwrap_err();
    assert!(matches!(err, CaptureError::DeviceAccess(_)));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.generation, 0);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn stop_without_start_is_a_noop() {
    let session = Session::new();
    let (_feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    let artifact = recorder.stop().await.unwrap();

    assert!(artifact.is_none());
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn second_start_while_recording_is_ignored() {
    let session = Session::new();
    let (feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    recorder.start().await.unwrap();
    let generation = session.generation();

    recorder.start().await.unwrap();

    assert_eq!(session.status(), SessionStatus::Recording);
    assert_eq!(session.generation(), generation);

    drop(feed);
    recorder.stop().await.unwrap();
}

#[tokio::test]
async fn elapsed_time_skips_paused_intervals() {
    let session = Session::new();
    let (feed, backend) = ScriptedBackend::new();
    let mut recorder = Recorder::new(session.clone(), Box::new(backend), test_config());

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1300)).await;

    recorder.pause();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    recorder.resume();
    tokio::time::sleep(Duration::from_millis(1300)).await;

    drop(feed);
    recorder.stop().await.unwrap();

    let elapsed = session.snapshot().elapsed_seconds;
    // One tick per recording interval; the paused second never counts and
    // is not caught up after resume.
    assert!(
        (1..=2).contains(&elapsed),
        "expected 1-2 elapsed seconds, got {}",
        elapsed
    );
}
