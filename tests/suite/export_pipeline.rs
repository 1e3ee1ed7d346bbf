//! Export pipeline through the engine: capture-instant snapshots,
//! single-flight behavior, and failure advisories.

use crate::common::{drive_until, start_gemini_mock, test_app};
use quill_engine::{ARTIFACT_FILENAME, EngineEvent, ExportPhase, Role};
use tokio::sync::broadcast::error::TryRecvError;

fn drain(rx: &mut tokio::sync::broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

#[tokio::test]
async fn export_writes_artifact_and_emits_completion() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());
    let mut events = app.subscribe();

    app.edit_document("Once upon a time, a hero rose.");
    app.export_story();
    assert_ne!(app.export_phase(), ExportPhase::Idle);

    let artifact = dir.path().join(ARTIFACT_FILENAME);
    drive_until(&mut app, |app| app.export_phase() == ExportPhase::Idle).await;

    let bytes = std::fs::read(&artifact).unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|event| matches!(event, EngineEvent::ExportStarted)));
    assert!(seen
        .iter()
        .any(|event| matches!(event, EngineEvent::ExportCompleted(path) if *path == artifact)));
}

#[tokio::test]
async fn blank_document_causes_zero_pipeline_transitions() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());
    let mut events = app.subscribe();

    app.export_story();
    app.edit_document("   \n\t");
    app.export_story();

    assert_eq!(app.export_phase(), ExportPhase::Idle);
    app.poll();
    assert!(!dir.path().join(ARTIFACT_FILENAME).exists());
    assert!(!drain(&mut events)
        .iter()
        .any(|event| matches!(event, EngineEvent::ExportStarted)));
}

#[tokio::test]
async fn concurrent_requests_produce_exactly_one_artifact() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());
    let mut events = app.subscribe();

    app.edit_document("chapter one");
    app.export_story();
    // Fired while the first export is still capturing: ignored.
    app.export_story();
    app.export_story();

    drive_until(&mut app, |app| app.export_phase() == ExportPhase::Idle).await;

    let started = drain(&mut events)
        .iter()
        .filter(|event| matches!(event, EngineEvent::ExportStarted))
        .count();
    assert_eq!(started, 1);

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn export_failure_lands_as_a_system_advisory() {
    let server = start_gemini_mock().await;
    // An existing file where the output directory should be makes the
    // artifact write fail.
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let mut app = test_app(&server, blocker.path().to_path_buf());

    app.edit_document("doomed export");
    app.export_story();

    drive_until(&mut app, |app| !app.turns().is_empty()).await;

    assert_eq!(app.export_phase(), ExportPhase::Idle);
    let advisory = &app.turns()[0];
    assert_eq!(advisory.role(), Role::System);
    assert!(advisory.display_text().starts_with("Export failed"));
}

#[tokio::test]
async fn export_captures_the_document_at_request_instant() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.edit_document("the captured text");
    app.export_story();
    // Edits after the capture instant do not reach the in-flight artifact.
    app.edit_document("text that arrived too late");

    drive_until(&mut app, |app| app.export_phase() == ExportPhase::Idle).await;

    let bytes = std::fs::read(dir.path().join(ARTIFACT_FILENAME)).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
