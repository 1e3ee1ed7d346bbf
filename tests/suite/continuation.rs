//! Streaming continuation: ordered increments into the manuscript, boundary
//! spacing, placeholder reconciliation, and partial-content retention.

use crate::common::{
    drive_until, mount_stream_chunks, mount_stream_error_after, received_bodies,
    start_gemini_mock, test_app,
};
use quill_engine::Role;

#[tokio::test]
async fn increments_land_in_order_with_exact_spacing() {
    let server = start_gemini_mock().await;
    mount_stream_chunks(&server, &[",", " a hero", " rose."]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.edit_document("Once upon a time");
    app.continue_story();

    assert!(app.is_responding());
    assert_eq!(app.turns().len(), 1);
    assert!(app.turns()[0].is_provisional());
    assert_eq!(app.turns()[0].display_text(), "Continuing the story…");

    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(app.document_text(), "Once upon a time, a hero rose.");
    // The placeholder is discarded once the prose lives in the document.
    assert!(app.turns().is_empty());
}

#[tokio::test]
async fn word_chunks_get_a_separating_space() {
    let server = start_gemini_mock().await;
    mount_stream_chunks(&server, &["the lighthouse", " went dark."]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.edit_document("Beyond the cliffs stood");
    app.continue_story();
    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(
        app.document_text(),
        "Beyond the cliffs stood the lighthouse went dark."
    );
}

#[tokio::test]
async fn empty_document_substitutes_the_opening_instruction() {
    let server = start_gemini_mock().await;
    mount_stream_chunks(&server, &["Dawn", " broke over the valley."]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.continue_story();
    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(app.document_text(), "Dawn broke over the valley.");

    // The backend never sees an empty prompt; a generic opening instruction
    // goes in its place.
    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(!sent.trim().is_empty());
    assert!(sent.contains("opening paragraph"));
}

#[tokio::test]
async fn midstream_failure_keeps_partial_content() {
    let server = start_gemini_mock().await;
    mount_stream_error_after(&server, &["It was", " a dark night"]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.continue_story();
    drive_until(&mut app, |app| !app.is_responding()).await;

    // No rollback: everything streamed before the failure stays.
    assert_eq!(app.document_text(), "It was a dark night");

    // The placeholder resolved in place to the error description.
    assert_eq!(app.turns().len(), 1);
    let turn = &app.turns()[0];
    assert_eq!(turn.role(), Role::Assistant);
    assert!(!turn.is_provisional());
    assert!(turn.display_text().starts_with("An error occurred"));
    assert!(turn.display_text().contains("quota exhausted"));
}

#[tokio::test]
async fn continuation_is_resumable_after_failure() {
    let server = start_gemini_mock().await;
    mount_stream_error_after(&server, &["First part"]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.continue_story();
    drive_until(&mut app, |app| !app.is_responding()).await;
    assert_eq!(app.document_text(), "First part");

    // Re-invoking continues from the enlarged document.
    server.reset().await;
    mount_stream_chunks(&server, &["and the second."]).await;

    app.continue_story();
    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(app.document_text(), "First part and the second.");
    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert_eq!(sent, "First part");
}
