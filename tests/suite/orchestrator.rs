//! Turn orchestration: the provisional-then-resolve contract and the
//! single-admission responder gate.

use std::collections::HashSet;
use std::time::Duration;

use crate::common::{
    drive_until, mount_converse_failure, mount_converse_text, mount_converse_text_delayed,
    received_bodies, start_gemini_mock, test_app,
};
use quill_engine::Role;

#[tokio::test]
async fn chat_turn_resolves_provisional_in_place() {
    let server = start_gemini_mock().await;
    mount_converse_text(&server, "Happy to help with your opening chapter.").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.send_chat("How should my story open?");

    // Invocation interval: responder is up, user turn and placeholder are in.
    assert!(app.is_responding());
    assert_eq!(app.turns().len(), 2);
    assert_eq!(app.turns()[0].role(), Role::User);
    assert_eq!(app.turns()[0].display_text(), "How should my story open?");
    assert!(app.turns()[1].is_provisional());
    assert_eq!(app.turns()[1].display_text(), "Thinking…");
    let placeholder_id = app.turns()[1].id();

    drive_until(&mut app, |app| !app.is_responding()).await;

    // Same turn, same position, resolved in place.
    assert_eq!(app.turns().len(), 2);
    assert_eq!(app.turns()[1].id(), placeholder_id);
    assert!(!app.turns()[1].is_provisional());
    assert_eq!(
        app.turns()[1].display_text(),
        "Happy to help with your opening chapter."
    );
}

#[tokio::test]
async fn backend_failure_becomes_ledger_content_and_clears_responder() {
    let server = start_gemini_mock().await;
    mount_converse_failure(&server, 500, "backend unavailable").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.send_chat("Hello?");
    assert!(app.is_responding());

    drive_until(&mut app, |app| !app.is_responding()).await;

    let turn = &app.turns()[1];
    assert!(!turn.is_provisional());
    assert!(turn.display_text().starts_with("An error occurred"));
    assert!(turn.display_text().contains("backend unavailable"));
    assert!(!app.is_responding());
}

#[tokio::test]
async fn requests_while_in_flight_are_dropped_silently() {
    let server = start_gemini_mock().await;
    mount_converse_text_delayed(&server, "First answer.", Duration::from_millis(200)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.send_chat("first");
    assert_eq!(app.turns().len(), 2);

    // No queueing: these are no-ops, not errors, and leave no trace.
    app.send_chat("second");
    app.suggest_titles();
    app.continue_story();
    assert_eq!(app.turns().len(), 2);

    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(app.turns().len(), 2);
    assert_eq!(app.turns()[1].display_text(), "First answer.");
    // Only the first request ever reached the backend.
    assert_eq!(received_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn hidden_prompt_actions_keep_the_instruction_out_of_the_transcript() {
    let server = start_gemini_mock().await;
    mount_converse_text(&server, "1. The Quiet Harbor").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.edit_document("The harbor slept under fog.");
    app.suggest_titles();

    // Silent action: no user turn, just the thinking placeholder.
    assert_eq!(app.turns().len(), 1);
    assert_eq!(app.turns()[0].role(), Role::Assistant);
    assert!(app.turns()[0].is_provisional());

    drive_until(&mut app, |app| !app.is_responding()).await;

    assert_eq!(app.turns().len(), 1);
    assert_eq!(app.turns()[0].display_text(), "1. The Quiet Harbor");

    // The backend received the manuscript inside the hidden instruction.
    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(sent.contains("The harbor slept under fog."));
    // A fixed system instruction rode along, outside the visible prompt.
    assert!(bodies[0]["system_instruction"]["parts"][0]["text"]
        .as_str()
        .is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn blank_chat_input_is_ignored() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.send_chat("   ");

    assert!(!app.is_responding());
    assert!(app.turns().is_empty());
    assert!(received_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn transcript_ids_stay_unique_across_orchestrations() {
    let server = start_gemini_mock().await;
    mount_converse_text(&server, "Noted.").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    for prompt in ["one", "two", "three"] {
        app.send_chat(prompt);
        drive_until(&mut app, |app| !app.is_responding()).await;
    }

    let ids: HashSet<_> = app.turns().iter().map(|turn| turn.id()).collect();
    assert_eq!(ids.len(), app.turns().len());
    assert_eq!(app.turns().len(), 6);
    assert!(app.turns().iter().all(|turn| !turn.is_provisional()));
}
