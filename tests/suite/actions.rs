//! Action-specific callers: selection preconditions and the two-phase
//! translate flow.

use crate::common::{
    drive_until, mount_converse_text, mount_converse_text_delayed, received_bodies,
    start_gemini_mock, test_app,
};
use std::time::Duration;

use quill_engine::{Role, TurnBody, TurnContent};

#[tokio::test]
async fn improve_with_blank_selection_appends_one_advisory() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.set_selection("   \n");
    app.improve_selection();

    // Zero orchestrations, exactly one system advisory.
    assert!(!app.is_responding());
    assert_eq!(app.turns().len(), 1);
    assert_eq!(app.turns()[0].role(), Role::System);
    assert_eq!(
        app.turns()[0].display_text(),
        "Select a passage in your story to improve it."
    );
    assert!(received_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn translate_with_blank_selection_appends_one_advisory() {
    let server = start_gemini_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.request_translation();

    assert!(!app.is_responding());
    assert_eq!(app.turns().len(), 1);
    assert_eq!(app.turns()[0].role(), Role::System);
    assert_eq!(
        app.turns()[0].display_text(),
        "Select a passage in your story to translate it."
    );
    assert!(received_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn translate_runs_in_two_phases() {
    let server = start_gemini_mock().await;
    mount_converse_text(&server, "Il pleuvait sur le port.").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.set_selection("Rain fell on the harbor.");

    // Phase one: a structured system turn asks the presentation layer for a
    // language choice. Nothing reaches the backend yet.
    app.request_translation();
    assert!(!app.is_responding());
    assert_eq!(app.turns().len(), 1);
    match app.turns()[0].body() {
        TurnBody::Resolved {
            content: TurnContent::LanguagePicker { languages },
        } => assert!(languages.contains(&"French")),
        other => panic!("expected a language picker turn, got {other:?}"),
    }
    assert!(received_bodies(&server).await.is_empty());

    // Phase two: the language choice triggers the hidden-prompt orchestration.
    app.translate_into("French");
    assert!(app.is_responding());
    drive_until(&mut app, |app| !app.is_responding()).await;

    let resolved = app.turns().last().unwrap();
    assert_eq!(resolved.display_text(), "Il pleuvait sur le port.");

    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(sent.contains("Rain fell on the harbor."));
    assert!(sent.contains("French"));
}

#[tokio::test]
async fn improve_sends_the_selection_in_a_hidden_prompt() {
    let server = start_gemini_mock().await;
    mount_converse_text(&server, "A tighter passage.").await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.set_selection("  a scruffy passage  ");
    app.improve_selection();

    // No user turn: the instruction stays out of the visible chat.
    assert!(app.turns().iter().all(|turn| turn.role() != Role::User));

    drive_until(&mut app, |app| !app.is_responding()).await;

    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(sent.contains("a scruffy passage"));
}

#[tokio::test]
async fn selection_is_captured_at_invocation_time() {
    let server = start_gemini_mock().await;
    mount_converse_text_delayed(&server, "Done.", Duration::from_millis(150)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&server, dir.path().to_path_buf());

    app.set_selection("the original selection");
    app.improve_selection();

    // The user moves on while the orchestration is in flight; the prompt
    // already snapshotted the old selection.
    app.set_selection("a different selection");

    drive_until(&mut app, |app| !app.is_responding()).await;

    let bodies = received_bodies(&server).await;
    let sent = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(sent.contains("the original selection"));
    assert!(!sent.contains("a different selection"));
}
