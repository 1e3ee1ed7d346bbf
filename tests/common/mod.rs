//! Shared test utilities and fixtures
//!
//! Wiremock stand-ins for the Gemini API plus an engine builder aimed at
//! them.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quill_engine::{App, RetryConfig};
use quill_providers::gemini::GeminiGateway;
use quill_types::ApiKey;

pub const TEST_MODEL: &str = "gemini-test";

pub async fn start_gemini_mock() -> MockServer {
    MockServer::start().await
}

pub fn converse_path() -> String {
    format!("/models/{TEST_MODEL}:generateContent")
}

pub fn stream_path() -> String {
    format!("/models/{TEST_MODEL}:streamGenerateContent")
}

/// Build an engine whose gateway points at the mock server, with fast retries
/// and an isolated export directory.
pub fn test_app(server: &MockServer, export_dir: PathBuf) -> App {
    let gateway = GeminiGateway::new(ApiKey::new("test-key").unwrap(), TEST_MODEL)
        .with_base_url(server.uri())
        .with_retry_config(RetryConfig::fast());
    App::from_parts(gateway, export_dir, None)
}

/// Mount a successful `generateContent` response.
pub async fn mount_converse_text(server: &MockServer, text: &str) {
    let body = serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    });

    Mock::given(method("POST"))
        .and(path(converse_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a successful `generateContent` response delivered after `delay`.
pub async fn mount_converse_text_delayed(server: &MockServer, text: &str, delay: Duration) {
    let body = serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    });

    Mock::given(method("POST"))
        .and(path(converse_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mount a persistent backend failure for `generateContent`.
pub async fn mount_converse_failure(server: &MockServer, status: u16, message: &str) {
    let body = serde_json::json!({
        "error": { "code": status, "message": message, "status": "UNAVAILABLE" }
    });

    Mock::given(method("POST"))
        .and(path(converse_path()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn sse_chunk_line(text: &str) -> String {
    let payload = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    });
    format!("data: {payload}\n\n")
}

/// Build an SSE body from text chunks, optionally finishing cleanly.
pub fn sse_body(chunks: &[&str], finish: bool) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&sse_chunk_line(chunk));
    }
    if finish {
        body.push_str("data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\n");
    }
    body
}

async fn mount_stream_body(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path(stream_path()))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Mount a streaming continuation that delivers `chunks` then completes.
pub async fn mount_stream_chunks(server: &MockServer, chunks: &[&str]) {
    mount_stream_body(server, sse_body(chunks, true)).await;
}

/// Mount a streaming continuation that delivers `chunks` then dies mid-stream
/// with a quota error.
pub async fn mount_stream_error_after(server: &MockServer, chunks: &[&str]) {
    let mut body = sse_body(chunks, false);
    body.push_str(
        "data: {\"error\":{\"code\":429,\"message\":\"quota exhausted\",\
         \"status\":\"RESOURCE_EXHAUSTED\"}}\n\n",
    );
    mount_stream_body(server, body).await;
}

/// Poll the engine until `condition` holds, or fail after five seconds.
pub async fn drive_until(app: &mut App, mut condition: impl FnMut(&App) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        app.poll();
        if condition(app) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "condition not reached within 5s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// The JSON bodies of all requests the mock server received.
pub async fn received_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("request body is JSON"))
        .collect()
}
