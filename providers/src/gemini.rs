//! Gemini API client.
//!
//! Communicates with `generateContent` (single-turn) and
//! `streamGenerateContent?alt=sse` (continuation streaming). Note: the Gemini
//! API mixes casings: `system_instruction` is snake_case while
//! `generationConfig` is camelCase.

use serde_json::{Value, json};
use tokio::sync::mpsc;

use quill_types::{ApiKey, StreamEvent};

use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};
use crate::sse_types::Response;
use crate::{
    BackendError, GEMINI_API_BASE_URL, MAX_SSE_BUFFER_BYTES, MAX_SSE_PARSE_ERRORS,
    drain_next_sse_event, extract_sse_data, http_client, read_capped_error_body,
    stream_idle_timeout,
};

/// System instruction for the conversational co-author mode.
///
/// Fixed per mode, never user-editable, never shown in the transcript.
const CO_AUTHOR_INSTRUCTION: &str = "You are a thoughtful writing partner helping an author \
develop a story. Ground every reply in the manuscript and selections you are given, offer \
concrete and specific suggestions, and keep replies concise enough to read in a sidebar.";

/// System instruction for pure continuation mode.
const CONTINUATION_INSTRUCTION: &str = "You are continuing a story in progress. Write the next \
passage only: match the established tone, voice, and tense. Do not repeat, summarize, or \
comment on the existing text, and do not address the author.";

/// Substitute prompt when the manuscript is still empty, so the backend never
/// receives an empty continuation request.
const OPENING_PROMPT: &str =
    "Write the opening paragraph of a new story. Any genre. Make it vivid and inviting.";

/// Opaque conversational memory for [`GeminiGateway::converse`].
///
/// Accumulates the exchange history that gives the backend its cross-call
/// context. Callers hold it and pass it back; they never inspect it.
#[derive(Debug, Default)]
pub struct ChatSession {
    entries: Vec<Exchange>,
}

#[derive(Debug)]
struct Exchange {
    role: &'static str,
    text: String,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded exchanges (user and model entries both count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one completed round trip. Only called after the backend
    /// answered; a failed call leaves the session untouched.
    fn record(&mut self, prompt: &str, reply: &str) {
        self.entries.push(Exchange {
            role: "user",
            text: prompt.to_string(),
        });
        self.entries.push(Exchange {
            role: "model",
            text: reply.to_string(),
        });
    }
}

/// Gateway to the generative backend.
///
/// Holds the credential, model name and endpoint; cheap to share behind an
/// `Arc`. The base URL is configurable so the test suite can point it at a
/// local mock; production callers use the default.
#[derive(Debug)]
pub struct GeminiGateway {
    api_key: ApiKey,
    model: String,
    base_url: String,
    retry: RetryConfig,
}

impl GeminiGateway {
    #[must_use]
    pub fn new(api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// One request/response turn in co-author mode.
    ///
    /// On success the exchange is recorded into `session`, so subsequent
    /// calls carry the conversational context.
    pub async fn converse(
        &self,
        session: &mut ChatSession,
        prompt: &str,
    ) -> Result<String, BackendError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = build_converse_body(session, prompt);

        let outcome = send_with_retry(
            || {
                http_client()
                    .post(&url)
                    .header("x-goog-api-key", self.api_key.expose())
                    .header("content-type", "application/json")
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = into_response(outcome).await?;
        let payload: Response = response
            .json()
            .await
            .map_err(|e| BackendError::Payload(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(BackendError::Api {
                status: error.code.unwrap_or(0).max(0) as u16,
                message: error.message_or_default().to_string(),
            });
        }

        let text = payload
            .text()
            .ok_or_else(|| BackendError::Payload("response carried no text".to_string()))?;

        session.record(prompt, &text);
        Ok(text)
    }

    /// Open a streaming continuation of `document` and forward its increments
    /// to `tx`, strictly in order.
    ///
    /// Returns `Err` only when the stream cannot be opened; once open, all
    /// failures are delivered in-band as [`StreamEvent::Error`] so the caller
    /// can keep partial output. Exactly one terminal event is sent unless the
    /// receiver goes away first.
    pub async fn stream_continue(
        &self,
        document: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let body = build_continue_body(document);

        let outcome = send_with_retry(
            || {
                http_client()
                    .post(&url)
                    .header("x-goog-api-key", self.api_key.expose())
                    .header("content-type", "application/json")
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = into_response(outcome).await?;
        process_sse_stream(response, &tx).await;
        Ok(())
    }
}

/// Map a retry outcome to a usable response or a [`BackendError`].
async fn into_response(outcome: RetryOutcome) -> Result<reqwest::Response, BackendError> {
    match outcome {
        RetryOutcome::Success(response) => Ok(response),
        RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            // The error body is usually a JSON envelope with a readable message
            let message = serde_json::from_str::<Response>(&body)
                .ok()
                .and_then(|r| r.error)
                .map_or(body, |e| e.message_or_default().to_string());
            Err(BackendError::Api { status, message })
        }
        RetryOutcome::ConnectionError { attempts, source } => Err(BackendError::Connect(format!(
            "{source} (after {attempts} attempts)"
        ))),
        RetryOutcome::NonRetryable(source) => Err(BackendError::Connect(source.to_string())),
    }
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

fn build_converse_body(session: &ChatSession, prompt: &str) -> Value {
    let mut contents: Vec<Value> = session
        .entries
        .iter()
        .map(|entry| {
            json!({
                "role": entry.role,
                "parts": [text_part(&entry.text)]
            })
        })
        .collect();
    contents.push(json!({
        "role": "user",
        "parts": [text_part(prompt)]
    }));

    json!({
        "contents": contents,
        "system_instruction": { "parts": [text_part(CO_AUTHOR_INSTRUCTION)] },
        "generationConfig": { "temperature": 1.0 }
    })
}

fn build_continue_body(document: &str) -> Value {
    let context = if document.trim().is_empty() {
        OPENING_PROMPT
    } else {
        document
    };

    json!({
        "contents": [{
            "role": "user",
            "parts": [text_part(context)]
        }],
        "system_instruction": { "parts": [text_part(CONTINUATION_INSTRUCTION)] },
        "generationConfig": { "temperature": 1.0 }
    })
}

/// Consume an open SSE response and forward [`StreamEvent`]s in order.
///
/// Handles idle timeouts, buffer caps, UTF-8 validation and a parse-error
/// threshold. Exactly one terminal event is emitted on every path (unless the
/// receiver has gone away, in which case events are dropped silently).
async fn process_sse_stream(response: reqwest::Response, tx: &mpsc::Sender<StreamEvent>) {
    use futures_util::StreamExt;

    let idle_timeout = stream_idle_timeout();
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut parse_errors = 0usize;

    loop {
        let Ok(next) = tokio::time::timeout(idle_timeout, stream.next()).await else {
            let _ = tx
                .send(StreamEvent::Error("stream idle timeout".to_string()))
                .await;
            return;
        };

        let Some(chunk) = next else { break };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        if buffer.len() > MAX_SSE_BUFFER_BYTES {
            let _ = tx
                .send(StreamEvent::Error(
                    "stream buffer exceeded maximum size (4 MiB)".to_string(),
                ))
                .await;
            return;
        }

        while let Some(event) = drain_next_sse_event(&mut buffer) {
            if event.is_empty() {
                continue;
            }

            let Ok(event) = std::str::from_utf8(&event) else {
                let _ = tx
                    .send(StreamEvent::Error(
                        "received invalid UTF-8 from stream".to_string(),
                    ))
                    .await;
                return;
            };

            let Some(data) = extract_sse_data(event) else {
                continue;
            };

            match serde_json::from_str::<Response>(&data) {
                Ok(payload) => {
                    parse_errors = 0;

                    if let Some(error) = payload.error {
                        let _ = tx
                            .send(StreamEvent::Error(error.message_or_default().to_string()))
                            .await;
                        return;
                    }

                    if let Some(text) = payload.text()
                        && tx.send(StreamEvent::Chunk(text)).await.is_err()
                    {
                        // Receiver torn down; nobody is listening anymore.
                        return;
                    }

                    match payload.finish_reason() {
                        Some("STOP") => {
                            let _ = tx.send(StreamEvent::Done).await;
                            return;
                        }
                        Some(reason) => {
                            let _ = tx
                                .send(StreamEvent::Error(format!(
                                    "generation stopped early: {reason}"
                                )))
                                .await;
                            return;
                        }
                        None => {}
                    }
                }
                Err(e) => {
                    parse_errors = parse_errors.saturating_add(1);
                    tracing::warn!(%e, payload_bytes = data.len(), "Invalid stream JSON payload");
                    if parse_errors >= MAX_SSE_PARSE_ERRORS {
                        let _ = tx
                            .send(StreamEvent::Error(
                                "stream produced repeated unparseable payloads".to_string(),
                            ))
                            .await;
                        return;
                    }
                }
            }
        }
    }

    // Byte stream ended without an explicit finish marker; the sequence is
    // finite, so treat a clean close as completion.
    let _ = tx.send(StreamEvent::Done).await;
}
