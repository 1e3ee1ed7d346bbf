//! Gateway to the generative-AI backend.
//!
//! # Architecture
//!
//! The application talks to the backend through exactly two operations on
//! [`gemini::GeminiGateway`]:
//!
//! - [`gemini::GeminiGateway::converse`] - one request/response turn against
//!   the `generateContent` API, with conversational memory accumulated in an
//!   opaque [`gemini::ChatSession`] handle
//! - [`gemini::GeminiGateway::stream_continue`] - a lazy continuation stream
//!   against `streamGenerateContent?alt=sse`, delivered as ordered
//!   [`StreamEvent`]s over a `tokio::sync::mpsc` channel
//!
//! Each operation carries a fixed, mode-specific system instruction supplied
//! at request-build time. The instructions are not user-editable and never
//! appear in the transcript.
//!
//! # Error Handling
//!
//! Failures to open a request surface as [`BackendError`] returns. Once a
//! stream is open, mid-sequence failures are delivered in-band as
//! [`StreamEvent::Error`] so partial output can be kept by the caller.

pub mod gemini;
pub mod retry;
pub mod sse_types;

use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;

pub use quill_types::StreamEvent;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

pub(crate) const MAX_SSE_BUFFER_BYTES: usize = 4 * 1024 * 1024;
pub(crate) const MAX_SSE_PARSE_ERRORS: usize = 3;
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Failure at the backend capability boundary.
///
/// Every variant is user-presentable; orchestrations convert these into
/// transcript content rather than propagating them.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend could not be reached at all.
    #[error("could not reach the model backend: {0}")]
    Connect(String),
    /// The backend answered with a non-success status (auth, quota, bad request).
    #[error("the model backend rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    /// An open stream was interrupted mid-sequence.
    #[error("the response stream was interrupted: {0}")]
    Stream(String),
    /// The backend answered with a payload we could not interpret.
    #[error("unexpected payload from the model backend: {0}")]
    Payload(String),
}

/// Process-wide hardened HTTP client.
///
/// No redirects, TLS only, connect timeout, TCP keepalive, pooled. Streaming
/// requests must not carry a total request timeout, so none is set here.
pub(crate) fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .expect("HTTP client must build; cannot proceed without one")
    })
}

/// Idle timeout between stream chunks, overridable for slow links via
/// `QUILL_STREAM_IDLE_TIMEOUT_SECS`.
pub(crate) fn stream_idle_timeout() -> Duration {
    static TIMEOUT: OnceLock<Duration> = OnceLock::new();
    *TIMEOUT.get_or_init(|| {
        let timeout = std::env::var("QUILL_STREAM_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_SECS);
        Duration::from_secs(timeout)
    })
}

/// Read a capped error body for diagnostics without trusting the backend to
/// bound its response size.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) => {
            let end = bytes.len().min(MAX_ERROR_BODY_BYTES);
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
        Err(e) => format!("<unreadable error body: {e}>"),
    }
}

// ============================================================================
// SSE byte-level plumbing
// ============================================================================

pub(crate) fn find_sse_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a <= b { (a, 2) } else { (b, 4) }),
        (Some(a), None) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

pub(crate) fn drain_next_sse_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (pos, delim_len) = find_sse_event_boundary(buffer)?;
    let event = buffer[..pos].to_vec();
    buffer.drain(..pos + delim_len);
    Some(event)
}

/// Extract the concatenated `data:` payload from one SSE event block.
pub(crate) fn extract_sse_data(event: &str) -> Option<String> {
    let mut data = String::new();
    let mut found = false;

    for line in event.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(mut rest) = line.strip_prefix("data:") {
            if let Some(stripped) = rest.strip_prefix(' ') {
                rest = stripped;
            }

            if found {
                data.push('\n');
            }
            data.push_str(rest);
            found = true;
        }
    }

    if found { Some(data) } else { None }
}
