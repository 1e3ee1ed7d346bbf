//! Typed structures for Gemini API responses.
//!
//! The non-streaming `generateContent` body and each `streamGenerateContent`
//! SSE payload share the same shape, so one set of types serves both paths.
//! Parse errors happen at the serde boundary, not scattered through the
//! processing logic; `#[serde(default)]` keeps unknown or absent fields from
//! failing the whole payload.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

/// In-band error object, delivered either as a whole-response body or as a
/// final SSE payload when a stream dies mid-sequence.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn message_or_default(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("unspecified backend error")
    }
}

impl Response {
    /// Concatenated text across all parts of the first candidate.
    ///
    /// Returns `None` when the payload carries no text at all (pure metadata
    /// chunks such as a bare `finishReason`).
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.as_ref()?.first()?;
        let parts = candidate.content.as_ref()?.parts.as_ref()?;
        let mut out = String::new();
        for part in parts {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }

    /// Finish reason of the first candidate, if present.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.as_ref()?.first()?.finish_reason.as_deref()
    }
}
