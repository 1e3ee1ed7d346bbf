//! Core domain types for Quill.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod ids;
mod proofs;
mod theme;
mod turn;

pub use ids::TurnId;
pub use proofs::{EmptyStringError, NonEmptyString};
pub use theme::Theme;
pub use turn::{ConversationTurn, Role, TurnBody, TurnContent};

use std::fmt;

// ============================================================================
// Streaming Events
// ============================================================================

/// Events emitted by the gateway's streaming continuation.
///
/// The stream is a lazy, finite, non-restartable sequence: zero or more
/// [`StreamEvent::Chunk`]s followed by exactly one terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text produced by the backend.
    Chunk(String),
    /// Stream completed successfully.
    Done,
    /// Stream could not be opened or was interrupted mid-sequence.
    Error(String),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

// ============================================================================
// ApiKey
// ============================================================================

/// A backend credential.
///
/// Wrapped so the raw key can never leak through `Debug` formatting in logs
/// or panic messages.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}
