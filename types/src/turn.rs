//! Conversation turn domain model.
//!
//! A turn's body is a sum type: it is either still provisional (a placeholder
//! shown while an orchestration is in flight) or resolved to final content.
//! Resolved-but-still-thinking is unrepresentable.

use crate::ids::TurnId;
use crate::proofs::NonEmptyString;

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Final content of a resolved turn: plain text, or a structured payload the
/// presentation layer renders specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnContent {
    Text(NonEmptyString),
    /// Signals the presentation layer to offer a target-language choice for
    /// the pending translation.
    LanguagePicker { languages: Vec<&'static str> },
}

impl TurnContent {
    /// Plain-text rendering used by surfaces that have no special handling
    /// for structured payloads.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(text) => text.as_str(),
            Self::LanguagePicker { .. } => "Choose a language for the translation.",
        }
    }
}

/// Body of a turn: provisional placeholder or resolved content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnBody {
    /// Placeholder shown while the owning orchestration is in flight.
    Provisional { placeholder: &'static str },
    /// Final content; a turn reaches this state exactly once.
    Resolved { content: TurnContent },
}

/// One entry in the visible conversation transcript.
///
/// Identity is immutable; the body is mutated exactly once, by the ledger,
/// when the owning orchestration resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    id: TurnId,
    role: Role,
    body: TurnBody,
}

impl ConversationTurn {
    #[must_use]
    pub fn resolved(id: TurnId, role: Role, content: TurnContent) -> Self {
        Self {
            id,
            role,
            body: TurnBody::Resolved { content },
        }
    }

    #[must_use]
    pub fn provisional(id: TurnId, role: Role, placeholder: &'static str) -> Self {
        Self {
            id,
            role,
            body: TurnBody::Provisional { placeholder },
        }
    }

    #[must_use]
    pub const fn id(&self) -> TurnId {
        self.id
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn body(&self) -> &TurnBody {
        &self.body
    }

    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        matches!(self.body, TurnBody::Provisional { .. })
    }

    /// Plain-text rendering of the body, placeholder included.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match &self.body {
            TurnBody::Provisional { placeholder } => placeholder,
            TurnBody::Resolved { content } => content.display_text(),
        }
    }

    /// Replace the provisional body with final content.
    ///
    /// The ledger is the only caller and guarantees this happens at most once
    /// per turn.
    pub fn resolve(&mut self, content: TurnContent) {
        self.body = TurnBody::Resolved { content };
    }
}
