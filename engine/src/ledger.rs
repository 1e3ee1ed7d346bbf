//! Ordered transcript record.

use quill_types::{ConversationTurn, Role, TurnContent, TurnId};

/// Append/update log of conversation turns.
///
/// Pure ordered record: holds no backend state. Insertion order is the
/// rendered transcript order. `resolve` and `discard` tolerate unknown ids as
/// no-ops so overlapping or settled flows never fault.
#[derive(Debug, Default)]
pub struct ConversationLedger {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl ConversationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolved turn.
    pub fn append(&mut self, role: Role, content: TurnContent) -> TurnId {
        let id = self.allocate_id();
        self.turns.push(ConversationTurn::resolved(id, role, content));
        id
    }

    /// Append a provisional placeholder turn and hand its id to the owning
    /// orchestration.
    pub fn append_provisional(&mut self, role: Role, placeholder: &'static str) -> TurnId {
        let id = self.allocate_id();
        self.turns
            .push(ConversationTurn::provisional(id, role, placeholder));
        id
    }

    /// Resolve a provisional turn in place. No-op when the id is unknown or
    /// the turn already settled.
    pub fn resolve(&mut self, id: TurnId, content: TurnContent) {
        match self.turns.iter_mut().find(|turn| turn.id() == id) {
            Some(turn) if turn.is_provisional() => turn.resolve(content),
            Some(_) => tracing::debug!(%id, "resolve ignored: turn already settled"),
            None => tracing::debug!(%id, "resolve ignored: unknown turn"),
        }
    }

    /// Remove a turn entirely. No-op when the id is unknown.
    pub fn discard(&mut self, id: TurnId) {
        let before = self.turns.len();
        self.turns.retain(|turn| turn.id() != id);
        if self.turns.len() == before {
            tracing::debug!(%id, "discard ignored: unknown turn");
        }
    }

    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    fn allocate_id(&mut self) -> TurnId {
        let id = TurnId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
