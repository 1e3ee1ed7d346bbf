//! Engine event bus.
//!
//! Replaces the reactive re-render idiom with an explicit state container
//! plus notifications: the engine mutates its state, then emits an event; UI
//! layers subscribe and re-read whatever state the event names. Events carry
//! no transcript or document payloads, so a slow subscriber can lag without
//! holding clones of large state.

use std::path::PathBuf;

use tokio::sync::broadcast;

use quill_types::Theme;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notification that a piece of engine state changed.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The ledger changed: a turn was appended, resolved, or discarded.
    TranscriptUpdated,
    /// The manuscript buffer changed. Emitted once per streamed chunk.
    DocumentUpdated,
    /// The responder flag flipped; drives loading indicators.
    ResponderChanged(bool),
    /// An export was accepted and is in flight.
    ExportStarted,
    /// An export finished; the artifact is at the given path.
    ExportCompleted(PathBuf),
    /// The theme preference changed.
    ThemeChanged(Theme),
}

/// Broadcast fan-out for [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    #[must_use]
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. Having no subscribers is not an error; the engine does
    /// not care whether anyone is watching.
    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
