//! Core engine for Quill - orchestration state machine without UI dependencies.
//!
//! The engine owns the conversation ledger, the shared manuscript buffer, the
//! responder admission gate and the export pipeline, and drives every backend
//! interaction as a poll-advanced operation:
//!
//! 1. An entry point ([`App::send_chat`], [`App::continue_story`], ...)
//!    acquires the gate, appends transcript state and spawns the gateway call.
//! 2. [`App::poll`] drains the operation's channel and settles it, resolving
//!    or discarding the provisional turn and releasing the gate.
//!
//! UI layers subscribe to [`EngineEvent`]s instead of reaching into engine
//! state, so the core stays independent of any rendering framework.

mod app;
mod config;
mod document;
mod events;
mod ledger;
mod prefs;
mod prompts;
mod responder;
mod state;

pub use app::App;
pub use config::{ConfigError, DEFAULT_MODEL, EngineConfig, QuillConfig, config_file_path, data_dir};
pub use document::DocumentContent;
pub use events::{EngineEvent, EventBus};
pub use ledger::ConversationLedger;
pub use prefs::{load_theme, save_theme};
pub use responder::ResponderGate;

// Re-export from crates for public API
pub use quill_export::{ARTIFACT_FILENAME, ExportPhase, ExportPipeline};
pub use quill_providers::{
    self, BackendError,
    gemini::{ChatSession, GeminiGateway},
    retry::RetryConfig,
};
pub use quill_types::{
    ApiKey, ConversationTurn, EmptyStringError, NonEmptyString, Role, StreamEvent, Theme, TurnBody,
    TurnContent, TurnId,
};
