//! The application engine: entry points and poll-driven settlement.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

use quill_export::{ExportPhase, ExportPipeline};
use quill_providers::BackendError;
use quill_providers::gemini::{ChatSession, GeminiGateway};
use quill_types::{ConversationTurn, NonEmptyString, Role, StreamEvent, Theme, TurnContent};

use crate::config::EngineConfig;
use crate::document::DocumentContent;
use crate::events::{EngineEvent, EventBus};
use crate::ledger::ConversationLedger;
use crate::prefs;
use crate::prompts;
use crate::responder::ResponderGate;
use crate::state::{ActiveContinuation, ActiveTurn, OperationState};

const STREAM_CHANNEL_CAPACITY: usize = 256;

/// The orchestration engine.
///
/// Owned and mutated by a single caller task; gateway calls run as spawned
/// tasks that report back over channels, and [`App::poll`] is the cooperative
/// interleaving point that applies their results. Because all mutation
/// happens on the owning task, the ledger and document need no locks.
pub struct App {
    ledger: ConversationLedger,
    document: DocumentContent,
    selection: String,
    gate: ResponderGate,
    state: OperationState,
    gateway: Arc<GeminiGateway>,
    session: Arc<Mutex<ChatSession>>,
    export: ExportPipeline,
    events: EventBus,
    theme: Theme,
    prefs_path: Option<PathBuf>,
}

impl App {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let EngineConfig {
            api_key,
            model,
            api_base,
            export_dir,
            prefs_path,
        } = config;

        let mut gateway = GeminiGateway::new(api_key, model);
        if let Some(base) = api_base {
            gateway = gateway.with_base_url(base);
        }
        Self::from_parts(gateway, export_dir, prefs_path)
    }

    /// Assemble an engine from an already-built gateway. Test suites use this
    /// to aim the gateway at a local mock.
    #[must_use]
    pub fn from_parts(
        gateway: GeminiGateway,
        export_dir: PathBuf,
        prefs_path: Option<PathBuf>,
    ) -> Self {
        let events = EventBus::new();
        let theme = prefs_path
            .as_deref()
            .map(prefs::load_theme)
            .unwrap_or_default();

        Self {
            ledger: ConversationLedger::new(),
            document: DocumentContent::new(),
            selection: String::new(),
            gate: ResponderGate::new(events.clone()),
            state: OperationState::Idle,
            gateway: Arc::new(gateway),
            session: Arc::new(Mutex::new(ChatSession::new())),
            export: ExportPipeline::new(export_dir),
            events,
            theme,
            prefs_path,
        }
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        self.ledger.turns()
    }

    #[must_use]
    pub fn document_text(&self) -> &str {
        self.document.text()
    }

    #[must_use]
    pub fn selection(&self) -> &str {
        &self.selection
    }

    #[must_use]
    pub fn is_responding(&self) -> bool {
        self.gate.is_responding()
    }

    #[must_use]
    pub fn export_phase(&self) -> ExportPhase {
        self.export.phase()
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    // ------------------------------------------------------------------
    // Editor surface writes
    // ------------------------------------------------------------------

    /// Direct user edit of the manuscript.
    pub fn edit_document(&mut self, text: impl Into<String>) {
        self.document.set(text.into());
        self.events.emit(EngineEvent::DocumentUpdated);
    }

    /// Splice accepted suggestion text at a caret position (in chars).
    pub fn insert_suggestion(&mut self, char_offset: usize, text: &str) {
        self.document.splice(char_offset, text);
        self.events.emit(EngineEvent::DocumentUpdated);
    }

    /// Update the selection snapshot. Orchestrations capture it at their own
    /// invocation; later changes never affect an in-flight prompt.
    pub fn set_selection(&mut self, selection: impl Into<String>) {
        self.selection = selection.into();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Some(path) = &self.prefs_path
            && let Err(e) = prefs::save_theme(path, theme)
        {
            tracing::warn!(%e, "Failed to persist theme preference");
        }
        self.events.emit(EngineEvent::ThemeChanged(theme));
    }

    // ------------------------------------------------------------------
    // Orchestration entry points
    // ------------------------------------------------------------------

    /// Free-form chat: the prompt is both visible and effective.
    pub fn send_chat(&mut self, prompt: &str) {
        if prompt.trim().is_empty() {
            return;
        }
        self.begin_turn(Some(prompt), prompt.to_string());
    }

    pub fn suggest_titles(&mut self) {
        let prompt = prompts::suggest_titles(self.document.text());
        self.begin_turn(None, prompt);
    }

    pub fn character_ideas(&mut self) {
        let prompt = prompts::character_ideas(self.document.text());
        self.begin_turn(None, prompt);
    }

    pub fn plot_twist(&mut self) {
        let prompt = prompts::plot_twist(self.document.text());
        self.begin_turn(None, prompt);
    }

    /// Improve the selected passage. With nothing selected, no orchestration
    /// starts; a system advisory lands in the transcript instead.
    pub fn improve_selection(&mut self) {
        let selection = self.selection.trim().to_string();
        if selection.is_empty() {
            self.append_advisory(prompts::SELECT_TO_IMPROVE.to_string());
            return;
        }
        self.begin_turn(None, prompts::improve(&selection));
    }

    /// First phase of translation: ask the presentation layer to offer a
    /// language choice.
    pub fn request_translation(&mut self) {
        if self.selection.trim().is_empty() {
            self.append_advisory(prompts::SELECT_TO_TRANSLATE.to_string());
            return;
        }
        self.ledger.append(
            Role::System,
            TurnContent::LanguagePicker {
                languages: prompts::TRANSLATION_LANGUAGES.to_vec(),
            },
        );
        self.events.emit(EngineEvent::TranscriptUpdated);
    }

    /// Second phase of translation: the user picked a language.
    ///
    /// The selection is re-validated; it may have been cleared between the
    /// picker turn and the choice.
    pub fn translate_into(&mut self, language: &str) {
        let selection = self.selection.trim().to_string();
        if selection.is_empty() {
            self.append_advisory(prompts::SELECT_TO_TRANSLATE.to_string());
            return;
        }
        self.begin_turn(None, prompts::translate(&selection, language));
    }

    /// Continue the story: stream increments straight into the manuscript.
    pub fn continue_story(&mut self) {
        let Some(guard) = self.gate.try_begin() else {
            tracing::debug!("continue-writing dropped: an orchestration is already in flight");
            return;
        };

        let placeholder = self
            .ledger
            .append_provisional(Role::Assistant, prompts::CONTINUING_PLACEHOLDER);
        self.events.emit(EngineEvent::TranscriptUpdated);

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let gateway = Arc::clone(&self.gateway);
        let document = self.document.text().to_string();

        tokio::spawn(async move {
            if let Err(e) = gateway.stream_continue(&document, tx.clone()).await {
                // Open failures arrive in-band like mid-stream ones.
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
            }
        });

        self.state = OperationState::Continuation(ActiveContinuation {
            placeholder,
            rx,
            appended: false,
            _guard: guard,
        });
    }

    /// Export the manuscript as it reads right now. Blank documents and
    /// requests during an in-flight export are dropped silently.
    pub fn export_story(&mut self) {
        if self.export.request(self.document.text()) {
            self.events.emit(EngineEvent::ExportStarted);
        }
    }

    // ------------------------------------------------------------------
    // Poll-driven settlement
    // ------------------------------------------------------------------

    /// Advance all in-flight work. The single cooperative interleaving point:
    /// call it on a fixed cadence from the owning task.
    pub fn poll(&mut self) {
        self.poll_turn();
        self.poll_continuation();
        self.poll_export();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Generic request/response turn.
    ///
    /// `visible_prompt` is appended as a user turn when present; the backend
    /// receives `effective_prompt`, which for silent actions is a hidden
    /// instruction the transcript never shows.
    fn begin_turn(&mut self, visible_prompt: Option<&str>, effective_prompt: String) {
        let Some(guard) = self.gate.try_begin() else {
            tracing::debug!("turn request dropped: an orchestration is already in flight");
            return;
        };

        if let Some(prompt) = visible_prompt
            && let Ok(content) = NonEmptyString::new(prompt)
        {
            self.ledger.append(Role::User, TurnContent::Text(content));
        }
        let placeholder = self
            .ledger
            .append_provisional(Role::Assistant, prompts::THINKING_PLACEHOLDER);
        self.events.emit(EngineEvent::TranscriptUpdated);

        let (tx, rx) = oneshot::channel();
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);

        tokio::spawn(async move {
            let result = {
                let mut session = session.lock().await;
                gateway.converse(&mut session, &effective_prompt).await
            };
            // A dropped receiver means the engine was torn down; the result
            // has nowhere to go and must not resurrect state.
            let _ = tx.send(result);
        });

        self.state = OperationState::Turn(ActiveTurn {
            placeholder,
            rx,
            _guard: guard,
        });
    }

    fn poll_turn(&mut self) {
        let result = match &mut self.state {
            OperationState::Turn(active) => match active.rx.try_recv() {
                Ok(result) => result,
                Err(oneshot::error::TryRecvError::Empty) => return,
                Err(oneshot::error::TryRecvError::Closed) => Err(BackendError::Connect(
                    "the request task ended unexpectedly".to_string(),
                )),
            },
            _ => return,
        };

        let OperationState::Turn(active) = std::mem::replace(&mut self.state, OperationState::Idle)
        else {
            return;
        };

        let content = match result {
            Ok(text) => resolved_content(text),
            Err(e) => error_content(&e.to_string()),
        };
        self.ledger.resolve(active.placeholder, content);
        self.events.emit(EngineEvent::TranscriptUpdated);
        // `active` drops here; its guard clears the responder flag.
    }

    fn poll_continuation(&mut self) {
        let mut terminal: Option<StreamEvent> = None;

        if let OperationState::Continuation(active) = &mut self.state {
            loop {
                match active.rx.try_recv() {
                    Ok(StreamEvent::Chunk(text)) => {
                        // One chunk at a time: each is applied and announced
                        // before the next is taken. No batching.
                        let first = !active.appended;
                        active.appended = true;
                        self.document.append_chunk(&text, first);
                        self.events.emit(EngineEvent::DocumentUpdated);
                    }
                    Ok(event) => {
                        terminal = Some(event);
                        break;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        terminal = Some(StreamEvent::Error(
                            "the stream task ended unexpectedly".to_string(),
                        ));
                        break;
                    }
                }
            }
        }

        let Some(event) = terminal else { return };
        let OperationState::Continuation(active) =
            std::mem::replace(&mut self.state, OperationState::Idle)
        else {
            return;
        };

        match event {
            StreamEvent::Done => {
                // Streamed prose lives in the document now; the placeholder
                // has nothing left to say.
                self.ledger.discard(active.placeholder);
            }
            StreamEvent::Error(message) => {
                // Partial content already appended is kept; continuation is
                // best-effort and resumable by re-invoking the action.
                self.ledger
                    .resolve(active.placeholder, error_content(&message));
            }
            StreamEvent::Chunk(_) => {}
        }
        self.events.emit(EngineEvent::TranscriptUpdated);
    }

    fn poll_export(&mut self) {
        let Some(result) = self.export.poll() else {
            return;
        };
        match result {
            Ok(path) => self.events.emit(EngineEvent::ExportCompleted(path)),
            Err(e) => self.append_advisory(format!("Export failed: {e}")),
        }
    }

    fn append_advisory(&mut self, text: String) {
        let content = NonEmptyString::new(text).expect("advisory text is never empty");
        self.ledger.append(Role::System, TurnContent::Text(content));
        self.events.emit(EngineEvent::TranscriptUpdated);
    }
}

fn resolved_content(text: String) -> TurnContent {
    match NonEmptyString::new(text) {
        Ok(content) => TurnContent::Text(content),
        Err(_) => TurnContent::Text(
            NonEmptyString::new(prompts::EMPTY_RESPONSE).expect("badge text is never empty"),
        ),
    }
}

fn error_content(message: &str) -> TurnContent {
    let text = format!("{}: {message}", prompts::ERROR_PREFIX);
    TurnContent::Text(NonEmptyString::new(text).expect("error text is never empty"))
}
