//! Quill CLI - binary entry point and the thin UI action surface.
//!
//! # Architecture
//!
//! The CLI owns the [`App`] engine and drives it from a single task:
//!
//! 1. Wait for either a line of input or the next poll tick
//! 2. Map commands onto engine entry points (1:1 with the action surface)
//! 3. Advance in-flight work (`app.poll()`)
//! 4. Drain engine events and render the resulting state changes
//!
//! The transcript, document and export state are all read back through the
//! engine; the CLI keeps only enough of a shadow copy to render diffs.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quill_engine::{App, EngineEvent, QuillConfig, Role, Theme, TurnId, data_dir};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    if let Some(file) = open_log_file() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        return;
    }

    // If we can't open a log file, prefer "no logs" over writing into the
    // interactive session on stdout/stderr.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> Option<std::fs::File> {
    let path: PathBuf = data_dir().join("logs").join("quill.log");
    let parent = path.parent()?;
    fs::create_dir_all(parent).ok()?;
    OpenOptions::new().create(true).append(true).open(path).ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = QuillConfig::load().context("could not load configuration")?;
    // A missing credential is a fatal startup condition: the process must not
    // run misconfigured.
    let resolved = config.resolve()?;

    let mut app = App::new(resolved);
    print_banner(app.theme());

    run(&mut app).await
}

fn print_banner(theme: Theme) {
    println!("quill - an AI co-writing studio ({} theme)", theme.as_str());
    println!("Type /help for commands; anything else is sent to your co-author.");
}

async fn run(app: &mut App) -> Result<()> {
    let mut events = app.subscribe();
    let mut view = View::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(POLL_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("stdin closed unexpectedly")? else {
                    break;
                };
                if !handle_line(app, line.trim()) {
                    break;
                }
            }
            _ = tick.tick() => {
                app.poll();
            }
        }

        view.drain(&mut events, app);
    }

    Ok(())
}

/// Map one input line onto the engine's action surface.
///
/// Returns `false` when the session should end.
fn handle_line(app: &mut App, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    let (command, rest) = match line.strip_prefix('/') {
        Some(command_line) => {
            let mut parts = command_line.splitn(2, ' ');
            (
                parts.next().unwrap_or_default(),
                parts.next().unwrap_or_default().trim(),
            )
        }
        None => {
            app.send_chat(line);
            return true;
        }
    };

    match command {
        "q" | "quit" => return false,
        "help" => print_help(),
        "continue" => app.continue_story(),
        "titles" => app.suggest_titles(),
        "characters" => app.character_ideas(),
        "twist" => app.plot_twist(),
        "improve" => app.improve_selection(),
        "translate" => app.request_translation(),
        "lang" => {
            if rest.is_empty() {
                println!("usage: /lang <language>");
            } else {
                app.translate_into(rest);
            }
        }
        "select" => app.set_selection(rest),
        "write" => app.edit_document(rest),
        "insert" => {
            let mut parts = rest.splitn(2, ' ');
            let offset = parts.next().and_then(|p| p.parse::<usize>().ok());
            match (offset, parts.next()) {
                (Some(offset), Some(text)) => app.insert_suggestion(offset, text),
                _ => println!("usage: /insert <char-offset> <text>"),
            }
        }
        "show" => println!("---\n{}\n---", app.document_text()),
        "export" => app.export_story(),
        "theme" => {
            let theme = match rest {
                "light" => Theme::Light,
                "dark" => Theme::Dark,
                "" => app.theme().toggled(),
                other => {
                    println!("unknown theme: {other}");
                    return true;
                }
            };
            app.set_theme(theme);
        }
        other => println!("unknown command: /{other} (try /help)"),
    }

    true
}

fn print_help() {
    println!(
        "\
  /continue            continue writing the story
  /titles              suggest titles
  /characters          suggest character ideas
  /twist               propose a plot twist
  /select <text>       set the current selection
  /improve             improve the selected passage
  /translate           translate the selected passage (then /lang <language>)
  /write <text>        replace the manuscript
  /insert <pos> <text> splice text at a character offset
  /show                print the manuscript
  /export              export the manuscript as a PDF
  /theme [light|dark]  switch theme
  /quit                exit
  anything else        chat with your co-author"
    );
}

/// Shadow of rendered state, used to print diffs as engine events arrive.
#[derive(Default)]
struct View {
    rendered: HashMap<TurnId, String>,
    order: Vec<TurnId>,
    document_len: usize,
    inline_stream: bool,
}

impl View {
    fn drain(&mut self, events: &mut broadcast::Receiver<EngineEvent>, app: &App) {
        loop {
            match events.try_recv() {
                Ok(event) => self.render(event, app),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    fn render(&mut self, event: EngineEvent, app: &App) {
        match event {
            EngineEvent::TranscriptUpdated => self.render_transcript(app),
            EngineEvent::DocumentUpdated => self.render_document(app),
            EngineEvent::ResponderChanged(responding) => {
                if !responding && self.inline_stream {
                    self.inline_stream = false;
                    println!();
                }
            }
            EngineEvent::ExportStarted => println!("Exporting story…"),
            EngineEvent::ExportCompleted(path) => {
                println!("Story exported to {}", path.display());
            }
            EngineEvent::ThemeChanged(theme) => println!("Theme set to {}", theme.as_str()),
        }
    }

    fn render_transcript(&mut self, app: &App) {
        let mut seen = Vec::with_capacity(app.turns().len());
        for turn in app.turns() {
            seen.push(turn.id());
            let text = turn.display_text();
            let known = self.rendered.get(&turn.id());
            if known.is_some_and(|prev| prev == text) {
                continue;
            }
            self.end_inline_stream();
            println!("[{}] {text}", role_tag(turn.role()));
            self.rendered.insert(turn.id(), text.to_string());
        }
        self.order = seen;
        self.rendered.retain(|id, _| self.order.contains(id));
    }

    fn render_document(&mut self, app: &App) {
        let doc = app.document_text();
        // Streamed growth: print just the new suffix, inline. Direct edits
        // update the shadow length without echoing the document back.
        if app.is_responding()
            && doc.len() > self.document_len
            && doc.is_char_boundary(self.document_len)
        {
            print!("{}", &doc[self.document_len..]);
            let _ = std::io::stdout().flush();
            self.inline_stream = true;
        }
        self.document_len = doc.len();
    }

    fn end_inline_stream(&mut self) {
        if self.inline_stream {
            self.inline_stream = false;
            println!();
        }
    }
}

const fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "quill",
        Role::System => "note",
    }
}
