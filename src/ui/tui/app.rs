//! TUI runtime loop: the reference host wiring marks, commands, and the
//! transfer session together.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::{CrosstermBackend, Terminal};
use std::cell::RefCell;
use tokio::time::{interval, MissedTickBehavior};

use super::listing::DirListing;
use super::render;
use crate::command::{FsProbe, PathLocator};
use crate::common::config::AppConfig;
use crate::host::{ListingView, Notifier, Severity};
use crate::marks::MarkStore;
use crate::ops::{self, RemovePlan, UploadKind};
use crate::session::{supervise, SessionUpdate, SurfaceSize, SystemBackend, TransferSession};

/// Render and input poll interval.
const RENDER_INTERVAL: Duration = Duration::from_millis(50);

/// Status-line notification sink. Single-threaded by design: every
/// notification is produced on the event loop.
pub struct StatusSink {
    last: RefCell<Option<(Severity, String)>>,
}

impl StatusSink {
    fn new() -> Self {
        Self {
            last: RefCell::new(None),
        }
    }

    pub fn current(&self) -> Option<(Severity, String)> {
        self.last.borrow().clone()
    }
}

impl Notifier for StatusSink {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(message),
            Severity::Warning => tracing::warn!(message),
            Severity::Error => tracing::error!(message),
        }
        *self.last.borrow_mut() = Some((severity, message.to_string()));
    }
}

/// One in-flight transfer and everything needed to finish it.
struct ActiveTransfer {
    session: TransferSession,
    remove_plan: Option<RemovePlan>,
    rendered: String,
    output: Vec<String>,
}

pub struct App {
    config: AppConfig,
    store: MarkStore,
    view: DirListing,
    sink: StatusSink,
    active: Option<ActiveTransfer>,
    prompt: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, start_dir: PathBuf) -> Result<Self> {
        let view = DirListing::open(1, &start_dir)?;
        Ok(Self {
            config,
            store: MarkStore::new(),
            view,
            sink: StatusSink::new(),
            active: None,
            prompt: None,
            should_quit: false,
        })
    }

    pub fn view(&self) -> &DirListing {
        &self.view
    }

    pub fn sink(&self) -> &StatusSink {
        &self.sink
    }

    pub fn mark_count(&self) -> usize {
        self.store.len()
    }

    pub fn destination(&self) -> &str {
        &self.config.transfer.destination
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Rendered command plus captured output for the pane, while a session
    /// runs and the pane is enabled.
    pub fn transfer_output(&self) -> Option<(&str, &[String])> {
        if !self.config.tui.show_output_pane {
            return None;
        }
        self.active
            .as_ref()
            .map(|a| (a.rendered.as_str(), a.output.as_slice()))
    }

    async fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.prompt.is_some() {
            self.on_prompt_key(key).await;
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                if self.active.is_some() {
                    self.sink
                        .notify(Severity::Warning, "A transfer is still running");
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char(':') => self.prompt = Some(String::new()),
            KeyCode::Char('j') | KeyCode::Down => self.view.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.view.move_cursor(-1),
            KeyCode::Enter => {
                if let Some(dir) = self.view.cursor_dir() {
                    self.change_dir(dir);
                }
            }
            KeyCode::Backspace => {
                if let Some(parent) = self.view.parent() {
                    self.change_dir(parent);
                }
            }
            KeyCode::Char('R') => {
                if self.view.reload().is_ok() {
                    self.store.on_view_reset(&mut self.view);
                }
            }
            code if self.config.install_default_keybindings => match code {
                KeyCode::Char('m') => {
                    ops::toggle_mark(&mut self.store, &mut self.view, &self.sink);
                }
                KeyCode::Char('u') => self.start_upload(UploadKind::Keep).await,
                KeyCode::Char('U') => self.start_upload(UploadKind::RemoveSources).await,
                KeyCode::Char('c') => self.clear_marks(),
                _ => {}
            },
            _ => {}
        }
    }

    async fn on_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                if let Some(prompt) = &mut self.prompt {
                    if prompt.pop().is_none() {
                        self.prompt = None;
                    }
                }
            }
            KeyCode::Enter => {
                if let Some(line) = self.prompt.take() {
                    self.run_command(&line).await;
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.push(c);
                }
            }
            _ => {}
        }
    }

    /// The four registry commands, as typed at the `:` prompt.
    async fn run_command(&mut self, line: &str) {
        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(err) => {
                self.sink
                    .notify(Severity::Error, &format!("Bad command line: {err}"));
                return;
            }
        };
        match words.split_first() {
            None => {}
            Some((cmd, args)) => match (cmd.as_str(), args) {
                ("set-destination", [target]) => {
                    self.config.transfer.destination = target.clone();
                    self.sink
                        .notify(Severity::Info, &format!("Destination set to {target}"));
                }
                ("set-destination", _) => {
                    self.sink
                        .notify(Severity::Error, "Usage: set-destination <target>");
                }
                ("upload", []) => self.start_upload(UploadKind::Keep).await,
                ("upload-and-remove", []) => self.start_upload(UploadKind::RemoveSources).await,
                ("clear-marks", []) => self.clear_marks(),
                _ => {
                    self.sink
                        .notify(Severity::Error, &format!("Unknown command: {cmd}"));
                }
            },
        }
    }

    fn clear_marks(&mut self) {
        ops::clear_marks(
            &mut self.store,
            [&mut self.view as &mut dyn ListingView],
            &self.sink,
        );
    }

    fn change_dir(&mut self, dir: PathBuf) {
        match self.view.enter(dir) {
            Ok(()) => self.store.on_view_reset(&mut self.view),
            Err(err) => self.sink.notify(Severity::Error, &err.to_string()),
        }
    }

    /// Validates, builds, and launches a transfer. One session at a time;
    /// a second request while one runs is refused here, on the caller side.
    async fn start_upload(&mut self, kind: UploadKind) {
        if self.active.is_some() {
            self.sink
                .notify(Severity::Warning, "A transfer is already running");
            return;
        }
        let prepared = match ops::prepare_upload(
            kind,
            &self.store,
            &self.config.transfer,
            &PathLocator,
            &FsProbe,
        ) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.sink.notify(err.severity(), &err.to_string());
                return;
            }
        };

        let surface = surface_size();
        match TransferSession::launch(&SystemBackend, &prepared.command, surface).await {
            Ok(session) => {
                self.sink.notify(Severity::Info, "Transfer started");
                self.active = Some(ActiveTransfer {
                    session,
                    remove_plan: prepared.remove_plan,
                    rendered: prepared.command.rendered(),
                    output: Vec::new(),
                });
            }
            Err(err) => {
                self.sink
                    .notify(Severity::Error, &format!("Failed to start transfer: {err}"));
            }
        }
    }

    /// Drains session events accumulated since the last tick.
    async fn pump_session(&mut self) {
        let mut finished = false;
        if let Some(active) = &mut self.active {
            let scrollback = self.config.tui.output_scrollback;
            while let Some(update) = active.session.try_update() {
                match update {
                    SessionUpdate::Output(line) => {
                        active.output.push(line);
                        if active.output.len() > scrollback {
                            let excess = active.output.len() - scrollback;
                            active.output.drain(..excess);
                        }
                    }
                    SessionUpdate::Finished(_) => {
                        finished = true;
                        break;
                    }
                }
            }
        }
        if finished {
            self.finish_transfer().await;
        }
    }

    /// Dispatches the terminal outcome: notification first, then (for a
    /// remove-upload) the directory sweep and mark clearing.
    async fn finish_transfer(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let had_plan = active.remove_plan.is_some();

        let action = active.remove_plan.take().map(|plan| {
            ops::remove_success_action(
                plan,
                &mut self.store,
                vec![&mut self.view as &mut dyn ListingView],
                &self.sink,
            )
        });

        let state = supervise(&mut active.session, &self.sink, action).await;
        if had_plan && state == crate::session::SessionState::Succeeded {
            // Sources vanished; show the new truth.
            if self.view.reload().is_ok() {
                self.store.on_view_reset(&mut self.view);
            }
        }
    }
}

fn surface_size() -> SurfaceSize {
    crossterm::terminal::size()
        .map(|(cols, rows)| SurfaceSize { rows, cols })
        .unwrap_or_default()
}

/// Runs the browser until the user quits.
pub async fn run_browser(config: AppConfig, start_dir: PathBuf) -> Result<()> {
    let mut app = App::new(config, start_dir)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    // Throttle rendering; unchecked it dominates the loop.
    let mut render_tick = interval(RENDER_INTERVAL);
    render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        render_tick.tick().await;

        app.pump_session().await;
        terminal.draw(|frame| render::draw(frame, app))?;

        // Non-blocking input poll keeps the loop responsive.
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key).await;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
