use std::future;
use std::io;
use std::time::Duration;

use crossterm::event::{Event, KeyEventKind};
use futures::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio::time::Interval;
use tracing::{debug, info, warn};

use crate::buffer::{StreamBuffer, plain_text};
use crate::classify::{LineKind, classify, detect_phase};
use crate::command::Operation;
use crate::config::Config;
use crate::dashboard::{BuildStatus, DashboardState};
use crate::effects::Intent;
use crate::error::ConsoleError;
use crate::event::{Action, BuildEvent, Message, ProjectContext};
use crate::issues::{Issue, IssuesStore, Severity};
use crate::phase::{PhaseModel, Row};
use crate::search::{SearchState, jump_to_match};
use crate::tui::{View, ViewTabs, handle_key};

/// Spinner and elapsed-time refresh period
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// How long quitting waits for a canceled driver to exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal mode
    Normal,
    /// Search mode
    Search,
}

/// Presentation of the stream view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Flat,
    Grouped,
    Cards,
}

impl StreamMode {
    pub fn next(self) -> Self {
        match self {
            Self::Flat => Self::Grouped,
            Self::Grouped => Self::Cards,
            Self::Cards => Self::Flat,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Grouped => "grouped",
            Self::Cards => "cards",
        }
    }
}

/// Scroll primitive from the key layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    Up(usize),
    Down(usize),
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// Application state
///
/// Owns every model the views read. All mutation happens in [`App::update`].
pub struct App {
    config: Config,
    tabs: ViewTabs,
    mode: Mode,
    stream_mode: StreamMode,
    stream: StreamBuffer,
    issues: IssuesStore,
    phases: PhaseModel,
    dashboard: DashboardState,
    search_state: SearchState,
    search_dirty: bool,
    operation: Option<Operation>,
    context_rx: Option<oneshot::Receiver<ProjectContext>>,
    pending_action: Option<Action>,
    status_message: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let buffer = &config.buffer;
        Self {
            stream: StreamBuffer::new(buffer.max_lines)
                .with_follow_tolerance(buffer.follow_tolerance),
            issues: IssuesStore::new(buffer.max_issues),
            phases: PhaseModel::new(buffer.max_lines, config.phases.smart_collapse),
            tabs: ViewTabs::new(),
            mode: Mode::Normal,
            stream_mode: StreamMode::Flat,
            dashboard: DashboardState::new(),
            search_state: SearchState::new(),
            search_dirty: false,
            operation: None,
            context_rx: None,
            pending_action: None,
            status_message: None,
            should_quit: false,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Deliver the discovered context through `rx`
    pub fn set_context_receiver(&mut self, rx: oneshot::Receiver<ProjectContext>) {
        self.context_rx = Some(rx);
    }

    /// Start `action` as soon as the context is loaded
    pub fn set_pending_action(&mut self, action: Option<Action>) {
        self.pending_action = action;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Quit when idle
    pub fn quit(&mut self) {
        if self.is_running() {
            self.status_message =
                Some("Operation running: Esc cancels, Ctrl-C cancels and quits".to_string());
        } else {
            self.should_quit = true;
        }
    }

    /// Cancel any running operation, then quit
    pub fn request_quit(&mut self) {
        self.cancel();
        self.should_quit = true;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn view(&self) -> View {
        self.tabs.current()
    }

    pub fn tabs(&self) -> &ViewTabs {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut ViewTabs {
        &mut self.tabs
    }

    pub fn stream_mode(&self) -> StreamMode {
        self.stream_mode
    }

    pub fn cycle_stream_mode(&mut self) {
        self.stream_mode = self.stream_mode.next();
    }

    /// Leave the flat view for one backed by the phase model
    fn ensure_grouped(&mut self) {
        if self.stream_mode == StreamMode::Flat {
            self.stream_mode = StreamMode::Grouped;
        }
    }

    pub fn stream(&self) -> &StreamBuffer {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut StreamBuffer {
        &mut self.stream
    }

    pub fn issues(&self) -> &IssuesStore {
        &self.issues
    }

    pub fn issues_mut(&mut self) -> &mut IssuesStore {
        &mut self.issues
    }

    pub fn phases(&self) -> &PhaseModel {
        &self.phases
    }

    pub fn phases_mut(&mut self) -> &mut PhaseModel {
        &mut self.phases
    }

    pub fn dashboard(&self) -> &DashboardState {
        &self.dashboard
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search_state
    }

    pub fn search_state_mut(&mut self) -> &mut SearchState {
        &mut self.search_state
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.dashboard.is_running()
    }

    /// Ticks only matter while something animates
    pub fn needs_tick(&self) -> bool {
        self.is_running() || !self.dashboard.context_loaded
    }

    /// Rows available to the scrollable views
    pub fn set_content_rows(&mut self, rows: usize) {
        self.stream.set_visible_rows(rows);
        self.phases.set_visible_rows(rows);
        self.issues.set_visible_rows(rows);
    }

    /// Spawn the configured driver command for `action`
    pub fn start(&mut self, action: Action) {
        if self.is_running() {
            self.status_message = Some(format!(
                "{} is running: Esc to cancel it first",
                self.dashboard.action.map_or("An operation", Action::label)
            ));
            return;
        }
        let command = self.config.command_for(action);
        self.attach(Operation::spawn(action, command));
    }

    /// Take over an already started operation
    pub fn attach(&mut self, operation: Operation) {
        let action = operation.action();
        self.stream.clear();
        self.issues.clear();
        self.phases.clear();
        self.search_state.clear();
        self.search_dirty = false;
        self.status_message = None;
        self.dashboard.start(action);
        self.operation = Some(operation);
        info!(%action, "operation started");
    }

    /// Ask the running operation to stop
    pub fn cancel(&mut self) {
        if let Some(operation) = &self.operation
            && self.dashboard.is_running()
        {
            operation.cancel();
            self.status_message = Some("Canceling...".to_string());
        }
    }

    /// Wait for the next message from the terminal, the operation, the context task or the tick
    ///
    /// Returns `None` when terminal input ends.
    pub async fn next_message<S>(&mut self, terminal: &mut S, ticker: &mut Interval) -> Option<Message>
    where
        S: Stream<Item = io::Result<Event>> + Unpin,
    {
        let tick = self.needs_tick();
        tokio::select! {
            biased;
            input = terminal.next() => match input {
                Some(Ok(event)) => Some(Message::Terminal(event)),
                Some(Err(err)) => {
                    warn!(error = %err, "terminal input failed");
                    None
                }
                None => None,
            },
            message = operation_message(&mut self.operation) => Some(message),
            context = context_message(&mut self.context_rx) => {
                self.context_rx = None;
                Some(Message::ContextLoaded(context))
            }
            _ = ticker.tick(), if tick => Some(Message::Tick),
        }
    }

    /// Apply one message; returns a side effect for the caller to run
    pub fn update(&mut self, message: Message) -> Option<Intent> {
        let intent = match message {
            Message::Build(event) => {
                self.ingest(event);
                None
            }
            Message::EventsClosed => {
                debug!("event channel closed");
                None
            }
            Message::OperationDone(result) => {
                self.finish(result);
                None
            }
            Message::ContextLoaded(context) => {
                self.dashboard.set_context(context);
                if let Some(action) = self.pending_action.take() {
                    self.start(action);
                }
                None
            }
            Message::Tick => {
                self.dashboard.tick();
                self.refresh_search();
                None
            }
            Message::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                handle_key(self, key)
            }
            Message::Terminal(_) => None,
        };

        if self.operation.as_ref().is_some_and(|op| !op.is_active()) {
            self.operation = None;
        }
        intent
    }

    /// Route one driver event to the stream, issues, phases and dashboard
    pub fn ingest(&mut self, event: BuildEvent) {
        match event {
            BuildEvent::Log { message, pretty } => self.ingest_line(message, !pretty),
            BuildEvent::LogRaw { message } => self.ingest_line(message, true),
            BuildEvent::Status { message } => {
                let text = plain_text(&message);
                self.dashboard.progress.observe(&text);
                self.stream.push(message, LineKind::Info);
            }
            BuildEvent::Result { message } => {
                let kind = classify(&plain_text(&message));
                self.stream.push(message, kind);
            }
            BuildEvent::Error { message, error } => {
                let message = match (message.trim().is_empty(), &error) {
                    (true, Some(error)) => error.message.clone(),
                    _ => message,
                };
                let detail = error.map(|e| e.detail);
                self.ingest_diagnostic(Severity::Error, message, detail);
            }
            BuildEvent::Warning { message } => {
                self.ingest_diagnostic(Severity::Warning, message, None);
            }
        }
        self.dashboard
            .set_counts(self.issues.errors(), self.issues.warnings());
        if self.search_state.is_active() {
            self.search_dirty = true;
        }
    }

    fn ingest_line(&mut self, raw: String, feeds_phases: bool) {
        if raw.trim().is_empty() {
            return;
        }
        let text = plain_text(&raw);
        let kind = classify(&text);

        match kind {
            LineKind::Error => {
                self.issues.add(Severity::Error, &text);
            }
            LineKind::Warning => {
                self.issues.add(Severity::Warning, &text);
            }
            _ => {}
        }

        if feeds_phases {
            let phase = detect_phase(&text);
            if !phase.is_empty() {
                self.phases.ensure_phase(phase);
            }
            self.dashboard.progress.observe(&text);
            self.phases.add_line(text, kind);
        }
        self.stream.push(raw, kind);
    }

    fn ingest_diagnostic(&mut self, severity: Severity, message: String, detail: Option<String>) {
        if message.trim().is_empty() {
            return;
        }
        let text = plain_text(&message);
        let kind = match severity {
            Severity::Error => LineKind::Error,
            Severity::Warning => LineKind::Warning,
            Severity::Note => LineKind::Note,
        };

        let mut issue = Issue::parse(severity, &text);
        if let Some(detail) = detail.filter(|d| !d.trim().is_empty()) {
            issue.full_text = format!("{text}\n{detail}");
        }
        self.issues.insert(issue);
        self.phases.add_line(text, kind);
        self.stream.push(message, kind);
    }

    /// Close out the operation and append its summary line
    /// Re-run the query when lines arrived since the last search
    fn refresh_search(&mut self) {
        if self.search_dirty {
            self.search_state.refresh(&self.phases);
            self.search_dirty = false;
        }
    }

    fn finish(&mut self, result: Result<(), ConsoleError>) {
        self.phases.mark_build_complete();
        self.refresh_search();
        let status = match &result {
            Ok(()) => BuildStatus::Success,
            Err(err) if err.is_canceled() => BuildStatus::Canceled,
            Err(_) => BuildStatus::Failed,
        };
        self.dashboard.finish(status);
        self.status_message = None;

        let label = self.dashboard.action.map_or("Operation", Action::label);
        let elapsed = self.dashboard.elapsed();
        let (line, kind) = match &result {
            Ok(()) => (format!("✓ {label} succeeded in {elapsed}"), LineKind::Success),
            Err(err) if err.is_canceled() => {
                (format!("⊘ {label} canceled after {elapsed}"), LineKind::Warning)
            }
            Err(err) => (format!("✗ {label} failed after {elapsed}: {err}"), LineKind::Error),
        };
        self.stream.push(line, kind);

        match result {
            Ok(()) => info!(action = label, %elapsed, "operation succeeded"),
            Err(err) => warn!(action = label, %elapsed, error = %err, "operation did not succeed"),
        }
    }

    /// Cancel and drain the operation before exit
    pub async fn shutdown(&mut self) {
        let Some(mut operation) = self.operation.take() else {
            return;
        };
        operation.cancel();
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while operation.is_active() {
                operation.next_message().await;
            }
        })
        .await;
        if drained.is_err() {
            warn!("build driver did not stop before exit");
        }
    }

    pub fn scroll(&mut self, scroll: Scroll) {
        match self.view() {
            View::Dashboard => {}
            View::Stream => match self.stream_mode {
                StreamMode::Flat => scroll_stream(&mut self.stream, scroll),
                StreamMode::Grouped => scroll_phases(&mut self.phases, scroll),
                StreamMode::Cards => {
                    let selected = self.phases.selected();
                    let step = (self.phases.viewport().visible_rows() / 4).max(1);
                    match scroll {
                        Scroll::Up(n) => self.phases.select(selected.saturating_sub(n)),
                        Scroll::Down(n) => self.phases.select(selected + n),
                        Scroll::HalfPageUp | Scroll::PageUp => {
                            self.phases.select(selected.saturating_sub(step))
                        }
                        Scroll::HalfPageDown | Scroll::PageDown => {
                            self.phases.select(selected + step)
                        }
                        Scroll::Top => self.phases.select(0),
                        Scroll::Bottom => self.phases.select(usize::MAX),
                    }
                }
            },
            View::Issues => {
                let rows = self.issues.viewport().visible_rows().max(1);
                match scroll {
                    Scroll::Up(n) => (0..n).for_each(|_| self.issues.select_up()),
                    Scroll::Down(n) => (0..n).for_each(|_| self.issues.select_down()),
                    Scroll::HalfPageUp => (0..rows / 2).for_each(|_| self.issues.select_up()),
                    Scroll::HalfPageDown => (0..rows / 2).for_each(|_| self.issues.select_down()),
                    Scroll::PageUp => (0..rows).for_each(|_| self.issues.select_up()),
                    Scroll::PageDown => (0..rows).for_each(|_| self.issues.select_down()),
                    Scroll::Top => self.issues.select_top(),
                    Scroll::Bottom => self.issues.select_bottom(),
                }
            }
        }
    }

    pub fn toggle_errors_only(&mut self) {
        self.ensure_grouped();
        self.phases.toggle_errors_only();
    }

    pub fn next_error(&mut self) {
        self.ensure_grouped();
        if self.phases.next_error().is_none() {
            self.status_message = Some("No errors".to_string());
        }
    }

    pub fn prev_error(&mut self) {
        self.ensure_grouped();
        if self.phases.prev_error().is_none() {
            self.status_message = Some("No errors".to_string());
        }
    }

    /// Search the phase model for `query`
    pub fn search_phases(&mut self, query: &str) {
        self.search_state.search(query, &self.phases);
        self.search_dirty = false;
    }

    pub fn jump_to_current_match(&mut self) {
        if let Some(m) = self.search_state.current_match() {
            self.stream_mode = match self.stream_mode {
                StreamMode::Flat => StreamMode::Grouped,
                mode => mode,
            };
            jump_to_match(&mut self.phases, m);
        }
    }

    pub fn next_search_match(&mut self) {
        if self.search_state.is_active() {
            self.search_state.next_match();
            self.jump_to_current_match();
        }
    }

    pub fn prev_search_match(&mut self) {
        if self.search_state.is_active() {
            self.search_state.prev_match();
            self.jump_to_current_match();
        }
    }

    fn row_text(&self, row: Row) -> String {
        match row {
            Row::Header(p) => self.phases.phase(p).map(|phase| phase.name.clone()),
            Row::Line(p, l) => self
                .phases
                .phase(p)
                .and_then(|phase| phase.lines.get(l))
                .map(|line| line.text.clone()),
        }
        .unwrap_or_default()
    }

    /// Plain text of the rows currently on screen
    pub fn visible_texts(&self) -> Vec<String> {
        match self.stream_mode {
            StreamMode::Flat => self
                .stream
                .visible()
                .into_iter()
                .map(|line| line.text.clone())
                .collect(),
            StreamMode::Grouped | StreamMode::Cards => {
                let rows = self.phases.rows();
                let range = self.phases.viewport().visible_range(rows.len());
                rows[range].iter().map(|row| self.row_text(*row)).collect()
            }
        }
    }

    /// Copy the current search match, or else the last visible line
    pub fn copy_line(&mut self) -> Option<Intent> {
        let from_match = match self.search_state.current_match() {
            Some(m) if self.stream_mode != StreamMode::Flat => Some(self.row_text(Row::Line(m.phase, m.line))),
            _ => None,
        };
        let text = from_match.or_else(|| self.visible_texts().pop())?;
        self.status_message = Some("Copied 1 line".to_string());
        Some(Intent::Copy(text))
    }

    pub fn copy_visible(&mut self) -> Option<Intent> {
        let lines = self.visible_texts();
        if lines.is_empty() {
            return None;
        }
        self.status_message = Some(format!("Copied {} lines", lines.len()));
        Some(Intent::Copy(lines.join("\n")))
    }

    pub fn copy_issue(&mut self) -> Option<Intent> {
        let text = self.issues.selected()?.full_text.clone();
        self.status_message = Some("Copied issue".to_string());
        Some(Intent::Copy(text))
    }

    /// Open the selected issue's location in the editor or in Xcode
    pub fn open_selected_issue(&mut self, in_xcode: bool) -> Option<Intent> {
        let issue = self.issues.selected()?;
        if !issue.location.is_known() {
            self.status_message = Some("Issue has no source location".to_string());
            return None;
        }
        let location = issue.location.clone();
        Some(if in_xcode {
            Intent::OpenInXcode(location)
        } else {
            Intent::OpenInEditor(location)
        })
    }
}

fn scroll_stream(stream: &mut StreamBuffer, scroll: Scroll) {
    match scroll {
        Scroll::Up(n) => stream.scroll_up(n),
        Scroll::Down(n) => stream.scroll_down(n),
        Scroll::HalfPageUp => stream.half_page_up(),
        Scroll::HalfPageDown => stream.half_page_down(),
        Scroll::PageUp => stream.page_up(),
        Scroll::PageDown => stream.page_down(),
        Scroll::Top => stream.scroll_to_top(),
        Scroll::Bottom => stream.scroll_to_bottom(),
    }
}

fn scroll_phases(phases: &mut PhaseModel, scroll: Scroll) {
    match scroll {
        Scroll::Up(n) => phases.scroll_up(n),
        Scroll::Down(n) => phases.scroll_down(n),
        Scroll::HalfPageUp => phases.half_page_up(),
        Scroll::HalfPageDown => phases.half_page_down(),
        Scroll::PageUp => phases.page_up(),
        Scroll::PageDown => phases.page_down(),
        Scroll::Top => phases.scroll_to_top(),
        Scroll::Bottom => phases.scroll_to_bottom(),
    }
}

async fn operation_message(operation: &mut Option<Operation>) -> Message {
    match operation {
        Some(operation) if operation.is_active() => operation.next_message().await,
        _ => future::pending().await,
    }
}

async fn context_message(rx: &mut Option<oneshot::Receiver<ProjectContext>>) -> ProjectContext {
    match rx {
        Some(rx) => rx.await.unwrap_or_default(),
        None => future::pending().await,
    }
}
