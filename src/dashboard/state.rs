use std::time::{Duration, Instant};

use crate::classify::Progress;
use crate::event::{Action, ProjectContext};

pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FILLED: char = '●';
const EMPTY: char = '○';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }
}

/// Outcome of the previous operation, shown while idle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastBuild {
    pub action: Action,
    pub success: bool,
    pub duration: Duration,
    pub errors: usize,
    pub warnings: usize,
}

/// Live summary of the current operation
pub struct DashboardState {
    pub status: BuildStatus,
    pub action: Option<Action>,
    pub progress: Progress,
    pub errors: usize,
    pub warnings: usize,
    pub last_build: Option<LastBuild>,
    pub context: ProjectContext,
    pub context_loaded: bool,
    started_at: Option<Instant>,
    /// Duration frozen at completion
    finished: Option<Duration>,
    spinner: usize,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            status: BuildStatus::Pending,
            action: None,
            progress: Progress::new(),
            errors: 0,
            warnings: 0,
            last_build: None,
            context: ProjectContext::default(),
            context_loaded: false,
            started_at: None,
            finished: None,
            spinner: 0,
        }
    }

    /// Reset for a new operation, remembering a finished one as the last build
    pub fn clear(&mut self) {
        if self.status.is_terminal()
            && let Some(action) = self.action
        {
            self.last_build = Some(LastBuild {
                action,
                success: self.status == BuildStatus::Success,
                duration: self.duration(),
                errors: self.errors,
                warnings: self.warnings,
            });
        }
        self.status = BuildStatus::Pending;
        self.action = None;
        self.progress.reset();
        self.errors = 0;
        self.warnings = 0;
        self.started_at = None;
        self.finished = None;
    }

    pub fn start(&mut self, action: Action) {
        self.start_at(action, Instant::now());
    }

    pub fn start_at(&mut self, action: Action, now: Instant) {
        self.clear();
        self.status = BuildStatus::Running;
        self.action = Some(action);
        self.started_at = Some(now);
    }

    /// Record the terminal status and freeze the elapsed time
    pub fn finish(&mut self, status: BuildStatus) {
        self.finished = Some(self.duration());
        self.status = status;
    }

    pub fn set_context(&mut self, context: ProjectContext) {
        self.context = context;
        self.context_loaded = true;
    }

    pub fn set_counts(&mut self, errors: usize, warnings: usize) {
        self.errors = errors;
        self.warnings = warnings;
    }

    pub fn is_running(&self) -> bool {
        self.status == BuildStatus::Running
    }

    /// Time since start, frozen once finished; zero when never started
    pub fn duration(&self) -> Duration {
        self.duration_at(Instant::now())
    }

    fn duration_at(&self, now: Instant) -> Duration {
        match (self.finished, self.started_at) {
            (Some(frozen), _) => frozen,
            (None, Some(start)) => now.saturating_duration_since(start),
            (None, None) => Duration::ZERO,
        }
    }

    /// Elapsed time as `m:ss`
    pub fn elapsed(&self) -> String {
        format_elapsed(self.duration())
    }

    pub fn elapsed_at(&self, now: Instant) -> String {
        format_elapsed(self.duration_at(now))
    }

    pub fn tick(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner % SPINNER_FRAMES.len()]
    }
}

/// `m:ss` with seconds rounded to the nearest whole second
pub fn format_elapsed(duration: Duration) -> String {
    let secs = duration.as_secs_f64().round() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Bar of `width` dots with `min(width, width * current / total)` filled
pub fn progress_bar(width: usize, current: u64, total: u64) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((width as u128 * current as u128) / total as u128).min(width as u128) as usize
    };
    let mut bar = String::with_capacity(width * FILLED.len_utf8());
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, width - filled));
    bar
}
