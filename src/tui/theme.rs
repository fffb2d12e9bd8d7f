//! Color and style tokens for the console views.

use ratatui::style::{Color, Modifier, Style};

use crate::classify::LineKind;
use crate::dashboard::BuildStatus;
use crate::issues::Severity;
use crate::phase::PhaseStatus;

const ACCENT: Color = Color::Cyan;
const AMBER: Color = Color::Rgb(255, 176, 0);
const MUTED: Color = Color::Rgb(150, 150, 150);
const SUBTLE: Color = Color::Rgb(120, 160, 200);

pub fn border() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn subdued() -> Style {
    Style::default().fg(MUTED)
}

pub fn tab_active() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_inactive() -> Style {
    subdued()
}

pub fn path() -> Style {
    Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn url() -> Style {
    Style::default()
        .fg(ACCENT)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn search_match() -> Style {
    Style::default().bg(Color::Rgb(70, 70, 20))
}

pub fn current_match() -> Style {
    Style::default().fg(Color::Black).bg(Color::Yellow)
}

pub fn selected() -> Style {
    Style::default().bg(Color::Rgb(40, 40, 60))
}

pub fn gutter() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Per-line style keyed by classification
pub fn line(kind: LineKind) -> Style {
    match kind {
        LineKind::Error | LineKind::TestFail => Style::default().fg(Color::Red),
        LineKind::Warning => Style::default().fg(AMBER),
        LineKind::Note => Style::default().fg(MUTED),
        LineKind::Info => Style::default().fg(SUBTLE),
        LineKind::Success | LineKind::TestPass => Style::default().fg(Color::Green),
        LineKind::PhaseHeader => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        LineKind::Progress => Style::default().fg(ACCENT),
        LineKind::Verbose => Style::default().add_modifier(Modifier::DIM),
        LineKind::Normal => Style::default(),
    }
}

pub fn severity(severity: Severity) -> Style {
    match severity {
        Severity::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Severity::Warning => Style::default().fg(AMBER),
        Severity::Note => Style::default().fg(MUTED),
    }
}

pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Note => "ℹ",
    }
}

pub fn phase_status(status: PhaseStatus) -> (&'static str, Style) {
    match status {
        PhaseStatus::Running => ("◐", Style::default().fg(ACCENT)),
        PhaseStatus::Success => ("✓", Style::default().fg(Color::Green)),
        PhaseStatus::Warning => ("⚠", Style::default().fg(AMBER)),
        PhaseStatus::Error => ("✗", Style::default().fg(Color::Red)),
    }
}

pub fn build_status(status: BuildStatus) -> (&'static str, Style) {
    match status {
        BuildStatus::Pending => ("○", subdued()),
        BuildStatus::Running => ("◐", Style::default().fg(ACCENT)),
        BuildStatus::Success => ("✓", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        BuildStatus::Failed => ("✗", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        BuildStatus::Canceled => ("⊘", Style::default().fg(AMBER).add_modifier(Modifier::BOLD)),
    }
}
