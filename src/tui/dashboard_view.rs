use std::path::Path;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::dashboard::{BuildStatus, DashboardState, LastBuild, format_elapsed, progress_bar};
use crate::event::ProjectContext;
use crate::tui::theme;

const CONTEXT_ROWS: u16 = 8;

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &DashboardState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(CONTEXT_ROWS), Constraint::Min(1)])
        .split(area);

    let context = Paragraph::new(context_lines(state)).block(
        Block::default()
            .title("Project")
            .borders(Borders::ALL)
            .border_style(theme::border()),
    );
    frame.render_widget(context, sections[0]);

    let inner_width = sections[1].width.saturating_sub(2) as usize;
    let body = match state.status {
        BuildStatus::Pending => pending_lines(state),
        BuildStatus::Running => running_lines(state, inner_width),
        BuildStatus::Success | BuildStatus::Failed | BuildStatus::Canceled => finished_lines(state),
    };
    let status = Paragraph::new(body).block(
        Block::default()
            .title("Status")
            .borders(Borders::ALL)
            .border_style(theme::border()),
    );
    frame.render_widget(status, sections[1]);
}

fn field(label: &str, value: &str) -> Line<'static> {
    let value = if value.is_empty() { "-" } else { value };
    Line::from(vec![
        Span::styled(format!("{label:<14}"), theme::subdued()),
        Span::raw(value.to_string()),
    ])
}

fn context_lines(state: &DashboardState) -> Vec<Line<'static>> {
    if !state.context_loaded {
        return vec![Line::from(vec![
            Span::styled(state.spinner(), theme::title()),
            Span::raw(" Loading project context..."),
        ])];
    }
    let ProjectContext {
        project,
        scheme,
        configuration,
        destination,
        system,
        xcode_version,
    } = &state.context;
    vec![
        field("Project", project),
        field("Scheme", scheme),
        field("Configuration", configuration),
        field("Destination", destination),
        field("System", system),
        field("Xcode", xcode_version.as_deref().unwrap_or("unavailable")),
    ]
}

fn pending_lines(state: &DashboardState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if !state.context_loaded {
        lines.push(Line::styled("Waiting for project context", theme::subdued()));
        return lines;
    }
    lines.push(Line::from("Ready"));
    lines.push(Line::default());
    lines.push(Line::styled(
        "b build · r run · t test · x clean",
        theme::subdued(),
    ));
    push_last_build(&mut lines, state.last_build.as_ref());
    lines
}

/// Outcome of the operation before the current one, if any
fn push_last_build(lines: &mut Vec<Line<'static>>, last: Option<&LastBuild>) {
    if let Some(last) = last {
        lines.push(Line::default());
        lines.push(last_build_line(last));
    }
}

fn last_build_line(last: &LastBuild) -> Line<'static> {
    let (icon, style) = theme::build_status(if last.success {
        BuildStatus::Success
    } else {
        BuildStatus::Failed
    });
    Line::from(vec![
        Span::styled("Last: ", theme::subdued()),
        Span::styled(format!("{icon} {}", last.action.label()), style),
        Span::raw(format!(
            "  {}  {} errors, {} warnings",
            format_elapsed(last.duration),
            last.errors,
            last.warnings
        )),
    ])
}

fn running_lines(state: &DashboardState, width: usize) -> Vec<Line<'static>> {
    let action = state.action.map_or("Operation", |a| a.label());
    let (_, running) = theme::build_status(BuildStatus::Running);
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} {action}", state.spinner()), running),
        Span::raw(format!("  {}", state.elapsed())),
    ])];

    let progress = &state.progress;
    if progress.total > 0 {
        let counter = format!(" {}/{}", progress.current.min(progress.total), progress.total);
        let bar_width = width.saturating_sub(counter.chars().count()).min(40);
        lines.push(Line::from(vec![
            Span::styled(
                progress_bar(bar_width, progress.current, progress.total),
                theme::title(),
            ),
            Span::raw(counter),
        ]));
    }
    if !progress.stage.is_empty() {
        lines.push(field("Stage", &progress.stage));
    }
    if !progress.current_file.is_empty() {
        let base = Path::new(&progress.current_file)
            .file_name()
            .map_or_else(|| progress.current_file.clone(), |n| n.to_string_lossy().into_owned());
        lines.push(field("File", &base));
    }
    lines.push(Line::default());
    lines.push(counters(state.errors, state.warnings));
    push_last_build(&mut lines, state.last_build.as_ref());
    lines
}

fn finished_lines(state: &DashboardState) -> Vec<Line<'static>> {
    let action = state.action.map_or("Operation", |a| a.label());
    let (icon, style) = theme::build_status(state.status);
    let outcome = match state.status {
        BuildStatus::Success => "succeeded",
        BuildStatus::Canceled => "canceled",
        _ => "failed",
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{icon} {action} {outcome}"), style),
            Span::raw(format!("  in {}", state.elapsed())),
        ]),
        Line::default(),
        counters(state.errors, state.warnings),
    ];
    if state.errors + state.warnings > 0 {
        lines.push(Line::default());
        lines.push(Line::styled("Press 3 to view Issues", theme::subdued()));
    }
    push_last_build(&mut lines, state.last_build.as_ref());
    lines
}

fn counters(errors: usize, warnings: usize) -> Line<'static> {
    let (_, error_style) = theme::build_status(BuildStatus::Failed);
    let (_, warning_style) = theme::build_status(BuildStatus::Canceled);
    Line::from(vec![
        Span::styled(format!("✗ {errors} errors"), if errors > 0 { error_style } else { theme::subdued() }),
        Span::raw("   "),
        Span::styled(
            format!("⚠ {warnings} warnings"),
            if warnings > 0 { warning_style } else { theme::subdued() },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Action;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(state: &DashboardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn loading_before_context() {
        let screen = draw(&DashboardState::new());
        assert!(screen.contains("Loading project context"));
    }

    #[test]
    fn pending_shows_context_and_keys() {
        let mut state = DashboardState::new();
        state.set_context(ProjectContext {
            project: "App".into(),
            scheme: "AppScheme".into(),
            ..ProjectContext::default()
        });
        let screen = draw(&state);
        assert!(screen.contains("AppScheme"));
        assert!(screen.contains("unavailable"));
        assert!(screen.contains("b build"));
    }

    #[test]
    fn running_shows_progress_and_counters() {
        let mut state = DashboardState::new();
        state.start(Action::Test);
        state.progress.observe("Compiling Foo.swift");
        state.progress.observe("3 of 12 tasks");
        state.set_counts(2, 1);
        let screen = draw(&state);
        assert!(screen.contains("Test"));
        assert!(screen.contains("Compile"));
        assert!(screen.contains("Foo.swift"));
        assert!(screen.contains("3/12"));
        assert!(screen.contains("2 errors"));
        assert!(screen.contains("1 warnings"));
    }

    #[test]
    fn failed_points_at_issues() {
        let mut state = DashboardState::new();
        state.start(Action::Build);
        state.set_counts(1, 0);
        state.finish(BuildStatus::Failed);
        let screen = draw(&state);
        assert!(screen.contains("Build failed"));
        assert!(screen.contains("Press 3 to view Issues"));
        assert!(!screen.contains("Last:"));
    }

    #[test]
    fn previous_outcome_stays_visible_across_runs() {
        let mut state = DashboardState::new();
        state.start(Action::Build);
        state.set_counts(4, 2);
        state.finish(BuildStatus::Failed);

        state.start(Action::Test);
        let screen = draw(&state);
        assert!(screen.contains("Last: ✗ Build"));
        assert!(screen.contains("4 errors, 2 warnings"));

        state.finish(BuildStatus::Success);
        let screen = draw(&state);
        assert!(screen.contains("Test succeeded"));
        assert!(screen.contains("Last: ✗ Build"));
    }
}
