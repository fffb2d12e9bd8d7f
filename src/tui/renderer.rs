use ratatui::Frame;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Tabs};

use crate::app::{App, Mode};
use crate::tui::{View, dashboard_view, issues_view, stream_view, theme};

/// Rows taken by the tab bar, the body border and the status bar
const CHROME_ROWS: u16 = 4;

/// TUI rendering handler
pub struct Renderer;

impl Renderer {
    /// Rows left for scrollable content in a terminal `height` rows tall
    pub fn content_rows(height: u16) -> usize {
        height.saturating_sub(CHROME_ROWS) as usize
    }

    /// Render application state
    pub fn render(frame: &mut Frame<'_>, app: &App) {
        let root = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        Self::render_tab_bar(frame, root[0], app);
        match app.view() {
            View::Dashboard => dashboard_view::render(frame, root[1], app.dashboard()),
            View::Stream => stream_view::render(frame, root[1], app),
            View::Issues => issues_view::render(frame, root[1], app.issues()),
        }
        Self::render_status_bar(frame, root[2], app);
    }

    fn render_tab_bar(frame: &mut Frame<'_>, area: Rect, app: &App) {
        let titles = app
            .tabs()
            .titles()
            .enumerate()
            .map(|(i, title)| match View::ALL[i] {
                View::Issues if !app.issues().is_empty() => {
                    format!(" {} {title} ({}) ", i + 1, app.issues().len())
                }
                _ => format!(" {} {title} ", i + 1),
            });
        let tabs = Tabs::new(titles)
            .select(app.tabs().active_index())
            .style(theme::tab_inactive())
            .highlight_style(theme::tab_active())
            .divider("");

        let (icon, style) = theme::build_status(app.dashboard().status);
        let icon = if app.is_running() {
            app.dashboard().spinner()
        } else {
            icon
        };
        let label = app.dashboard().action.map_or("xcconsole", |a| a.label());
        let state = Line::from(vec![
            Span::styled(format!("{icon} {label} "), style),
            Span::styled(app.dashboard().elapsed(), theme::subdued()),
            Span::raw(" "),
        ])
        .right_aligned();

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(state.width() as u16)])
            .split(area);
        frame.render_widget(tabs, columns[0]);
        frame.render_widget(Paragraph::new(state), columns[1]);
    }

    fn render_status_bar(frame: &mut Frame<'_>, area: Rect, app: &App) {
        if app.mode() == Mode::Search {
            let input = app.search_state().input();
            let prompt = Line::from(vec![
                Span::styled("/", theme::title()),
                Span::raw(input.value().to_string()),
            ]);
            frame.render_widget(Paragraph::new(prompt), area);
            let cursor = input.visual_cursor() as u16 + 1;
            frame.set_cursor_position((area.x + cursor.min(area.width.saturating_sub(1)), area.y));
            return;
        }

        let text = match app.status_message() {
            Some(message) => Line::styled(message.to_string(), theme::title()),
            None => Line::styled(hints(app), theme::subdued()),
        };
        frame.render_widget(Paragraph::new(text), area);
    }
}

fn hints(app: &App) -> &'static str {
    match (app.view(), app.is_running()) {
        (_, true) => "Esc cancel · Ctrl-C quit · Tab switch view",
        (View::Dashboard, false) => "b build · r run · t test · x clean · Tab switch view · q quit",
        (View::Stream, false) => {
            "j/k scroll · v mode · e errors · ]/[ next/prev error · / search · y copy · q quit"
        }
        (View::Issues, false) => "j/k select · Enter expand · o editor · X Xcode · y copy · q quit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::{BuildEvent, Message};
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| Renderer::render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn content_rows_leave_room_for_chrome() {
        assert_eq!(Renderer::content_rows(24), 20);
        assert_eq!(Renderer::content_rows(3), 0);
    }

    #[test]
    fn renders_tab_bar_and_hints() {
        let app = App::new(Config::default());
        let screen = screen(&app, 100, 20);
        let first = screen.lines().next().unwrap_or_default();
        assert!(first.contains("1 Dashboard"));
        assert!(first.contains("3 Issues"));
        assert!(screen.contains("b build"));
    }

    #[test]
    fn renders_stream_view_with_lines() {
        let mut app = App::new(Config::default());
        app.set_content_rows(Renderer::content_rows(12));
        app.update(Message::Build(BuildEvent::log("Compiling Foo.swift")));
        app.tabs_mut().select(View::Stream);

        let screen = screen(&app, 80, 12);
        assert!(screen.contains("Stream · flat"));
        assert!(screen.contains("Compiling Foo.swift"));
        assert!(screen.contains("LIVE"));
    }
}
