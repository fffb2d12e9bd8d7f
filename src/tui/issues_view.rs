use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::issues::{IssuesStore, analyze};
use crate::tui::highlight::truncate;
use crate::tui::theme;

pub fn render(frame: &mut Frame<'_>, area: Rect, store: &IssuesStore) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    let list = Block::default()
        .title(Span::styled(
            format!(
                "Issues · {} errors, {} warnings",
                store.errors(),
                store.warnings()
            ),
            theme::title(),
        ))
        .borders(Borders::ALL)
        .border_style(theme::border());
    let inner = list.inner(columns[0]);
    frame.render_widget(list, columns[0]);
    let body = if store.is_empty() {
        vec![Line::styled("No issues", theme::subdued())]
    } else {
        issue_lines(store, inner.width, inner.height)
    };
    frame.render_widget(Paragraph::new(body), inner);

    let analysis = analyze(store.issues());
    let mut lines = vec![Line::styled(analysis.summary, theme::title()), Line::default()];
    lines.extend(
        analysis
            .suggestions
            .iter()
            .map(|s| Line::from(vec![Span::styled("• ", theme::subdued()), Span::raw(*s)])),
    );
    let panel = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title("Analysis")
            .borders(Borders::ALL)
            .border_style(theme::border()),
    );
    frame.render_widget(panel, columns[1]);
}

/// Issue rows from the top of the viewport, with expanded issues showing their full text
pub fn issue_lines(store: &IssuesStore, width: u16, height: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let height = height as usize;
    let mut lines = Vec::with_capacity(height);
    let start = store.first_visible(height);

    for (index, issue) in store.issues().iter().enumerate().skip(start) {
        if lines.len() >= height {
            break;
        }
        let icon = theme::severity_icon(issue.severity);
        let location = issue.location_label();
        let head = format!("{icon} {}", issue.message);
        let room = width.saturating_sub(location.chars().count() + 2);
        let mut spans = vec![Span::styled(
            truncate(&head, room).into_owned(),
            theme::severity(issue.severity),
        )];
        if !location.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(location, theme::subdued()));
        }
        let line = Line::from(spans);
        lines.push(if index == store.selected_index() {
            line.patch_style(theme::selected())
        } else {
            line
        });

        if issue.expanded {
            for text in issue.full_text.lines() {
                if lines.len() >= height {
                    break;
                }
                let text = truncate(text, width.saturating_sub(4)).into_owned();
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(text, theme::subdued()),
                ]));
            }
        }
    }
    lines
}
