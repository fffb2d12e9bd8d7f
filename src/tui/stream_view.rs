use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{App, StreamMode};
use crate::buffer::{StreamBuffer, line_number_width};
use crate::classify::LineKind;
use crate::issues::Severity;
use crate::phase::{Phase, PhaseModel, Row};
use crate::search::SearchState;
use crate::tui::highlight::styled_line;
use crate::tui::theme;

const INDENT: &str = "    ";
const CARD_PREVIEW_LINES: usize = 3;

pub fn render(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(
            format!("Stream · {}", app.stream_mode().label()),
            theme::title(),
        ))
        .title(indicators(app).right_aligned())
        .borders(Borders::ALL)
        .border_style(theme::border());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let empty = match app.stream_mode() {
        StreamMode::Flat => app.stream().is_empty(),
        StreamMode::Grouped | StreamMode::Cards => app.phases().is_empty(),
    };
    if empty {
        frame.render_widget(
            Paragraph::new(Line::styled("Waiting for output", theme::subdued())),
            inner,
        );
        return;
    }

    match app.stream_mode() {
        StreamMode::Flat => {
            frame.render_widget(Paragraph::new(flat_lines(app.stream(), inner.width)), inner)
        }
        StreamMode::Grouped => frame.render_widget(
            Paragraph::new(grouped_lines(app.phases(), app.search_state(), inner.width)),
            inner,
        ),
        StreamMode::Cards => render_cards(frame, inner, app.phases()),
    }
}

fn indicators(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    let search = app.search_state();
    if search.is_active() {
        let current = search.current_match_display().unwrap_or(0);
        spans.push(Span::styled(
            format!(" /{} [{}/{}] ", search.query(), current, search.match_count()),
            theme::subdued(),
        ));
    }
    if app.stream_mode() != StreamMode::Flat && app.phases().errors_only() {
        spans.push(Span::styled(" errors only ", theme::line(LineKind::Error)));
    }
    let following = match app.stream_mode() {
        StreamMode::Flat => app.stream().viewport().auto_follow(),
        _ => app.phases().viewport().auto_follow(),
    };
    spans.push(if following {
        Span::styled(" ● LIVE ", theme::title())
    } else {
        Span::styled(" PAUSED ", theme::subdued())
    });
    Line::from(spans)
}

/// Flat rows with the optional line number and timestamp gutter
pub fn flat_lines(stream: &StreamBuffer, width: u16) -> Vec<Line<'static>> {
    let range = stream.viewport().visible_range(stream.len());
    let number_width = line_number_width(stream.line_number(stream.len().saturating_sub(1)));
    let text_width = (width as usize).saturating_sub(stream.gutter_width());
    range
        .filter_map(|index| stream.get(index).map(|line| (index, line)))
        .map(|(index, line)| {
            let mut spans = Vec::new();
            if stream.show_line_numbers() {
                spans.push(Span::styled(
                    format!("{:>number_width$} ", stream.line_number(index)),
                    theme::gutter(),
                ));
            }
            if stream.show_timestamps() {
                spans.push(Span::styled(format!("{} ", line.clock()), theme::gutter()));
            }
            spans.extend(styled_line(&line.text, line.kind, text_width).spans);
            Line::from(spans)
        })
        .collect()
}

fn header_line(model: &PhaseModel, index: usize, phase: &Phase) -> Line<'static> {
    let chevron = if phase.collapsed { "▸" } else { "▾" };
    let (icon, icon_style) = theme::phase_status(phase.status);
    let count = if model.errors_only() {
        phase.problem_count()
    } else {
        phase.lines.len()
    };
    let line = Line::from(vec![
        Span::styled(format!("{chevron} "), theme::subdued()),
        Span::styled(format!("{icon} "), icon_style),
        Span::styled(phase.name.clone(), theme::title()),
        Span::styled(format!(" ({count})"), theme::subdued()),
    ]);
    if index == model.selected() {
        line.patch_style(theme::selected())
    } else {
        line
    }
}

/// Grouped rows inside the viewport, topped by the sticky header when scrolled into a phase
pub fn grouped_lines(model: &PhaseModel, search: &SearchState, width: u16) -> Vec<Line<'static>> {
    let rows = model.rows();
    let range = model.viewport().visible_range(rows.len());
    let current = search.current_match().map(|m| (m.phase, m.line));
    let text_width = (width as usize).saturating_sub(INDENT.len());

    let mut lines: Vec<Line<'static>> = rows[range]
        .iter()
        .filter_map(|row| match *row {
            Row::Header(p) => model.phase(p).map(|phase| header_line(model, p, phase)),
            Row::Line(p, l) => {
                let line = model.phase(p)?.lines.get(l)?;
                let mut spans = vec![Span::raw(INDENT)];
                spans.extend(styled_line(&line.text, line.kind, text_width).spans);
                let rendered = Line::from(spans);
                Some(if current == Some((p, l)) {
                    rendered.patch_style(theme::current_match())
                } else if search.is_highlighted(p, l) {
                    rendered.patch_style(theme::search_match())
                } else {
                    rendered
                })
            }
        })
        .collect();

    if let Some(p) = model.sticky_header()
        && let Some(phase) = model.phase(p)
        && let Some(first) = lines.first_mut()
    {
        *first = header_line(model, p, phase);
    }
    lines
}

fn card_height(phase: &Phase, errors_only: bool) -> u16 {
    let body = if phase.collapsed {
        1
    } else if errors_only {
        phase.problem_count().clamp(1, CARD_PREVIEW_LINES)
    } else {
        phase.lines.len().clamp(1, CARD_PREVIEW_LINES)
    };
    body as u16 + 2
}

fn render_cards(frame: &mut Frame<'_>, area: Rect, model: &PhaseModel) {
    let errors_only = model.errors_only();
    let shown: Vec<(usize, &Phase)> = model
        .phases()
        .iter()
        .enumerate()
        .filter(|(_, phase)| !errors_only || phase.problem_count() > 0)
        .collect();
    let Some(selected) = shown
        .iter()
        .position(|(p, _)| *p == model.selected())
        .or_else(|| (!shown.is_empty()).then_some(0))
    else {
        return;
    };

    let mut start = selected;
    let mut used = card_height(shown[selected].1, errors_only);
    while start > 0 {
        let previous = card_height(shown[start - 1].1, errors_only);
        if used + previous > area.height / 2 {
            break;
        }
        start -= 1;
        used += previous;
    }

    let mut y = area.y;
    for (p, phase) in &shown[start..] {
        let bottom = area.y + area.height;
        if y >= bottom {
            break;
        }
        let height = card_height(phase, errors_only).min(bottom - y);
        let rect = Rect::new(area.x, y, area.width, height);
        render_card(frame, rect, model, *p, phase);
        y += height;
    }
}

fn render_card(frame: &mut Frame<'_>, area: Rect, model: &PhaseModel, index: usize, phase: &Phase) {
    let (icon, icon_style) = theme::phase_status(phase.status);
    let mut badges = Vec::new();
    if phase.file_count > 1 {
        badges.push(Span::styled(format!(" {} files ", phase.file_count), theme::subdued()));
    }
    badges.push(Span::styled(format!(" {} lines ", phase.lines.len()), theme::subdued()));
    let errors = phase.error_count();
    let warnings = phase.warning_count();
    if errors > 0 {
        badges.push(Span::styled(format!(" ✗ {errors} "), theme::severity(Severity::Error)));
    }
    if warnings > 0 {
        badges.push(Span::styled(format!(" ⚠ {warnings} "), theme::severity(Severity::Warning)));
    }
    let border = if index == model.selected() {
        theme::title()
    } else {
        theme::border()
    };
    let block = Block::default()
        .title(Line::from(vec![
            Span::styled(format!(" {icon} "), icon_style),
            Span::styled(format!("{} ", phase.name), theme::title()),
        ]))
        .title(Line::from(badges).right_aligned())
        .borders(Borders::ALL)
        .border_style(border);

    let width = block.inner(area).width as usize;
    let body: Vec<Line<'static>> = if phase.collapsed {
        vec![Line::styled("collapsed", theme::subdued())]
    } else {
        let picked: Vec<_> = phase
            .lines
            .iter()
            .filter(|line| !model.errors_only() || line.kind.is_problem())
            .collect();
        let skip = picked.len().saturating_sub(CARD_PREVIEW_LINES);
        picked[skip..]
            .iter()
            .map(|line| styled_line(&line.text, line.kind, width))
            .collect()
    };
    frame.render_widget(Paragraph::new(body).block(block), area);
}
