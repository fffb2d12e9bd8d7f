//! Inline highlighting of file paths and URLs inside log lines.

use std::borrow::Cow;
use std::sync::LazyLock;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use regex::Regex;

use crate::classify::LineKind;
use crate::tui::theme;

const ELLIPSIS: &str = "...";

static URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).ok());

static PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[~.\w@+-]*(?:/[\w.@+-]+)+(?::\d+(?::\d+)?)?").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Path,
    Url,
}

/// Byte range of a line and how it is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

/// Split `text` into contiguous spans covering the whole line
///
/// URL matches win over path matches that overlap them.
pub fn spans(text: &str) -> Vec<HighlightSpan> {
    let mut found: Vec<HighlightSpan> = URL
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| HighlightSpan {
            start: m.start(),
            end: trim_punctuation(text, m.start(), m.end()),
            kind: SpanKind::Url,
        })
        .collect();
    let urls = found.len();
    for m in PATH.iter().flat_map(|re| re.find_iter(text)) {
        let end = trim_punctuation(text, m.start(), m.end());
        let overlaps = found[..urls]
            .iter()
            .any(|u| m.start() < u.end && u.start < end);
        if !overlaps && end > m.start() {
            found.push(HighlightSpan {
                start: m.start(),
                end,
                kind: SpanKind::Path,
            });
        }
    }
    fill_gaps(found, text.len())
}

fn trim_punctuation(text: &str, start: usize, mut end: usize) -> usize {
    let bytes = text.as_bytes();
    while end > start && matches!(bytes[end - 1], b'.' | b',' | b':' | b';') {
        end -= 1;
    }
    end
}

fn fill_gaps(mut found: Vec<HighlightSpan>, len: usize) -> Vec<HighlightSpan> {
    found.sort_by_key(|s| s.start);
    let mut filled = Vec::with_capacity(found.len() * 2 + 1);
    let mut cursor = 0;
    for span in found {
        if span.start < cursor {
            continue;
        }
        if span.start > cursor {
            filled.push(HighlightSpan {
                start: cursor,
                end: span.start,
                kind: SpanKind::Plain,
            });
        }
        cursor = span.end;
        filled.push(span);
    }
    if cursor < len {
        filled.push(HighlightSpan {
            start: cursor,
            end: len,
            kind: SpanKind::Plain,
        });
    }
    filled
}

/// Cut `text` to `width` columns, ending in `...` when it does not fit
pub fn truncate(text: &str, width: usize) -> Cow<'_, str> {
    if text.chars().count() <= width {
        return Cow::Borrowed(text);
    }
    if width <= ELLIPSIS.len() {
        return Cow::Owned(text.chars().take(width).collect());
    }
    let head: String = text.chars().take(width - ELLIPSIS.len()).collect();
    Cow::Owned(head + ELLIPSIS)
}

/// Render one log line, styled by kind and cut to `width`
pub fn styled_line(text: &str, kind: LineKind, width: usize) -> Line<'static> {
    let base = theme::line(kind);
    let truncated = text.chars().count() > width;
    let body: String = if truncated && width > ELLIPSIS.len() {
        text.chars().take(width - ELLIPSIS.len()).collect()
    } else {
        truncate(text, width).into_owned()
    };

    let mut out: Vec<Span<'static>> = if matches!(kind, LineKind::Error | LineKind::Warning) {
        vec![Span::styled(body, base)]
    } else {
        spans(&body)
            .into_iter()
            .map(|s| Span::styled(body[s.start..s.end].to_string(), span_style(s.kind, base)))
            .collect()
    };
    if truncated && width > ELLIPSIS.len() {
        out.push(Span::styled(ELLIPSIS, base));
    }
    Line::from(out)
}

fn span_style(kind: SpanKind, base: Style) -> Style {
    match kind {
        SpanKind::Plain => base,
        SpanKind::Path => base.patch(theme::path()),
        SpanKind::Url => base.patch(theme::url()),
    }
}
