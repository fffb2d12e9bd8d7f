use std::collections::VecDeque;

use ansi_to_tui::IntoText;
use chrono::{DateTime, Local};

use crate::buffer::Viewport;
use crate::classify::LineKind;

/// Width of the timestamp gutter (`HH:MM:SS ` )
pub const TIMESTAMP_WIDTH: usize = 9;

/// Strip ANSI escape sequences, keeping only the visible text
pub fn plain_text(raw: &str) -> String {
    if !raw.contains('\x1b') {
        return raw.to_string();
    }
    match raw.into_text() {
        Ok(text) => text
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(" "),
        Err(_) => raw.to_string(),
    }
}

/// A single line of the stream view
#[derive(Debug, Clone)]
pub struct StreamLine {
    /// Visible text without escape sequences
    pub text: String,
    pub timestamp: DateTime<Local>,
    pub kind: LineKind,
    /// Text exactly as the driver produced it
    pub original: String,
}

impl StreamLine {
    pub fn new(original: String, kind: LineKind, timestamp: DateTime<Local>) -> Self {
        Self {
            text: plain_text(&original),
            timestamp,
            kind,
            original,
        }
    }

    /// Timestamp formatted for the gutter
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Gutter width for line numbers: `ceil(log10(total)) + 1`
pub fn line_number_width(total: usize) -> usize {
    (total.max(1) as f64).log10().ceil() as usize + 1
}

/// Ring buffer of stream lines with its scroll state
///
/// When max lines is exceeded, old lines are automatically discarded.
/// Uses VecDeque internally for O(1) removal from the front.
pub struct StreamBuffer {
    lines: VecDeque<StreamLine>,
    max_lines: usize,
    viewport: Viewport,
    last_timestamp: Option<DateTime<Local>>,
    show_line_numbers: bool,
    show_timestamps: bool,
    /// Lines evicted since the buffer was created, used to number lines
    evicted: usize,
}

impl StreamBuffer {
    /// Create a buffer with specified max lines
    ///
    /// # Arguments
    /// * `max_lines` - Maximum number of lines to keep (0 for unlimited)
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines,
            viewport: Viewport::following(),
            last_timestamp: None,
            show_line_numbers: false,
            show_timestamps: false,
            evicted: 0,
        }
    }

    pub fn with_follow_tolerance(mut self, tolerance: usize) -> Self {
        self.viewport = self.viewport.with_follow_tolerance(tolerance);
        self
    }

    /// Append a line stamped with the current time
    ///
    /// Blank lines are ignored. Returns whether the line was kept.
    pub fn push(&mut self, original: impl Into<String>, kind: LineKind) -> bool {
        self.push_at(original, kind, Local::now())
    }

    /// Append a line with an explicit timestamp
    ///
    /// Timestamps never go backwards: an earlier time is raised to the last one.
    pub fn push_at(
        &mut self,
        original: impl Into<String>,
        kind: LineKind,
        timestamp: DateTime<Local>,
    ) -> bool {
        let original = original.into();
        if original.trim().is_empty() {
            return false;
        }
        let timestamp = match self.last_timestamp {
            Some(last) if timestamp < last => last,
            _ => timestamp,
        };
        self.last_timestamp = Some(timestamp);

        let mut dropped = 0;
        if self.max_lines > 0 {
            while self.lines.len() >= self.max_lines {
                self.lines.pop_front();
                dropped += 1;
            }
        }
        self.evicted += dropped;
        self.lines.push_back(StreamLine::new(original, kind, timestamp));
        self.viewport.on_append(self.lines.len(), dropped);
        true
    }

    /// Get lines in specified range
    pub fn get_range(&self, start: usize, count: usize) -> Vec<&StreamLine> {
        self.lines.iter().skip(start).take(count).collect()
    }

    /// Lines currently inside the viewport
    pub fn visible(&self) -> Vec<&StreamLine> {
        let range = self.viewport.visible_range(self.lines.len());
        self.get_range(range.start, range.len())
    }

    pub fn get(&self, index: usize) -> Option<&StreamLine> {
        self.lines.get(index)
    }

    /// Return the number of lines in the buffer
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Return an iterator over all lines
    pub fn iter(&self) -> impl Iterator<Item = &StreamLine> {
        self.lines.iter()
    }

    /// Absolute 1-based number of the line at `index`, stable across eviction
    pub fn line_number(&self, index: usize) -> usize {
        self.evicted + index + 1
    }

    /// Remove all lines and follow the tail again
    pub fn clear(&mut self) {
        self.lines.clear();
        self.viewport.reset();
        self.last_timestamp = None;
        self.evicted = 0;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        self.viewport.set_visible_rows(rows, self.lines.len());
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.viewport.up(n, self.lines.len());
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.viewport.down(n, self.lines.len());
    }

    pub fn scroll_to_top(&mut self) {
        self.viewport.top(self.lines.len());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.viewport.bottom(self.lines.len());
    }

    pub fn page_up(&mut self) {
        self.viewport.page_up(self.lines.len());
    }

    pub fn page_down(&mut self) {
        self.viewport.page_down(self.lines.len());
    }

    pub fn half_page_up(&mut self) {
        self.viewport.half_page_up(self.lines.len());
    }

    pub fn half_page_down(&mut self) {
        self.viewport.half_page_down(self.lines.len());
    }

    pub fn show_line_numbers(&self) -> bool {
        self.show_line_numbers
    }

    pub fn toggle_line_numbers(&mut self) {
        self.show_line_numbers = !self.show_line_numbers;
    }

    pub fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    pub fn toggle_timestamps(&mut self) {
        self.show_timestamps = !self.show_timestamps;
    }

    /// Total gutter width for the enabled overlays
    pub fn gutter_width(&self) -> usize {
        let numbers = if self.show_line_numbers {
            line_number_width(self.line_number(self.lines.len().saturating_sub(1))) + 1
        } else {
            0
        };
        let clock = if self.show_timestamps {
            TIMESTAMP_WIDTH
        } else {
            0
        };
        numbers + clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn push_lines(buffer: &mut StreamBuffer, count: usize) {
        for i in 0..count {
            buffer.push(format!("line{}", i), LineKind::Normal);
        }
    }

    #[test]
    fn stream_buffer_push_adds_line_to_buffer() {
        let mut buffer = StreamBuffer::new(100);
        assert!(buffer.push("hello", LineKind::Normal));

        assert_eq!(buffer.len(), 1);
        assert!(!buffer.is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t \t")]
    fn stream_buffer_ignores_blank_lines(#[case] line: &str) {
        let mut buffer = StreamBuffer::new(100);
        assert!(!buffer.push(line, LineKind::Normal));
        assert!(buffer.is_empty());
    }

    #[test]
    fn stream_buffer_push_discards_oldest_line_when_max_exceeded() {
        let mut buffer = StreamBuffer::new(3);
        push_lines(&mut buffer, 4);

        assert_eq!(buffer.len(), 3);
        let lines = buffer.get_range(0, 3);
        assert_eq!(lines[0].text, "line1");
        assert_eq!(lines[1].text, "line2");
        assert_eq!(lines[2].text, "line3");
        assert_eq!(buffer.line_number(0), 2);
    }

    #[test]
    fn stream_buffer_keeps_suffix_of_insertion_order() {
        let mut buffer = StreamBuffer::new(50);
        push_lines(&mut buffer, 1234);

        assert_eq!(buffer.len(), 50);
        let texts: Vec<_> = buffer.iter().map(|l| l.text.clone()).collect();
        let expected: Vec<_> = (1184..1234).map(|i| format!("line{}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn stream_buffer_push_unlimited_when_max_lines_is_zero() {
        let mut buffer = StreamBuffer::new(0);
        push_lines(&mut buffer, 1000);

        assert_eq!(buffer.len(), 1000);
    }

    #[test]
    fn stream_buffer_get_range_returns_partial_when_exceeds_buffer() {
        let mut buffer = StreamBuffer::new(100);
        push_lines(&mut buffer, 5);

        let lines = buffer.get_range(3, 10);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "line3");
        assert_eq!(lines[1].text, "line4");
        assert!(buffer.get_range(10, 5).is_empty());
    }

    #[test]
    fn stream_buffer_timestamps_never_decrease() {
        let mut buffer = StreamBuffer::new(10);
        let now = Local::now();
        buffer.push_at("first", LineKind::Normal, now);
        buffer.push_at("second", LineKind::Normal, now - Duration::seconds(5));

        let lines = buffer.get_range(0, 2);
        assert!(lines[1].timestamp >= lines[0].timestamp);
    }

    #[test]
    fn stream_line_strips_ansi_but_keeps_original() {
        let mut buffer = StreamBuffer::new(10);
        buffer.push("\x1b[31merror\x1b[0m: boom", LineKind::Error);

        let line = buffer.get(0).unwrap();
        assert_eq!(line.text, "error: boom");
        assert_eq!(line.original, "\x1b[31merror\x1b[0m: boom");
    }

    #[test]
    fn stream_buffer_autofollow_scenario() {
        let mut buffer = StreamBuffer::new(20_000);
        buffer.set_visible_rows(40);
        push_lines(&mut buffer, 5000);
        assert!(buffer.viewport().auto_follow());

        buffer.push("line 5001", LineKind::Normal);
        assert_eq!(buffer.viewport().scroll_pos(), 4961);

        buffer.scroll_up(1);
        assert!(!buffer.viewport().auto_follow());
        let pinned = buffer.viewport().scroll_pos();

        buffer.push("line 5002", LineKind::Normal);
        assert_eq!(buffer.viewport().scroll_pos(), pinned);
    }

    #[test]
    fn stream_buffer_visible_returns_viewport_slice() {
        let mut buffer = StreamBuffer::new(100);
        buffer.set_visible_rows(3);
        push_lines(&mut buffer, 10);

        let texts: Vec<_> = buffer.visible().iter().map(|l| l.text.clone()).collect();
        assert_eq!(texts, vec!["line7", "line8", "line9"]);

        buffer.scroll_to_top();
        assert_eq!(buffer.visible()[0].text, "line0");
    }

    #[test]
    fn stream_buffer_clear_resets_follow() {
        let mut buffer = StreamBuffer::new(100);
        buffer.set_visible_rows(3);
        push_lines(&mut buffer, 10);
        buffer.scroll_to_top();

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.viewport().auto_follow());
        assert_eq!(buffer.viewport().scroll_pos(), 0);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(9, 2)]
    #[case(10, 2)]
    #[case(11, 3)]
    #[case(5000, 5)]
    fn line_number_width_uses_log10(#[case] total: usize, #[case] expected: usize) {
        assert_eq!(line_number_width(total), expected);
    }

    #[test]
    fn gutter_width_sums_overlays() {
        let mut buffer = StreamBuffer::new(100);
        push_lines(&mut buffer, 42);
        assert_eq!(buffer.gutter_width(), 0);

        buffer.toggle_timestamps();
        assert_eq!(buffer.gutter_width(), TIMESTAMP_WIDTH);

        buffer.toggle_line_numbers();
        assert_eq!(buffer.gutter_width(), TIMESTAMP_WIDTH + 3 + 1);
    }
}
