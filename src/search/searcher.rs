use std::collections::HashSet;

use tui_input::{Input, InputRequest};

use crate::phase::PhaseModel;

/// One occurrence of the query inside a phase line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub phase: usize,
    /// Index into the phase's lines
    pub line: usize,
    /// Byte offset of the hit in the lowercased line
    pub start: usize,
    pub len: usize,
}

/// Query, hits and the hit under the cursor for the grouped views
#[derive(Default)]
pub struct SearchState {
    input: Input,
    hits: Vec<Match>,
    lines_hit: HashSet<(usize, usize)>,
    cursor: Option<usize>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Apply one editing request to the query line
    pub fn handle_input(&mut self, req: InputRequest) {
        self.input.handle(req);
    }

    /// Set the query and collect case-insensitive matches in reading order
    pub fn search(&mut self, query: &str, model: &PhaseModel) {
        self.input = query.into();
        self.hits.clear();
        self.lines_hit.clear();
        self.cursor = None;
        if query.is_empty() {
            return;
        }

        let needle = query.to_lowercase();
        for (phase, line, entry) in model.lines() {
            let haystack = entry.text.to_lowercase();
            let before = self.hits.len();
            self.hits
                .extend(haystack.match_indices(&needle).map(|(start, _)| Match {
                    phase,
                    line,
                    start,
                    len: needle.len(),
                }));
            if self.hits.len() > before {
                self.lines_hit.insert((phase, line));
            }
        }
        self.cursor = (!self.hits.is_empty()).then_some(0);
    }

    /// Re-run the query against new model contents, keeping the cursor in range
    pub fn refresh(&mut self, model: &PhaseModel) {
        let query = self.query().to_string();
        let cursor = self.cursor;
        self.search(&query, model);
        if let (Some(i), Some(last)) = (cursor, self.hits.len().checked_sub(1)) {
            self.cursor = Some(i.min(last));
        }
    }

    pub fn matches(&self) -> &[Match] {
        &self.hits
    }

    pub fn match_count(&self) -> usize {
        self.hits.len()
    }

    /// Whether a line holds at least one match
    pub fn is_highlighted(&self, phase: usize, line: usize) -> bool {
        self.lines_hit.contains(&(phase, line))
    }

    /// 1-based cursor position for the status line
    pub fn current_match_display(&self) -> Option<usize> {
        self.cursor.map(|i| i + 1)
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.hits.get(self.cursor?)
    }

    pub fn next_match(&mut self) -> Option<&Match> {
        self.step(1)
    }

    pub fn prev_match(&mut self) -> Option<&Match> {
        self.step(-1)
    }

    /// Move the cursor by `delta`, wrapping at both ends
    fn step(&mut self, delta: isize) -> Option<&Match> {
        let count = self.hits.len() as isize;
        if count == 0 {
            return None;
        }
        let next = match self.cursor {
            Some(i) => (i as isize + delta).rem_euclid(count),
            None if delta < 0 => count - 1,
            None => 0,
        } as usize;
        self.cursor = Some(next);
        self.hits.get(next)
    }

    pub fn clear(&mut self) {
        self.input.reset();
        self.hits.clear();
        self.lines_hit.clear();
        self.cursor = None;
    }

    pub fn is_active(&self) -> bool {
        !self.query().is_empty()
    }

    pub fn has_matches(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Expand the match's phase and center its row
pub fn jump_to_match(model: &mut PhaseModel, m: &Match) {
    model.reveal_line(m.phase, m.line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LineKind;

    fn model_with(phases: &[(&str, &[&str])]) -> PhaseModel {
        let mut model = PhaseModel::new(0, true);
        for (name, lines) in phases {
            model.ensure_phase(name);
            for line in *lines {
                model.add_line(*line, LineKind::Normal);
            }
        }
        model.mark_build_complete();
        model
    }

    #[test]
    fn matches_follow_reading_order_across_phases() {
        let model = model_with(&[
            ("Compiling", &["Compiling Foo.swift", "Compiling Bar.swift"]),
            ("Linking", &["Ld Foo"]),
        ]);
        let mut search = SearchState::new();

        search.search("foo", &model);

        let positions: Vec<_> = search.matches().iter().map(|m| (m.phase, m.line)).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0)]);
        assert!(search.is_highlighted(0, 0));
        assert!(!search.is_highlighted(0, 1));
        assert_eq!(search.matches()[0].start, 10);
        assert_eq!(search.matches()[0].len, 3);
    }

    #[test]
    fn query_ignores_case() {
        let model = model_with(&[("Compiling", &["ERROR here", "error there", "Error"])]);
        let mut search = SearchState::new();

        search.search("Error", &model);
        assert_eq!(search.match_count(), 3);
    }

    #[test]
    fn every_occurrence_in_a_line_is_a_match() {
        let model = model_with(&[("Compiling", &["foo bar foo baz foo"])]);
        let mut search = SearchState::new();

        search.search("foo", &model);

        let starts: Vec<_> = search.matches().iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 8, 16]);
    }

    #[test]
    fn empty_query_drops_highlights() {
        let model = model_with(&[("Compiling", &["hello"])]);
        let mut search = SearchState::new();

        search.search("hello", &model);
        search.search("", &model);

        assert!(!search.has_matches());
        assert!(!search.is_highlighted(0, 0));
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let model = model_with(&[("Compiling", &["line1 foo", "line2", "line3 foo"])]);
        let mut search = SearchState::new();
        search.search("foo", &model);

        assert_eq!(search.current_match_display(), Some(1));
        assert_eq!(search.next_match().map(|m| m.line), Some(2));
        assert_eq!(search.next_match().map(|m| m.line), Some(0));
        assert_eq!(search.prev_match().map(|m| m.line), Some(2));
        assert_eq!(search.current_match_display(), Some(2));
    }

    #[test]
    fn cursor_moves_nowhere_without_matches() {
        let model = model_with(&[("Compiling", &["hello"])]);
        let mut search = SearchState::new();
        search.search("xyz", &model);

        assert!(search.next_match().is_none());
        assert!(search.prev_match().is_none());
    }

    #[test]
    fn offsets_are_bytes_for_multibyte_text() {
        let model = model_with(&[("Compiling", &["こんにちは世界", "hello world"])]);
        let mut search = SearchState::new();

        search.search("世界", &model);
        assert_eq!(search.match_count(), 1);
        assert_eq!(search.matches()[0].start, 15);
        assert_eq!(search.matches()[0].len, 6);
    }

    #[test]
    fn refresh_sees_lines_added_later() {
        let mut model = PhaseModel::new(0, false);
        model.ensure_phase("Compiling");
        model.add_line("foo", LineKind::Normal);
        let mut search = SearchState::new();
        search.search("foo", &model);

        model.add_line("another foo", LineKind::Normal);
        search.refresh(&model);

        assert_eq!(search.match_count(), 2);
        assert_eq!(search.current_match_display(), Some(1));
    }

    #[test]
    fn jump_to_match_expands_and_centers() {
        let mut model = PhaseModel::new(0, true);
        model.set_visible_rows(10);
        model.ensure_phase("Compiling");
        for i in 0..60 {
            model.add_line(format!("line {i}"), LineKind::Normal);
        }
        model.mark_build_complete();
        assert!(model.phases()[0].collapsed);

        let mut search = SearchState::new();
        search.search("line 40", &model);
        let m = search.current_match().cloned();
        jump_to_match(&mut model, m.as_ref().unwrap());

        assert!(!model.phases()[0].collapsed);
        // Row 41 (header first) centered in ten rows
        assert_eq!(model.viewport().scroll_pos(), 36);
    }

    #[test]
    fn clear_forgets_query_and_hits() {
        let model = model_with(&[("Compiling", &["hello world"])]);
        let mut search = SearchState::new();
        search.search("hello", &model);
        search.clear();

        assert!(search.query().is_empty());
        assert!(!search.has_matches());
        assert!(!search.is_active());
    }
}
