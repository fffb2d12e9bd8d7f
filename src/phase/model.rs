use crate::buffer::Viewport;
use crate::classify::LineKind;

/// Phase that collects lines seen before any phase marker
pub const PREPARING: &str = "Preparing";

/// Status of a build phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Running,
    Success,
    Warning,
    Error,
}

/// A categorised line inside a phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseLine {
    pub text: String,
    pub kind: LineKind,
}

/// A named segment of the build
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: String,
    pub lines: Vec<PhaseLine>,
    pub status: PhaseStatus,
    pub collapsed: bool,
    /// Number of marker lines (files, steps) seen for this phase
    pub file_count: usize,
    /// Sticky once the first failure line arrives
    pub has_error: bool,
    has_warning: bool,
}

impl Phase {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Vec::new(),
            status: PhaseStatus::Running,
            collapsed: false,
            file_count: 0,
            has_error: false,
            has_warning: false,
        }
    }

    pub fn count(&self, pred: impl Fn(LineKind) -> bool) -> usize {
        self.lines.iter().filter(|l| pred(l.kind)).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(LineKind::is_failure)
    }

    pub fn warning_count(&self) -> usize {
        self.count(|k| k == LineKind::Warning)
    }

    pub fn problem_count(&self) -> usize {
        self.count(LineKind::is_problem)
    }
}

/// One rendered row of the grouped view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Header(usize),
    Line(usize, usize),
}

impl Row {
    pub fn phase(self) -> usize {
        match self {
            Self::Header(p) | Self::Line(p, _) => p,
        }
    }
}

/// Collapsible per-phase grouping of build output
pub struct PhaseModel {
    phases: Vec<Phase>,
    active: Option<usize>,
    smart_collapse: bool,
    errors_only: bool,
    selected: usize,
    error_cursor: Option<(usize, usize)>,
    viewport: Viewport,
    max_lines: usize,
    total_lines: usize,
}

impl PhaseModel {
    /// # Arguments
    /// * `max_lines` - Maximum lines kept across all phases (0 for unlimited)
    pub fn new(max_lines: usize, smart_collapse: bool) -> Self {
        Self {
            phases: Vec::new(),
            active: None,
            smart_collapse,
            errors_only: false,
            selected: 0,
            error_cursor: None,
            viewport: Viewport::following(),
            max_lines,
            total_lines: 0,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Make `name` the current phase, completing any running phase first
    pub fn ensure_phase(&mut self, name: &str) -> usize {
        if let Some(index) = self.active
            && self.phases[index].name == name
        {
            self.phases[index].file_count += 1;
            return index;
        }

        self.complete_running();
        let mut phase = Phase::new(name);
        phase.file_count = 1;
        self.phases.push(phase);
        let index = self.phases.len() - 1;
        self.active = Some(index);
        self.refresh(0);
        index
    }

    /// Append a line to the current phase
    pub fn add_line(&mut self, text: impl Into<String>, kind: LineKind) {
        let index = match self.active {
            Some(index) => index,
            None => {
                self.complete_running();
                self.phases.push(Phase::new(PREPARING));
                let index = self.phases.len() - 1;
                self.active = Some(index);
                index
            }
        };

        let phase = &mut self.phases[index];
        phase.lines.push(PhaseLine {
            text: text.into(),
            kind,
        });
        if kind.is_failure() && !phase.has_error {
            phase.has_error = true;
            phase.status = PhaseStatus::Error;
            phase.collapsed = false;
        }
        if kind == LineKind::Warning {
            phase.has_warning = true;
        }
        self.total_lines += 1;

        let dropped = self.evict();
        self.refresh(dropped);
    }

    /// Drop the oldest lines once over the cap, returning rows removed
    fn evict(&mut self) -> usize {
        if self.max_lines == 0 {
            return 0;
        }
        let mut dropped = 0;
        while self.total_lines > self.max_lines {
            let Some(first) = self.phases.iter().position(|p| !p.lines.is_empty()) else {
                break;
            };
            let phase = &mut self.phases[first];
            let header_shown = !self.errors_only || phase.problem_count() > 0;
            let line = phase.lines.remove(0);
            self.total_lines -= 1;
            if header_shown && !phase.collapsed && (!self.errors_only || line.kind.is_problem()) {
                dropped += 1;
            }

            let remove = phase.lines.is_empty() && self.active != Some(first);
            let header_hidden = self.errors_only && phase.problem_count() == 0;
            if header_shown && (remove || header_hidden) {
                dropped += 1;
            }
            if remove {
                self.phases.remove(first);
                self.shift_after_removal(first);
            }
        }
        dropped
    }

    fn shift_after_removal(&mut self, removed: usize) {
        let shift = |i: usize| if i > removed { i - 1 } else { i };
        self.active = self.active.map(shift);
        self.selected = shift(self.selected).min(self.phases.len().saturating_sub(1));
        self.error_cursor = self
            .error_cursor
            .filter(|(p, _)| *p != removed)
            .map(|(p, l)| (shift(p), l));
    }

    fn complete(&mut self, index: usize) {
        let smart_collapse = self.smart_collapse;
        let phase = &mut self.phases[index];
        if phase.status != PhaseStatus::Running {
            return;
        }
        phase.status = if phase.has_error {
            PhaseStatus::Error
        } else if phase.has_warning {
            PhaseStatus::Warning
        } else {
            PhaseStatus::Success
        };
        if smart_collapse && phase.status == PhaseStatus::Success {
            phase.collapsed = true;
        }
    }

    fn complete_running(&mut self) {
        for index in 0..self.phases.len() {
            self.complete(index);
        }
    }

    /// Terminate every running phase at the end of an operation
    pub fn mark_build_complete(&mut self) {
        self.complete_running();
        self.active = None;
        self.refresh(0);
    }

    pub fn clear(&mut self) {
        self.phases.clear();
        self.active = None;
        self.selected = 0;
        self.error_cursor = None;
        self.total_lines = 0;
        self.viewport.reset();
        self.refresh(0);
    }

    pub fn errors_only(&self) -> bool {
        self.errors_only
    }

    pub fn toggle_errors_only(&mut self) {
        self.errors_only = !self.errors_only;
        self.refresh(0);
    }

    pub fn expand_all(&mut self) {
        self.phases.iter_mut().for_each(|p| p.collapsed = false);
        self.refresh(0);
    }

    pub fn collapse_all(&mut self) {
        self.phases.iter_mut().for_each(|p| p.collapsed = true);
        self.refresh(0);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Flip the collapsed flag of the selected phase
    pub fn toggle_selected(&mut self) {
        if let Some(phase) = self.phases.get_mut(self.selected) {
            phase.collapsed = !phase.collapsed;
            self.refresh(0);
            self.reveal_phase(self.selected);
        }
    }

    pub fn select_next(&mut self) {
        self.select(self.selected + 1);
    }

    pub fn select_prev(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    /// Select a phase by index, clamped, and bring its header into view
    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.phases.len().saturating_sub(1));
        self.reveal_phase(self.selected);
    }

    fn reveal_phase(&mut self, index: usize) {
        let rows = self.rows();
        if let Some(row) = rows.iter().position(|r| *r == Row::Header(index)) {
            self.viewport.reveal(row, rows.len());
        }
    }

    /// Visible rows in reading order
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.phases.len() + self.total_lines);
        for (p, phase) in self.phases.iter().enumerate() {
            if self.errors_only && phase.problem_count() == 0 {
                continue;
            }
            rows.push(Row::Header(p));
            if phase.collapsed {
                continue;
            }
            for (l, line) in phase.lines.iter().enumerate() {
                if self.errors_only && !line.kind.is_problem() {
                    continue;
                }
                rows.push(Row::Line(p, l));
            }
        }
        rows
    }

    /// Number of rows `rows` would produce
    pub fn row_count(&self) -> usize {
        self.phases
            .iter()
            .map(|phase| {
                let lines = match (self.errors_only, phase.collapsed) {
                    (_, true) => 0,
                    (true, false) => phase.problem_count(),
                    (false, false) => phase.lines.len(),
                };
                match (self.errors_only, phase.problem_count()) {
                    (true, 0) => 0,
                    _ => 1 + lines,
                }
            })
            .sum()
    }

    /// Every line in reading order, regardless of collapse state
    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, &PhaseLine)> {
        self.phases
            .iter()
            .enumerate()
            .flat_map(|(p, phase)| phase.lines.iter().enumerate().map(move |(l, line)| (p, l, line)))
    }

    /// Next failure line after `from` in reading order, wrapping around
    ///
    /// Expands the phase containing the match.
    pub fn find_next_error(&mut self, from: Option<(usize, usize)>) -> Option<(usize, usize)> {
        let positions: Vec<(usize, usize)> = self
            .lines()
            .filter(|(_, _, line)| line.kind.is_failure())
            .map(|(p, l, _)| (p, l))
            .collect();
        let found = match from {
            Some(from) => positions
                .iter()
                .find(|pos| **pos > from)
                .or_else(|| positions.first()),
            None => positions.first(),
        }
        .copied()?;
        self.phases[found.0].collapsed = false;
        self.refresh(0);
        Some(found)
    }

    /// Previous failure line before `from` in reading order, wrapping around
    pub fn find_prev_error(&mut self, from: Option<(usize, usize)>) -> Option<(usize, usize)> {
        let positions: Vec<(usize, usize)> = self
            .lines()
            .filter(|(_, _, line)| line.kind.is_failure())
            .map(|(p, l, _)| (p, l))
            .collect();
        let found = match from {
            Some(from) => positions
                .iter()
                .rev()
                .find(|pos| **pos < from)
                .or_else(|| positions.last()),
            None => positions.last(),
        }
        .copied()?;
        self.phases[found.0].collapsed = false;
        self.refresh(0);
        Some(found)
    }

    /// Jump to the next failure and center it
    pub fn next_error(&mut self) -> Option<(usize, usize)> {
        let found = self.find_next_error(self.error_cursor)?;
        self.error_cursor = Some(found);
        self.reveal_line(found.0, found.1);
        Some(found)
    }

    /// Jump to the previous failure and center it
    pub fn prev_error(&mut self) -> Option<(usize, usize)> {
        let found = self.find_prev_error(self.error_cursor)?;
        self.error_cursor = Some(found);
        self.reveal_line(found.0, found.1);
        Some(found)
    }

    /// Expand the phase and center the line's row in the viewport
    pub fn reveal_line(&mut self, phase: usize, line: usize) {
        let Some(target) = self.phases.get_mut(phase) else {
            return;
        };
        target.collapsed = false;
        self.selected = phase;
        let rows = self.rows();
        let row = rows
            .iter()
            .position(|r| *r == Row::Line(phase, line))
            .or_else(|| rows.iter().position(|r| *r == Row::Header(phase)));
        if let Some(row) = row {
            self.viewport.center_on(row, rows.len());
        }
    }

    /// Phase whose header is pinned above the viewport
    ///
    /// Only set when the top row is a line inside the phase body.
    pub fn sticky_header(&self) -> Option<usize> {
        let rows = self.rows();
        match rows.get(self.viewport.scroll_pos()) {
            Some(Row::Line(p, _)) => Some(*p),
            _ => None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn refresh(&mut self, dropped: usize) {
        let total = self.row_count();
        self.viewport.on_append(total, dropped);
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        let total = self.row_count();
        self.viewport.set_visible_rows(rows, total);
    }

    pub fn scroll_up(&mut self, n: usize) {
        let total = self.row_count();
        self.viewport.up(n, total);
    }

    pub fn scroll_down(&mut self, n: usize) {
        let total = self.row_count();
        self.viewport.down(n, total);
    }

    pub fn scroll_to_top(&mut self) {
        let total = self.row_count();
        self.viewport.top(total);
    }

    pub fn scroll_to_bottom(&mut self) {
        let total = self.row_count();
        self.viewport.bottom(total);
    }

    pub fn page_up(&mut self) {
        let total = self.row_count();
        self.viewport.page_up(total);
    }

    pub fn page_down(&mut self) {
        let total = self.row_count();
        self.viewport.page_down(total);
    }

    pub fn half_page_up(&mut self) {
        let total = self.row_count();
        self.viewport.half_page_up(total);
    }

    pub fn half_page_down(&mut self) {
        let total = self.row_count();
        self.viewport.half_page_down(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_count(model: &PhaseModel) -> usize {
        model
            .phases()
            .iter()
            .filter(|p| p.status == PhaseStatus::Running)
            .count()
    }

    #[test]
    fn phase_model_lines_before_marker_go_to_preparing() {
        let mut model = PhaseModel::new(0, true);
        model.add_line("Command line invocation:", LineKind::Normal);

        assert_eq!(model.phases().len(), 1);
        assert_eq!(model.phases()[0].name, PREPARING);
        assert_eq!(model.phases()[0].status, PhaseStatus::Running);
    }

    #[test]
    fn phase_model_same_phase_counts_files() {
        let mut model = PhaseModel::new(0, true);
        model.ensure_phase("Compiling");
        model.add_line("Compiling A.swift", LineKind::PhaseHeader);
        model.ensure_phase("Compiling");
        model.add_line("Compiling B.swift", LineKind::PhaseHeader);

        assert_eq!(model.phases().len(), 1);
        assert_eq!(model.phases()[0].file_count, 2);
        assert_eq!(model.phases()[0].lines.len(), 2);
    }

    #[test]
    fn phase_model_new_phase_completes_previous() {
        let mut model = PhaseModel::new(0, true);
        model.ensure_phase("Compiling");
        model.add_line("Compiling A.swift", LineKind::PhaseHeader);
        model.ensure_phase("Linking");

        let phases = model.phases();
        assert_eq!(phases[0].status, PhaseStatus::Success);
        assert!(phases[0].collapsed, "smart collapse folds successful phases");
        assert_eq!(phases[1].status, PhaseStatus::Running);
        assert_eq!(running_count(&model), 1);
    }

    #[test]
    fn phase_model_warning_phase_stays_expanded() {
        let mut model = PhaseModel::new(0, true);
        model.ensure_phase("Compiling");
        model.add_line("a.swift:1:1: warning: unused", LineKind::Warning);
        model.mark_build_complete();

        let phase = &model.phases()[0];
        assert_eq!(phase.status, PhaseStatus::Warning);
        assert!(!phase.collapsed);
        assert_eq!(running_count(&model), 0);
    }

    #[test]
    fn phase_model_error_is_sticky_and_expands() {
        let mut model = PhaseModel::new(0, true);
        model.ensure_phase("Linking");
        model.collapse_all();
        model.add_line("clang: error: linker command failed", LineKind::Error);

        assert_eq!(model.phases()[0].status, PhaseStatus::Error);
        assert!(!model.phases()[0].collapsed);

        model.add_line("all good", LineKind::Success);
        model.mark_build_complete();
        assert_eq!(model.phases()[0].status, PhaseStatus::Error);
        assert!(model.phases()[0].has_error);
    }

    #[test]
    fn phase_model_at_most_one_running_after_each_transition() {
        let mut model = PhaseModel::new(0, true);
        for name in ["Compiling", "Linking", "Compiling", "Signing"] {
            model.ensure_phase(name);
            model.add_line(format!("{name} thing"), LineKind::PhaseHeader);
            assert!(running_count(&model) <= 1);
        }
        assert_eq!(model.phases().len(), 4);
    }

    #[test]
    fn phase_model_smart_collapse_off_keeps_success_expanded() {
        let mut model = PhaseModel::new(0, false);
        model.ensure_phase("Compiling");
        model.ensure_phase("Linking");
        assert!(!model.phases()[0].collapsed);
    }

    #[test]
    fn phase_model_rows_follow_collapse_and_errors_only() {
        let mut model = PhaseModel::new(0, false);
        model.ensure_phase("Compiling");
        model.add_line("Compiling A.swift", LineKind::PhaseHeader);
        model.add_line("a.swift:1:1: error: boom", LineKind::Error);
        model.ensure_phase("Linking");
        model.add_line("Ld App", LineKind::PhaseHeader);

        assert_eq!(model.rows().len(), 5);

        model.toggle_errors_only();
        assert_eq!(model.rows(), vec![Row::Header(0), Row::Line(0, 1)]);

        model.toggle_errors_only();
        model.collapse_all();
        assert_eq!(model.rows(), vec![Row::Header(0), Row::Header(1)]);
    }

    #[test]
    fn phase_model_error_navigation_wraps() {
        let mut model = PhaseModel::new(0, true);
        model.ensure_phase("Compiling");
        model.add_line("a.swift:1:1: error: one", LineKind::Error);
        model.ensure_phase("Testing");
        model.add_line("Test Case 'x' passed", LineKind::TestPass);
        model.add_line("Test Case 'y' failed", LineKind::TestFail);
        model.mark_build_complete();
        model.collapse_all();

        assert_eq!(model.find_next_error(None), Some((0, 0)));
        assert_eq!(model.find_next_error(Some((0, 0))), Some((1, 1)));
        assert_eq!(model.find_next_error(Some((1, 1))), Some((0, 0)));
        assert_eq!(model.find_prev_error(Some((0, 0))), Some((1, 1)));
        assert!(!model.phases()[0].collapsed);
        assert!(!model.phases()[1].collapsed);
    }

    #[test]
    fn phase_model_no_errors_yields_none() {
        let mut model = PhaseModel::new(0, true);
        model.add_line("hello", LineKind::Normal);
        assert_eq!(model.find_next_error(None), None);
        assert_eq!(model.next_error(), None);
    }

    #[test]
    fn phase_model_reveal_line_centers_row() {
        let mut model = PhaseModel::new(0, false);
        model.set_visible_rows(10);
        model.ensure_phase("Compiling");
        for i in 0..100 {
            model.add_line(format!("line {i}"), LineKind::Normal);
        }
        model.collapse_all();

        model.reveal_line(0, 50);
        // Header occupies row 0, so line 50 is row 51
        assert_eq!(model.viewport().scroll_pos(), 46);
        assert!(!model.viewport().auto_follow());
        assert_eq!(model.sticky_header(), Some(0));
    }

    #[test]
    fn phase_model_sticky_header_absent_at_header_row() {
        let mut model = PhaseModel::new(0, false);
        model.set_visible_rows(10);
        model.ensure_phase("Compiling");
        model.add_line("a", LineKind::Normal);
        model.scroll_to_top();
        assert_eq!(model.sticky_header(), None);
    }

    #[test]
    fn phase_model_evicts_oldest_lines() {
        let mut model = PhaseModel::new(3, false);
        model.ensure_phase("Compiling");
        model.add_line("c1", LineKind::Normal);
        model.add_line("c2", LineKind::Normal);
        model.ensure_phase("Linking");
        model.add_line("l1", LineKind::Normal);
        model.add_line("l2", LineKind::Normal);
        model.add_line("l3", LineKind::Normal);

        assert_eq!(model.total_lines(), 3);
        assert_eq!(model.phases().len(), 1);
        assert_eq!(model.phases()[0].name, "Linking");
        assert_eq!(model.active(), Some(0));
    }

    #[test]
    fn phase_model_eviction_of_hidden_lines_keeps_pinned_position() {
        let mut model = PhaseModel::new(12, false);
        model.set_visible_rows(3);
        model.ensure_phase("Compiling");
        for i in 0..4 {
            model.add_line(format!("n{i}"), LineKind::Normal);
        }
        for i in 0..8 {
            model.add_line(format!("e{i}.swift:1:1: error: e{i}"), LineKind::Error);
        }
        model.toggle_errors_only();
        model.scroll_up(2);
        let pinned = model.viewport().scroll_pos();

        model.add_line("e8.swift:1:1: error: e8", LineKind::Error);
        model.add_line("e9.swift:1:1: error: e9", LineKind::Error);

        assert_eq!(model.total_lines(), 12);
        assert_eq!(model.viewport().scroll_pos(), pinned);
    }

    #[test]
    fn phase_model_toggle_selected_flips_collapse() {
        let mut model = PhaseModel::new(0, false);
        model.ensure_phase("Compiling");
        model.ensure_phase("Linking");
        model.select_next();
        assert_eq!(model.selected(), 1);

        model.toggle_selected();
        assert!(model.phases()[1].collapsed);
        model.toggle_selected();
        assert!(!model.phases()[1].collapsed);
    }
}
