use std::collections::HashSet;

use crate::buffer::Viewport;
use crate::classify::{Location, extract_location};

/// Default cap on stored issues
pub const DEFAULT_MAX_ISSUES: usize = 2000;

/// Severity of a diagnostic, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }
}

/// A diagnostic surfaced in the issues view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    /// Short message without location or severity label
    pub message: String,
    pub location: Location,
    /// Full diagnostic text as received
    pub full_text: String,
    pub expanded: bool,
}

/// Identity used to recognise the same diagnostic reported twice
type IssueKey = (Severity, String, u32, u32, String);

impl Issue {
    /// Parse a diagnostic line into an issue
    pub fn parse(severity: Severity, text: &str) -> Self {
        let extracted = extract_location(text);
        Self {
            severity,
            message: extracted.message,
            location: extracted.location,
            full_text: text.to_string(),
            expanded: false,
        }
    }

    fn key(&self) -> IssueKey {
        (
            self.severity,
            self.location.file.clone(),
            self.location.line,
            self.location.column,
            self.message.clone(),
        )
    }

    /// Rows taken in the list, counting the full text when expanded
    pub fn rows(&self) -> usize {
        if self.expanded {
            1 + self.full_text.lines().count()
        } else {
            1
        }
    }

    /// `file:line:col` for display, empty when unknown
    pub fn location_label(&self) -> String {
        let loc = &self.location;
        match (loc.is_known(), loc.line, loc.column) {
            (false, _, _) => String::new(),
            (true, 0, _) => loc.file.clone(),
            (true, line, 0) => format!("{}:{}", loc.file, line),
            (true, line, column) => format!("{}:{}:{}", loc.file, line, column),
        }
    }
}

/// Sorted, bounded, deduplicated collection of diagnostics
pub struct IssuesStore {
    issues: Vec<Issue>,
    seen: HashSet<IssueKey>,
    max_issues: usize,
    selected: usize,
    viewport: Viewport,
}

impl Default for IssuesStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ISSUES)
    }
}

impl IssuesStore {
    pub fn new(max_issues: usize) -> Self {
        Self {
            issues: Vec::new(),
            seen: HashSet::new(),
            max_issues,
            selected: 0,
            viewport: Viewport::pinned(),
        }
    }

    /// Parse and insert a diagnostic
    ///
    /// Returns false when an identical issue is already stored.
    pub fn add(&mut self, severity: Severity, text: &str) -> bool {
        self.insert(Issue::parse(severity, text))
    }

    /// Insert an issue, keeping the list sorted by severity
    pub fn insert(&mut self, issue: Issue) -> bool {
        if !self.seen.insert(issue.key()) {
            return false;
        }
        self.issues.push(issue);
        // Stable: arrival order is kept within a severity
        self.issues.sort_by_key(|issue| issue.severity);

        if self.issues.len() > self.max_issues {
            self.issues.truncate(self.max_issues);
            self.seen = self.issues.iter().map(Issue::key).collect();
        }
        self.selected = self.selected.min(self.issues.len().saturating_sub(1));
        self.viewport.clamp(self.issues.len());
        true
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Issue> {
        self.issues.get(self.selected)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        self.viewport.set_visible_rows(rows, self.issues.len());
        self.viewport.reveal(self.selected, self.issues.len());
    }

    pub fn select_up(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    pub fn select_down(&mut self) {
        self.select(self.selected + 1);
    }

    pub fn select_top(&mut self) {
        self.select(0);
    }

    pub fn select_bottom(&mut self) {
        self.select(self.issues.len().saturating_sub(1));
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.issues.len().saturating_sub(1));
        self.viewport.reveal(self.selected, self.issues.len());
        let start = self.first_visible(self.viewport.visible_rows());
        self.viewport.scroll_to(start, self.issues.len());
    }

    /// First issue drawn in a list `rows` tall
    ///
    /// Starts at the scroll position and skips issues until the rows of
    /// expanded issues above the selection leave room for its header.
    pub fn first_visible(&self, rows: usize) -> usize {
        let mut start = self.viewport.scroll_pos().min(self.selected);
        let used = |start: usize| {
            self.issues[start..self.selected]
                .iter()
                .map(Issue::rows)
                .sum::<usize>()
                + 1
        };
        while start < self.selected && used(start) > rows {
            start += 1;
        }
        start
    }

    /// Show or hide the full text of the selected issue
    pub fn toggle_expand(&mut self) {
        if let Some(issue) = self.issues.get_mut(self.selected) {
            issue.expanded = !issue.expanded;
        }
    }

    pub fn clear(&mut self) {
        self.issues.clear();
        self.seen.clear();
        self.selected = 0;
        let rows = self.viewport.visible_rows();
        self.viewport = Viewport::pinned();
        self.viewport.set_visible_rows(rows, 0);
    }
}
