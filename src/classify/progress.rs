use std::path::Path;

/// Source suffixes that identify the file currently being processed
const TRACKED_SUFFIXES: &[&str] = &[".swift", ".m", ".mm"];

/// Markers that start a fresh operation and reset all progress
const START_MARKERS: &[&str] = &["Starting", "Build started"];

/// Stage labels keyed by lowercase substrings, checked in order.
/// A needle starting with `^` must match at the start of the line.
const STAGES: &[(&[&str], &str)] = &[
    (&["resolve package", "resolving", "resolved source packages"], "Resolve"),
    (&["compil"], "Compile"),
    (&["linking", "^ld "], "Link"),
    (&["signing", "codesign"], "Sign"),
    (&["running", "launching", "launched"], "Running"),
    (&["testing", "test suite", "test case"], "Testing"),
    (&["analyz"], "Analyzing"),
];

/// Live progress extracted from non-pretty log lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Current stage label, empty until a stage is seen
    pub stage: String,
    /// Basename of the file being processed
    pub current_file: String,
    pub current: u64,
    pub total: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters and labels
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one message; unrelated lines leave state untouched
    pub fn observe(&mut self, message: &str) {
        if START_MARKERS.iter().any(|m| message.contains(m)) {
            self.reset();
        }

        let lower = message.to_lowercase();
        if let Some(stage) = stage_for(&lower) {
            self.stage = stage.to_string();
        }

        if let Some((current, total)) = parse_counters(&lower) {
            self.current = current;
            self.total = total;
        }

        if let Some(file) = file_in(message) {
            self.current_file = file;
        }
    }

    /// Fraction complete in `[0, 1]`, if a total is known
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.current.min(self.total) as f64) / (self.total as f64))
    }
}

fn stage_for(lower: &str) -> Option<&'static str> {
    STAGES
        .iter()
        .find(|(needles, _)| {
            needles.iter().any(|n| match n.strip_prefix('^') {
                Some(prefix) => lower.starts_with(prefix),
                None => lower.contains(n),
            })
        })
        .map(|(_, label)| *label)
}

/// Parse `N of M ... task` counters
fn parse_counters(lower: &str) -> Option<(u64, u64)> {
    if !lower.contains("task") {
        return None;
    }
    let (left, right) = lower.split_once(" of ")?;
    let current = left.split_whitespace().last()?.parse().ok()?;
    let total = right.split_whitespace().next()?.parse().ok()?;
    Some((current, total))
}

/// First whitespace-delimited token naming a tracked source file, as a basename
fn file_in(message: &str) -> Option<String> {
    if !TRACKED_SUFFIXES.iter().any(|s| message.contains(s)) {
        return None;
    }
    let token = message
        .split_whitespace()
        .find(|token| TRACKED_SUFFIXES.iter().any(|s| token.ends_with(s)))?;
    Path::new(token)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn progress_tracks_stage_file_and_counters() {
        let mut progress = Progress::new();
        progress.observe("Compiling Foo.swift");
        progress.observe("3 of 10 tasks");

        assert_eq!(progress.stage, "Compile");
        assert_eq!(progress.current_file, "Foo.swift");
        assert_eq!((progress.current, progress.total), (3, 10));
        assert_eq!(progress.ratio(), Some(0.3));
    }

    #[test]
    fn progress_reduces_file_to_basename() {
        let mut progress = Progress::new();
        progress.observe("CompileSwift normal arm64 /Users/me/App/Sources/View.swift (in target 'App')");
        assert_eq!(progress.current_file, "View.swift");
    }

    #[test]
    fn progress_survives_unrelated_lines() {
        let mut progress = Progress::new();
        progress.observe("Compiling Foo.swift");
        progress.observe("5 of 12 tasks");
        progress.observe("Build settings from command line:");
        progress.observe("    SDKROOT = iphonesimulator");

        assert_eq!(progress.stage, "Compile");
        assert_eq!((progress.current, progress.total), (5, 12));
        assert_eq!(progress.current_file, "Foo.swift");
    }

    #[rstest]
    #[case("abc of def tasks")]
    #[case("of 10 tasks")]
    #[case("3 of tasks")]
    fn progress_ignores_unparseable_counters(#[case] line: &str) {
        let mut progress = Progress::new();
        progress.observe("7 of 9 tasks");
        progress.observe(line);
        assert_eq!((progress.current, progress.total), (7, 9));
    }

    #[test]
    fn progress_start_marker_resets() {
        let mut progress = Progress::new();
        progress.observe("Compiling Foo.swift");
        progress.observe("3 of 10 tasks");
        progress.observe("Build started");

        assert_eq!(progress, Progress::default());
    }

    #[rstest]
    #[case("Resolve Package Graph", "Resolve")]
    #[case("Ld /tmp/App normal", "Link")]
    #[case("▸ Signing App.app", "Sign")]
    #[case("Launching App on iPhone 15", "Running")]
    #[case("Test Suite 'All tests' started", "Testing")]
    #[case("Analyzing main.m", "Analyzing")]
    fn progress_stage_labels(#[case] line: &str, #[case] stage: &str) {
        let mut progress = Progress::new();
        progress.observe(line);
        assert_eq!(progress.stage, stage);
    }

    #[test]
    fn progress_ratio_unknown_without_total() {
        assert_eq!(Progress::new().ratio(), None);
    }
}
