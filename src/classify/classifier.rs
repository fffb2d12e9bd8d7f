use std::sync::LazyLock;

use regex::Regex;

/// Kind assigned to every line of build output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Normal,
    Info,
    Success,
    Warning,
    Error,
    Note,
    TestPass,
    TestFail,
    PhaseHeader,
    Progress,
    Verbose,
}

impl LineKind {
    /// Whether the line is shown in errors-only mode
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Error | Self::Warning | Self::TestFail)
    }

    /// Whether the line marks a failure inside a phase
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::TestFail)
    }
}

/// Strings that always mean a terminal failure, matched against the lowercased line
const FATAL_MARKERS: &[&str] = &[
    "fatal error",
    "clang: error",
    "swiftc: error",
    "swift-frontend: error",
    "ld: error",
    "linker command failed",
    "command swiftcompile failed",
    "command compilec failed",
    "command link failed",
    "codesign error",
    "no such module",
    "undefined symbols",
    "symbol(s) not found",
    "framework not found",
    "library not found",
    "failed with exit code",
    "build failed",
    "xcodebuild: error",
    "error: unable to find a destination",
    "error: no profiles",
    "error: exit status",
];

/// Pairs that imply a failure only when both appear
const FATAL_PAIRS: &[(&str, &str)] = &[("code signing", "error"), ("provisioning profile", "error")];

/// `path:line[:col]: error:` header of a compiler diagnostic
static DIAGNOSTIC_HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[^:\s].*:\d+(?::\d+)?:\s*(fatal error|error):").ok()
});

/// A line prepared once for all rules
struct Probe<'a> {
    text: &'a str,
    lower: String,
}

impl Probe<'_> {
    fn contains(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.lower.contains(n))
    }
}

type Rule = fn(&Probe<'_>) -> Option<LineKind>;

/// Ordered rule table. The first rule returning a kind wins.
const RULES: &[(&str, Rule)] = &[
    ("warning", rule_warning),
    ("note", rule_note),
    ("fatal", rule_fatal),
    ("errorish", rule_errorish),
    ("test-result", rule_test_result),
    ("success", rule_success),
    ("info", rule_info),
    ("progress", rule_progress),
    ("phase-header", rule_phase_header),
    ("verbose", rule_verbose),
];

fn rule_warning(p: &Probe<'_>) -> Option<LineKind> {
    (p.contains("warning:") || p.text.contains('⚠')).then_some(LineKind::Warning)
}

fn rule_note(p: &Probe<'_>) -> Option<LineKind> {
    p.contains_any(&["note:", "remark:"]).then_some(LineKind::Note)
}

fn rule_fatal(p: &Probe<'_>) -> Option<LineKind> {
    let paired = FATAL_PAIRS
        .iter()
        .any(|(a, b)| p.contains(a) && p.contains(b));
    (paired || p.contains_any(FATAL_MARKERS)).then_some(LineKind::Error)
}

fn rule_errorish(p: &Probe<'_>) -> Option<LineKind> {
    let errorish = p.contains_any(&["error:", "fatal error"]) || p.text.contains(['❌', '✗']);
    if !errorish {
        return None;
    }
    // A mention without a proper diagnostic header is demoted
    if DIAGNOSTIC_HEADER.as_ref().is_some_and(|re| re.is_match(p.text)) {
        Some(LineKind::Error)
    } else {
        Some(LineKind::Warning)
    }
}

fn rule_test_result(p: &Probe<'_>) -> Option<LineKind> {
    if !p.contains("test case") {
        return None;
    }
    if p.contains("passed") {
        Some(LineKind::TestPass)
    } else if p.contains("failed") {
        Some(LineKind::TestFail)
    } else {
        None
    }
}

fn rule_success(p: &Probe<'_>) -> Option<LineKind> {
    (p.contains_any(&["succeeded", "build succeeded"]) || p.text.contains(['✓', '✔']))
        .then_some(LineKind::Success)
}

fn rule_info(p: &Probe<'_>) -> Option<LineKind> {
    p.text.starts_with(['▸', '→', '•']).then_some(LineKind::Info)
}

fn rule_progress(p: &Probe<'_>) -> Option<LineKind> {
    (p.contains(" of ") && p.contains("task")).then_some(LineKind::Progress)
}

fn rule_phase_header(p: &Probe<'_>) -> Option<LineKind> {
    (p.text.starts_with("===") || p.contains_any(&["compiling", "linking", "signing"]))
        .then_some(LineKind::PhaseHeader)
}

fn rule_verbose(p: &Probe<'_>) -> Option<LineKind> {
    (p.text.starts_with("    ") || p.contains_any(&["creating", "copying"]))
        .then_some(LineKind::Verbose)
}

/// Classify a single line of output
///
/// Pure and total: every input maps to exactly one kind.
pub fn classify(line: &str) -> LineKind {
    let probe = Probe {
        text: line,
        lower: line.to_lowercase(),
    };
    RULES
        .iter()
        .find_map(|(_, rule)| rule(&probe))
        .unwrap_or(LineKind::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matching_rule(line: &str) -> Option<&'static str> {
        let probe = Probe {
            text: line,
            lower: line.to_lowercase(),
        };
        RULES
            .iter()
            .find(|(_, rule)| rule(&probe).is_some())
            .map(|(name, _)| *name)
    }

    #[rstest]
    #[case("main.swift:3:1: warning: unused variable 'x'", LineKind::Warning)]
    #[case("… warning: error: bad thing", LineKind::Warning)]
    #[case("⚠ Deprecated API usage", LineKind::Warning)]
    #[case("note: add '@MainActor' to make this isolated", LineKind::Note)]
    #[case("remark: Incremental compilation has been disabled", LineKind::Note)]
    #[case("clang: error: linker command failed with exit code 1", LineKind::Error)]
    #[case("ld: library not found for -lPods", LineKind::Error)]
    #[case("error: No such module 'Alamofire'", LineKind::Error)]
    #[case("Undefined symbols for architecture arm64:", LineKind::Error)]
    #[case("** BUILD FAILED **", LineKind::Error)]
    #[case("Code Signing Error: No certificate", LineKind::Error)]
    #[case("Provisioning profile \"App\" has error", LineKind::Error)]
    #[case("xcodebuild: error: Unable to read project", LineKind::Error)]
    #[case("/a/b/c.swift:42:10: error: cannot convert 'Int' to 'String'", LineKind::Error)]
    #[case("/a/b/c.m:7: error: expected ';'", LineKind::Error)]
    #[case("Something went wrong, error: retrying", LineKind::Warning)]
    #[case("❌ step failed", LineKind::Warning)]
    #[case("Test Case '-[AppTests testA]' passed (0.001 seconds).", LineKind::TestPass)]
    #[case("Test Case '-[AppTests testB]' failed (0.002 seconds).", LineKind::TestFail)]
    #[case("** BUILD SUCCEEDED **", LineKind::Success)]
    #[case("✓ Tests passed", LineKind::Success)]
    #[case("▸ Compiling Foo.swift", LineKind::Info)]
    #[case("→ Resolving packages", LineKind::Info)]
    #[case("    • nested bullet", LineKind::Verbose)]
    #[case("3 of 10 tasks", LineKind::Progress)]
    #[case("=== BUILD TARGET App OF PROJECT App ===", LineKind::PhaseHeader)]
    #[case("Compiling Foo.swift", LineKind::PhaseHeader)]
    #[case("    cd /Users/me/App", LineKind::Verbose)]
    #[case("Copying resources", LineKind::Verbose)]
    #[case("Build settings from command line:", LineKind::Normal)]
    #[case("", LineKind::Normal)]
    fn classify_follows_rule_order(#[case] line: &str, #[case] expected: LineKind) {
        assert_eq!(classify(line), expected);
    }

    #[rstest]
    #[case("warning: fatal error: no such module")]
    #[case("WARNING: linker command failed")]
    #[case("x.swift:1:1: warning: error: build failed")]
    fn classify_warning_wins_over_everything(#[case] line: &str) {
        assert_eq!(classify(line), LineKind::Warning);
    }

    #[test]
    fn classify_fatal_markers_are_errors() {
        for marker in FATAL_MARKERS {
            let line = format!("something {marker} happened");
            assert_eq!(classify(&line), LineKind::Error, "{line}");
        }
    }

    #[test]
    fn classify_is_deterministic() {
        let line = "/tmp/x.swift:1:2: error: boom";
        assert_eq!(classify(line), classify(line));
    }

    #[test]
    fn matching_rule_reports_first_match() {
        assert_eq!(matching_rule("a warning: b error:"), Some("warning"));
        assert_eq!(matching_rule("plain text"), None);
    }

    #[test]
    fn line_kind_problem_and_failure_sets() {
        assert!(LineKind::TestFail.is_problem());
        assert!(LineKind::Warning.is_problem());
        assert!(!LineKind::Warning.is_failure());
        assert!(LineKind::Error.is_failure());
        assert!(!LineKind::Note.is_problem());
    }
}
