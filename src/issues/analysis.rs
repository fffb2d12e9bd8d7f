use crate::issues::{Issue, Severity};

/// Lowercase substrings mapped to a human suggestion
const HINTS: &[(&[&str], &str)] = &[
    (
        &["no such module"],
        "Missing module: resolve packages or check the target's framework search paths",
    ),
    (
        &["cannot convert", "type mismatch"],
        "Type conversion: check the expected and actual types at the call site",
    ),
    (
        &["has no member"],
        "Missing member: the type does not declare this property or method",
    ),
    (
        &["cannot find", "unresolved identifier"],
        "Unresolved symbol: check imports, spelling and target membership",
    ),
    (
        &["sendable", "@mainactor"],
        "Concurrency: review actor isolation and Sendable conformances",
    ),
];

/// Summary of the error subset shown under the issues list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub suggestions: Vec<&'static str>,
    pub summary: String,
}

/// Derive suggestions from the stored errors
pub fn analyze(issues: &[Issue]) -> Analysis {
    let errors: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .collect();
    let warnings = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .count();

    let mut suggestions = Vec::new();
    for issue in &errors {
        let lower = issue.full_text.to_lowercase();
        for (needles, hint) in HINTS {
            if needles.iter().any(|n| lower.contains(n)) && !suggestions.contains(hint) {
                suggestions.push(*hint);
            }
        }
    }

    let summary = match (errors.len(), warnings) {
        (0, 0) => "No issues".to_string(),
        (e, w) => format!(
            "{} error{}, {} warning{}",
            e,
            plural(e),
            w,
            plural(w)
        ),
    };

    Analysis {
        suggestions,
        summary,
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
