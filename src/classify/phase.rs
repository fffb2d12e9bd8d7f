use std::sync::LazyLock;

use regex::Regex;

pub const COMPILING: &str = "Compiling";
pub const LINKING: &str = "Linking";
pub const SIGNING: &str = "Signing";
pub const PROCESSING: &str = "Processing";
pub const COPYING: &str = "Copying";
pub const RUNNING_SCRIPTS: &str = "Running Scripts";
pub const TOUCHING: &str = "Touching";
pub const REGISTERING: &str = "Registering";
pub const BUILDING_TARGET: &str = "Building Target";
pub const TESTING: &str = "Testing";
pub const ANALYZING: &str = "Analyzing";
pub const ARCHIVING: &str = "Archiving";
pub const EXPORTING: &str = "Exporting";

/// Anchored detectors, first match wins
const DETECTORS: &[(&str, &str)] = &[
    // Pretty-printed headers
    (r"^▸ Compiling\b", COMPILING),
    (r"^▸ Linking\b", LINKING),
    (r"^▸ Signing\b", SIGNING),
    (r"^▸ Processing\b", PROCESSING),
    (r"^▸ Copying\b", COPYING),
    (r"^▸ Running script\b", RUNNING_SCRIPTS),
    (r"^▸ Touching\b", TOUCHING),
    (r"^▸ Test(ing|s)?\b", TESTING),
    (r"^▸ Analyzing\b", ANALYZING),
    // Raw build driver headers
    (r"^(CompileSwiftSources|CompileSwift|SwiftCompile|SwiftDriver)\b", COMPILING),
    (r"^CompileC ", COMPILING),
    (r"^Ld ", LINKING),
    (r"^CodeSign ", SIGNING),
    (r"^ProcessInfoPlistFile\b", PROCESSING),
    (r"^CpResource\b", COPYING),
    (r"^PBXCp\b", COPYING),
    (r"^PhaseScriptExecution\b", RUNNING_SCRIPTS),
    (r"^CreateUniversalBinary\b", LINKING),
    (r"^Touch ", TOUCHING),
    (r"^RegisterExecutionPolicyException\b", REGISTERING),
    // Bracketed target markers
    (r"^=== BUILD TARGET\b", BUILDING_TARGET),
    (r"^=== TEST TARGET\b", TESTING),
    (r"^=== ANALYZE TARGET\b", ANALYZING),
    // Test anchors
    (r"^Test Suite '.*' started", TESTING),
    (r"^Test Case '.*' started", TESTING),
    // Archive and export
    (r"^(\*\* )?ARCHIVE\b", ARCHIVING),
    (r"^▸ Archiving\b", ARCHIVING),
    (r"^(\*\* )?EXPORT\b", EXPORTING),
    (r"^▸ Exporting\b", EXPORTING),
];

/// Lowercase substring fallback when no detector matches
const FALLBACK: &[(&str, &str)] = &[
    ("compiling", COMPILING),
    ("linking", LINKING),
    ("signing", SIGNING),
    ("testing", TESTING),
    ("analyzing", ANALYZING),
];

static COMPILED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DETECTORS
        .iter()
        .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, *name)))
        .collect()
});

/// Infer the build phase a line belongs to
///
/// Returns an empty string when no phase can be inferred.
pub fn detect_phase(line: &str) -> &'static str {
    let trimmed = line.trim_start();
    if let Some((_, name)) = COMPILED.iter().find(|(re, _)| re.is_match(trimmed)) {
        return name;
    }

    let lower = trimmed.to_lowercase();
    FALLBACK
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| *name)
        .unwrap_or("")
}
