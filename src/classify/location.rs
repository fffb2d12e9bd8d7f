/// Source suffixes recognised as a file segment
pub const SOURCE_SUFFIXES: &[&str] = &[".swift", ".m", ".mm", ".c", ".cpp", ".h"];

/// Diagnostic prefixes trimmed from the message body
const SEVERITY_PREFIXES: &[&str] = &["error:", "warning:", "note:"];

/// Source location recovered from a diagnostic line
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// File path, empty when unknown
    pub file: String,
    /// 1-based line, 0 when unknown
    pub line: u32,
    /// 1-based column, 0 when unknown
    pub column: u32,
}

impl Location {
    pub fn is_known(&self) -> bool {
        !self.file.is_empty()
    }
}

/// Result of location extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub location: Location,
    /// Message with the location prefix and severity label removed
    pub message: String,
}

fn looks_like_file(segment: &str) -> bool {
    segment.contains('/') || SOURCE_SUFFIXES.iter().any(|s| segment.ends_with(s))
}

/// Extract `file:line:column` and the short message from a diagnostic
///
/// Returns an unknown location and the untouched text when no file segment
/// is present.
pub fn extract_location(text: &str) -> Extracted {
    let mut offset = 0;
    let mut consumed_end = None;
    let mut file = None;
    let mut numbers = Vec::with_capacity(2);

    for segment in text.split(':') {
        let end = offset + segment.len();
        match file {
            None => {
                let trimmed = segment.trim();
                if looks_like_file(trimmed) {
                    file = Some(trimmed.to_string());
                    consumed_end = Some(end);
                }
            }
            Some(_) => match segment.trim().parse::<u32>() {
                Ok(n) if numbers.len() < 2 => {
                    numbers.push(n);
                    consumed_end = Some(end);
                }
                _ => break,
            },
        }
        if file.is_some() && numbers.len() == 2 {
            break;
        }
        // Skip the ':' separator
        offset = end + 1;
    }

    let (Some(file), Some(end)) = (file, consumed_end) else {
        return Extracted {
            location: Location::default(),
            message: text.to_string(),
        };
    };

    let rest = text.get(end..).unwrap_or_default();
    let rest = rest.strip_prefix(':').unwrap_or(rest);

    Extracted {
        location: Location {
            file,
            line: numbers.first().copied().unwrap_or(0),
            column: numbers.get(1).copied().unwrap_or(0),
        },
        message: strip_severity(rest.trim()).to_string(),
    }
}

/// Trim one leading `error:`/`warning:`/`note:` in any case
fn strip_severity(message: &str) -> &str {
    for prefix in SEVERITY_PREFIXES {
        if message.len() >= prefix.len()
            && message.is_char_boundary(prefix.len())
            && message[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return message[prefix.len()..].trim_start();
        }
    }
    message
}
