//! Side effects requested by key handling, kept out of the model.

use std::io::{self, Write};
use std::process::Stdio;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use tokio::process::Command;
use tracing::{info, warn};

use crate::classify::Location;
use crate::config::EditorConfig;

/// Work the UI asks for but does not perform itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Copy(String),
    OpenInEditor(Location),
    OpenInXcode(Location),
}

/// Execute an intent; failures are logged and otherwise ignored
pub fn run(intent: Intent, editor: &EditorConfig) {
    let result = match &intent {
        Intent::Copy(text) => copy(text),
        Intent::OpenInEditor(location) => editor_argv(&editor.command, location)
            .map_err(io::Error::other)
            .and_then(spawn),
        Intent::OpenInXcode(location) => spawn(xcode_argv(location)),
    };
    if let Err(err) = result {
        warn!(?intent, error = %err, "effect failed");
    }
}

/// OSC 52 sequence placing `text` on the terminal's clipboard
pub fn osc52(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", BASE64_ENGINE.encode(text))
}

fn copy(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(osc52(text).as_bytes())?;
    stdout.flush()
}

/// Split the editor template into shell words and fill placeholders per word
pub fn editor_argv(
    template: &str,
    location: &Location,
) -> Result<Vec<String>, shell_words::ParseError> {
    let line = location.line.max(1).to_string();
    let column = location.column.max(1).to_string();
    Ok(shell_words::split(template)?
        .into_iter()
        .map(|word| {
            word.replace("{file}", &location.file)
                .replace("{line}", &line)
                .replace("{column}", &column)
        })
        .collect())
}

pub fn xcode_argv(location: &Location) -> Vec<String> {
    let mut argv = vec!["xed".to_string()];
    if location.line > 0 {
        argv.push("--line".to_string());
        argv.push(location.line.to_string());
    }
    argv.push(location.file.clone());
    argv
}

fn spawn(argv: Vec<String>) -> io::Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    };
    info!(%program, ?args, "launching");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}
