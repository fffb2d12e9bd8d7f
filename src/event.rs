use std::fmt;

use clap::ValueEnum;
use crossterm::event::Event;

use crate::error::ConsoleError;

/// Operation the console can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Build,
    Run,
    Test,
    Clean,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Run => "Run",
            Self::Test => "Test",
            Self::Clean => "Clean",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured error attached to an error event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub message: String,
    pub detail: String,
}

/// Event produced by the build driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Log line; `pretty` marks lines already reformatted for display
    Log { message: String, pretty: bool },
    /// Raw diagnostic stream line
    LogRaw { message: String },
    Status { message: String },
    Result { message: String },
    Error {
        message: String,
        error: Option<DriverError>,
    },
    Warning { message: String },
}

impl BuildEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            pretty: false,
        }
    }

    pub fn pretty(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            pretty: true,
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Log { message, .. }
            | Self::LogRaw { message }
            | Self::Status { message }
            | Self::Result { message }
            | Self::Error { message, .. }
            | Self::Warning { message } => message,
        }
    }
}

/// Static project and host metadata shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    pub project: String,
    pub scheme: String,
    pub configuration: String,
    pub destination: String,
    /// `os/arch` of the host
    pub system: String,
    pub xcode_version: Option<String>,
}

/// Everything the UI loop reacts to
#[derive(Debug)]
pub enum Message {
    Build(BuildEvent),
    /// The event channel closed or the stop signal fired
    EventsClosed,
    OperationDone(Result<(), ConsoleError>),
    ContextLoaded(ProjectContext),
    Tick,
    Terminal(Event),
}
