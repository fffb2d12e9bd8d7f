use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;

/// Failure of an operation or of the console itself
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("build driver exited with status {exit_code}")]
    DriverFailed { exit_code: i32 },

    #[error("build driver terminated by signal")]
    Terminated,

    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConsoleError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
