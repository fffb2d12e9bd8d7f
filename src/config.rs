//! Configuration loaded from `.xcconsole.toml`.
//!
//! Every field has a default, so an empty or missing file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::event::Action;

pub const CONFIG_FILE: &str = ".xcconsole.toml";

const DEFAULT_MAX_LINES: usize = 20_000;
const DEFAULT_MAX_ISSUES: usize = 2_000;
const DEFAULT_FOLLOW_TOLERANCE: usize = 3;
const MAX_FOLLOW_TOLERANCE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub commands: CommandsConfig,
    pub buffer: BufferConfig,
    pub phases: PhasesConfig,
    pub editor: EditorConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// `.xcworkspace` or `.xcodeproj`; empty lets xcodebuild pick
    pub path: String,
    pub scheme: String,
    pub configuration: String,
    pub destination: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            scheme: String::new(),
            configuration: "Debug".to_string(),
            destination: "generic/platform=iOS Simulator".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Display name of the project, from the path's file stem
    pub fn name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `-workspace X` or `-project X`, empty when no path is set
    pub fn selector(&self) -> String {
        if self.path.is_empty() {
            String::new()
        } else if self.path.ends_with(".xcworkspace") {
            format!("-workspace {}", shell_words::quote(&self.path))
        } else {
            format!("-project {}", shell_words::quote(&self.path))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub build: String,
    pub run: String,
    pub test: String,
    pub clean: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        let base = "xcodebuild {project} -scheme {scheme} -configuration {configuration} -destination {destination}";
        Self {
            build: format!("{base} build"),
            run: format!("{base} build && xcrun simctl launch --console-pty booted {{scheme}}"),
            test: format!("{base} test"),
            clean: format!("{base} clean"),
        }
    }
}

impl CommandsConfig {
    pub fn template(&self, action: Action) -> &str {
        match action {
            Action::Build => &self.build,
            Action::Run => &self.run,
            Action::Test => &self.test,
            Action::Clean => &self.clean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Line cap shared by the stream and phase buffers
    pub max_lines: usize,
    pub max_issues: usize,
    pub follow_tolerance: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            max_issues: DEFAULT_MAX_ISSUES,
            follow_tolerance: DEFAULT_FOLLOW_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhasesConfig {
    pub smart_collapse: bool,
}

impl Default for PhasesConfig {
    fn default() -> Self {
        Self {
            smart_collapse: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Template with `{file}`, `{line}` and `{column}` placeholders
    pub command: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: "code --goto {file}:{line}:{column}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("xcconsole").join("logs"))
    }
}

impl Config {
    /// Load from `explicit`, else `./.xcconsole.toml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => Self::discover_in(Path::new(".")),
        }
    }

    fn discover_in(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.max_lines == 0 {
            return Err(ConfigError::Invalid("buffer.max_lines must be > 0".into()));
        }
        if self.buffer.max_issues == 0 {
            return Err(ConfigError::Invalid("buffer.max_issues must be > 0".into()));
        }
        if self.buffer.follow_tolerance > MAX_FOLLOW_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "buffer.follow_tolerance must be <= {MAX_FOLLOW_TOLERANCE}"
            )));
        }
        for action in [Action::Build, Action::Run, Action::Test, Action::Clean] {
            if self.commands.template(action).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "commands.{} must not be empty",
                    action.label().to_lowercase()
                )));
            }
        }
        Ok(())
    }

    /// Shell command line for `action` with placeholders expanded
    pub fn command_for(&self, action: Action) -> String {
        let project = &self.project;
        self.commands
            .template(action)
            .replace("{project}", &project.selector())
            .replace("{scheme}", &shell_words::quote(&project.scheme))
            .replace("{configuration}", &shell_words::quote(&project.configuration))
            .replace("{destination}", &shell_words::quote(&project.destination))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_toml_parses_to_defaults() {
        let (_tmp, path) = write_config("");
        let config = Config::load_file(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.buffer.max_lines, 20_000);
        assert_eq!(config.buffer.max_issues, 2_000);
        assert!(config.phases.smart_collapse);
    }

    #[test]
    fn partial_config_uses_defaults_for_missing_fields() {
        let (_tmp, path) = write_config(
            r#"
[project]
path = "App.xcworkspace"
scheme = "App"

[buffer]
max_lines = 500
"#,
        );
        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.project.scheme, "App");
        assert_eq!(config.project.configuration, "Debug");
        assert_eq!(config.buffer.max_lines, 500);
        assert_eq!(config.buffer.follow_tolerance, 3);
    }

    #[test]
    fn missing_file_in_directory_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::discover_in(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn discovers_file_in_directory() {
        let (tmp, _path) = write_config("[phases]\nsmart_collapse = false\n");
        let config = Config::discover_in(tmp.path()).unwrap();
        assert!(!config.phases.smart_collapse);
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let err = Config::load(Some(Path::new("/nonexistent/xcconsole.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let (_tmp, path) = write_config("[buffer\nmax_lines = ");
        let err = Config::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[rstest::rstest]
    #[case("[buffer]\nmax_lines = 0", "buffer.max_lines must be > 0")]
    #[case("[buffer]\nmax_issues = 0", "buffer.max_issues must be > 0")]
    #[case("[buffer]\nfollow_tolerance = 9", "buffer.follow_tolerance must be <= 5")]
    #[case("[commands]\ntest = \"  \"", "commands.test must not be empty")]
    fn validation_rejects(#[case] content: &str, #[case] message: &str) {
        let (_tmp, path) = write_config(content);
        match Config::load_file(&path) {
            Err(ConfigError::Invalid(m)) => assert_eq!(m, message),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn command_for_expands_placeholders() {
        let mut config = Config::default();
        config.project.path = "App.xcworkspace".into();
        config.project.scheme = "App".into();
        config.project.destination = "platform=iOS Simulator,name=iPhone 15".into();

        insta::assert_snapshot!(
            config.command_for(Action::Build),
            @"xcodebuild -workspace App.xcworkspace -scheme App -configuration Debug -destination 'platform=iOS Simulator,name=iPhone 15' build"
        );
    }

    #[test]
    fn project_selector_variants() {
        let mut project = ProjectConfig::default();
        assert_eq!(project.selector(), "");

        project.path = "Demo.xcodeproj".into();
        assert_eq!(project.selector(), "-project Demo.xcodeproj");

        project.path = "My App.xcodeproj".into();
        assert_eq!(project.selector(), "-project 'My App.xcodeproj'");
        assert_eq!(project.name(), "Demo");
    }

    #[test]
    fn command_for_quotes_awkward_values() {
        let mut config = Config::default();
        config.project.scheme = "Bob's App".into();
        let command = config.command_for(Action::Build);
        let words = shell_words::split(&command).unwrap();
        assert!(words.windows(2).any(|w| w == ["-scheme", "Bob's App"]));
    }
}
