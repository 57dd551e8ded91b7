//! Console Configuration - TOML-Based Board Definitions
//!
//! Describes which viewers exist and which boards the console runs for them.
//!
//! # Configuration Sources (Priority Order)
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Config file (`~/.config/board/boards.toml`)
//! 4. Built-in demo boards (lowest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! viewers = ["ann", "bob"]
//!
//! [defaults]
//! tick_ms = 1000
//! start_delay_ms = 0
//!
//! [[boards]]
//! id = "lobby"
//! tick_ms = 500
//! hidden = ["bob"]
//! title = { kind = "framed", frames = ["&6Lobby", "&eLobby"] }
//!
//! [[boards.lines]]
//! kind = "template"
//! text = "Welcome, &a{viewer}"
//!
//! [[boards.lines]]
//! kind = "scrolled"
//! text = "Servers restart at noon"
//! width = 16
//! space_between = 3
//! ```
//!
//! # Environment Variables
//!
//! - `BOARD_TICK_MS`: default render period in milliseconds
//! - `BOARD_START_DELAY_MS`: default delay before the first render

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use board_core::{FilterPolicy, Framed, Highlighted, Line, Scrolled, SectionColor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alternate color prefix accepted in configured text
pub const ALTERNATE_COLOR_CHAR: char = '&';

/// Placeholder replaced by the viewer name in template lines
pub const VIEWER_PLACEHOLDER: &str = "{viewer}";

/// Default render period
pub const DEFAULT_TICK_MS: u64 = 1000;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// ============================================================================
// Configuration Source Tracking
// ============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from config file
    File,
    /// Built-in default
    #[default]
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// ============================================================================
// TOML Structures
// ============================================================================

/// Root TOML configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleToml {
    /// Viewers every board shows to unless it names its own
    pub viewers: Option<Vec<String>>,

    /// Values boards fall back to
    pub defaults: DefaultsToml,

    /// Board definitions
    pub boards: Vec<BoardSpec>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsToml {
    /// Render period in milliseconds
    pub tick_ms: Option<u64>,

    /// Delay before the first render in milliseconds
    pub start_delay_ms: Option<u64>,
}

/// One `[[boards]]` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardSpec {
    /// Registry id
    pub id: String,

    /// Render period in milliseconds, overriding the default
    pub tick_ms: Option<u64>,

    /// Start delay in milliseconds, overriding the default
    pub start_delay_ms: Option<u64>,

    /// Viewers of this board, replacing the global list
    pub viewers: Option<Vec<String>>,

    /// Viewers that never see this board
    pub hidden: Vec<String>,

    /// When set, only these viewers see this board
    pub only: Option<Vec<String>>,

    /// How `hidden` and `only` combine
    pub filter_policy: FilterPolicy,

    /// Viewers dropped from this board on its first render
    pub evict: Vec<String>,

    /// Title line
    pub title: Option<LineSpec>,

    /// Lines in display order
    pub lines: Vec<LineSpec>,
}

/// A configured line, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LineSpec {
    /// Fixed text
    Static {
        /// Text shown to everyone
        text: String,
    },

    /// Text with `{viewer}` replaced per viewer
    Template {
        /// Text with placeholders
        text: String,
    },

    /// Cycles through frames
    Framed {
        /// Frames in order
        frames: Vec<String>,
        /// Cycle backwards
        #[serde(default)]
        reverse: bool,
    },

    /// Sweeps a highlight across text
    Highlighted {
        /// Text being swept
        context: String,
        /// Color code of the highlighted character
        #[serde(default = "default_highlight")]
        highlight: String,
        /// Color code of the rest
        #[serde(default = "default_normal")]
        normal: String,
        /// Text before every frame
        #[serde(default)]
        prefix: String,
        /// Text after every frame
        #[serde(default)]
        suffix: String,
        /// Sweep backwards
        #[serde(default)]
        reverse: bool,
    },

    /// Scrolls text through a fixed-width window
    Scrolled {
        /// Text to scroll
        text: String,
        /// Window width in columns
        width: usize,
        /// Blank columns before the text wraps around
        #[serde(default)]
        space_between: usize,
        /// Starting color code
        color: Option<char>,
        /// Scroll right instead of left
        #[serde(default)]
        reverse: bool,
    },
}

fn default_highlight() -> String {
    "&e".to_string()
}

fn default_normal() -> String {
    "&f".to_string()
}

impl LineSpec {
    fn validate(&self, board: &str) -> Result<(), ConfigError> {
        match self {
            Self::Framed { frames, .. } if frames.is_empty() => Err(ConfigError::ValidationError(
                format!("board '{board}': framed line needs at least one frame"),
            )),
            Self::Highlighted { context, .. } if context.is_empty() => {
                Err(ConfigError::ValidationError(format!(
                    "board '{board}': highlighted line needs non-empty context"
                )))
            }
            Self::Scrolled { width: 0, .. } => Err(ConfigError::ValidationError(format!(
                "board '{board}': scrolled line width must be greater than 0"
            ))),
            Self::Scrolled {
                color: Some(code), ..
            } if SectionColor::from_code(*code).is_none() => Err(ConfigError::ValidationError(
                format!("board '{board}': unknown color code '{code}'"),
            )),
            _ => Ok(()),
        }
    }

    /// Build the board line this entry describes
    ///
    /// `&` color codes in configured text become `§` codes.
    #[must_use]
    pub fn to_line(&self) -> Line<String> {
        let colored = |text: &str| SectionColor::translate_alternate(ALTERNATE_COLOR_CHAR, text);
        match self {
            Self::Static { text } => Line::constant(colored(text)),
            Self::Template { text } => {
                let template = colored(text);
                Line::dynamic(move |viewer: &String| template.replace(VIEWER_PLACEHOLDER, viewer))
            }
            Self::Framed { frames, reverse } => {
                let framed = Framed::new(frames.iter().map(|frame| colored(frame)));
                Line::animated(if *reverse { framed.reversed() } else { framed })
            }
            Self::Highlighted {
                context,
                highlight,
                normal,
                prefix,
                suffix,
                reverse,
            } => {
                let highlighted = Highlighted::with_affixes(
                    context.clone(),
                    &colored(highlight),
                    &colored(normal),
                    &colored(prefix),
                    &colored(suffix),
                );
                Line::animated(if *reverse {
                    highlighted.reversed()
                } else {
                    highlighted
                })
            }
            Self::Scrolled {
                text,
                width,
                space_between,
                color,
                reverse,
            } => {
                let start = color
                    .and_then(SectionColor::from_code)
                    .unwrap_or(SectionColor::RESET);
                let scrolled =
                    Scrolled::with_color(colored(text), *space_between, *width, start.shared());
                Line::animated(if *reverse { scrolled.reversed() } else { scrolled })
            }
        }
    }
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Complete console configuration after all sources are applied
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Viewers boards show to by default
    pub viewers: Vec<String>,

    /// Default render period in milliseconds
    pub tick_ms: u64,

    /// Default start delay in milliseconds
    pub start_delay_ms: u64,

    /// Boards to run
    pub boards: Vec<BoardSpec>,

    /// Where the defaults were last set from
    pub source: ConfigSource,

    /// Config file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            viewers: vec!["ann".to_string(), "bob".to_string()],
            tick_ms: DEFAULT_TICK_MS,
            start_delay_ms: 0,
            boards: demo_boards(),
            source: ConfigSource::Default,
            config_file_path: None,
        }
    }
}

impl ConsoleConfig {
    /// Render period of `board`
    #[must_use]
    pub fn tick_for(&self, board: &BoardSpec) -> Duration {
        Duration::from_millis(board.tick_ms.unwrap_or(self.tick_ms))
    }

    /// Start delay of `board`
    #[must_use]
    pub fn start_delay_for(&self, board: &BoardSpec) -> Duration {
        Duration::from_millis(board.start_delay_ms.unwrap_or(self.start_delay_ms))
    }

    /// Viewers of `board`
    #[must_use]
    pub fn viewers_for<'a>(&'a self, board: &'a BoardSpec) -> &'a [String] {
        board.viewers.as_deref().unwrap_or(&self.viewers)
    }

    /// Check the configuration is runnable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for zero periods, missing or
    /// duplicate board ids and malformed lines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boards.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one board is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for board in &self.boards {
            if board.id.is_empty() {
                return Err(ConfigError::ValidationError(
                    "every board needs an id".to_string(),
                ));
            }
            if !seen.insert(board.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate board id '{}'",
                    board.id
                )));
            }
            if self.tick_for(board).is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "board '{}': tick_ms must be greater than 0",
                    board.id
                )));
            }
            for line in board.title.iter().chain(&board.lines) {
                line.validate(&board.id)?;
            }
        }
        Ok(())
    }
}

/// Boards used when no config file exists
#[must_use]
pub fn demo_boards() -> Vec<BoardSpec> {
    vec![
        BoardSpec {
            id: "lobby".to_string(),
            title: Some(LineSpec::Framed {
                frames: vec!["&6&lLobby".to_string(), "&e&lLobby".to_string()],
                reverse: false,
            }),
            lines: vec![
                LineSpec::Template {
                    text: "Welcome, &a{viewer}".to_string(),
                },
                LineSpec::Highlighted {
                    context: "board demo".to_string(),
                    highlight: default_highlight(),
                    normal: default_normal(),
                    prefix: String::new(),
                    suffix: String::new(),
                    reverse: false,
                },
                LineSpec::Scrolled {
                    text: "&bNews: &fservers restart at noon".to_string(),
                    width: 16,
                    space_between: 3,
                    color: None,
                    reverse: false,
                },
            ],
            ..BoardSpec::default()
        },
        BoardSpec {
            id: "staff".to_string(),
            tick_ms: Some(2000),
            only: Some(vec!["ann".to_string()]),
            title: Some(LineSpec::Static {
                text: "&cStaff".to_string(),
            }),
            lines: vec![LineSpec::Static {
                text: "Nothing to report".to_string(),
            }],
            ..BoardSpec::default()
        },
    ]
}

// ============================================================================
// Loading
// ============================================================================

/// Get the default config file path
///
/// Returns `~/.config/board/boards.toml` on Linux/macOS, or the equivalent
/// on other platforms.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("board").join("boards.toml"))
}

/// Load configuration from a specific path, reading the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ConsoleConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with `env` standing in for the process environment
///
/// A missing config file is not an error; the demo boards are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<E>(path: Option<PathBuf>, env: E) -> Result<ConsoleConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = ConsoleConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConsoleToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                boards = config.boards.len(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using demo boards"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn apply_toml_config(config: &mut ConsoleConfig, toml: ConsoleToml) {
    if let Some(viewers) = toml.viewers {
        config.viewers = viewers;
    }
    if let Some(tick) = toml.defaults.tick_ms {
        config.tick_ms = tick;
    }
    if let Some(delay) = toml.defaults.start_delay_ms {
        config.start_delay_ms = delay;
    }
    if !toml.boards.is_empty() {
        config.boards = toml.boards;
    }
}

fn apply_env_config<E>(config: &mut ConsoleConfig, env: E)
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(tick) = env("BOARD_TICK_MS") {
        match tick.parse::<u64>() {
            Ok(ms) => {
                config.tick_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %tick, "Ignoring invalid BOARD_TICK_MS"),
        }
    }
    if let Some(delay) = env("BOARD_START_DELAY_MS") {
        match delay.parse::<u64>() {
            Ok(ms) => {
                config.start_delay_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %delay, "Ignoring invalid BOARD_START_DELAY_MS"),
        }
    }
}

// ============================================================================
// CLI Override Support
// ============================================================================

/// Command-line overrides applied after [`load_config_from_path`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Default tick override (milliseconds)
    pub tick_ms: Option<u64>,

    /// Default start delay override (milliseconds)
    pub start_delay_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Apply these overrides to a config
    pub fn apply(&self, config: &mut ConsoleConfig) {
        if let Some(tick) = self.tick_ms {
            config.tick_ms = tick;
            config.source = ConfigSource::Cli;
        }
        if let Some(delay) = self.start_delay_ms {
            config.start_delay_ms = delay;
            config.source = ConfigSource::Cli;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const SAMPLE: &str = r#"
viewers = ["carol", "dave"]

[defaults]
tick_ms = 250

[[boards]]
id = "arena"
tick_ms = 100
hidden = ["dave"]
evict = ["eve"]
title = { kind = "static", text = "&cArena" }

[[boards.lines]]
kind = "template"
text = "Hi {viewer}"

[[boards.lines]]
kind = "scrolled"
text = "abc"
width = 5
color = "6"

[[boards]]
id = "quiet"
viewers = ["eve"]
filter_policy = "any"
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsoleConfig::default();
        assert_eq!(config.tick_ms, DEFAULT_TICK_MS);
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.boards.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["lobby", "staff"]
        );
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("board/boards.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_config(SAMPLE);
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.source, ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
        assert_eq!(config.viewers, vec!["carol", "dave"]);
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.boards.len(), 2);

        let arena = &config.boards[0];
        assert_eq!(arena.hidden, vec!["dave"]);
        assert_eq!(arena.evict, vec!["eve"]);
        assert_eq!(config.tick_for(arena), Duration::from_millis(100));
        assert_eq!(config.viewers_for(arena), ["carol", "dave"]);
        assert_eq!(
            arena.lines[1],
            LineSpec::Scrolled {
                text: "abc".to_string(),
                width: 5,
                space_between: 0,
                color: Some('6'),
                reverse: false,
            }
        );

        let quiet = &config.boards[1];
        assert_eq!(quiet.filter_policy, FilterPolicy::Any);
        assert_eq!(config.tick_for(quiet), Duration::from_millis(250));
        assert_eq!(config.viewers_for(quiet), ["eve"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_toml_keeps_demo() {
        let file = write_config("");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.source, ConfigSource::File);
        assert_eq!(config.boards, demo_boards());
    }

    #[test]
    fn test_missing_file_graceful() {
        let config = load_config_with_env(
            Some(PathBuf::from("/nonexistent/path/boards.toml")),
            no_env,
        )
        .unwrap();
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_config("[[boards]]\nid = ");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_line_kind_is_parse_error() {
        let file = write_config("[[boards]]\nid = \"a\"\n[[boards.lines]]\nkind = \"blinking\"\n");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(SAMPLE);
        let env = |key: &str| match key {
            "BOARD_TICK_MS" => Some("40".to_string()),
            "BOARD_START_DELAY_MS" => Some("not-a-number".to_string()),
            _ => None,
        };
        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();
        assert_eq!(config.tick_ms, 40);
        assert_eq!(config.start_delay_ms, 0);
        assert_eq!(config.source, ConfigSource::Env);
        // a board's own tick still wins over the default
        assert_eq!(config.tick_for(&config.boards[0]), Duration::from_millis(100));
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = |key: &str| (key == "BOARD_TICK_MS").then(|| "40".to_string());
        let mut config = load_config_with_env(None, env).unwrap();
        ConfigOverrides {
            tick_ms: Some(10),
            start_delay_ms: Some(5),
        }
        .apply(&mut config);
        assert_eq!(config.tick_ms, 10);
        assert_eq!(config.start_delay_ms, 5);
        assert_eq!(config.source, ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = ConsoleConfig::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config.tick_ms, DEFAULT_TICK_MS);
        assert_eq!(config.source, ConfigSource::Default);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ConsoleConfig::default();
        config.tick_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = ConsoleConfig::default();
        config.boards[1].id = "lobby".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate board id 'lobby'"));

        let mut config = ConsoleConfig::default();
        config.boards[0].lines.push(LineSpec::Scrolled {
            text: "x".to_string(),
            width: 4,
            space_between: 0,
            color: Some('z'),
            reverse: false,
        });
        assert!(config.validate().unwrap_err().to_string().contains("unknown color code 'z'"));

        let mut config = ConsoleConfig::default();
        config.boards[0].title = Some(LineSpec::Framed {
            frames: Vec::new(),
            reverse: false,
        });
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.boards.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_line_specs_build_lines() {
        let template = LineSpec::Template {
            text: "&aHi {viewer}".to_string(),
        }
        .to_line();
        assert_eq!(template.apply(&"ann".to_string()), "\u{a7}aHi ann");
        assert!(template.requires_recompute());

        let fixed = LineSpec::Static {
            text: "plain".to_string(),
        }
        .to_line();
        assert_eq!(fixed.apply(&"ann".to_string()), "plain");
        assert!(!fixed.requires_recompute());

        let framed = LineSpec::Framed {
            frames: vec!["a".to_string(), "b".to_string()],
            reverse: true,
        }
        .to_line();
        assert_eq!(framed.apply(&"ann".to_string()), "b");
        assert_eq!(framed.apply(&"ann".to_string()), "a");

        let scrolled = LineSpec::Scrolled {
            text: "Hi".to_string(),
            width: 6,
            space_between: 1,
            color: Some('6'),
            reverse: false,
        }
        .to_line();
        assert!(scrolled.apply(&"ann".to_string()).starts_with("\u{a7}6"));
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationError("bad".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad");
    }
}
