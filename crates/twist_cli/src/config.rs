//! CLI configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command-line flags. Each layer only overrides the keys it sets.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use twist_core::{CoreError, CoreResult};
use twist_log::TraceFormat;
use twist_replay::ReplayConfig;

/// Log verbosity accepted by `--logging`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every event and decision
    Debug,
    /// Per-event progress
    Info,
    /// Suspicious but tolerated input
    Warning,
    /// Violations and mismatches only
    #[default]
    Error,
    /// Same as `error`
    Critical,
    /// No log output
    Off,
}

impl LogLevel {
    /// Filter directive for the subscriber, `None` when logging is off
    #[must_use]
    pub fn directive(self) -> Option<&'static str> {
        match self {
            Self::Debug => Some("debug"),
            Self::Info => Some("info"),
            Self::Warning => Some("warn"),
            Self::Error | Self::Critical => Some("error"),
            Self::Off => None,
        }
    }
}

/// Effective configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log verbosity
    pub logging: LogLevel,
    /// Scratch directory for replayed responses
    pub replay_dir: PathBuf,
    /// Directory of responses captured from the live service
    pub response_dir: PathBuf,
    /// Trace encoding
    pub format: TraceFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        let replay = ReplayConfig::default();
        Self {
            logging: LogLevel::default(),
            replay_dir: replay.replay_dir,
            response_dir: replay.response_dir,
            format: TraceFormat::default(),
        }
    }
}

/// A partial configuration; unset keys leave the lower layer alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// Log verbosity
    pub logging: Option<LogLevel>,
    /// Scratch directory for replayed responses
    pub replay_dir: Option<PathBuf>,
    /// Directory of captured responses
    pub response_dir: Option<PathBuf>,
    /// Trace encoding
    pub format: Option<TraceFormat>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text is not valid TOML or names an unknown key
    pub fn parse(text: &str) -> CoreResult<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config {
            reason: e.to_string(),
        })
    }
}

impl CliConfig {
    /// Defaults overridden by the file at `path`
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Config` if it does not parse
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let layer = ConfigLayer::parse(&text).map_err(|err| match err {
            CoreError::Config { reason } => CoreError::Config {
                reason: format!("{}: {reason}", path.display()),
            },
            other => other,
        })?;
        let mut config = Self::default();
        config.apply(layer);
        Ok(config)
    }

    /// Override every key `layer` sets
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(logging) = layer.logging {
            self.logging = logging;
        }
        if let Some(replay_dir) = layer.replay_dir {
            self.replay_dir = replay_dir;
        }
        if let Some(response_dir) = layer.response_dir {
            self.response_dir = response_dir;
        }
        if let Some(format) = layer.format {
            self.format = format;
        }
    }

    /// Engine-level view of the directories
    #[must_use]
    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            replay_dir: self.replay_dir.clone(),
            response_dir: self.response_dir.clone(),
        }
    }
}

/// Parse a `--format` value
///
/// # Errors
///
/// Returns a message naming the accepted values
pub fn parse_format(value: &str) -> Result<TraceFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "auto" => Ok(TraceFormat::Auto),
        "document" | "toml" => Ok(TraceFormat::Document),
        "lines" | "log" => Ok(TraceFormat::Lines),
        other => Err(format!(
            "unknown trace format '{other}' (expected auto, document or lines)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.logging, LogLevel::Error);
        assert_eq!(config.replay_dir, PathBuf::from("replay"));
        assert_eq!(config.response_dir, PathBuf::from("responses"));
        assert_eq!(config.format, TraceFormat::Auto);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twist.toml");
        std::fs::write(&path, "logging = \"info\"\nreplay_dir = \"scratch\"\n").unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.logging, LogLevel::Info);
        assert_eq!(config.replay_dir, PathBuf::from("scratch"));
        assert_eq!(config.response_dir, PathBuf::from("responses"));
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = CliConfig::default();
        config.apply(ConfigLayer::parse("format = \"lines\"\nresponse_dir = \"a\"").unwrap());
        config.apply(ConfigLayer {
            response_dir: Some(PathBuf::from("b")),
            ..ConfigLayer::default()
        });
        assert_eq!(config.format, TraceFormat::Lines);
        assert_eq!(config.response_dir, PathBuf::from("b"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ConfigLayer::parse("colour = \"red\"").unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Warning.directive(), Some("warn"));
        assert_eq!(LogLevel::Critical.directive(), Some("error"));
        assert_eq!(LogLevel::Off.directive(), None);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("Document"), Ok(TraceFormat::Document));
        assert_eq!(parse_format("lines"), Ok(TraceFormat::Lines));
        assert!(parse_format("yaml").is_err());
    }

    #[test]
    fn test_replay_config_view() {
        let mut config = CliConfig::default();
        config.replay_dir = PathBuf::from("out");
        let replay = config.replay_config();
        assert_eq!(replay.replay_dir, PathBuf::from("out"));
        assert_eq!(replay.response_dir, PathBuf::from("responses"));
    }
}
