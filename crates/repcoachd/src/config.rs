//! Daemon configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an
//! empty file (or no file) is a valid configuration. `REPCOACH_SOCKET`
//! overrides the socket path after the file is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use repcoach_core::DetectorConfig;

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/repcoach.sock";

/// Environment variable overriding `socket_path`
pub const SOCKET_ENV: &str = "REPCOACH_SOCKET";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    /// Period of the broadcast dispatcher
    pub broadcast_interval_ms: u64,
    /// Frames queued per exercise worker before new frames are dropped
    pub feed_buffer: usize,
    /// Outbound lines queued per subscriber before events are dropped
    pub subscriber_buffer: usize,
    pub max_subscribers: usize,
    pub detector: DetectorConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            broadcast_interval_ms: 500,
            feed_buffer: 64,
            subscriber_buffer: 32,
            max_subscribers: 64,
            detector: DetectorConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` (if given), applies the environment override and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };

        if let Some(socket) = std::env::var_os(SOCKET_ENV) {
            config.socket_path = PathBuf::from(socket);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    /// Rejects values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.broadcast_interval_ms == 0, "broadcast_interval_ms must be positive"),
            (self.feed_buffer == 0, "feed_buffer must be positive"),
            (self.subscriber_buffer == 0, "subscriber_buffer must be positive"),
            (self.max_subscribers == 0, "max_subscribers must be positive"),
            (
                !self.detector.is_valid(),
                "detector durations must be positive and finite",
            ),
            (
                self.socket_path.as_os_str().is_empty(),
                "socket_path must not be empty",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(ConfigError::Invalid(reason.to_string())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        let config = DaemonConfig::from_toml("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.broadcast_interval(), Duration::from_millis(500));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/repcoach.sock"));
    }

    #[test]
    fn test_partial_document() {
        let config = DaemonConfig::from_toml(
            r#"
            broadcast_interval_ms = 250
            max_subscribers = 4

            [detector]
            yoga_hold_secs = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.broadcast_interval_ms, 250);
        assert_eq!(config.max_subscribers, 4);
        assert_eq!(config.detector.yoga_hold_secs, 3.0);
        assert_eq!(config.detector.jump_air_timeout_secs, 1.0);
        assert_eq!(config.feed_buffer, 64);
    }

    #[test]
    fn test_invalid_values() {
        let err = DaemonConfig::from_toml("broadcast_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DaemonConfig::from_toml("[detector]\nyoga_hold_secs = -1.0").unwrap_err();
        assert!(err.to_string().contains("detector durations"));

        let err = DaemonConfig::from_toml("no_such_field = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "subscriber_buffer = 8").unwrap();

        let config = DaemonConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.subscriber_buffer, 8);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DaemonConfig::load(Some(Path::new("/nonexistent/repcoach.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
