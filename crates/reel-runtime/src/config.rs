//! Session configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reel_core::{ReelError, ReelResult};
use reel_playback::{duration_ms, PlaybackConfig};
use serde::{Deserialize, Serialize};

/// Where and how closed snippets are written
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory, created on first export
    pub dir: PathBuf,
    /// Indented JSON
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            dir: PathBuf::from("snippets"),
            pretty: true,
        }
    }
}

/// Log output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// One JSON object per line
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".into(),
            json: false,
            ansi: true,
        }
    }
}

/// Everything a session needs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub playback: PlaybackConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    /// Step used by the skip and reverse buttons
    #[serde(with = "duration_ms")]
    pub skip_step: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            playback: PlaybackConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
            skip_step: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Defaults with the export directory set
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export.dir = dir.into();
        self
    }

    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    /// Read and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| ReelError::Config(format!("{}: {}", path.display(), err)))?;
        let config = Self::from_json_str(&text)
            .map_err(|err| ReelError::Config(format!("{}: {}", path.display(), err)))?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> ReelResult<Self> {
        let config: SessionConfig =
            serde_json::from_str(text).map_err(|err| ReelError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| ReelError::Config(err.to_string()))
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.playback.poll_interval.is_zero() {
            return Err(ReelError::Config("playback.poll_interval must be positive".into()));
        }
        if self.playback.idle_wait.is_zero() {
            return Err(ReelError::Config("playback.idle_wait must be positive".into()));
        }
        if self.skip_step.is_zero() {
            return Err(ReelError::Config("skip_step must be positive".into()));
        }
        if self.export.dir.as_os_str().is_empty() {
            return Err(ReelError::Config("export.dir is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_playback::EndBehavior;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.skip_step, Duration::from_secs(5));
        assert_eq!(config.playback.loop_count, 0);
        assert_eq!(config.playback.end_behavior, EndBehavior::Stop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = SessionConfig::from_json_str(
            r#"{"skip_step": 2000, "export": {"dir": "/data/owas"}, "playback": {"loop_count": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.skip_step, Duration::from_secs(2));
        assert_eq!(config.export.dir, PathBuf::from("/data/owas"));
        assert!(config.export.pretty);
        assert_eq!(config.playback.loop_count, 1);
        assert_eq!(config.playback.poll_interval, Duration::from_millis(33));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            SessionConfig::from_json_str(r#"{"skip_step": 0}"#),
            Err(ReelError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("not json"),
            Err(ReelError::Config(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.json");
        let config = SessionConfig::default().with_export_dir(dir.path().join("out"));
        fs::write(&path, config.to_json_pretty().unwrap()).unwrap();

        assert_eq!(SessionConfig::from_json_file(&path).unwrap(), config);
        assert!(matches!(
            SessionConfig::from_json_file(dir.path().join("missing.json")),
            Err(ReelError::Config(_))
        ));
    }
}
