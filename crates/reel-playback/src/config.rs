//! Playback configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EndBehavior;

/// Playback controller configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Extra iterations of the recording
    pub loop_count: u32,
    /// Behaviour at end of recording
    pub end_behavior: EndBehavior,
    /// Position republish cadence while playing
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Upper bound on the worker's sleep while nothing is happening.
    /// Commands and engine notifications cut it short.
    #[serde(with = "duration_ms")]
    pub idle_wait: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            loop_count: 0,
            end_behavior: EndBehavior::Stop,
            poll_interval: Duration::from_millis(33),
            idle_wait: Duration::from_millis(500),
        }
    }
}

impl PlaybackConfig {
    /// Tight cadence for smooth scrubbing displays
    pub fn responsive() -> Self {
        PlaybackConfig {
            poll_interval: Duration::from_millis(16),
            idle_wait: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Slow cadence for headless batch annotation
    pub fn low_power() -> Self {
        PlaybackConfig {
            poll_interval: Duration::from_millis(100),
            idle_wait: Duration::from_millis(1000),
            ..Default::default()
        }
    }

    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_end_behavior(mut self, end_behavior: EndBehavior) -> Self {
        self.end_behavior = end_behavior;
        self
    }
}

/// Serde adapter writing a `Duration` as whole milliseconds
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = PlaybackConfig::default();
        assert_eq!(default.end_behavior, EndBehavior::Stop);
        assert_eq!(default.loop_count, 0);
        assert!(PlaybackConfig::responsive().poll_interval < default.poll_interval);
        assert!(PlaybackConfig::low_power().idle_wait > default.idle_wait);
    }

    #[test]
    fn test_json_uses_milliseconds() {
        let config = PlaybackConfig::default().with_loop_count(2);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["poll_interval"], 33);
        assert_eq!(json["end_behavior"], "stop");

        let parsed: PlaybackConfig =
            serde_json::from_str(r#"{"idle_wait": 250, "end_behavior": "loop"}"#).unwrap();
        assert_eq!(parsed.idle_wait, Duration::from_millis(250));
        assert_eq!(parsed.end_behavior, EndBehavior::Loop);
        assert_eq!(parsed.poll_interval, Duration::from_millis(33));
    }
}
