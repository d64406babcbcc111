//! Published playback session state

use std::path::PathBuf;

use reel_core::PlaybackTime;

use crate::{EndBehavior, EngineState};

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    /// Nothing loaded (initial and terminal)
    #[default]
    Stopped,
    /// Engine opened, waiting for the paused start to be confirmed
    Loading,
    Playing,
    Paused,
}

impl PlaybackState {
    /// A recording is loaded (any state but `Stopped`)
    #[inline]
    pub fn is_loaded(self) -> bool {
        self != PlaybackState::Stopped
    }

    /// Playing or paused with a loaded recording
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl From<EngineState> for PlaybackState {
    fn from(state: EngineState) -> Self {
        match state {
            EngineState::Stopped => PlaybackState::Stopped,
            EngineState::Paused => PlaybackState::Paused,
            EngineState::Playing => PlaybackState::Playing,
        }
    }
}

/// Which operator commands make sense right now
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CommandAvailability {
    pub load: bool,
    pub play_pause: bool,
    pub stop: bool,
    pub seek: bool,
    pub snippet: bool,
}

/// Read-consistent view of one playback session
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    /// Seek target waiting for the worker, if any
    pub seek_pending: Option<PlaybackTime>,
    pub duration: PlaybackTime,
    pub position: PlaybackTime,
    pub loop_count: u32,
    pub end_behavior: EndBehavior,
    /// Loaded recording
    pub path: Option<PathBuf>,
    /// Engine failure that ended the previous session
    pub fault: Option<String>,
}

impl SessionSnapshot {
    /// Snapshot published when nothing is loaded
    pub fn stopped(fault: Option<String>) -> Self {
        SessionSnapshot {
            fault,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[inline]
    pub fn is_seek_pending(&self) -> bool {
        self.seek_pending.is_some()
    }

    /// Position the operator should see: the pending target wins
    pub fn display_position(&self) -> PlaybackTime {
        self.seek_pending.unwrap_or(self.position)
    }

    pub fn status_text(&self) -> &'static str {
        match self.state {
            PlaybackState::Playing => "Playback is playing",
            PlaybackState::Paused => "Playback is paused",
            PlaybackState::Loading => "Playback is loaded",
            PlaybackState::Stopped => "Playback is stopped",
        }
    }

    /// "Current Time: hh:mm:ss/hh:mm:ss", empty when stopped
    pub fn progress_text(&self) -> String {
        if !self.is_loaded() {
            return String::new();
        }
        format!(
            "Current Time: {}/{}",
            self.display_position().to_clock_string(),
            self.duration.to_clock_string()
        )
    }

    /// Fraction of the recording played, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration == PlaybackTime::ZERO {
            return 0.0;
        }
        (self.display_position().as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn availability(&self) -> CommandAvailability {
        let loaded = self.is_loaded();
        CommandAvailability {
            load: !loaded,
            play_pause: loaded,
            stop: loaded,
            seek: self.is_active(),
            snippet: self.is_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(state: PlaybackState) -> SessionSnapshot {
        SessionSnapshot {
            state,
            duration: PlaybackTime::from_secs(120),
            position: PlaybackTime::from_secs(65),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_text() {
        assert_eq!(loaded(PlaybackState::Playing).status_text(), "Playback is playing");
        assert_eq!(loaded(PlaybackState::Paused).status_text(), "Playback is paused");
        assert_eq!(loaded(PlaybackState::Loading).status_text(), "Playback is loaded");
        assert_eq!(SessionSnapshot::default().status_text(), "Playback is stopped");
    }

    #[test]
    fn test_progress_text() {
        assert_eq!(
            loaded(PlaybackState::Paused).progress_text(),
            "Current Time: 00:01:05/00:02:00"
        );
        assert_eq!(SessionSnapshot::default().progress_text(), "");

        let mut seeking = loaded(PlaybackState::Paused);
        seeking.seek_pending = Some(PlaybackTime::from_secs(90));
        assert_eq!(seeking.progress_text(), "Current Time: 00:01:30/00:02:00");
        assert!((seeking.progress() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_availability() {
        let stopped = SessionSnapshot::default().availability();
        assert!(stopped.load);
        assert!(!stopped.play_pause && !stopped.stop && !stopped.snippet);

        let playing = loaded(PlaybackState::Playing).availability();
        assert!(!playing.load);
        assert!(playing.play_pause && playing.stop && playing.snippet && playing.seek);

        let loading = loaded(PlaybackState::Loading).availability();
        assert!(loading.stop && !loading.snippet);
    }

    #[test]
    fn test_state_predicates() {
        assert!(!PlaybackState::Stopped.is_loaded());
        assert!(PlaybackState::Loading.is_loaded());
        assert!(!PlaybackState::Loading.is_active());
        assert_eq!(PlaybackState::from(EngineState::Playing), PlaybackState::Playing);
    }
}
