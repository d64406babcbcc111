//! Time primitives for Reel
//!
//! Playback positions are relative to the start of the recording and are
//! never negative. They are kept in microseconds so arithmetic stays exact.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Position within a recording, in microseconds from its start
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PlaybackTime(pub u64);

impl PlaybackTime {
    pub const ZERO: PlaybackTime = PlaybackTime(0);
    pub const MAX: PlaybackTime = PlaybackTime(u64::MAX);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        PlaybackTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        PlaybackTime(millis.saturating_mul(1000))
    }

    #[inline]
    pub fn from_secs(secs: u64) -> Self {
        PlaybackTime(secs.saturating_mul(1_000_000))
    }

    /// Negative and non-finite inputs map to zero
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return PlaybackTime::ZERO;
        }
        PlaybackTime((secs * 1_000_000.0) as u64)
    }

    #[inline]
    pub fn from_duration(duration: Duration) -> Self {
        PlaybackTime(duration.as_micros().min(u64::MAX as u128) as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        self.saturating_add_time(PlaybackTime::from_duration(duration))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        PlaybackTime(self.0.saturating_sub(PlaybackTime::from_duration(duration).0))
    }

    #[inline]
    fn saturating_add_time(self, other: PlaybackTime) -> Self {
        PlaybackTime(self.0.saturating_add(other.0))
    }

    /// Clamp into `[0, duration]`
    #[inline]
    pub fn clamp_to(self, duration: PlaybackTime) -> Self {
        self.min(duration)
    }

    /// `hh:mm:ss`, truncating sub-second precision
    pub fn to_clock_string(self) -> String {
        let total = self.0 / 1_000_000;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    /// `hh:mm:ss.mmm`
    pub fn to_precise_string(self) -> String {
        format!("{}.{:03}", self.to_clock_string(), (self.0 / 1000) % 1000)
    }
}

impl Add<Duration> for PlaybackTime {
    type Output = PlaybackTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for PlaybackTime {
    type Output = PlaybackTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub<PlaybackTime> for PlaybackTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: PlaybackTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl From<Duration> for PlaybackTime {
    fn from(duration: Duration) -> Self {
        PlaybackTime::from_duration(duration)
    }
}

impl std::fmt::Debug for PlaybackTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}s)", self.as_secs_f64())
    }
}

impl std::fmt::Display for PlaybackTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_precise_string())
    }
}
