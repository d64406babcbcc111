//! Playback engine collaborator
//!
//! The engine decodes a recording and exposes transport controls. Reel never
//! decodes anything itself; it only drives an engine through these traits.

use std::path::Path;
use std::sync::Arc;

use reel_core::{PlaybackTime, ReelResult};
use serde::{Deserialize, Serialize};

/// Transport state reported by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineState {
    Stopped,
    Paused,
    Playing,
}

/// What the engine does when it reaches the end of the recording
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndBehavior {
    /// Stop and release (the session ends)
    #[default]
    Stop,
    /// Pause on the last frame
    Pause,
    /// Start over from the beginning
    Loop,
}

/// Called by the engine whenever its transport state changes
pub type StateListener = Arc<dyn Fn(EngineState) + Send + Sync>;

/// One opened recording
///
/// Methods are called with the controller's engine lock held, so an engine
/// may invoke its state listener synchronously from inside them.
pub trait PlaybackEngine: Send {
    /// Live transport state
    fn state(&self) -> ReelResult<EngineState>;

    /// Total length of the recording
    fn duration(&self) -> PlaybackTime;

    /// Current position relative to the recording start
    fn position(&self) -> ReelResult<PlaybackTime>;

    /// Number of extra iterations before the end behaviour applies
    fn set_loop_count(&mut self, count: u32);

    fn set_end_behavior(&mut self, behavior: EndBehavior);

    fn set_state_listener(&mut self, listener: StateListener);

    /// Start the engine, paused at the beginning
    fn start_paused(&mut self) -> ReelResult<()>;

    fn play(&mut self) -> ReelResult<()>;

    fn pause(&mut self) -> ReelResult<()>;

    /// Only meaningful while paused
    fn seek(&mut self, position: PlaybackTime) -> ReelResult<()>;

    fn stop(&mut self) -> ReelResult<()>;
}

/// Opens recordings. A missing or malformed file fails with `ReelError::Load`.
pub trait EngineFactory: Send + Sync {
    fn open(&self, path: &Path) -> ReelResult<Box<dyn PlaybackEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(&Path) -> ReelResult<Box<dyn PlaybackEngine>> + Send + Sync,
{
    fn open(&self, path: &Path) -> ReelResult<Box<dyn PlaybackEngine>> {
        self(path)
    }
}
