//! Simulated replay engine
//!
//! Stands in for the external decoder. Position advances with the wall
//! clock (scaled by `speed`) while playing; the end of the recording applies
//! loop count and end behaviour. Faults can be injected explicitly, after a
//! given amount of played time, or at random with a seeded rate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reel_core::{PlaybackTime, ReelError, ReelResult};
use reel_playback::{EndBehavior, EngineFactory, EngineState, PlaybackEngine, StateListener};
use tracing::debug;

/// Simulated engine behaviour
#[derive(Clone, Debug)]
pub struct EngineSimConfig {
    /// Recording seconds per wall-clock second
    pub speed: f64,
    /// Probability that a transport call faults
    pub fault_rate: f64,
    /// Fault once playback passes this position
    pub fault_at: Option<PlaybackTime>,
    /// `start_paused` leaves the engine stopped
    pub refuse_start: bool,
    /// RNG seed for random faults
    pub seed: u64,
}

impl Default for EngineSimConfig {
    fn default() -> Self {
        EngineSimConfig {
            speed: 1.0,
            fault_rate: 0.0,
            fault_at: None,
            refuse_start: false,
            seed: 0,
        }
    }
}

impl EngineSimConfig {
    /// Real-time, never faults
    pub fn realtime() -> Self {
        Self::default()
    }

    /// Fast-forwarded replay for short tests
    pub fn fast() -> Self {
        EngineSimConfig {
            speed: 50.0,
            ..Default::default()
        }
    }

    /// Random faults on a small share of calls
    pub fn flaky(seed: u64) -> Self {
        EngineSimConfig {
            speed: 50.0,
            fault_rate: 0.05,
            seed,
            ..Default::default()
        }
    }

    pub fn with_fault_at(mut self, at: PlaybackTime) -> Self {
        self.fault_at = Some(at);
        self
    }
}

/// Calls observed by one engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineLog {
    pub plays: u32,
    pub pauses: u32,
    pub stops: u32,
    pub seeks: Vec<PlaybackTime>,
    /// Seeks issued while the engine was playing
    pub seeks_while_playing: u32,
    pub notifications: u32,
    pub loops: u32,
}

struct SimState {
    state: EngineState,
    /// Position when `since` was taken
    anchor: PlaybackTime,
    /// Set while playing
    since: Option<Instant>,
    loop_count: u32,
    loops_done: u32,
    end_behavior: EndBehavior,
    listener: Option<StateListener>,
    fault: Option<String>,
    rng: StdRng,
    log: EngineLog,
}

struct EngineCore {
    duration: PlaybackTime,
    config: EngineSimConfig,
    state: Mutex<SimState>,
}

impl EngineCore {
    fn raw_position(&self, s: &SimState) -> PlaybackTime {
        match s.since {
            Some(since) => s.anchor + since.elapsed().mul_f64(self.config.speed),
            None => s.anchor,
        }
    }

    /// Bring the clock up to date. Returns a state change to announce.
    fn advance(&self, s: &mut SimState) -> Option<EngineState> {
        if s.state != EngineState::Playing {
            return None;
        }

        let position = self.raw_position(s);
        if let Some(at) = self.config.fault_at {
            if position >= at && s.fault.is_none() {
                s.fault = Some(format!("decoder failed at {}", at));
            }
        }
        if position < self.duration {
            return None;
        }

        let looping = s.end_behavior == EndBehavior::Loop || s.loops_done < s.loop_count;
        if looping {
            s.loops_done += 1;
            s.log.loops += 1;
            s.anchor = PlaybackTime::ZERO;
            s.since = Some(Instant::now());
            return None;
        }

        s.since = None;
        match s.end_behavior {
            EndBehavior::Pause => {
                s.anchor = self.duration;
                s.state = EngineState::Paused;
            }
            _ => {
                s.anchor = PlaybackTime::ZERO;
                s.state = EngineState::Stopped;
            }
        }
        Some(s.state)
    }

    /// Fail if a fault is latched, or latch a random one
    fn check_fault(&self, s: &mut SimState) -> ReelResult<()> {
        if s.fault.is_none()
            && self.config.fault_rate > 0.0
            && s.rng.gen::<f64>() < self.config.fault_rate
        {
            s.fault = Some("simulated decoder fault".into());
        }
        match &s.fault {
            Some(message) => Err(ReelError::PlaybackFault(message.clone())),
            None => Ok(()),
        }
    }

    /// Run `f` on the state, then notify the listener outside the lock
    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> (T, Option<EngineState>)) -> T {
        let (value, changed, listener) = {
            let mut s = self.state.lock();
            let ended = self.advance(&mut s);
            let (value, changed) = f(&mut s);
            let changed = changed.or(ended);
            if changed.is_some() {
                s.log.notifications += 1;
            }
            (value, changed, s.listener.clone())
        };
        if let (Some(state), Some(listener)) = (changed, listener) {
            listener(state);
        }
        value
    }

    fn transition(&self, to: EngineState, fallible: bool) -> ReelResult<()> {
        self.with_state(|s| {
            if fallible {
                if let Err(err) = self.check_fault(s) {
                    return (Err(err), None);
                }
            }
            let position = self.raw_position(s);
            match to {
                EngineState::Playing => {
                    s.log.plays += 1;
                    if s.since.is_none() {
                        s.since = Some(Instant::now());
                    }
                }
                EngineState::Paused => {
                    s.log.pauses += 1;
                    s.anchor = position.clamp_to(self.duration);
                    s.since = None;
                }
                EngineState::Stopped => {
                    s.log.stops += 1;
                    s.anchor = PlaybackTime::ZERO;
                    s.since = None;
                }
            }
            let changed = (s.state != to).then_some(to);
            s.state = to;
            (Ok(()), changed)
        })
    }
}

/// One opened simulated recording
pub struct SimulatedEngine {
    core: Arc<EngineCore>,
}

impl PlaybackEngine for SimulatedEngine {
    fn state(&self) -> ReelResult<EngineState> {
        self.core.with_state(|s| {
            let result = self.core.check_fault(s).map(|_| s.state);
            (result, None)
        })
    }

    fn duration(&self) -> PlaybackTime {
        self.core.duration
    }

    fn position(&self) -> ReelResult<PlaybackTime> {
        self.core.with_state(|s| {
            let result = self
                .core
                .check_fault(s)
                .map(|_| self.core.raw_position(s).clamp_to(self.core.duration));
            (result, None)
        })
    }

    fn set_loop_count(&mut self, count: u32) {
        self.core.state.lock().loop_count = count;
    }

    fn set_end_behavior(&mut self, behavior: EndBehavior) {
        self.core.state.lock().end_behavior = behavior;
    }

    fn set_state_listener(&mut self, listener: StateListener) {
        self.core.state.lock().listener = Some(listener);
    }

    fn start_paused(&mut self) -> ReelResult<()> {
        if self.core.config.refuse_start {
            return Ok(());
        }
        self.core.transition(EngineState::Paused, true)
    }

    fn play(&mut self) -> ReelResult<()> {
        self.core.transition(EngineState::Playing, true)
    }

    fn pause(&mut self) -> ReelResult<()> {
        self.core.transition(EngineState::Paused, true)
    }

    fn seek(&mut self, position: PlaybackTime) -> ReelResult<()> {
        self.core.with_state(|s| {
            if let Err(err) = self.core.check_fault(s) {
                return (Err(err), None);
            }
            if s.state == EngineState::Playing {
                s.log.seeks_while_playing += 1;
                s.since = Some(Instant::now());
            }
            s.anchor = position.clamp_to(self.core.duration);
            s.log.seeks.push(position);
            (Ok(()), None)
        })
    }

    fn stop(&mut self) -> ReelResult<()> {
        self.core.transition(EngineState::Stopped, false)
    }
}

/// Test-side view of an engine handed to a controller
#[derive(Clone)]
pub struct EngineHandle {
    path: PathBuf,
    core: Arc<EngineCore>,
}

impl EngineHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self) -> EngineLog {
        self.core.state.lock().log.clone()
    }

    /// Engine state without fault checks
    pub fn state(&self) -> EngineState {
        self.core.with_state(|s| (s.state, None))
    }

    pub fn position(&self) -> PlaybackTime {
        self.core
            .with_state(|s| (self.core.raw_position(s).clamp_to(self.core.duration), None))
    }

    /// Latch a decoder fault; the next engine call fails
    pub fn inject_fault(&self, message: impl Into<String>) {
        let listener = {
            let mut s = self.core.state.lock();
            s.fault = Some(message.into());
            s.listener.clone()
        };
        if let Some(listener) = listener {
            let state = self.state();
            listener(state);
        }
    }

    /// Make the engine stop on its own, as at the end of a recording
    pub fn finish(&self) {
        self.core.with_state(|s| {
            s.since = None;
            s.anchor = PlaybackTime::ZERO;
            let changed = (s.state != EngineState::Stopped).then_some(EngineState::Stopped);
            s.state = EngineState::Stopped;
            ((), changed)
        })
    }
}

/// A recording known to the library
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedRecording {
    pub duration: PlaybackTime,
    /// Open fails as if the header were corrupt
    pub malformed: bool,
}

/// In-memory set of recordings; opens `SimulatedEngine`s
pub struct SimulatedLibrary {
    config: EngineSimConfig,
    recordings: RwLock<HashMap<PathBuf, SimulatedRecording>>,
    opened: Mutex<Vec<EngineHandle>>,
    seeds: AtomicU64,
}

impl SimulatedLibrary {
    pub fn new(config: EngineSimConfig) -> Self {
        SimulatedLibrary {
            seeds: AtomicU64::new(config.seed),
            config,
            recordings: RwLock::new(HashMap::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_recording(self, path: impl Into<PathBuf>, duration: PlaybackTime) -> Self {
        self.insert(path, duration);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, duration: PlaybackTime) {
        self.recordings.write().insert(
            path.into(),
            SimulatedRecording {
                duration,
                malformed: false,
            },
        );
    }

    pub fn insert_malformed(&self, path: impl Into<PathBuf>) {
        self.recordings.write().insert(
            path.into(),
            SimulatedRecording {
                duration: PlaybackTime::ZERO,
                malformed: true,
            },
        );
    }

    /// Most recently opened engine
    pub fn last_engine(&self) -> Option<EngineHandle> {
        self.opened.lock().last().cloned()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl EngineFactory for SimulatedLibrary {
    fn open(&self, path: &Path) -> ReelResult<Box<dyn PlaybackEngine>> {
        let recording = self
            .recordings
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ReelError::load(path, "no such recording"))?;
        if recording.malformed {
            return Err(ReelError::load(path, "malformed recording header"));
        }

        let seed = self.seeds.fetch_add(1, Ordering::Relaxed);
        let core = Arc::new(EngineCore {
            duration: recording.duration,
            config: self.config.clone(),
            state: Mutex::new(SimState {
                state: EngineState::Stopped,
                anchor: PlaybackTime::ZERO,
                since: None,
                loop_count: 0,
                loops_done: 0,
                end_behavior: EndBehavior::Stop,
                listener: None,
                fault: None,
                rng: StdRng::seed_from_u64(seed),
                log: EngineLog::default(),
            }),
        });
        self.opened.lock().push(EngineHandle {
            path: path.to_path_buf(),
            core: Arc::clone(&core),
        });
        debug!(path = %path.display(), duration = %recording.duration, "simulated recording opened");

        Ok(Box::new(SimulatedEngine { core }))
    }
}
