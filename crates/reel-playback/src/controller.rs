//! Playback controller and its polling worker

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use reel_core::{ListenerId, PlaybackTime, Published, ReelError, ReelResult};
use tracing::{debug, info, warn};

use crate::{
    EngineFactory, EngineState, PlaybackConfig, PlaybackEngine, PlaybackState, RecordingLock,
    SessionSnapshot, StateListener,
};

/// A seek the worker applies on its next paused cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SeekRequest {
    target: PlaybackTime,
    /// Resume playing once the seek is applied
    resume: bool,
}

/// Command-to-worker mailbox
#[derive(Debug, Default)]
struct Control {
    seek: Option<SeekRequest>,
    /// Prior play intent remembered while the operator scrubs
    scrub_resume: Option<bool>,
    shutdown: bool,
    /// Engine failure observed on a command path
    fault: Option<String>,
    /// Wake-up pending for the worker
    signalled: bool,
}

struct EngineSlot {
    engine: Box<dyn PlaybackEngine>,
    path: std::path::PathBuf,
}

/// Worker counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub polls: u64,
    pub seeks_applied: u64,
    pub sessions: u64,
    pub faults: u64,
}

#[derive(Default)]
struct Counters {
    polls: AtomicU64,
    seeks_applied: AtomicU64,
    sessions: AtomicU64,
    faults: AtomicU64,
}

/// State shared with the worker.
///
/// Lock order is `engine` then `control`. Engine methods are never called
/// while `control` is held, because engines may call the state listener
/// (which takes `control`) from inside them.
struct Shared {
    engine: Mutex<Option<EngineSlot>>,
    control: Mutex<Control>,
    wake: Condvar,
    published: Published<SessionSnapshot>,
    recording: RecordingLock,
    config: PlaybackConfig,
    counters: Counters,
}

enum Poll {
    Continue { playing: bool },
    Finished,
}

/// Drives an external playback engine for one recording at a time
pub struct PlaybackController {
    factory: Arc<dyn EngineFactory>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Serializes load and stop
    lifecycle: Mutex<()>,
}

impl PlaybackController {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self::with_config(factory, PlaybackConfig::default())
    }

    pub fn with_config(factory: Arc<dyn EngineFactory>, config: PlaybackConfig) -> Self {
        PlaybackController {
            factory,
            shared: Arc::new(Shared {
                engine: Mutex::new(None),
                control: Mutex::new(Control::default()),
                wake: Condvar::new(),
                published: Published::new(SessionSnapshot::stopped(None)),
                recording: RecordingLock::new(),
                config,
                counters: Counters::default(),
            }),
            worker: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    /// Open a recording and leave it paused at the start.
    ///
    /// Valid only while stopped and while no snippet holds the recording
    /// latch. A missing or malformed recording fails with `ReelError::Load`
    /// and the controller stays stopped.
    pub fn load(&self, path: impl AsRef<Path>) -> ReelResult<SessionSnapshot> {
        let path = path.as_ref();
        let _lifecycle = self.lifecycle.lock();
        self.reap_worker();

        if self.worker.lock().is_some() || self.shared.engine.lock().is_some() {
            return Err(ReelError::AlreadyLoaded);
        }
        // A snippet left over from the previous session must be closed first
        let Some(_block) = self.shared.recording.block() else {
            return Err(ReelError::RecordingInProgress);
        };

        info!(path = %path.display(), "loading recording");
        let mut engine = self.factory.open(path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "load failed");
            err
        })?;

        let config = &self.shared.config;
        engine.set_loop_count(config.loop_count);
        engine.set_end_behavior(config.end_behavior);
        let weak = Arc::downgrade(&self.shared);
        let listener: StateListener = Arc::new(move |state| {
            if let Some(shared) = weak.upgrade() {
                debug!(?state, "engine state changed");
                shared.signal();
            }
        });
        engine.set_state_listener(listener);

        let duration = engine.duration();
        let mut guard = self.shared.engine.lock();
        *self.shared.control.lock() = Control::default();

        self.shared.published.publish(SessionSnapshot {
            state: PlaybackState::Loading,
            duration,
            loop_count: config.loop_count,
            end_behavior: config.end_behavior,
            path: Some(path.to_path_buf()),
            ..Default::default()
        });

        let confirmed = engine.start_paused().and_then(|_| engine.state());
        match confirmed {
            Ok(EngineState::Paused) => {}
            other => {
                let reason = match other {
                    Ok(state) => format!("engine reported {:?} after paused start", state),
                    Err(err) => err.to_string(),
                };
                if let Err(err) = engine.stop() {
                    debug!(error = %err, "stop after failed start");
                }
                self.shared.published.publish(SessionSnapshot::stopped(None));
                warn!(path = %path.display(), %reason, "engine did not start");
                return Err(ReelError::load(path, reason));
            }
        }

        *guard = Some(EngineSlot {
            engine,
            path: path.to_path_buf(),
        });
        if let Some(slot) = guard.as_ref() {
            self.shared
                .publish_locked(slot, PlaybackState::Paused, PlaybackTime::ZERO);
        }
        drop(guard);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("playback-poll".into())
            .spawn(move || shared.run())
            .map_err(|err| {
                self.shared.release(Some(err.to_string()));
                ReelError::PlaybackFault(format!("cannot start playback worker: {}", err))
            })?;
        *self.worker.lock() = Some(handle);
        self.shared.counters.sessions.fetch_add(1, Ordering::Relaxed);

        info!(path = %path.display(), duration = %duration, "recording loaded");
        Ok(self.snapshot())
    }

    /// Resume playback. No-op when nothing is loaded or already playing.
    pub fn play(&self) -> ReelResult<()> {
        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            debug!("play ignored: nothing loaded");
            return Ok(());
        };

        match slot.engine.state().map_err(|e| self.shared.fault(e))? {
            EngineState::Paused => {}
            EngineState::Playing | EngineState::Stopped => return Ok(()),
        }

        // A pending seek must land before playback resumes
        let deferred = {
            let mut control = self.shared.control.lock();
            match control.seek.as_mut() {
                Some(request) => {
                    request.resume = true;
                    true
                }
                None => false,
            }
        };
        if deferred {
            debug!("play deferred until pending seek is applied");
            self.shared.signal();
            return Ok(());
        }

        slot.engine.play().map_err(|e| self.shared.fault(e))?;
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared
            .publish_locked(slot, PlaybackState::Playing, position);
        self.shared.signal();
        debug!(%position, "playing");
        Ok(())
    }

    /// Pause playback. No-op when nothing is loaded or already paused.
    pub fn pause(&self) -> ReelResult<()> {
        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            debug!("pause ignored: nothing loaded");
            return Ok(());
        };

        if slot.engine.state().map_err(|e| self.shared.fault(e))? != EngineState::Playing {
            return Ok(());
        }

        slot.engine.pause().map_err(|e| self.shared.fault(e))?;
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared
            .publish_locked(slot, PlaybackState::Paused, position);
        self.shared.signal();
        debug!(%position, "paused");
        Ok(())
    }

    /// Single play/pause button
    pub fn toggle_play_pause(&self) -> ReelResult<()> {
        match self.snapshot().state {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Stop playback and release the engine.
    ///
    /// Idempotent. Returns only after the worker has exited. Refused while a
    /// snippet is recording.
    pub fn stop(&self) -> ReelResult<()> {
        let _lifecycle = self.lifecycle.lock();
        let Some(_block) = self.shared.recording.block() else {
            return Err(ReelError::RecordingInProgress);
        };

        self.teardown();
        Ok(())
    }

    /// Request a seek. Applied by the worker on its next cycle while paused;
    /// while playing the request waits for a pause.
    pub fn seek_to(&self, target: PlaybackTime) -> ReelResult<()> {
        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            return Err(ReelError::NotLoaded);
        };

        let target = target.clamp_to(slot.engine.duration());
        let state = slot.engine.state().map_err(|e| self.shared.fault(e))?;
        {
            let mut control = self.shared.control.lock();
            let resume = control.seek.map(|r| r.resume).unwrap_or(false);
            control.seek = Some(SeekRequest { target, resume });
        }

        if state == EngineState::Playing {
            debug!(%target, "seek deferred until pause");
        }
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared.publish_locked(slot, state.into(), position);
        self.shared.signal();
        Ok(())
    }

    /// Jump forward, pausing first and resuming afterwards if playing
    pub fn skip_by(&self, delta: Duration) -> ReelResult<()> {
        self.shift(delta, true)
    }

    /// Jump backward, pausing first and resuming afterwards if playing
    pub fn reverse_by(&self, delta: Duration) -> ReelResult<()> {
        self.shift(delta, false)
    }

    fn shift(&self, delta: Duration, forward: bool) -> ReelResult<()> {
        if self.shared.recording.is_held() {
            return Err(ReelError::RecordingInProgress);
        }

        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            return Err(ReelError::NotLoaded);
        };

        let was_playing = self.pause_locked(slot)?;
        let pending = self.shared.control.lock().seek;
        let base = match pending {
            Some(request) => request.target,
            None => slot.engine.position().map_err(|e| self.shared.fault(e))?,
        };
        let target = if forward { base + delta } else { base - delta };
        let target = target.clamp_to(slot.engine.duration());
        let resume = was_playing || pending.map(|r| r.resume).unwrap_or(false);

        self.shared.control.lock().seek = Some(SeekRequest { target, resume });
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared
            .publish_locked(slot, PlaybackState::Paused, position);
        self.shared.signal();
        debug!(%target, forward, resume, "shift requested");
        Ok(())
    }

    /// Operator grabbed the position slider: pause, remembering whether we
    /// were playing.
    pub fn begin_scrub(&self) -> ReelResult<()> {
        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            return Err(ReelError::NotLoaded);
        };

        let was_playing = self.pause_locked(slot)?;
        {
            let mut control = self.shared.control.lock();
            if control.scrub_resume.is_none() {
                control.scrub_resume = Some(was_playing);
            }
        }
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared
            .publish_locked(slot, PlaybackState::Paused, position);
        Ok(())
    }

    /// Operator released the slider at `target`: seek, then resume if
    /// playback was running when the scrub began.
    pub fn end_scrub(&self, target: PlaybackTime) -> ReelResult<()> {
        let mut guard = self.shared.engine.lock();
        let Some(slot) = guard.as_mut() else {
            return Err(ReelError::NotLoaded);
        };

        let target = target.clamp_to(slot.engine.duration());
        let state = slot.engine.state().map_err(|e| self.shared.fault(e))?;
        {
            let mut control = self.shared.control.lock();
            let resume = control.scrub_resume.take().unwrap_or(false);
            control.seek = Some(SeekRequest { target, resume });
        }
        let position = slot.engine.position().map_err(|e| self.shared.fault(e))?;
        self.shared.publish_locked(slot, state.into(), position);
        self.shared.signal();
        Ok(())
    }

    /// Pause if playing; returns whether it was playing
    fn pause_locked(&self, slot: &mut EngineSlot) -> ReelResult<bool> {
        let state = slot.engine.state().map_err(|e| self.shared.fault(e))?;
        if state != EngineState::Playing {
            return Ok(false);
        }
        slot.engine.pause().map_err(|e| self.shared.fault(e))?;
        Ok(true)
    }

    /// Current published session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.published.snapshot()
    }

    /// The published-state cell, for waits and watch receivers
    pub fn published(&self) -> &Published<SessionSnapshot> {
        &self.shared.published
    }

    /// Register a state-change callback. It runs on the publishing thread
    /// and must not issue controller commands.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> ListenerId {
        self.shared.published.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.published.unsubscribe(id)
    }

    /// Block until the published state satisfies `pred`
    pub fn wait_for(
        &self,
        pred: impl FnMut(&SessionSnapshot) -> bool,
        timeout: Duration,
    ) -> Option<SessionSnapshot> {
        self.shared.published.wait_until(pred, timeout)
    }

    /// Latch the snippet recorder holds while recording
    pub fn recording_lock(&self) -> RecordingLock {
        self.shared.recording.clone()
    }

    /// Whether a polling worker is currently alive
    pub fn is_worker_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> ControllerStats {
        let c = &self.shared.counters;
        ControllerStats {
            polls: c.polls.load(Ordering::Relaxed),
            seeks_applied: c.seeks_applied.load(Ordering::Relaxed),
            sessions: c.sessions.load(Ordering::Relaxed),
            faults: c.faults.load(Ordering::Relaxed),
        }
    }

    /// Join a worker that ended the session on its own (end of recording,
    /// engine fault). Once the engine slot is empty the worker is exiting.
    fn reap_worker(&self) {
        let mut worker = self.worker.lock();
        let exiting = worker
            .as_ref()
            .map(|h| h.is_finished() || self.shared.engine.lock().is_none())
            .unwrap_or(false);
        if exiting {
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    warn!("playback worker panicked");
                }
            }
        }
    }

    /// Signal shutdown, join the worker and make sure nothing is left loaded
    fn teardown(&self) {
        {
            let mut control = self.shared.control.lock();
            control.shutdown = true;
            control.signalled = true;
        }
        self.shared.wake.notify_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("playback worker panicked");
            }
        }

        // Worker gone; release anything it could not
        if self.shared.engine.lock().is_some() {
            self.shared.release(None);
        } else if self.snapshot().is_loaded() {
            self.shared.published.publish(SessionSnapshot::stopped(None));
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Shared {
    /// Wake the worker
    fn signal(&self) {
        self.control.lock().signalled = true;
        self.wake.notify_all();
    }

    /// Record an engine failure seen on a command path. The worker turns it
    /// into a forced stop on its next cycle.
    fn fault(&self, err: ReelError) -> ReelError {
        let message = match err {
            ReelError::PlaybackFault(message) => message,
            other => other.to_string(),
        };
        warn!(fault = %message, "engine fault");
        {
            let mut control = self.control.lock();
            control.fault.get_or_insert_with(|| message.clone());
            control.signalled = true;
        }
        self.wake.notify_all();
        ReelError::PlaybackFault(message)
    }

    /// Publish session state. Callers hold the engine lock, which orders
    /// every publication after the engine call that caused it.
    fn publish_locked(&self, slot: &EngineSlot, state: PlaybackState, position: PlaybackTime) {
        let seek_pending = self.control.lock().seek.map(|r| r.target);
        self.published.publish_if_changed(SessionSnapshot {
            state,
            seek_pending,
            duration: slot.engine.duration(),
            position,
            loop_count: self.config.loop_count,
            end_behavior: self.config.end_behavior,
            path: Some(slot.path.clone()),
            fault: None,
        });
    }

    /// Worker body
    fn run(&self) {
        debug!("playback worker started");
        let mut fault = None;

        loop {
            self.counters.polls.fetch_add(1, Ordering::Relaxed);
            let playing = match self.poll_once() {
                Ok(Poll::Continue { playing }) => playing,
                Ok(Poll::Finished) => break,
                Err(err) => {
                    fault = Some(match err {
                        ReelError::PlaybackFault(message) => message,
                        other => other.to_string(),
                    });
                    break;
                }
            };

            let wait = if playing {
                self.config.poll_interval
            } else {
                self.config.idle_wait
            };
            self.wait(wait);
        }

        self.release(fault);
        debug!("playback worker exited");
    }

    fn poll_once(&self) -> ReelResult<Poll> {
        let mut guard = self.engine.lock();
        let Some(slot) = guard.as_mut() else {
            return Ok(Poll::Finished);
        };

        let (shutdown, fault) = {
            let control = self.control.lock();
            (control.shutdown, control.fault.clone())
        };
        if let Some(message) = fault {
            return Err(ReelError::PlaybackFault(message));
        }
        if shutdown {
            if slot.engine.state()? != EngineState::Stopped {
                slot.engine.stop()?;
            }
            return Ok(Poll::Finished);
        }

        match slot.engine.state()? {
            EngineState::Stopped => Ok(Poll::Finished),
            EngineState::Playing => {
                let position = slot.engine.position()?;
                self.publish_locked(slot, PlaybackState::Playing, position);
                Ok(Poll::Continue { playing: true })
            }
            EngineState::Paused => {
                let request = self.control.lock().seek.take();
                if let Some(request) = request {
                    slot.engine.seek(request.target)?;
                    self.counters.seeks_applied.fetch_add(1, Ordering::Relaxed);
                    debug!(target = %request.target, resume = request.resume, "seek applied");
                    if request.resume {
                        slot.engine.play()?;
                    }
                }

                let state = slot.engine.state()?;
                let position = slot.engine.position()?;
                self.publish_locked(slot, state.into(), position);
                Ok(Poll::Continue {
                    playing: state == EngineState::Playing,
                })
            }
        }
    }

    /// Sleep until signalled or `timeout` elapses
    fn wait(&self, timeout: Duration) {
        let mut control = self.control.lock();
        if !control.signalled && !control.shutdown {
            let _ = self.wake.wait_for(&mut control, timeout);
        }
        control.signalled = false;
    }

    /// Release the engine and publish `Stopped`. Sole path back to stopped
    /// after a load.
    fn release(&self, fault: Option<String>) {
        let mut guard = self.engine.lock();
        if let Some(mut slot) = guard.take() {
            if fault.is_some() {
                if let Err(err) = slot.engine.stop() {
                    debug!(error = %err, "stop after fault");
                }
            }
            info!(path = %slot.path.display(), "recording released");
        }
        *self.control.lock() = Control::default();

        if let Some(message) = &fault {
            self.counters.faults.fetch_add(1, Ordering::Relaxed);
            warn!(fault = %message, "playback stopped by fault");
        }
        self.published.publish(SessionSnapshot::stopped(fault));
    }
}
