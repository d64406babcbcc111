//! Snippet recorder
//!
//! Records one subject at a time. Lifecycle of a snippet:
//! `Idle -> Recording -> Closed(Completed)` on stop, or
//! `Idle -> Recording -> Aborting -> Closed(Aborted)` when the subject leaves
//! the body set, the playback session ends, or the operator discards it.
//!
//! The first terminal transition wins. A `stop` racing a frame that lost the
//! subject gets `AlreadyTerminal` and the snippet is never half-closed.

use parking_lot::Mutex;
use reel_bodies::TrackedBodySet;
use reel_core::{OwasCode, PlaybackTime, ReelError, ReelResult, SnippetId, SubjectId};
use reel_playback::{RecordingGuard, RecordingLock, SessionSnapshot};
use tracing::{debug, info, warn};

use crate::{CapturedFrame, Snippet};

/// How a snippet ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SnippetEnd {
    Completed,
    Aborted,
}

/// Observable recorder phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RecorderPhase {
    #[default]
    Idle,
    Recording,
    /// Discarding a snippet; becomes `Closed(Aborted)`
    Aborting,
    Closed(SnippetEnd),
}

impl RecorderPhase {
    pub fn is_recording(self) -> bool {
        self == RecorderPhase::Recording
    }

    /// Ready for `start`
    pub fn can_start(self) -> bool {
        matches!(self, RecorderPhase::Idle | RecorderPhase::Closed(_))
    }
}

/// Result of feeding one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame captured; carries the new frame count
    Appended(usize),
    /// Subject present but not tracked this frame
    Skipped,
    /// Not recording
    Ignored,
}

/// Recorder counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub started: u64,
    pub completed: u64,
    pub aborted: u64,
    pub subjects_lost: u64,
    /// Snippets discarded because playback stopped under them
    pub sessions_ended: u64,
    pub frames_appended: u64,
    pub frames_skipped: u64,
}

struct Active {
    snippet: Snippet,
    /// Keeps the controller from stopping or skipping under us
    _guard: RecordingGuard,
}

enum Phase {
    Idle,
    Recording(Active),
    Aborting,
    Closed(SnippetEnd),
}

impl Phase {
    fn observable(&self) -> RecorderPhase {
        match self {
            Phase::Idle => RecorderPhase::Idle,
            Phase::Recording(_) => RecorderPhase::Recording,
            Phase::Aborting => RecorderPhase::Aborting,
            Phase::Closed(end) => RecorderPhase::Closed(*end),
        }
    }
}

struct Inner {
    phase: Phase,
    next_id: SnippetId,
    /// Snippet discarded by a session end, not yet reported
    interrupted: Option<SnippetId>,
    stats: RecorderStats,
}

/// Records at most one snippet at a time
pub struct SnippetRecorder {
    lock: RecordingLock,
    inner: Mutex<Inner>,
}

impl SnippetRecorder {
    /// `lock` is the controller's recording latch
    pub fn new(lock: RecordingLock) -> Self {
        SnippetRecorder {
            lock,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                next_id: SnippetId::new(1),
                interrupted: None,
                stats: RecorderStats::default(),
            }),
        }
    }

    /// Begin recording `subject` at `at`.
    ///
    /// The subject must be live in `bodies` and the session loaded and
    /// playing or paused.
    pub fn start(
        &self,
        subject: Option<SubjectId>,
        at: PlaybackTime,
        bodies: &TrackedBodySet,
        session: &SessionSnapshot,
    ) -> ReelResult<SnippetId> {
        let subject = subject.ok_or(ReelError::NoSubjectSelected)?;

        let mut inner = self.inner.lock();
        if !inner.phase.observable().can_start() {
            return Err(ReelError::AlreadyRecording);
        }
        if !bodies.is_live(subject) {
            return Err(ReelError::UnknownSubject(subject));
        }
        if !session.is_active() {
            return Err(ReelError::SessionInactive);
        }
        // Blocked latch means the controller is tearing the session down
        let guard = self.lock.try_acquire().ok_or(ReelError::SessionInactive)?;

        let id = inner.next_id;
        inner.next_id = id.next();
        inner.interrupted = None;
        inner.phase = Phase::Recording(Active {
            snippet: Snippet::open(id, subject, at),
            _guard: guard,
        });
        inner.stats.started += 1;

        info!(snippet = %id, %subject, beginning = %at, "snippet recording started");
        Ok(id)
    }

    /// Feed the latest body set. Constant time apart from the append; no I/O.
    ///
    /// Returns `SubjectLost` exactly once, on the frame where the recorded
    /// subject disappeared; the snippet is discarded.
    pub fn on_frame(&self, bodies: &TrackedBodySet) -> ReelResult<FrameOutcome> {
        let mut inner = self.inner.lock();
        let subject = match &inner.phase {
            Phase::Recording(active) => active.snippet.subject(),
            _ => return Ok(FrameOutcome::Ignored),
        };

        match bodies.observation(subject) {
            Some(observation) if observation.is_tracked => {
                let frame = CapturedFrame::from_observation(observation);
                let Phase::Recording(active) = &mut inner.phase else {
                    return Ok(FrameOutcome::Ignored);
                };
                let count = active.snippet.push(frame);
                inner.stats.frames_appended += 1;
                Ok(FrameOutcome::Appended(count))
            }
            Some(_) => {
                if let Phase::Recording(active) = &mut inner.phase {
                    active.snippet.skip();
                }
                inner.stats.frames_skipped += 1;
                Ok(FrameOutcome::Skipped)
            }
            None => {
                inner.stats.subjects_lost += 1;
                let discarded = self.begin_abort(&mut inner);
                drop(inner);
                self.finish_abort(discarded, "subject lost");
                Err(ReelError::SubjectLost(subject))
            }
        }
    }

    /// Close the snippet with `code` at `at` and hand it back for export.
    pub fn stop(
        &self,
        code: OwasCode,
        at: PlaybackTime,
        session: &SessionSnapshot,
    ) -> ReelResult<Snippet> {
        let mut inner = self.inner.lock();
        let active = match &inner.phase {
            Phase::Recording(active) => active,
            Phase::Aborting | Phase::Closed(_) => return Err(ReelError::AlreadyTerminal),
            Phase::Idle => return Err(ReelError::NotRecording),
        };
        if !session.is_active() {
            return Err(ReelError::SessionInactive);
        }
        let beginning = active.snippet.beginning();
        if at < beginning {
            return Err(ReelError::InvalidBounds {
                beginning,
                ending: at,
            });
        }

        let Phase::Recording(active) =
            std::mem::replace(&mut inner.phase, Phase::Closed(SnippetEnd::Completed))
        else {
            return Err(ReelError::NotRecording);
        };
        inner.stats.completed += 1;
        drop(inner);

        let mut snippet = active.snippet;
        snippet.close(code, at);
        info!(
            snippet = %snippet.id(),
            subject = %snippet.subject(),
            %code,
            frames = snippet.frame_count(),
            skipped = snippet.skipped_frames(),
            ending = %at,
            "snippet closed"
        );
        Ok(snippet)
    }

    /// Follow the playback session. A snippet never outlives the session it
    /// started in: once the session is no longer playing or paused, the
    /// snippet in progress is discarded and its id returned.
    pub fn on_session(&self, session: &SessionSnapshot) -> Option<SnippetId> {
        if session.is_active() {
            return None;
        }
        let mut inner = self.inner.lock();
        if !matches!(inner.phase, Phase::Recording(_)) {
            return None;
        }
        let discarded = self.begin_abort(&mut inner);
        let id = discarded.as_ref().map(|a| a.snippet.id());
        if id.is_some() {
            inner.stats.sessions_ended += 1;
            inner.interrupted = id;
        }
        drop(inner);
        self.finish_abort(discarded, "playback session ended");
        id
    }

    /// Snippet discarded by a session end since the last call. Reported once.
    pub fn take_interrupted(&self) -> Option<SnippetId> {
        self.inner.lock().interrupted.take()
    }

    /// Operator discard of the snippet in progress
    pub fn abort(&self) -> ReelResult<SnippetId> {
        let mut inner = self.inner.lock();
        match inner.phase {
            Phase::Recording(_) => {}
            Phase::Aborting | Phase::Closed(_) => return Err(ReelError::AlreadyTerminal),
            Phase::Idle => return Err(ReelError::NotRecording),
        }
        let discarded = self.begin_abort(&mut inner);
        drop(inner);
        let id = discarded.as_ref().map(|a| a.snippet.id());
        self.finish_abort(discarded, "operator abort");
        id.ok_or(ReelError::NotRecording)
    }

    fn begin_abort(&self, inner: &mut Inner) -> Option<Active> {
        match std::mem::replace(&mut inner.phase, Phase::Aborting) {
            Phase::Recording(active) => {
                inner.stats.aborted += 1;
                Some(active)
            }
            other => {
                inner.phase = other;
                None
            }
        }
    }

    /// Drop the discarded snippet (releasing the latch) outside the lock
    fn finish_abort(&self, discarded: Option<Active>, reason: &str) {
        if let Some(active) = discarded {
            warn!(
                snippet = %active.snippet.id(),
                subject = %active.snippet.subject(),
                frames = active.snippet.frame_count(),
                reason,
                "snippet discarded"
            );
            drop(active);
        }

        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Aborting) {
            inner.phase = Phase::Closed(SnippetEnd::Aborted);
        } else {
            debug!("recorder left aborting state concurrently");
        }
    }

    pub fn phase(&self) -> RecorderPhase {
        self.inner.lock().phase.observable()
    }

    pub fn is_recording(&self) -> bool {
        self.phase().is_recording()
    }

    /// Subject of the snippet in progress
    pub fn subject(&self) -> Option<SubjectId> {
        match &self.inner.lock().phase {
            Phase::Recording(active) => Some(active.snippet.subject()),
            _ => None,
        }
    }

    /// Frames captured so far by the snippet in progress
    pub fn frame_count(&self) -> Option<usize> {
        match &self.inner.lock().phase {
            Phase::Recording(active) => Some(active.snippet.frame_count()),
            _ => None,
        }
    }

    pub fn stats(&self) -> RecorderStats {
        self.inner.lock().stats.clone()
    }
}
