//! Session facade
//!
//! The single surface a UI talks to. Three contexts call in concurrently:
//! the UI thread issues commands, acquisition delivers frames through
//! `on_bodies`, and the playback worker publishes session state. Frame
//! ingestion never touches the filesystem; exports run on the command path
//! after a snippet is closed.
//!
//! A snippet never spans two playback sessions. When the session ends under
//! a recording (end of media, engine fault) the snippet is discarded, the
//! next snippet or frame call reports `SessionEnded` once, and the subject
//! list is cleared.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reel_bodies::{BodyDelta, BodySetStats, TrackedBodyHandle, TrackedBodySet};
use reel_core::{
    BodyObservation, ListenerId, OwasCode, PlaybackTime, Published, ReelError, ReelResult,
    SnippetId, SubjectId,
};
use reel_playback::{
    CommandAvailability, ControllerStats, EngineFactory, PlaybackController, SessionSnapshot,
};
use reel_snippet::{FrameOutcome, RecorderPhase, RecorderStats, Snippet, SnippetExporter, SnippetRecorder};
use tracing::{debug, info, warn};

use crate::SessionConfig;

/// What the operator sees of a closed snippet
#[derive(Clone, Debug, PartialEq)]
pub struct SnippetSummary {
    pub id: SnippetId,
    pub subject: SubjectId,
    pub code: OwasCode,
    pub beginning: PlaybackTime,
    pub ending: PlaybackTime,
    pub frame_count: usize,
    pub skipped_frames: u64,
    /// Unset while the export is pending
    pub export_path: Option<PathBuf>,
}

impl SnippetSummary {
    fn of(snippet: &Snippet, code: OwasCode, ending: PlaybackTime) -> Self {
        SnippetSummary {
            id: snippet.id(),
            subject: snippet.subject(),
            code,
            beginning: snippet.beginning(),
            ending,
            frame_count: snippet.frame_count(),
            skipped_frames: snippet.skipped_frames(),
            export_path: None,
        }
    }

    pub fn is_exported(&self) -> bool {
        self.export_path.is_some()
    }
}

/// Outcome of one `on_bodies` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub delta: BodyDelta,
    pub outcome: FrameOutcome,
    /// Selection was dropped because the subject left
    pub selection_cleared: bool,
}

/// Result of `retry_exports`
#[derive(Debug, Default)]
pub struct RetryReport {
    pub exported: Vec<PathBuf>,
    pub failed: Vec<(SnippetId, ReelError)>,
}

/// Aggregated counters
#[derive(Clone, Debug, Default)]
pub struct FacadeStats {
    pub playback: ControllerStats,
    pub bodies: BodySetStats,
    pub recorder: RecorderStats,
    pub frames: u64,
    pub exports_written: u64,
    pub export_failures: u64,
}

#[derive(Default)]
struct Counters {
    frames: AtomicU64,
    exports_written: AtomicU64,
    export_failures: AtomicU64,
}

/// Composition of controller, body set, recorder and exporter
pub struct SessionFacade {
    config: SessionConfig,
    controller: PlaybackController,
    /// Lock order: `bodies` before the recorder's internal lock
    bodies: Mutex<TrackedBodySet>,
    subjects: Published<Vec<TrackedBodyHandle>>,
    selected: Mutex<Option<SubjectId>>,
    recorder: Arc<SnippetRecorder>,
    /// Set once a loaded session has been observed; cleared with the subjects
    session_live: AtomicBool,
    exporter: SnippetExporter,
    history: Mutex<Vec<SnippetSummary>>,
    pending: Mutex<VecDeque<Snippet>>,
    counters: Counters,
}

impl SessionFacade {
    pub fn new(factory: Arc<dyn EngineFactory>, config: SessionConfig) -> Self {
        let controller = PlaybackController::with_config(factory, config.playback.clone());
        let recorder = Arc::new(SnippetRecorder::new(controller.recording_lock()));
        let observer = Arc::clone(&recorder);
        controller.subscribe(move |session| {
            observer.on_session(session);
        });
        let exporter = SnippetExporter::new(&config.export.dir).with_pretty(config.export.pretty);

        SessionFacade {
            config,
            controller,
            bodies: Mutex::new(TrackedBodySet::new()),
            subjects: Published::new(Vec::new()),
            selected: Mutex::new(None),
            recorder,
            session_live: AtomicBool::new(false),
            exporter,
            history: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    // Playback commands

    /// Load a recording. A snippet left over from an ended session is
    /// discarded first and reported by the next snippet call.
    pub fn load(&self, path: impl AsRef<Path>) -> ReelResult<SessionSnapshot> {
        self.sync_session();
        let loaded = self.controller.load(path)?;
        self.sync_session();
        Ok(loaded)
    }

    pub fn play(&self) -> ReelResult<()> {
        self.controller.play()
    }

    pub fn pause(&self) -> ReelResult<()> {
        self.controller.pause()
    }

    pub fn toggle_play_pause(&self) -> ReelResult<()> {
        self.controller.toggle_play_pause()
    }

    /// Stop playback. Refused while a snippet records; abort or close it first.
    pub fn stop(&self) -> ReelResult<()> {
        self.sync_session();
        self.controller.stop()?;
        self.sync_session();
        Ok(())
    }

    pub fn seek_to(&self, target: PlaybackTime) -> ReelResult<()> {
        self.controller.seek_to(target)
    }

    /// Skip forward by the configured step
    pub fn skip(&self) -> ReelResult<()> {
        self.controller.skip_by(self.config.skip_step)
    }

    /// Skip backward by the configured step
    pub fn reverse(&self) -> ReelResult<()> {
        self.controller.reverse_by(self.config.skip_step)
    }

    pub fn skip_by(&self, delta: Duration) -> ReelResult<()> {
        self.controller.skip_by(delta)
    }

    pub fn reverse_by(&self, delta: Duration) -> ReelResult<()> {
        self.controller.reverse_by(delta)
    }

    pub fn begin_scrub(&self) -> ReelResult<()> {
        self.controller.begin_scrub()
    }

    pub fn end_scrub(&self, target: PlaybackTime) -> ReelResult<()> {
        self.controller.end_scrub(target)
    }

    // Subjects

    /// Select the subject snippets are recorded for. `None` clears.
    pub fn select_subject(&self, subject: Option<SubjectId>) -> ReelResult<()> {
        if let Some(id) = subject {
            if !self.bodies.lock().is_live(id) {
                return Err(ReelError::UnknownSubject(id));
            }
        }
        *self.selected.lock() = subject;
        debug!(?subject, "subject selected");
        Ok(())
    }

    pub fn selected_subject(&self) -> Option<SubjectId> {
        *self.selected.lock()
    }

    /// Live subjects in acquisition order
    pub fn subjects(&self) -> Vec<TrackedBodyHandle> {
        self.subjects.snapshot()
    }

    /// Subject list cell, republished whenever subjects come or go
    pub fn subject_list(&self) -> &Published<Vec<TrackedBodyHandle>> {
        &self.subjects
    }

    // Snippets

    /// Select `subject` and start recording it at the current position
    pub fn start_snippet(&self, subject: SubjectId) -> ReelResult<SnippetId> {
        self.select_subject(Some(subject))?;
        self.start_selected_snippet()
    }

    /// Start recording the selected subject at the current position
    pub fn start_selected_snippet(&self) -> ReelResult<SnippetId> {
        let session = self.sync_session();
        let subject = self.selected_subject();
        let id = {
            let bodies = self.bodies.lock();
            self.recorder
                .start(subject, session.position, &bodies, &session)?
        };

        // The session may have ended between the snapshot and the start
        let now = self.controller.snapshot();
        if !now.is_active() {
            self.recorder.on_session(&now);
            self.recorder.take_interrupted();
            return Err(ReelError::SessionInactive);
        }
        Ok(id)
    }

    /// Close the snippet at the current position and export it.
    ///
    /// On an export failure the closed snippet is queued for
    /// `retry_exports` and the error is returned.
    pub fn stop_snippet(&self, code: OwasCode) -> ReelResult<SnippetSummary> {
        let session = self.sync_session();
        if let Some(id) = self.recorder.take_interrupted() {
            return Err(ReelError::SessionEnded(id));
        }
        let at = session.position;
        let snippet = self.recorder.stop(code, at, &session)?;

        let mut summary = SnippetSummary::of(&snippet, code, at);
        match self.exporter.export(&snippet) {
            Ok(path) => {
                self.counters.exports_written.fetch_add(1, Ordering::Relaxed);
                summary.export_path = Some(path);
                self.history.lock().push(summary.clone());
                Ok(summary)
            }
            Err(err) => {
                self.counters.export_failures.fetch_add(1, Ordering::Relaxed);
                warn!(snippet = %snippet.id(), error = %err, "export failed, snippet kept for retry");
                self.history.lock().push(summary);
                self.pending.lock().push_back(snippet);
                Err(err)
            }
        }
    }

    /// Discard the snippet in progress
    pub fn abort_snippet(&self) -> ReelResult<SnippetId> {
        self.recorder.abort()
    }

    pub fn recorder_phase(&self) -> RecorderPhase {
        self.sync_session();
        self.recorder.phase()
    }

    /// Closed snippets, oldest first
    pub fn snippets(&self) -> Vec<SnippetSummary> {
        self.history.lock().clone()
    }

    /// Closed snippets whose export has not succeeded yet
    pub fn pending_exports(&self) -> Vec<SnippetId> {
        self.pending.lock().iter().map(|s| s.id()).collect()
    }

    /// Try every pending export again
    pub fn retry_exports(&self) -> RetryReport {
        let queued: Vec<Snippet> = self.pending.lock().drain(..).collect();
        let mut report = RetryReport::default();
        let mut still_pending = VecDeque::new();

        for snippet in queued {
            match self.exporter.export(&snippet) {
                Ok(path) => {
                    self.counters.exports_written.fetch_add(1, Ordering::Relaxed);
                    if let Some(summary) =
                        self.history.lock().iter_mut().find(|s| s.id == snippet.id())
                    {
                        summary.export_path = Some(path.clone());
                    }
                    info!(snippet = %snippet.id(), path = %path.display(), "pending export written");
                    report.exported.push(path);
                }
                Err(err) => {
                    self.counters.export_failures.fetch_add(1, Ordering::Relaxed);
                    report.failed.push((snippet.id(), err));
                    still_pending.push_back(snippet);
                }
            }
        }

        // Keep queue order; anything queued meanwhile goes after the retries
        let mut pending = self.pending.lock();
        still_pending.extend(pending.drain(..));
        *pending = still_pending;
        report
    }

    // Frame ingestion

    /// Acquisition callback. Updates the body set, republishes the subject
    /// list on change, drops a selection whose subject left, and feeds the
    /// recorder. Returns `SubjectLost` if the recorded subject disappeared
    /// and `SessionEnded` if playback ended under the snippet.
    pub fn on_bodies(&self, observations: &[BodyObservation]) -> ReelResult<FrameReport> {
        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        self.sync_session();

        let mut bodies = self.bodies.lock();
        let delta = bodies.update(observations);
        if !delta.is_empty() {
            self.subjects.publish(bodies.handles().to_vec());
        }

        let mut selection_cleared = false;
        {
            let mut selected = self.selected.lock();
            if let Some(id) = *selected {
                if delta.was_removed(id) {
                    *selected = None;
                    selection_cleared = true;
                    debug!(subject = %id, "selected subject left, selection cleared");
                }
            }
        }

        let outcome = self.recorder.on_frame(&bodies)?;
        drop(bodies);
        if let Some(id) = self.recorder.take_interrupted() {
            return Err(ReelError::SessionEnded(id));
        }
        Ok(FrameReport {
            delta,
            outcome,
            selection_cleared,
        })
    }

    /// Bring the recorder and subject list in line with the published
    /// session. The session listener normally gets there first; this covers
    /// calls that race the worker's publish.
    fn sync_session(&self) -> SessionSnapshot {
        let session = self.controller.snapshot();
        if !session.is_active() {
            self.recorder.on_session(&session);
        }
        if session.is_loaded() {
            self.session_live.store(true, Ordering::Release);
        } else if self.session_live.swap(false, Ordering::AcqRel) {
            self.clear_subjects();
        }
        session
    }

    /// Forget every subject of the session that ended
    fn clear_subjects(&self) {
        let delta = self.bodies.lock().clear();
        self.subjects.publish(Vec::new());
        let selection = self.selected.lock().take();
        debug!(removed = delta.removed.len(), ?selection, "session ended, subjects cleared");
    }

    // Queries

    pub fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    pub fn session(&self) -> &Published<SessionSnapshot> {
        self.controller.published()
    }

    pub fn subscribe_session(
        &self,
        listener: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> ListenerId {
        self.controller.subscribe(listener)
    }

    /// Command availability including recorder and selection state
    pub fn availability(&self) -> CommandAvailability {
        let mut availability = self.controller.snapshot().availability();
        if self.recorder.is_recording() {
            availability.stop = false;
        } else if self.selected_subject().is_none() {
            availability.snippet = false;
        }
        availability
    }

    pub fn stats(&self) -> FacadeStats {
        FacadeStats {
            playback: self.controller.stats(),
            bodies: self.bodies.lock().stats().clone(),
            recorder: self.recorder.stats(),
            frames: self.counters.frames.load(Ordering::Relaxed),
            exports_written: self.counters.exports_written.load(Ordering::Relaxed),
            export_failures: self.counters.export_failures.load(Ordering::Relaxed),
        }
    }

    /// Discard any snippet in progress and stop playback
    pub fn shutdown(&self) -> ReelResult<()> {
        self.sync_session();
        if self.recorder.is_recording() {
            match self.recorder.abort() {
                Ok(id) => info!(snippet = %id, "snippet discarded at shutdown"),
                Err(err) => debug!(error = %err, "nothing to discard at shutdown"),
            }
        }
        self.controller.stop()?;
        self.sync_session();

        let pending = self.pending.lock().len();
        if pending > 0 {
            warn!(pending, "shutting down with unexported snippets");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{Joint, JointType};
    use reel_playback::{EndBehavior, EngineState, PlaybackEngine, PlaybackState, StateListener};
    use reel_snippet::SnippetEnd;
    use std::fs;

    /// Paused-only engine: enough to drive the facade without a clock.
    /// Raising `ended` makes it report end of media.
    struct StillEngine {
        state: EngineState,
        position: PlaybackTime,
        ended: Arc<AtomicBool>,
    }

    impl PlaybackEngine for StillEngine {
        fn state(&self) -> ReelResult<EngineState> {
            if self.ended.load(Ordering::Acquire) {
                return Ok(EngineState::Stopped);
            }
            Ok(self.state)
        }
        fn duration(&self) -> PlaybackTime {
            PlaybackTime::from_secs(120)
        }
        fn position(&self) -> ReelResult<PlaybackTime> {
            Ok(self.position)
        }
        fn set_loop_count(&mut self, _count: u32) {}
        fn set_end_behavior(&mut self, _behavior: EndBehavior) {}
        fn set_state_listener(&mut self, _listener: StateListener) {}
        fn start_paused(&mut self) -> ReelResult<()> {
            self.state = EngineState::Paused;
            Ok(())
        }
        fn play(&mut self) -> ReelResult<()> {
            self.state = EngineState::Playing;
            Ok(())
        }
        fn pause(&mut self) -> ReelResult<()> {
            self.state = EngineState::Paused;
            Ok(())
        }
        fn seek(&mut self, position: PlaybackTime) -> ReelResult<()> {
            self.position = position;
            Ok(())
        }
        fn stop(&mut self) -> ReelResult<()> {
            self.state = EngineState::Stopped;
            Ok(())
        }
    }

    fn open(path: &Path) -> ReelResult<Box<dyn PlaybackEngine>> {
        if path.extension().and_then(|e| e.to_str()) != Some("rec") {
            return Err(ReelError::load(path, "not a recording"));
        }
        Ok(Box::new(StillEngine {
            state: EngineState::Stopped,
            position: PlaybackTime::ZERO,
            ended: Arc::new(AtomicBool::new(false)),
        }))
    }

    fn test_config(export_dir: &Path) -> SessionConfig {
        let mut config = SessionConfig::default().with_export_dir(export_dir);
        config.playback.poll_interval = Duration::from_millis(2);
        config.playback.idle_wait = Duration::from_millis(10);
        config
    }

    fn facade(export_dir: &Path) -> SessionFacade {
        SessionFacade::new(Arc::new(open), test_config(export_dir))
    }

    /// Facade whose engines end their media when the returned flag is raised.
    /// Each load starts with the flag lowered.
    fn ending_facade(export_dir: &Path) -> (SessionFacade, Arc<AtomicBool>) {
        let ended = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&ended);
        let factory = move |path: &Path| -> ReelResult<Box<dyn PlaybackEngine>> {
            open(path)?;
            shared.store(false, Ordering::Release);
            Ok(Box::new(StillEngine {
                state: EngineState::Stopped,
                position: PlaybackTime::ZERO,
                ended: Arc::clone(&shared),
            }))
        };
        (SessionFacade::new(Arc::new(factory), test_config(export_dir)), ended)
    }

    fn end_media(facade: &SessionFacade, ended: &AtomicBool) {
        ended.store(true, Ordering::Release);
        facade
            .session()
            .wait_until(|s| s.state == PlaybackState::Stopped, Duration::from_secs(5))
            .unwrap();
    }

    fn body(id: u64) -> BodyObservation {
        BodyObservation::new(SubjectId::new(id))
            .with_joint(JointType::SpineBase, Joint::tracked(0.1, 0.2))
    }

    fn seek_and_wait(facade: &SessionFacade, secs: u64) {
        facade.seek_to(PlaybackTime::from_secs(secs)).unwrap();
        facade
            .session()
            .wait_until(
                |s| !s.is_seek_pending() && s.position == PlaybackTime::from_secs(secs),
                Duration::from_secs(5),
            )
            .unwrap();
    }

    #[test]
    fn test_snippet_round_trip_through_facade() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path());
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7)]).unwrap();

        seek_and_wait(&facade, 10);
        facade.start_snippet(SubjectId::new(7)).unwrap();
        assert!(matches!(facade.stop(), Err(ReelError::RecordingInProgress)));
        assert!(!facade.availability().stop);

        for _ in 0..30 {
            facade.on_bodies(&[body(7), body(8)]).unwrap();
        }
        seek_and_wait(&facade, 25);

        let summary = facade.stop_snippet(OwasCode::new(2, 1, 5).unwrap()).unwrap();
        assert_eq!(summary.frame_count, 30);
        assert_eq!(summary.beginning, PlaybackTime::from_secs(10));
        assert_eq!(summary.ending, PlaybackTime::from_secs(25));
        assert!(summary.export_path.as_ref().unwrap().exists());
        assert_eq!(facade.snippets().len(), 1);

        facade.shutdown().unwrap();
        assert_eq!(facade.snapshot().state, PlaybackState::Stopped);
    }

    #[test]
    fn test_selection_cleared_when_subject_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path());

        facade.on_bodies(&[body(7), body(8)]).unwrap();
        assert_eq!(facade.subjects().len(), 2);
        assert!(matches!(
            facade.select_subject(Some(SubjectId::new(9))),
            Err(ReelError::UnknownSubject(_))
        ));
        facade.select_subject(Some(SubjectId::new(8))).unwrap();

        let report = facade.on_bodies(&[body(7)]).unwrap();
        assert!(report.selection_cleared);
        assert_eq!(report.delta.removed, vec![SubjectId::new(8)]);
        assert_eq!(facade.selected_subject(), None);
        assert_eq!(facade.subjects()[0].label, "Body 7");
    }

    #[test]
    fn test_subject_loss_discards_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path());
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7)]).unwrap();
        facade.start_snippet(SubjectId::new(7)).unwrap();

        assert!(matches!(facade.on_bodies(&[]), Err(ReelError::SubjectLost(_))));
        assert!(facade.on_bodies(&[]).is_ok());
        assert!(matches!(
            facade.stop_snippet(OwasCode::new(1, 1, 1).unwrap()),
            Err(ReelError::AlreadyTerminal)
        ));
        assert!(facade.snippets().is_empty());
        assert_eq!(fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);

        // Playback can be stopped again once the snippet is gone
        facade.stop().unwrap();
    }

    #[test]
    fn test_failed_export_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        fs::write(&target, b"in the way").unwrap();

        let facade = facade(&target);
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7)]).unwrap();
        facade.start_snippet(SubjectId::new(7)).unwrap();
        facade.on_bodies(&[body(7)]).unwrap();

        let err = facade.stop_snippet(OwasCode::new(3, 2, 1).unwrap()).unwrap_err();
        assert!(matches!(err, ReelError::Export { .. }));
        assert_eq!(facade.pending_exports().len(), 1);
        assert!(!facade.snippets()[0].is_exported());

        let report = facade.retry_exports();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(facade.pending_exports().len(), 1);

        fs::remove_file(&target).unwrap();
        let report = facade.retry_exports();
        assert_eq!(report.exported.len(), 1);
        assert!(facade.pending_exports().is_empty());
        assert!(facade.snippets()[0].is_exported());
        assert_eq!(facade.stats().export_failures, 2);
    }

    #[test]
    fn test_load_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path());
        assert!(matches!(facade.load("notes.txt"), Err(ReelError::Load { .. })));
        assert!(facade.availability().load);
        assert!(!facade.availability().snippet);
    }

    #[test]
    fn test_session_end_discards_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let (facade, ended) = ending_facade(dir.path());
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7)]).unwrap();
        seek_and_wait(&facade, 100);
        let id = facade.start_snippet(SubjectId::new(7)).unwrap();
        for _ in 0..8 {
            facade.on_bodies(&[body(7)]).unwrap();
        }

        end_media(&facade, &ended);
        assert_eq!(facade.recorder_phase(), RecorderPhase::Closed(SnippetEnd::Aborted));
        assert!(!facade.controller().recording_lock().is_held());

        // Stopping and reloading are no longer blocked by the dead snippet
        facade.stop().unwrap();
        assert!(facade.subjects().is_empty());
        assert!(facade.subject_list().snapshot().is_empty());
        assert_eq!(facade.selected_subject(), None);

        facade.load("session.rec").unwrap();
        seek_and_wait(&facade, 110);
        assert!(matches!(
            facade.stop_snippet(OwasCode::new(2, 1, 5).unwrap()),
            Err(ReelError::SessionEnded(ended_id)) if ended_id == id
        ));
        assert!(matches!(
            facade.stop_snippet(OwasCode::new(2, 1, 5).unwrap()),
            Err(ReelError::AlreadyTerminal)
        ));
        assert!(facade.snippets().is_empty());
        assert_eq!(fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
        assert_eq!(facade.stats().recorder.sessions_ended, 1);
    }

    #[test]
    fn test_session_end_reported_on_next_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (facade, ended) = ending_facade(dir.path());
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7), body(8)]).unwrap();
        let id = facade.start_snippet(SubjectId::new(7)).unwrap();

        end_media(&facade, &ended);
        assert!(matches!(
            facade.on_bodies(&[body(7)]),
            Err(ReelError::SessionEnded(ended_id)) if ended_id == id
        ));

        // Reported once; acquisition carries on with a fresh subject list
        let report = facade.on_bodies(&[body(7)]).unwrap();
        assert_eq!(report.outcome, FrameOutcome::Ignored);
        assert_eq!(facade.subjects().len(), 1);
        assert_eq!(facade.selected_subject(), None);
        assert!(matches!(
            facade.stop_snippet(OwasCode::new(1, 1, 1).unwrap()),
            Err(ReelError::AlreadyTerminal)
        ));
    }

    #[test]
    fn test_stop_clears_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path());
        facade.load("session.rec").unwrap();
        facade.on_bodies(&[body(7), body(8)]).unwrap();
        facade.select_subject(Some(SubjectId::new(8))).unwrap();
        let mut list = facade.subject_list().watch();
        list.borrow_and_update();

        facade.stop().unwrap();
        assert!(list.has_changed().unwrap());
        assert!(list.borrow_and_update().is_empty());
        assert_eq!(facade.selected_subject(), None);
        assert_eq!(facade.stats().bodies.removed, 2);
        assert!(matches!(
            facade.select_subject(Some(SubjectId::new(7))),
            Err(ReelError::UnknownSubject(_))
        ));
    }
}
