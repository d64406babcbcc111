//! End-to-end annotation scenarios
//!
//! Drives a `SessionFacade` with the simulated engine and synthetic
//! acquisition, the way an operator session would run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reel_core::{OwasCode, PlaybackTime, ReelError, ReelResult, SnippetId, SubjectId};
use reel_playback::{PlaybackConfig, PlaybackState, SessionSnapshot};
use reel_runtime::{SessionConfig, SessionFacade, SnippetSummary};
use reel_snippet::{FrameOutcome, SnippetRecord};
use tracing::debug;

use crate::{BodyStream, BodyStreamConfig, EngineLog, EngineSimConfig, SimulatedLibrary};

/// Recording every scenario loads
pub const SESSION_PATH: &str = "session.rec";

/// How long scenario waits may take before giving up
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames fed by one `feed` call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub appended: usize,
    pub skipped: usize,
    pub lost: Vec<SubjectId>,
    /// Snippet reported as discarded by a session end
    pub ended: Option<SnippetId>,
}

/// Facade plus simulated collaborators
pub struct ScenarioHarness {
    pub library: Arc<SimulatedLibrary>,
    pub facade: SessionFacade,
    pub stream: BodyStream,
}

impl ScenarioHarness {
    /// Harness with a 120 s `session.rec` and fast worker cadence
    pub fn new(engine: EngineSimConfig, stream: BodyStream, export_dir: &Path) -> Self {
        Self::with_duration(engine, stream, export_dir, PlaybackTime::from_secs(120))
    }

    pub fn with_duration(
        engine: EngineSimConfig,
        stream: BodyStream,
        export_dir: &Path,
        duration: PlaybackTime,
    ) -> Self {
        let library = Arc::new(SimulatedLibrary::new(engine).with_recording(SESSION_PATH, duration));
        let playback = PlaybackConfig {
            poll_interval: Duration::from_millis(2),
            idle_wait: Duration::from_millis(10),
            ..PlaybackConfig::default()
        };
        let config = SessionConfig::default()
            .with_export_dir(export_dir)
            .with_playback(playback);
        let facade = SessionFacade::new(library.clone(), config);

        ScenarioHarness {
            library,
            facade,
            stream,
        }
    }

    /// Feed `frames` acquisition frames through the facade
    pub fn feed(&mut self, frames: usize) -> FeedReport {
        let mut report = FeedReport::default();
        for _ in 0..frames {
            let bodies = self.stream.next_frame();
            match self.facade.on_bodies(&bodies) {
                Ok(frame) => match frame.outcome {
                    FrameOutcome::Appended(_) => report.appended += 1,
                    FrameOutcome::Skipped => report.skipped += 1,
                    FrameOutcome::Ignored => {}
                },
                Err(ReelError::SubjectLost(id)) => report.lost.push(id),
                Err(ReelError::SessionEnded(id)) => report.ended = Some(id),
                Err(err) => debug!(error = %err, "frame rejected"),
            }
        }
        report
    }

    /// Pause, seek and wait until the seek is applied
    pub fn seek_and_settle(&self, target: PlaybackTime) -> ReelResult<SessionSnapshot> {
        self.facade.pause()?;
        self.facade.seek_to(target)?;
        self.facade
            .session()
            .wait_until(
                |s| !s.is_seek_pending() && s.state == PlaybackState::Paused,
                SETTLE_TIMEOUT,
            )
            .ok_or_else(|| ReelError::PlaybackFault("seek did not settle".into()))
    }

    pub fn wait_state(&self, state: PlaybackState) -> Option<SessionSnapshot> {
        self.facade
            .session()
            .wait_until(|s| s.state == state, SETTLE_TIMEOUT)
    }

    pub fn engine_log(&self) -> EngineLog {
        self.library
            .last_engine()
            .map(|engine| engine.log())
            .unwrap_or_default()
    }
}

/// Outcome of the reference annotation run
#[derive(Debug)]
pub struct ReferenceOutcome {
    pub summary: SnippetSummary,
    pub record: SnippetRecord,
    pub engine: EngineLog,
}

/// Load a 120 s recording, play, mark subject 7 from 10 s, feed 30 frames,
/// close at 25 s with code 215, and read the exported record back.
pub fn run_reference_scenario(export_dir: &Path) -> ReelResult<ReferenceOutcome> {
    let subject = SubjectId::new(7);
    let mut stream = BodyStream::new(BodyStreamConfig::steady());
    stream.pin(subject);
    let mut harness = ScenarioHarness::new(EngineSimConfig::realtime(), stream, export_dir);

    harness.facade.load(SESSION_PATH)?;
    harness.feed(1);
    harness.facade.play()?;

    harness.seek_and_settle(PlaybackTime::from_secs(10))?;
    harness.facade.start_snippet(subject)?;
    harness.facade.play()?;

    let fed = harness.feed(30);
    if fed.appended != 30 {
        return Err(ReelError::PlaybackFault(format!(
            "expected 30 captured frames, got {}",
            fed.appended
        )));
    }

    harness.seek_and_settle(PlaybackTime::from_secs(25))?;
    let summary = harness.facade.stop_snippet(OwasCode::new(2, 1, 5)?)?;
    let path = summary
        .export_path
        .clone()
        .ok_or_else(|| ReelError::PlaybackFault("snippet was not exported".into()))?;
    let record = SnippetRecord::load(path)?;

    harness.facade.shutdown()?;
    Ok(ReferenceOutcome {
        summary,
        record,
        engine: harness.engine_log(),
    })
}

/// Tallies of a churn run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChurnReport {
    pub started: usize,
    pub completed: usize,
    pub aborted: usize,
    pub lost_reports: usize,
    pub frames_appended: usize,
}

/// Operator repeatedly marks random visible subjects while subjects churn
pub fn run_churn_scenario(seed: u64, frames: usize, export_dir: &Path) -> ReelResult<ChurnReport> {
    let stream = BodyStream::with_seed(BodyStreamConfig::busy(), seed);
    let mut harness = ScenarioHarness::new(EngineSimConfig::realtime(), stream, export_dir);
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let mut report = ChurnReport::default();

    harness.facade.load(SESSION_PATH)?;
    harness.facade.play()?;

    let mut recording_for = 0usize;
    for _ in 0..frames {
        let fed = harness.feed(1);
        report.frames_appended += fed.appended;
        if !fed.lost.is_empty() {
            report.lost_reports += fed.lost.len();
            report.aborted += 1;
            recording_for = 0;
        }

        if harness.facade.recorder_phase().is_recording() {
            recording_for += 1;
            if recording_for >= 20 {
                let code = OwasCode::new(
                    rng.gen_range(1..=4),
                    rng.gen_range(1..=3),
                    rng.gen_range(1..=7),
                )?;
                harness.facade.stop_snippet(code)?;
                report.completed += 1;
                recording_for = 0;
            }
        } else {
            let visible = harness.facade.subjects();
            if !visible.is_empty() {
                let pick = visible[rng.gen_range(0..visible.len())].id;
                harness.facade.start_snippet(pick)?;
                report.started += 1;
            }
        }
    }

    if harness.facade.recorder_phase().is_recording() {
        harness.facade.abort_snippet()?;
        report.aborted += 1;
    }
    harness.facade.shutdown()?;
    Ok(report)
}
