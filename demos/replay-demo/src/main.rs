//! Reel Replay Demo
//!
//! Walks one annotation session against the simulated replay engine:
//! - load a recording and seek into it
//! - play while synthetic bodies stream in
//! - record a snippet for one subject and export it with an OWAS code
//! - print the published session state as it changes
//!
//! Usage: `replay-demo [session-config.json]`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reel_core::{OwasCode, PlaybackTime, ReelError, ReelResult};
use reel_runtime::{init_logging, SessionConfig, SessionFacade};
use reel_test::{BodyStream, BodyStreamConfig, EngineSimConfig, SimulatedLibrary};
use tracing::info;

const RECORDING: &str = "session.rec";
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           Reel Replay Demo - Snippet Annotation            ║");
    println!("║     Simulated engine + synthetic acquisition               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    config.validate()?;
    init_logging(&config.logging);

    let library = SimulatedLibrary::new(EngineSimConfig {
        speed: 4.0,
        ..EngineSimConfig::realtime()
    })
    .with_recording(RECORDING, PlaybackTime::from_secs(90));
    let facade = Arc::new(SessionFacade::new(Arc::new(library), config));

    // Mirror the published session the way a UI would
    let mut session = facade.session().watch();
    let watcher = tokio::spawn(async move {
        while session.changed().await.is_ok() {
            let snapshot = session.borrow_and_update().clone();
            println!("  [{}] {}", snapshot.status_text(), snapshot.progress_text());
        }
    });

    let operator = Arc::clone(&facade);
    let outcome = tokio::task::spawn_blocking(move || run_session(&operator)).await?;
    watcher.abort();
    outcome?;

    let stats = facade.stats();
    println!();
    println!("Frames ingested:    {}", stats.frames);
    println!("Subjects seen:      {}", stats.bodies.added);
    println!("Seeks applied:      {}", stats.playback.seeks_applied);
    println!("Snippets exported:  {}", stats.exports_written);
    Ok(())
}

fn run_session(facade: &SessionFacade) -> ReelResult<()> {
    let settle = Duration::from_secs(2);

    println!("Loading {}...", RECORDING);
    let loaded = facade.load(RECORDING)?;
    println!("Loaded, duration {}", loaded.duration.to_clock_string());

    let mut stream = BodyStream::with_seed(BodyStreamConfig::steady(), 7);
    let worker = stream.enter();
    stream.enter();
    facade.on_bodies(&stream.next_frame())?;
    for handle in facade.subjects() {
        println!("  subject: {}", handle.label);
    }

    facade.seek_to(PlaybackTime::from_secs(10))?;
    facade
        .session()
        .wait_until(|s| !s.is_seek_pending(), settle)
        .ok_or_else(|| ReelError::Config("seek did not settle".into()))?;

    facade.play()?;
    let snippet = facade.start_snippet(worker)?;
    info!(snippet = %snippet, subject = %worker, "recording");

    for _ in 0..60 {
        facade.on_bodies(&stream.next_frame())?;
        thread::sleep(FRAME_INTERVAL);
    }

    let summary = facade.stop_snippet(OwasCode::new(2, 1, 5)?)?;
    println!();
    println!(
        "Snippet {} for {}: code {} from {} to {}, {} frames",
        summary.id,
        summary.subject.label(),
        summary.code.as_number(),
        summary.beginning.to_clock_string(),
        summary.ending.to_clock_string(),
        summary.frame_count,
    );
    if let Some(path) = &summary.export_path {
        println!("Exported to {}", path.display());
    }
    println!();

    facade.skip()?;
    thread::sleep(Duration::from_millis(200));
    facade.pause()?;
    facade.shutdown()
}
