//! Reel Snippet - time-bounded trajectories of one subject
//!
//! A snippet is marked by the operator against the replay: it starts at the
//! current playback position for one selected subject, collects that
//! subject's skeleton on every frame, and closes with an OWAS posture code.
//! - `SnippetRecorder` owns the recording state machine
//! - `SnippetExporter` persists closed snippets as JSON records
//! - `SnippetRecord` is the persisted shape

pub mod exporter;
pub mod record;
pub mod recorder;
pub mod snippet;

pub use exporter::*;
pub use record::*;
pub use recorder::*;
pub use snippet::*;
