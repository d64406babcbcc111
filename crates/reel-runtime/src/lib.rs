//! Reel Runtime - the session boundary
//!
//! Wires the playback controller, the tracked body set and the snippet
//! recorder together behind one command/query surface:
//! - operator commands (load, play, seek, snippets, subject selection)
//! - frame ingestion from acquisition (`on_bodies`)
//! - published session state and subject list for a UI
//!
//! Also hosts session configuration and logging setup.

pub mod config;
pub mod facade;
pub mod logging;

pub use config::*;
pub use facade::*;
pub use logging::*;
