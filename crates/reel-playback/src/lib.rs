//! Reel Playback - transport control over an external replay engine
//!
//! The controller owns the engine for one loaded recording and runs one
//! background worker per session. The worker is the single writer of the
//! published session state:
//! 1. Read engine state and position
//! 2. While playing, republish position at a steady cadence
//! 3. While paused, apply a pending seek (and resume if asked)
//! 4. On engine stop, release the engine and publish `Stopped`

pub mod config;
pub mod controller;
pub mod engine;
pub mod lock;
pub mod session;

pub use config::*;
pub use controller::*;
pub use engine::*;
pub use lock::*;
pub use session::*;
