//! Reel Test Harness - simulated collaborators and end-to-end scenarios
//!
//! This crate provides:
//! - A simulated replay engine and recording library (seedable, fault-injectable)
//! - Synthetic acquisition: subjects entering, leaving and losing tracking
//! - End-to-end annotation scenarios over the session facade

pub mod acquisition;
pub mod engine_sim;
pub mod scenario;

pub use acquisition::*;
pub use engine_sim::*;
pub use scenario::*;
