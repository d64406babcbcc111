//! Reel Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by every other Reel crate:
//! - Identifiers (SubjectId, SnippetId)
//! - Playback time (PlaybackTime)
//! - Skeleton observations delivered by acquisition
//! - OWAS posture codes
//! - The published-state cell used for cross-thread snapshots
//! - The error taxonomy

pub mod code;
pub mod error;
pub mod id;
pub mod publish;
pub mod skeleton;
pub mod time;

pub use code::*;
pub use error::*;
pub use id::*;
pub use publish::*;
pub use skeleton::*;
pub use time::*;
