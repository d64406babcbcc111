//! Reel Bodies - the set of currently visible subjects
//!
//! Every acquisition frame replaces the set: identities seen in the frame
//! are refreshed or created, identities missing from the frame are removed.
//! The caller gets an explicit add/remove delta for each update.

pub mod set;

pub use set::*;
