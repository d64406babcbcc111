//! Error types for Reel

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{OwasFactor, PlaybackTime, SnippetId, SubjectId};

/// Core Reel errors
#[derive(Error, Debug)]
pub enum ReelError {
    // Playback errors
    #[error("Cannot load recording {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Playback fault: {0}")]
    PlaybackFault(String),

    #[error("No recording loaded")]
    NotLoaded,

    #[error("A recording is already loaded")]
    AlreadyLoaded,

    #[error("Operation refused while a snippet is recording")]
    RecordingInProgress,

    // Recorder errors
    #[error("No subject selected")]
    NoSubjectSelected,

    #[error("Subject {0} is not currently tracked")]
    UnknownSubject(SubjectId),

    #[error("A snippet is already recording")]
    AlreadyRecording,

    #[error("No snippet is recording")]
    NotRecording,

    #[error("Subject {0} was lost during recording")]
    SubjectLost(SubjectId),

    #[error("Snippet already reached a terminal state")]
    AlreadyTerminal,

    #[error("Snippet recording requires a loaded, active playback session")]
    SessionInactive,

    #[error("Snippet {0} was discarded because the playback session ended")]
    SessionEnded(SnippetId),

    #[error("Snippet ending {ending} precedes beginning {beginning}")]
    InvalidBounds {
        beginning: PlaybackTime,
        ending: PlaybackTime,
    },

    // Code errors
    #[error("Invalid OWAS {factor} code {value}")]
    InvalidCode { factor: OwasFactor, value: u8 },

    #[error("Malformed OWAS code: {0}")]
    MalformedCode(String),

    // Export errors
    #[error("Snippet is still open")]
    SnippetOpen,

    #[error("Export to {path:?} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot encode snippet record: {0}")]
    Encode(String),

    #[error("Cannot read snippet record {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReelError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReelError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReelError::Export {
            path: path.into(),
            source,
        }
    }

    /// Recorder-side conditions that the operator caused or that the
    /// environment forced; none of them leave state undefined.
    pub fn is_recorder_condition(&self) -> bool {
        matches!(
            self,
            ReelError::NoSubjectSelected
                | ReelError::UnknownSubject(_)
                | ReelError::AlreadyRecording
                | ReelError::NotRecording
                | ReelError::SubjectLost(_)
                | ReelError::AlreadyTerminal
                | ReelError::SessionInactive
                | ReelError::SessionEnded(_)
                | ReelError::InvalidBounds { .. }
        )
    }
}

/// Result type for Reel operations
pub type ReelResult<T> = Result<T, ReelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReelError::load("/tmp/missing.rec", "file not found");
        assert!(err.to_string().contains("missing.rec"));
        assert!(err.to_string().contains("file not found"));

        let err = ReelError::SubjectLost(SubjectId::new(7));
        assert_eq!(err.to_string(), "Subject 7 was lost during recording");
    }

    #[test]
    fn test_export_error_keeps_source() {
        use std::error::Error as _;

        let err = ReelError::export(
            "/readonly/x.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_recorder_conditions() {
        assert!(ReelError::AlreadyTerminal.is_recorder_condition());
        assert!(ReelError::SessionEnded(SnippetId::new(2)).is_recorder_condition());
        assert!(!ReelError::NotLoaded.is_recorder_condition());
    }
}
