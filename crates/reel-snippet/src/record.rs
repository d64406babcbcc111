//! Persisted snippet record
//!
//! One JSON document per exported snippet. Times are stored in microseconds
//! with a human readable copy next to them. Every joint of every frame is
//! listed in sensor order; only joints that were tracked carry a position.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reel_core::{JointType, OwasCode, PlaybackTime, ReelError, ReelResult};
use serde::{Deserialize, Serialize};

use crate::{CapturedFrame, Snippet};

/// 2-D joint position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRecord {
    pub joint: String,
    /// Present only when the joint was tracked in this frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: usize,
    pub joints: Vec<JointRecord>,
}

impl FrameRecord {
    fn from_frame(index: usize, frame: &CapturedFrame) -> Self {
        let joints = frame
            .joints()
            .map(|(joint, captured)| JointRecord {
                joint: joint.name().to_string(),
                position: captured.tracked.then(|| PositionRecord {
                    x: captured.position.x,
                    y: captured.position.y,
                }),
            })
            .collect();
        FrameRecord { index, joints }
    }

    /// Position of `joint`, if it was tracked
    pub fn position(&self, joint: JointType) -> Option<PositionRecord> {
        self.joints
            .iter()
            .find(|j| j.joint == joint.name())
            .and_then(|j| j.position)
    }
}

/// Persisted form of one closed snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetRecord {
    /// Three-digit presentation, e.g. 215
    pub code: u16,
    pub back: u8,
    pub arms: u8,
    pub legs: u8,
    pub subject: u64,
    pub beginning_us: u64,
    pub ending_us: u64,
    pub duration_us: u64,
    /// "hh:mm:ss.mmm"
    pub beginning: String,
    pub ending: String,
    pub frame_count: usize,
    pub frames: Vec<FrameRecord>,
}

impl SnippetRecord {
    /// Build the record for a closed snippet
    pub fn from_snippet(snippet: &Snippet) -> ReelResult<Self> {
        let (Some(ending), Some(code)) = (snippet.ending(), snippet.code()) else {
            return Err(ReelError::SnippetOpen);
        };
        let beginning = snippet.beginning();

        Ok(SnippetRecord {
            code: code.as_number(),
            back: code.back(),
            arms: code.arms(),
            legs: code.legs(),
            subject: snippet.subject().0,
            beginning_us: beginning.as_micros(),
            ending_us: ending.as_micros(),
            duration_us: (ending - beginning).as_micros() as u64,
            beginning: beginning.to_precise_string(),
            ending: ending.to_precise_string(),
            frame_count: snippet.frame_count(),
            frames: snippet
                .frames()
                .iter()
                .enumerate()
                .map(|(i, frame)| FrameRecord::from_frame(i, frame))
                .collect(),
        })
    }

    /// Read a record back from disk
    pub fn load(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| ReelError::Decode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|err| ReelError::Decode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Validated code
    pub fn owas_code(&self) -> ReelResult<OwasCode> {
        OwasCode::new(self.back, self.arms, self.legs)
    }

    pub fn beginning_time(&self) -> PlaybackTime {
        PlaybackTime::from_micros(self.beginning_us)
    }

    pub fn ending_time(&self) -> PlaybackTime {
        PlaybackTime::from_micros(self.ending_us)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.duration_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{BodyObservation, Joint, SnippetId, SubjectId};

    fn closed_snippet() -> Snippet {
        let mut snippet = Snippet::open(
            SnippetId::new(3),
            SubjectId::new(7),
            PlaybackTime::from_secs(10),
        );
        let observation = BodyObservation::new(SubjectId::new(7))
            .with_joint(JointType::Head, Joint::tracked(0.25, 0.75));
        snippet.push(CapturedFrame::from_observation(&observation));
        snippet.push(CapturedFrame::from_observation(&observation));
        snippet.close(OwasCode::new(2, 1, 5).unwrap(), PlaybackTime::from_secs(25));
        snippet
    }

    #[test]
    fn test_record_contents() {
        let record = SnippetRecord::from_snippet(&closed_snippet()).unwrap();

        assert_eq!(record.code, 215);
        assert_eq!((record.back, record.arms, record.legs), (2, 1, 5));
        assert_eq!(record.beginning_time(), PlaybackTime::from_secs(10));
        assert_eq!(record.ending_time(), PlaybackTime::from_secs(25));
        assert_eq!(record.duration(), Duration::from_secs(15));
        assert_eq!(record.beginning, "00:00:10.000");
        assert_eq!(record.frame_count, 2);
        assert_eq!(record.frames.len(), 2);

        let frame = &record.frames[1];
        assert_eq!(frame.index, 1);
        assert_eq!(frame.joints.len(), JointType::COUNT);
        assert_eq!(
            frame.position(JointType::Head),
            Some(PositionRecord { x: 0.25, y: 0.75 })
        );
        assert_eq!(frame.position(JointType::Neck), None);
    }

    #[test]
    fn test_untracked_joints_have_no_position_field() {
        let record = SnippetRecord::from_snippet(&closed_snippet()).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        let joints = json["frames"][0]["joints"].as_array().unwrap();
        let neck = joints.iter().find(|j| j["joint"] == "Neck").unwrap();
        assert!(neck.get("position").is_none());
        let head = joints.iter().find(|j| j["joint"] == "Head").unwrap();
        assert_eq!(head["position"]["x"], 0.25);
    }

    #[test]
    fn test_open_snippet_has_no_record() {
        let snippet = Snippet::open(SnippetId::new(1), SubjectId::new(7), PlaybackTime::ZERO);
        assert!(matches!(
            SnippetRecord::from_snippet(&snippet),
            Err(ReelError::SnippetOpen)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SnippetRecord::load("/nonexistent/215_x.json").unwrap_err();
        assert!(matches!(err, ReelError::Decode { .. }));
    }
}
