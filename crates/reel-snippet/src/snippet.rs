//! Snippet and captured frames

use std::time::Duration;

use reel_core::{BodyObservation, JointType, OwasCode, PlaybackTime, Point2D, SnippetId, SubjectId};

/// One joint of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CapturedJoint {
    pub position: Point2D,
    /// Tracking succeeded for this joint in this frame
    pub tracked: bool,
}

/// One subject's skeleton at one frame (indexed by JointType)
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    joints: Vec<CapturedJoint>,
}

impl CapturedFrame {
    /// Copy the joints out of an observation. Inferred joints count as
    /// untracked.
    pub fn from_observation(observation: &BodyObservation) -> Self {
        let joints = JointType::all()
            .iter()
            .map(|&joint| {
                let state = observation.joint(joint);
                CapturedJoint {
                    position: state.position,
                    tracked: state.tracking.is_tracked(),
                }
            })
            .collect();
        CapturedFrame { joints }
    }

    pub fn joint(&self, joint: JointType) -> CapturedJoint {
        self.joints.get(joint.index()).copied().unwrap_or_default()
    }

    /// Joints in sensor order
    pub fn joints(&self) -> impl Iterator<Item = (JointType, CapturedJoint)> + '_ {
        JointType::all().iter().map(move |&j| (j, self.joint(j)))
    }

    pub fn tracked_count(&self) -> usize {
        self.joints.iter().filter(|j| j.tracked).count()
    }
}

/// A time-bounded trajectory of one subject.
///
/// Frames can only be appended by the recorder while the snippet is open.
/// Once closed (ending and code set) the snippet is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    id: SnippetId,
    subject: SubjectId,
    beginning: PlaybackTime,
    ending: Option<PlaybackTime>,
    code: Option<OwasCode>,
    frames: Vec<CapturedFrame>,
    skipped_frames: u64,
}

impl Snippet {
    pub(crate) fn open(id: SnippetId, subject: SubjectId, beginning: PlaybackTime) -> Self {
        Snippet {
            id,
            subject,
            beginning,
            ending: None,
            code: None,
            frames: Vec::new(),
            skipped_frames: 0,
        }
    }

    pub(crate) fn push(&mut self, frame: CapturedFrame) -> usize {
        self.frames.push(frame);
        self.frames.len()
    }

    pub(crate) fn skip(&mut self) {
        self.skipped_frames += 1;
    }

    pub(crate) fn close(&mut self, code: OwasCode, ending: PlaybackTime) {
        self.code = Some(code);
        self.ending = Some(ending);
    }

    pub fn id(&self) -> SnippetId {
        self.id
    }

    /// Subject identity, held by value
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn beginning(&self) -> PlaybackTime {
        self.beginning
    }

    /// Unset until the snippet is closed
    pub fn ending(&self) -> Option<PlaybackTime> {
        self.ending
    }

    pub fn code(&self) -> Option<OwasCode> {
        self.code
    }

    pub fn is_closed(&self) -> bool {
        self.ending.is_some()
    }

    /// `ending - beginning` once closed
    pub fn duration(&self) -> Option<Duration> {
        self.ending.map(|ending| ending - self.beginning)
    }

    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames where the subject was present but not tracked
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{Joint, TrackingState};

    #[test]
    fn test_capture_marks_only_tracked_joints() {
        let observation = BodyObservation::new(SubjectId::new(7))
            .with_joint(JointType::Head, Joint::tracked(0.1, 0.9))
            .with_joint(
                JointType::HandLeft,
                Joint::new(Point2D::new(0.5, 0.5), TrackingState::Inferred),
            );

        let frame = CapturedFrame::from_observation(&observation);
        assert_eq!(frame.joints().count(), JointType::COUNT);
        assert_eq!(frame.tracked_count(), 1);
        assert!(frame.joint(JointType::Head).tracked);
        assert_eq!(frame.joint(JointType::Head).position, Point2D::new(0.1, 0.9));
        assert!(!frame.joint(JointType::HandLeft).tracked);
    }

    #[test]
    fn test_snippet_lifecycle() {
        let mut snippet = Snippet::open(
            SnippetId::new(1),
            SubjectId::new(7),
            PlaybackTime::from_secs(10),
        );
        assert!(!snippet.is_closed());
        assert_eq!(snippet.duration(), None);

        let observation = BodyObservation::new(SubjectId::new(7));
        assert_eq!(snippet.push(CapturedFrame::from_observation(&observation)), 1);
        snippet.skip();

        snippet.close(OwasCode::new(2, 1, 5).unwrap(), PlaybackTime::from_secs(25));
        assert!(snippet.is_closed());
        assert_eq!(snippet.duration(), Some(Duration::from_secs(15)));
        assert_eq!(snippet.frame_count(), 1);
        assert_eq!(snippet.skipped_frames(), 1);
        assert_eq!(snippet.code().map(|c| c.as_number()), Some(215));
    }
}
