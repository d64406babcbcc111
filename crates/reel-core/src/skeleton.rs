//! Skeleton observations
//!
//! What acquisition delivers for each tracked body in a frame: an identity,
//! a body-level tracked flag and, per joint, a position plus tracking state.
//! Positions are the 2-D (x, y) projection of camera space.

use std::fmt;

use crate::SubjectId;

/// Joint identifier for the body skeleton (25 joints, sensor order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JointType {
    // Spine and head
    SpineBase,
    SpineMid,
    Neck,
    Head,

    // Left arm
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,

    // Right arm
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,

    // Left leg
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,

    // Right leg
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,

    SpineShoulder,

    // Hand detail
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    pub const COUNT: usize = 25;

    /// All joints in order
    pub fn all() -> &'static [JointType] {
        &[
            JointType::SpineBase,
            JointType::SpineMid,
            JointType::Neck,
            JointType::Head,
            JointType::ShoulderLeft,
            JointType::ElbowLeft,
            JointType::WristLeft,
            JointType::HandLeft,
            JointType::ShoulderRight,
            JointType::ElbowRight,
            JointType::WristRight,
            JointType::HandRight,
            JointType::HipLeft,
            JointType::KneeLeft,
            JointType::AnkleLeft,
            JointType::FootLeft,
            JointType::HipRight,
            JointType::KneeRight,
            JointType::AnkleRight,
            JointType::FootRight,
            JointType::SpineShoulder,
            JointType::HandTipLeft,
            JointType::ThumbLeft,
            JointType::HandTipRight,
            JointType::ThumbRight,
        ]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<JointType> {
        JointType::all().get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            JointType::SpineBase => "SpineBase",
            JointType::SpineMid => "SpineMid",
            JointType::Neck => "Neck",
            JointType::Head => "Head",
            JointType::ShoulderLeft => "ShoulderLeft",
            JointType::ElbowLeft => "ElbowLeft",
            JointType::WristLeft => "WristLeft",
            JointType::HandLeft => "HandLeft",
            JointType::ShoulderRight => "ShoulderRight",
            JointType::ElbowRight => "ElbowRight",
            JointType::WristRight => "WristRight",
            JointType::HandRight => "HandRight",
            JointType::HipLeft => "HipLeft",
            JointType::KneeLeft => "KneeLeft",
            JointType::AnkleLeft => "AnkleLeft",
            JointType::FootLeft => "FootLeft",
            JointType::HipRight => "HipRight",
            JointType::KneeRight => "KneeRight",
            JointType::AnkleRight => "AnkleRight",
            JointType::FootRight => "FootRight",
            JointType::SpineShoulder => "SpineShoulder",
            JointType::HandTipLeft => "HandTipLeft",
            JointType::ThumbLeft => "ThumbLeft",
            JointType::HandTipRight => "HandTipRight",
            JointType::ThumbRight => "ThumbRight",
        }
    }

    pub fn from_name(name: &str) -> Option<JointType> {
        JointType::all().iter().copied().find(|j| j.name() == name)
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-joint tracking quality reported by acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

impl TrackingState {
    #[inline]
    pub fn is_tracked(self) -> bool {
        self == TrackingState::Tracked
    }
}

/// 2-D position
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance to another point
    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Joint observation (position + tracking state)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Joint {
    pub position: Point2D,
    pub tracking: TrackingState,
}

impl Joint {
    pub fn new(position: Point2D, tracking: TrackingState) -> Self {
        Self { position, tracking }
    }

    pub fn tracked(x: f32, y: f32) -> Self {
        Self::new(Point2D::new(x, y), TrackingState::Tracked)
    }

    pub fn untracked() -> Self {
        Self::default()
    }
}

/// One raw body in one acquisition frame
#[derive(Debug, Clone, PartialEq)]
pub struct BodyObservation {
    /// Acquisition tracking identity
    pub id: SubjectId,

    /// Body-level tracked flag
    pub is_tracked: bool,

    /// Joint observations (indexed by JointType)
    pub joints: Vec<Joint>,
}

impl BodyObservation {
    /// Tracked body with every joint untracked
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            is_tracked: true,
            joints: vec![Joint::untracked(); JointType::COUNT],
        }
    }

    /// Body that acquisition sees but cannot track
    pub fn untracked(id: SubjectId) -> Self {
        Self {
            is_tracked: false,
            ..Self::new(id)
        }
    }

    /// Get joint by joint type. Missing trailing joints read as untracked.
    pub fn joint(&self, joint: JointType) -> Joint {
        self.joints.get(joint.index()).copied().unwrap_or_default()
    }

    /// Set joint observation
    pub fn set_joint(&mut self, joint: JointType, state: Joint) {
        let idx = joint.index();
        if idx >= self.joints.len() {
            self.joints.resize(JointType::COUNT, Joint::untracked());
        }
        self.joints[idx] = state;
    }

    pub fn with_joint(mut self, joint: JointType, state: Joint) -> Self {
        self.set_joint(joint, state);
        self
    }

    /// Number of joints reported as tracked
    pub fn tracked_joint_count(&self) -> usize {
        self.joints.iter().filter(|j| j.tracking.is_tracked()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_table() {
        assert_eq!(JointType::all().len(), JointType::COUNT);
        for (i, joint) in JointType::all().iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(JointType::from_index(i), Some(*joint));
            assert_eq!(JointType::from_name(joint.name()), Some(*joint));
        }
        assert_eq!(JointType::from_index(JointType::COUNT), None);
    }

    #[test]
    fn test_body_joints() {
        let body = BodyObservation::new(SubjectId::new(3))
            .with_joint(JointType::Head, Joint::tracked(0.1, 0.9));

        assert!(body.is_tracked);
        assert_eq!(body.joints.len(), JointType::COUNT);
        assert_eq!(body.joint(JointType::Head).position, Point2D::new(0.1, 0.9));
        assert_eq!(body.tracked_joint_count(), 1);
        assert!(!body.joint(JointType::FootLeft).tracking.is_tracked());
    }

    #[test]
    fn test_short_joint_list_reads_untracked() {
        let mut body = BodyObservation::new(SubjectId::new(1));
        body.joints.truncate(4);
        assert_eq!(body.joint(JointType::ThumbRight), Joint::untracked());

        body.set_joint(JointType::ThumbRight, Joint::tracked(1.0, 1.0));
        assert_eq!(body.joints.len(), JointType::COUNT);
        assert!(body.joint(JointType::ThumbRight).tracking.is_tracked());
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }
}
