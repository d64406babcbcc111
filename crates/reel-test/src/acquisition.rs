//! Synthetic acquisition
//!
//! Produces per-frame body observations the way a depth sensor would:
//! subjects walk in and out of view, occasionally lose body tracking, and
//! individual joints drop to inferred or untracked.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reel_core::{BodyObservation, Joint, JointType, Point2D, SubjectId, TrackingState};

/// Base of the synthetic tracking ids (sensor ids are large 64-bit values)
pub const TRACKING_ID_BASE: u64 = 72_057_594_037_927_936;

/// Stream behaviour
#[derive(Clone, Debug)]
pub struct BodyStreamConfig {
    /// Most subjects in view at once
    pub max_subjects: usize,
    /// Per-frame probability that a new subject enters
    pub enter_prob: f64,
    /// Per-frame, per-subject probability of leaving
    pub leave_prob: f64,
    /// Per-frame, per-subject probability of a body-level tracking loss
    pub untracked_prob: f64,
    /// Per-joint probability of not being tracked
    pub joint_dropout: f64,
    /// Uniform noise added to joint positions
    pub jitter: f32,
}

impl Default for BodyStreamConfig {
    fn default() -> Self {
        BodyStreamConfig {
            max_subjects: 3,
            enter_prob: 0.02,
            leave_prob: 0.01,
            untracked_prob: 0.0,
            joint_dropout: 0.05,
            jitter: 0.01,
        }
    }
}

impl BodyStreamConfig {
    /// Nobody enters or leaves; every joint tracked
    pub fn steady() -> Self {
        BodyStreamConfig {
            enter_prob: 0.0,
            leave_prob: 0.0,
            joint_dropout: 0.0,
            ..Default::default()
        }
    }

    /// Constant churn and poor tracking
    pub fn busy() -> Self {
        BodyStreamConfig {
            max_subjects: 6,
            enter_prob: 0.2,
            leave_prob: 0.1,
            untracked_prob: 0.05,
            joint_dropout: 0.2,
            jitter: 0.03,
        }
    }
}

#[derive(Clone, Debug)]
struct SimSubject {
    id: SubjectId,
    /// Horizontal offset of this subject in the scene
    offset: f32,
    /// Phase of the bending motion
    phase: f32,
}

/// Seeded generator of acquisition frames
pub struct BodyStream {
    config: BodyStreamConfig,
    rng: StdRng,
    subjects: Vec<SimSubject>,
    /// Subjects that never leave on their own
    pinned: HashSet<SubjectId>,
    next_id: u64,
    frame: u64,
}

impl BodyStream {
    pub fn new(config: BodyStreamConfig) -> Self {
        Self::with_seed(config, 0)
    }

    pub fn with_seed(config: BodyStreamConfig, seed: u64) -> Self {
        BodyStream {
            config,
            rng: StdRng::seed_from_u64(seed),
            subjects: Vec::new(),
            pinned: HashSet::new(),
            next_id: 1,
            frame: 0,
        }
    }

    /// Bring a subject into view with a fresh synthetic id
    pub fn enter(&mut self) -> SubjectId {
        let id = SubjectId::new(TRACKING_ID_BASE + self.next_id);
        self.next_id += 1;
        self.enter_as(id);
        id
    }

    /// Bring a subject into view with a given id. No-op if already visible.
    pub fn enter_as(&mut self, id: SubjectId) {
        if self.is_visible(id) {
            return;
        }
        let offset = self.rng.gen_range(-0.6..0.6);
        let phase = self.rng.gen_range(0.0..std::f32::consts::TAU);
        self.subjects.push(SimSubject { id, offset, phase });
    }

    /// Keep `id` in view until `leave` is called
    pub fn pin(&mut self, id: SubjectId) {
        self.enter_as(id);
        self.pinned.insert(id);
    }

    pub fn leave(&mut self, id: SubjectId) {
        self.subjects.retain(|s| s.id != id);
        self.pinned.remove(&id);
    }

    pub fn is_visible(&self, id: SubjectId) -> bool {
        self.subjects.iter().any(|s| s.id == id)
    }

    pub fn visible(&self) -> Vec<SubjectId> {
        self.subjects.iter().map(|s| s.id).collect()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance one frame: apply churn, then observe everyone in view
    pub fn next_frame(&mut self) -> Vec<BodyObservation> {
        self.frame += 1;

        let leave_prob = self.config.leave_prob;
        let mut leaving = Vec::new();
        for subject in &self.subjects {
            if !self.pinned.contains(&subject.id) && self.rng.gen_bool(leave_prob) {
                leaving.push(subject.id);
            }
        }
        for id in leaving {
            self.leave(id);
        }

        if self.subjects.len() < self.config.max_subjects && self.rng.gen_bool(self.config.enter_prob) {
            self.enter();
        }

        let subjects = self.subjects.clone();
        subjects.iter().map(|s| self.observe(s)).collect()
    }

    fn observe(&mut self, subject: &SimSubject) -> BodyObservation {
        if self.rng.gen_bool(self.config.untracked_prob) {
            return BodyObservation::untracked(subject.id);
        }

        // Slow forward bend so trajectories are not constant
        let bend = 0.15 * (self.frame as f32 * 0.05 + subject.phase).sin();
        let mut observation = BodyObservation::new(subject.id);
        for &joint in JointType::all() {
            let (x, y) = rest_pose(joint);
            let lean = if y > 0.0 { bend * y } else { 0.0 };
            let jitter = self.config.jitter;
            let position = Point2D::new(
                subject.offset + x + lean + self.rng.gen_range(-jitter..=jitter),
                y + self.rng.gen_range(-jitter..=jitter),
            );
            let tracking = if self.rng.gen_bool(self.config.joint_dropout) {
                if self.rng.gen_bool(0.5) {
                    TrackingState::Inferred
                } else {
                    TrackingState::NotTracked
                }
            } else {
                TrackingState::Tracked
            };
            observation.set_joint(joint, Joint::new(position, tracking));
        }
        observation
    }
}

/// Standing pose in camera space, metres relative to the spine base
fn rest_pose(joint: JointType) -> (f32, f32) {
    match joint {
        JointType::SpineBase => (0.0, 0.0),
        JointType::SpineMid => (0.0, 0.3),
        JointType::SpineShoulder => (0.0, 0.5),
        JointType::Neck => (0.0, 0.58),
        JointType::Head => (0.0, 0.72),
        JointType::ShoulderLeft => (-0.18, 0.5),
        JointType::ElbowLeft => (-0.22, 0.22),
        JointType::WristLeft => (-0.24, -0.02),
        JointType::HandLeft => (-0.24, -0.08),
        JointType::HandTipLeft => (-0.24, -0.15),
        JointType::ThumbLeft => (-0.2, -0.1),
        JointType::ShoulderRight => (0.18, 0.5),
        JointType::ElbowRight => (0.22, 0.22),
        JointType::WristRight => (0.24, -0.02),
        JointType::HandRight => (0.24, -0.08),
        JointType::HandTipRight => (0.24, -0.15),
        JointType::ThumbRight => (0.2, -0.1),
        JointType::HipLeft => (-0.1, -0.02),
        JointType::KneeLeft => (-0.1, -0.45),
        JointType::AnkleLeft => (-0.1, -0.85),
        JointType::FootLeft => (-0.1, -0.9),
        JointType::HipRight => (0.1, -0.02),
        JointType::KneeRight => (0.1, -0.45),
        JointType::AnkleRight => (0.1, -0.85),
        JointType::FootRight => (0.1, -0.9),
    }
}
