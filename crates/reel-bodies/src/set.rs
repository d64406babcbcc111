//! Tracked body set

use std::collections::{HashMap, HashSet};

use reel_core::{BodyObservation, SubjectId};
use tracing::debug;

/// A subject visible in the most recent frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedBodyHandle {
    /// Stable identity
    pub id: SubjectId,
    /// Display label derived from the identity
    pub label: String,
    /// Present in the most recent frame
    pub live: bool,
    /// Body-level tracked flag from the most recent frame
    pub tracked: bool,
    /// Frame number of first appearance
    pub first_seen: u64,
    /// Frame number of latest appearance
    pub last_seen: u64,
}

impl TrackedBodyHandle {
    fn new(observation: &BodyObservation, frame: u64) -> Self {
        Self {
            id: observation.id,
            label: observation.id.label(),
            live: true,
            tracked: observation.is_tracked,
            first_seen: frame,
            last_seen: frame,
        }
    }

    /// Frames this subject has been visible for
    pub fn frames_visible(&self) -> u64 {
        self.last_seen - self.first_seen + 1
    }
}

/// Identity-set difference produced by one update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyDelta {
    /// New identities, in acquisition order
    pub added: Vec<SubjectId>,
    /// Identities gone since the previous update, in previous order
    pub removed: Vec<SubjectId>,
}

impl BodyDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn was_removed(&self, id: SubjectId) -> bool {
        self.removed.contains(&id)
    }
}

/// Update statistics
#[derive(Debug, Clone, Default)]
pub struct BodySetStats {
    pub updates: u64,
    pub added: u64,
    pub removed: u64,
    /// Observations dropped because their identity repeated within a frame
    pub duplicates: u64,
}

/// Currently visible subjects, keyed by identity
#[derive(Debug, Default)]
pub struct TrackedBodySet {
    /// Live handles in acquisition order of the latest update
    handles: Vec<TrackedBodyHandle>,
    /// Latest observation per live identity
    observations: HashMap<SubjectId, BodyObservation>,
    /// Frame counter
    frame: u64,
    stats: BodySetStats,
}

impl TrackedBodySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set with the bodies of one frame.
    /// The first observation wins if an identity repeats within the frame.
    pub fn update(&mut self, bodies: &[BodyObservation]) -> BodyDelta {
        self.frame += 1;
        self.stats.updates += 1;

        let mut seen = HashSet::with_capacity(bodies.len());
        let previous_order: Vec<SubjectId> = self.handles.iter().map(|h| h.id).collect();
        let mut previous: HashMap<SubjectId, TrackedBodyHandle> =
            self.handles.drain(..).map(|h| (h.id, h)).collect();

        let mut delta = BodyDelta::default();
        let mut observations = HashMap::with_capacity(bodies.len());

        for body in bodies {
            if !seen.insert(body.id) {
                self.stats.duplicates += 1;
                continue;
            }

            let handle = match previous.remove(&body.id) {
                Some(mut handle) => {
                    handle.tracked = body.is_tracked;
                    handle.last_seen = self.frame;
                    handle
                }
                None => {
                    delta.added.push(body.id);
                    TrackedBodyHandle::new(body, self.frame)
                }
            };
            self.handles.push(handle);
            observations.insert(body.id, body.clone());
        }

        delta.removed = previous_order
            .into_iter()
            .filter(|id| previous.contains_key(id))
            .collect();
        self.observations = observations;

        self.stats.added += delta.added.len() as u64;
        self.stats.removed += delta.removed.len() as u64;

        for id in &delta.added {
            debug!(subject = %id, label = %id.label(), "subject appeared");
        }
        for id in &delta.removed {
            debug!(subject = %id, "subject removed");
        }

        delta
    }

    /// Drop every handle (e.g. when playback stops)
    pub fn clear(&mut self) -> BodyDelta {
        let removed: Vec<SubjectId> = self.handles.drain(..).map(|h| h.id).collect();
        self.observations.clear();
        self.stats.removed += removed.len() as u64;
        BodyDelta {
            added: Vec::new(),
            removed,
        }
    }

    /// Get handle by identity
    pub fn get(&self, id: SubjectId) -> Option<&TrackedBodyHandle> {
        self.handles.iter().find(|h| h.id == id)
    }

    /// Latest raw observation for a live identity
    pub fn observation(&self, id: SubjectId) -> Option<&BodyObservation> {
        self.observations.get(&id)
    }

    pub fn is_live(&self, id: SubjectId) -> bool {
        self.observations.contains_key(&id)
    }

    /// Live handles in acquisition order
    pub fn handles(&self) -> &[TrackedBodyHandle] {
        &self.handles
    }

    pub fn live_ids(&self) -> Vec<SubjectId> {
        self.handles.iter().map(|h| h.id).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of updates applied
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> &BodySetStats {
        &self.stats
    }
}
