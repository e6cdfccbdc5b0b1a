//! Two-phase geometry/style retention for the cycle in flight.

use crate::collections::map::HashMap;
use crate::geometry::Bounds;
use crate::hash;
use crate::platform::{Measure, StyleSample};
use crate::{ContextId, ParticipantId};

/// Immutable record of one participant's geometry and style at one instant,
/// together with the context it was owned by at capture time.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub context: ContextId,
    pub bounds: Bounds,
    pub style: StyleSample,
}

impl Snapshot {
    /// Order-independent fingerprint of the sampled style properties, used
    /// for cheap change detection.
    pub fn style_fingerprint(&self) -> u64 {
        let mut pairs: Vec<(&str, &str)> = self
            .style
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        pairs.sort_unstable();
        hash::hash_one(&pairs)
    }
}

/// Retains the before/after snapshot sets for one cycle, keyed by
/// participant identity. A participant holds at most one snapshot per
/// phase; both phases are cleared before the next cycle's before-capture.
#[derive(Default)]
pub struct SnapshotStore {
    before: HashMap<ParticipantId, Snapshot>,
    after: HashMap<ParticipantId, Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all retained snapshots from the previous cycle.
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
    }

    /// Captures the before-phase reading for each given participant. A
    /// participant the measurer cannot read (detached element) simply gets
    /// no snapshot for the phase.
    pub fn capture_before<I>(&mut self, participants: I, measure: &dyn Measure)
    where
        I: IntoIterator<Item = (ParticipantId, ContextId)>,
    {
        Self::capture_into(&mut self.before, participants, measure);
    }

    /// Captures the after-phase reading for each given participant.
    pub fn capture_after<I>(&mut self, participants: I, measure: &dyn Measure)
    where
        I: IntoIterator<Item = (ParticipantId, ContextId)>,
    {
        Self::capture_into(&mut self.after, participants, measure);
    }

    fn capture_into<I>(
        phase: &mut HashMap<ParticipantId, Snapshot>,
        participants: I,
        measure: &dyn Measure,
    ) where
        I: IntoIterator<Item = (ParticipantId, ContextId)>,
    {
        for (participant, context) in participants {
            if let Some(measurement) = measure.measure(participant) {
                phase.insert(
                    participant,
                    Snapshot {
                        context,
                        bounds: measurement.bounds,
                        style: measurement.style,
                    },
                );
            }
        }
    }

    pub fn before(&self, participant: ParticipantId) -> Option<&Snapshot> {
        self.before.get(&participant)
    }

    pub fn after(&self, participant: ParticipantId) -> Option<&Snapshot> {
        self.after.get(&participant)
    }

    /// Every participant identity seen in either phase, in ascending id
    /// order so downstream diffing is independent of capture order.
    pub fn seen_participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self.before.keys().copied().collect();
        for id in self.after.keys() {
            if !self.before.contains_key(id) {
                ids.push(*id);
            }
        }
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}
