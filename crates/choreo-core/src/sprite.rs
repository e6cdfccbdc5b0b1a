//! The typed result of diffing one participant across a render cycle.

use crate::geometry::FrameDelta;
use crate::snapshot::Snapshot;
use crate::{ContextId, ParticipantId};

/// Lifecycle category of a sprite within one cycle, fully determined by
/// which snapshot phases hold the participant and whether the owning
/// context changed between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpriteKind {
    /// Present only in the after-phase.
    Inserted,
    /// Present only in the before-phase.
    Removed,
    /// Present in both phases under the same context.
    Kept,
    /// Present in both phases under different contexts.
    Sent,
}

/// One participant's categorized geometry delta for a single cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    participant: ParticipantId,
    kind: SpriteKind,
    before: Option<Snapshot>,
    after: Option<Snapshot>,
}

impl Sprite {
    /// Categorizes a participant from its two phase snapshots. Returns
    /// `None` when neither phase holds a snapshot, since such a participant
    /// never produces a sprite.
    pub fn from_phases(
        participant: ParticipantId,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Option<Self> {
        let kind = match (&before, &after) {
            (None, None) => return None,
            (None, Some(_)) => SpriteKind::Inserted,
            (Some(_), None) => SpriteKind::Removed,
            (Some(b), Some(a)) if b.context == a.context => SpriteKind::Kept,
            (Some(_), Some(_)) => SpriteKind::Sent,
        };
        Some(Self {
            participant,
            kind,
            before,
            after,
        })
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn kind(&self) -> SpriteKind {
        self.kind
    }

    pub fn before(&self) -> Option<&Snapshot> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Snapshot> {
        self.after.as_ref()
    }

    pub fn before_context(&self) -> Option<ContextId> {
        self.before.as_ref().map(|snapshot| snapshot.context)
    }

    pub fn after_context(&self) -> Option<ContextId> {
        self.after.as_ref().map(|snapshot| snapshot.context)
    }

    /// Geometric delta between the two phases, when both are present.
    pub fn frame_delta(&self) -> Option<FrameDelta> {
        match (&self.before, &self.after) {
            (Some(b), Some(a)) => Some(b.bounds.delta_to(&a.bounds)),
            _ => None,
        }
    }

    /// A kept sprite whose geometry and style did not change has nothing to
    /// reconcile and is skipped by transition runs.
    pub fn is_visual_noop(&self) -> bool {
        if self.kind != SpriteKind::Kept {
            return false;
        }
        match (&self.before, &self.after) {
            (Some(b), Some(a)) => {
                b.bounds == a.bounds && b.style_fingerprint() == a.style_fingerprint()
            }
            _ => false,
        }
    }

    /// Assignment policy: a sprite belongs to a context when either of its
    /// phases was captured under it; a sent sprite therefore belongs to
    /// both its source and destination context.
    pub fn belongs_to(&self, context: ContextId) -> bool {
        self.before_context() == Some(context) || self.after_context() == Some(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::platform::StyleSample;

    fn snapshot(context: ContextId, bounds: Bounds) -> Snapshot {
        Snapshot {
            context,
            bounds,
            style: StyleSample::default(),
        }
    }

    #[test]
    fn category_follows_phase_presence() {
        let context = ContextId::next();
        let at_origin = snapshot(context, Bounds::default());

        let inserted =
            Sprite::from_phases(ParticipantId::next(), None, Some(at_origin.clone())).unwrap();
        assert_eq!(inserted.kind(), SpriteKind::Inserted);
        assert!(inserted.before().is_none());

        let removed =
            Sprite::from_phases(ParticipantId::next(), Some(at_origin.clone()), None).unwrap();
        assert_eq!(removed.kind(), SpriteKind::Removed);
        assert!(removed.after().is_none());

        let kept = Sprite::from_phases(
            ParticipantId::next(),
            Some(at_origin.clone()),
            Some(snapshot(context, Bounds::new(5.0, 5.0, 0.0, 0.0))),
        )
        .unwrap();
        assert_eq!(kept.kind(), SpriteKind::Kept);

        assert!(Sprite::from_phases(ParticipantId::next(), None, None).is_none());
    }

    #[test]
    fn context_change_makes_a_sent_sprite() {
        let source = ContextId::next();
        let destination = ContextId::next();
        let sprite = Sprite::from_phases(
            ParticipantId::next(),
            Some(snapshot(source, Bounds::new(0.0, 0.0, 10.0, 10.0))),
            Some(snapshot(destination, Bounds::new(100.0, 0.0, 10.0, 10.0))),
        )
        .unwrap();

        assert_eq!(sprite.kind(), SpriteKind::Sent);
        assert!(sprite.belongs_to(source));
        assert!(sprite.belongs_to(destination));
        let delta = sprite.frame_delta().unwrap();
        assert_eq!(delta.dx, 100.0);
        assert_eq!(delta.dy, 0.0);
    }

    #[test]
    fn unchanged_kept_sprite_is_a_visual_noop() {
        let context = ContextId::next();
        let still = Bounds::new(1.0, 2.0, 3.0, 4.0);
        let sprite = Sprite::from_phases(
            ParticipantId::next(),
            Some(snapshot(context, still)),
            Some(snapshot(context, still)),
        )
        .unwrap();
        assert!(sprite.is_visual_noop());
    }

    #[test]
    fn style_change_defeats_the_noop_check() {
        let context = ContextId::next();
        let still = Bounds::new(1.0, 2.0, 3.0, 4.0);
        let before = snapshot(context, still);
        let mut after = snapshot(context, still);
        after.style.insert("opacity".into(), "0.5".into());

        let sprite =
            Sprite::from_phases(ParticipantId::next(), Some(before), Some(after)).unwrap();
        assert!(!sprite.is_visual_noop());
    }

    #[test]
    fn removed_sprite_is_never_a_noop() {
        let context = ContextId::next();
        let sprite = Sprite::from_phases(
            ParticipantId::next(),
            Some(snapshot(context, Bounds::default())),
            None,
        )
        .unwrap();
        assert!(!sprite.is_visual_noop());
    }
}
