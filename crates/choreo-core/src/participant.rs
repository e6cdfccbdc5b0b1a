//! Live participant bookkeeping and the before/after diff.

use indexmap::IndexMap;

use crate::animator::{Animator, ContextInfo, ModifierInfo};
use crate::collections::map::HashMap;
use crate::platform::Measure;
use crate::registry::RegistryChanges;
use crate::snapshot::SnapshotStore;
use crate::sprite::Sprite;
use crate::{ContextId, ParticipantId};

/// Tracks the contexts and sprite modifiers alive across render cycles and
/// diffs their before/after snapshots into sprites and per-context
/// animators.
///
/// Removed entries are retained in "departed" tables for exactly the cycle
/// being processed, then forgotten.
#[derive(Default)]
pub struct ParticipantManager {
    contexts: HashMap<ContextId, ContextInfo>,
    modifiers: HashMap<ParticipantId, ModifierInfo>,
    departed_contexts: HashMap<ContextId, ContextInfo>,
    departed_modifiers: HashMap<ParticipantId, ModifierInfo>,
    snapshots: SnapshotStore,
}

impl ParticipantManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the previous cycle's snapshots. Must run before the next
    /// before-capture.
    pub fn clear_snapshots(&mut self) {
        self.snapshots.clear();
    }

    /// Folds one cycle's drained registry deltas into the live tables.
    /// Pure bookkeeping: runs whether or not any transition results.
    ///
    /// A brand-new identity that was both registered and unregistered
    /// within the cycle is net-zero. A live identity that was unregistered
    /// and re-registered is a re-parent: its entry is updated in place and
    /// the sent categorization falls out of the snapshot contexts.
    pub fn update_participants(&mut self, changes: RegistryChanges) {
        self.departed_contexts.clear();
        self.departed_modifiers.clear();

        for (id, info) in &changes.inserted_contexts {
            if changes.removed_contexts.contains_key(id) && !self.contexts.contains_key(id) {
                continue;
            }
            self.contexts.insert(*id, *info);
        }
        for id in changes.removed_contexts.keys() {
            if changes.inserted_contexts.contains_key(id) {
                continue;
            }
            if let Some(info) = self.contexts.remove(id) {
                self.departed_contexts.insert(*id, info);
            }
        }

        for (id, info) in &changes.inserted_modifiers {
            if changes.removed_modifiers.contains_key(id) && !self.modifiers.contains_key(id) {
                continue;
            }
            self.modifiers.insert(*id, *info);
        }
        for id in changes.removed_modifiers.keys() {
            if changes.inserted_modifiers.contains_key(id) {
                continue;
            }
            if let Some(info) = self.modifiers.remove(id) {
                self.departed_modifiers.insert(*id, info);
            }
        }
    }

    /// Captures the before-phase for every currently live modifier. Called
    /// synchronously when a cycle is notified, before this cycle's deltas
    /// are folded, so participants about to be removed are still measured.
    pub fn snapshot_before_render(&mut self, measure: &dyn Measure) {
        let participants: Vec<(ParticipantId, ContextId)> = self
            .modifiers
            .values()
            .map(|modifier| (modifier.id, modifier.context))
            .collect();
        self.snapshots.capture_before(participants, measure);
    }

    /// Captures the after-phase for every live modifier once the render has
    /// settled and this cycle's deltas are folded.
    pub fn snapshot_after_render(&mut self, measure: &dyn Measure) {
        let participants: Vec<(ParticipantId, ContextId)> = self
            .modifiers
            .values()
            .map(|modifier| (modifier.id, modifier.context))
            .collect();
        self.snapshots.capture_after(participants, measure);
    }

    /// Diffs the two snapshot phases into sprites and builds one animator
    /// per live context with at least one relevant sprite.
    ///
    /// Pure with respect to its inputs: sprites come out in ascending
    /// participant-id order and animators in ascending context-id order, so
    /// the result never depends on registration order.
    pub fn create_animators_and_sprites(&self) -> (Vec<Sprite>, Vec<Animator>) {
        let mut sprites = Vec::new();
        for id in self.snapshots.seen_participants() {
            let before = self.snapshots.before(id).cloned();
            let after = self.snapshots.after(id).cloned();
            if let Some(sprite) = Sprite::from_phases(id, before, after) {
                sprites.push(sprite);
            }
        }

        // Only live contexts can host a transition; a removed sprite whose
        // context also left the tree has nowhere to play.
        let mut grouped: IndexMap<ContextId, usize> = IndexMap::new();
        for sprite in &sprites {
            let before_context = sprite.before_context();
            let mut after_context = sprite.after_context();
            if after_context == before_context {
                after_context = None;
            }
            for context in [before_context, after_context].into_iter().flatten() {
                if !self.contexts.contains_key(&context) {
                    continue;
                }
                *grouped.entry(context).or_insert(0) += 1;
            }
        }

        let mut relevant: Vec<ContextId> = grouped.keys().copied().collect();
        relevant.sort_unstable();
        let animators = relevant
            .into_iter()
            .map(|context| Animator::new(self.contexts[&context]))
            .collect();

        (sprites, animators)
    }

    pub fn live_context(&self, id: ContextId) -> Option<&ContextInfo> {
        self.contexts.get(&id)
    }

    pub fn live_modifier(&self, id: ParticipantId) -> Option<&ModifierInfo> {
        self.modifiers.get(&id)
    }

    pub fn is_tracked(&self, id: ParticipantId) -> bool {
        self.modifiers.contains_key(&id)
    }

    pub fn live_participant_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Trace-level dump of the live and departed sets for debugging a
    /// misbehaving cycle.
    pub fn log_participants(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let mut contexts: Vec<ContextId> = self.contexts.keys().copied().collect();
        contexts.sort_unstable();
        let mut modifiers: Vec<ParticipantId> = self.modifiers.keys().copied().collect();
        modifiers.sort_unstable();
        log::trace!(
            "participants: contexts={contexts:?} modifiers={modifiers:?} departed_contexts={} departed_modifiers={}",
            self.departed_contexts.len(),
            self.departed_modifiers.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::platform::{Measurement, StyleSample};
    use crate::registry::ParticipantRegistry;
    use crate::sprite::SpriteKind;
    use std::cell::RefCell;

    #[derive(Default)]
    struct TableMeasure {
        bounds: RefCell<HashMap<ParticipantId, Bounds>>,
    }

    impl TableMeasure {
        fn place(&self, participant: ParticipantId, bounds: Bounds) {
            self.bounds.borrow_mut().insert(participant, bounds);
        }

        fn remove(&self, participant: ParticipantId) {
            self.bounds.borrow_mut().remove(&participant);
        }
    }

    impl Measure for TableMeasure {
        fn measure(&self, participant: ParticipantId) -> Option<Measurement> {
            self.bounds
                .borrow()
                .get(&participant)
                .map(|bounds| Measurement {
                    bounds: *bounds,
                    style: StyleSample::default(),
                })
        }
    }

    fn changes_with(registry: &ParticipantRegistry) -> RegistryChanges {
        registry.drain_and_clear()
    }

    #[test]
    fn insert_then_remove_before_processing_is_net_zero() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let modifier = ModifierInfo::new(ParticipantId::next(), ContextId::next());

        registry.register_sprite_modifier(modifier);
        registry.unregister_sprite_modifier(modifier);
        manager.update_participants(changes_with(&registry));

        assert!(!manager.is_tracked(modifier.id));
        assert_eq!(manager.live_participant_count(), 0);
    }

    #[test]
    fn remove_then_reinsert_is_a_reparent() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let source = ContextId::next();
        let destination = ContextId::next();
        let id = ParticipantId::next();

        registry.register_sprite_modifier(ModifierInfo::new(id, source));
        manager.update_participants(changes_with(&registry));
        assert_eq!(manager.live_modifier(id).unwrap().context, source);

        registry.unregister_sprite_modifier(ModifierInfo::new(id, source));
        registry.register_sprite_modifier(ModifierInfo::new(id, destination));
        manager.update_participants(changes_with(&registry));

        assert_eq!(manager.live_modifier(id).unwrap().context, destination);
        assert_eq!(manager.live_participant_count(), 1);
    }

    #[test]
    fn removal_is_remembered_for_one_cycle_only() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let modifier = ModifierInfo::new(ParticipantId::next(), ContextId::next());

        registry.register_sprite_modifier(modifier);
        manager.update_participants(changes_with(&registry));
        registry.unregister_sprite_modifier(modifier);
        manager.update_participants(changes_with(&registry));
        assert_eq!(manager.departed_modifiers.len(), 1);

        manager.update_participants(RegistryChanges::default());
        assert!(manager.departed_modifiers.is_empty());
    }

    #[test]
    fn quiet_cycle_produces_only_noop_changesets() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let measure = TableMeasure::default();

        let context = ContextId::next();
        let id = ParticipantId::next();
        measure.place(id, Bounds::new(0.0, 0.0, 10.0, 10.0));
        registry.register_context(ContextInfo::new(context));
        registry.register_sprite_modifier(ModifierInfo::new(id, context));
        manager.update_participants(changes_with(&registry));

        // A cycle where nothing moved.
        manager.clear_snapshots();
        manager.snapshot_before_render(&measure);
        manager.update_participants(changes_with(&registry));
        manager.snapshot_after_render(&measure);

        let (sprites, mut animators) = manager.create_animators_and_sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].kind(), SpriteKind::Kept);
        assert!(sprites[0].is_visual_noop());

        let mut with_content = 0;
        for animator in animators.iter_mut() {
            animator.handle_sprites(&sprites);
            if animator.to_changeset().has_sprites() {
                with_content += 1;
            }
        }
        assert_eq!(with_content, 0);
    }

    #[test]
    fn removed_participant_yields_a_before_only_sprite() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let measure = TableMeasure::default();

        let context = ContextId::next();
        let id = ParticipantId::next();
        measure.place(id, Bounds::new(2.0, 2.0, 4.0, 4.0));
        registry.register_context(ContextInfo::new(context));
        registry.register_sprite_modifier(ModifierInfo::new(id, context));
        manager.update_participants(changes_with(&registry));

        // The element unmounts; the before-capture still sees it, the
        // after-capture does not.
        registry.unregister_sprite_modifier(ModifierInfo::new(id, context));
        manager.clear_snapshots();
        manager.snapshot_before_render(&measure);
        measure.remove(id);
        manager.update_participants(changes_with(&registry));
        manager.snapshot_after_render(&measure);

        let (sprites, animators) = manager.create_animators_and_sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].kind(), SpriteKind::Removed);
        assert!(sprites[0].before().is_some());
        assert!(sprites[0].after().is_none());
        assert_eq!(animators.len(), 1);
        assert_eq!(animators[0].context().id, context);
    }

    #[test]
    fn reparented_participant_yields_a_sent_sprite_for_both_contexts() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let measure = TableMeasure::default();

        let source = ContextId::next();
        let destination = ContextId::next();
        let id = ParticipantId::next();
        measure.place(id, Bounds::new(0.0, 0.0, 10.0, 10.0));
        registry.register_context(ContextInfo::new(source));
        registry.register_context(ContextInfo::new(destination));
        registry.register_sprite_modifier(ModifierInfo::new(id, source));
        manager.update_participants(changes_with(&registry));

        registry.unregister_sprite_modifier(ModifierInfo::new(id, source));
        registry.register_sprite_modifier(ModifierInfo::new(id, destination));
        manager.clear_snapshots();
        manager.snapshot_before_render(&measure);
        measure.place(id, Bounds::new(100.0, 0.0, 10.0, 10.0));
        manager.update_participants(changes_with(&registry));
        manager.snapshot_after_render(&measure);

        let (sprites, animators) = manager.create_animators_and_sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].kind(), SpriteKind::Sent);
        let delta = sprites[0].frame_delta().unwrap();
        assert_eq!((delta.dx, delta.dy), (100.0, 0.0));

        let contexts: Vec<ContextId> = animators
            .iter()
            .map(|animator| animator.context().id)
            .collect();
        assert_eq!(contexts, vec![source, destination]);
    }

    #[test]
    fn diff_ignores_registration_order() {
        let measure = TableMeasure::default();
        let context = ContextId::next();
        let a = ParticipantId::next();
        let b = ParticipantId::next();
        measure.place(a, Bounds::new(0.0, 0.0, 1.0, 1.0));
        measure.place(b, Bounds::new(5.0, 0.0, 1.0, 1.0));

        let run = |first: ParticipantId, second: ParticipantId| {
            let registry = ParticipantRegistry::new();
            let mut manager = ParticipantManager::new();
            registry.register_context(ContextInfo::new(context));
            registry.register_sprite_modifier(ModifierInfo::new(first, context));
            registry.register_sprite_modifier(ModifierInfo::new(second, context));
            manager.clear_snapshots();
            manager.snapshot_before_render(&measure);
            manager.update_participants(registry.drain_and_clear());
            manager.snapshot_after_render(&measure);
            let (sprites, _) = manager.create_animators_and_sprites();
            sprites
                .iter()
                .map(|sprite| sprite.participant())
                .collect::<Vec<_>>()
        };

        assert_eq!(run(a, b), run(b, a));
    }

    #[test]
    fn sprite_for_a_departed_context_gets_no_animator() {
        let registry = ParticipantRegistry::new();
        let mut manager = ParticipantManager::new();
        let measure = TableMeasure::default();

        let context = ContextId::next();
        let id = ParticipantId::next();
        measure.place(id, Bounds::default());
        registry.register_context(ContextInfo::new(context));
        registry.register_sprite_modifier(ModifierInfo::new(id, context));
        manager.update_participants(changes_with(&registry));

        // Context and element unmount together.
        registry.unregister_context(ContextInfo::new(context));
        registry.unregister_sprite_modifier(ModifierInfo::new(id, context));
        manager.clear_snapshots();
        manager.snapshot_before_render(&measure);
        measure.remove(id);
        manager.update_participants(changes_with(&registry));
        manager.snapshot_after_render(&measure);

        let (sprites, animators) = manager.create_animators_and_sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].kind(), SpriteKind::Removed);
        assert!(animators.is_empty());
    }
}
