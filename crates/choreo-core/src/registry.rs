//! Render-cycle participant registration buffers.
//!
//! Data here is relevant for exactly one render cycle and is handed out
//! wholesale by [`ParticipantRegistry::drain_and_clear`]; the participant
//! manager folds it into the live tables when the cycle is processed.

use std::cell::RefCell;
use std::mem;

use crate::animator::{ContextInfo, ModifierInfo};
use crate::collections::map::HashMap;
use crate::{ContextId, ParticipantId};

/// Buffers of contexts and sprite modifiers inserted or removed since the
/// last processed cycle.
///
/// Registration methods take `&self`: external mount/unmount code may call
/// them at any time, including while a drain is in progress elsewhere in
/// the same tick. The drain swaps the buffers out whole, so a registration
/// lands in exactly one cycle's set.
#[derive(Default)]
pub struct ParticipantRegistry {
    inserted_contexts: RefCell<HashMap<ContextId, ContextInfo>>,
    removed_contexts: RefCell<HashMap<ContextId, ContextInfo>>,
    inserted_modifiers: RefCell<HashMap<ParticipantId, ModifierInfo>>,
    removed_modifiers: RefCell<HashMap<ParticipantId, ModifierInfo>>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a context mount. Duplicate registrations collapse.
    pub fn register_context(&self, context: ContextInfo) {
        self.inserted_contexts
            .borrow_mut()
            .insert(context.id, context);
    }

    /// Records a context unmount.
    pub fn unregister_context(&self, context: ContextInfo) {
        self.removed_contexts
            .borrow_mut()
            .insert(context.id, context);
    }

    /// Records a sprite-modifier mount. Duplicate registrations collapse.
    pub fn register_sprite_modifier(&self, modifier: ModifierInfo) {
        self.inserted_modifiers
            .borrow_mut()
            .insert(modifier.id, modifier);
    }

    /// Records a sprite-modifier unmount.
    pub fn unregister_sprite_modifier(&self, modifier: ModifierInfo) {
        self.removed_modifiers
            .borrow_mut()
            .insert(modifier.id, modifier);
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_contexts.borrow().is_empty()
            && self.removed_contexts.borrow().is_empty()
            && self.inserted_modifiers.borrow().is_empty()
            && self.removed_modifiers.borrow().is_empty()
    }

    /// Returns the four pending sets and atomically replaces them with
    /// empty buffers. A registration arriving after the drain accrues to
    /// the next cycle's sets, never the one just drained.
    pub fn drain_and_clear(&self) -> RegistryChanges {
        RegistryChanges {
            inserted_contexts: mem::take(&mut *self.inserted_contexts.borrow_mut()),
            removed_contexts: mem::take(&mut *self.removed_contexts.borrow_mut()),
            inserted_modifiers: mem::take(&mut *self.inserted_modifiers.borrow_mut()),
            removed_modifiers: mem::take(&mut *self.removed_modifiers.borrow_mut()),
        }
    }
}

/// One cycle's drained registration deltas.
#[derive(Default)]
pub struct RegistryChanges {
    pub inserted_contexts: HashMap<ContextId, ContextInfo>,
    pub removed_contexts: HashMap<ContextId, ContextInfo>,
    pub inserted_modifiers: HashMap<ParticipantId, ModifierInfo>,
    pub removed_modifiers: HashMap<ParticipantId, ModifierInfo>,
}

impl RegistryChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted_contexts.is_empty()
            && self.removed_contexts.is_empty()
            && self.inserted_modifiers.is_empty()
            && self.removed_modifiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modifier() -> ModifierInfo {
        ModifierInfo::new(ParticipantId::next(), ContextId::next())
    }

    #[test]
    fn duplicate_registrations_collapse() {
        let registry = ParticipantRegistry::new();
        let m = modifier();
        registry.register_sprite_modifier(m);
        registry.register_sprite_modifier(m);

        let changes = registry.drain_and_clear();
        assert_eq!(changes.inserted_modifiers.len(), 1);
    }

    #[test]
    fn drain_empties_all_buffers() {
        let registry = ParticipantRegistry::new();
        let context = ContextInfo::new(ContextId::next());
        registry.register_context(context);
        registry.unregister_context(context);
        registry.register_sprite_modifier(modifier());
        registry.unregister_sprite_modifier(modifier());
        assert!(!registry.is_empty());

        let changes = registry.drain_and_clear();
        assert!(!changes.is_empty());
        assert!(registry.is_empty());
        assert!(registry.drain_and_clear().is_empty());
    }

    #[test]
    fn post_drain_registration_accrues_to_the_next_cycle() {
        let registry = ParticipantRegistry::new();
        let first = modifier();
        registry.register_sprite_modifier(first);

        let drained = registry.drain_and_clear();
        let second = modifier();
        registry.register_sprite_modifier(second);

        assert!(drained.inserted_modifiers.contains_key(&first.id));
        assert!(!drained.inserted_modifiers.contains_key(&second.id));

        let next = registry.drain_and_clear();
        assert!(next.inserted_modifiers.contains_key(&second.id));
        assert!(!next.inserted_modifiers.contains_key(&first.id));
    }

    #[test]
    fn register_and_unregister_land_in_separate_sets() {
        let registry = ParticipantRegistry::new();
        let m = modifier();
        registry.register_sprite_modifier(m);
        registry.unregister_sprite_modifier(m);

        let changes = registry.drain_and_clear();
        assert!(changes.inserted_modifiers.contains_key(&m.id));
        assert!(changes.removed_modifiers.contains_key(&m.id));
    }
}
