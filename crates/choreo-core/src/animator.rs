//! Per-context aggregation of a cycle's sprites into playable changesets,
//! plus the registration token types external UI code hands to the
//! choreographer.

use crate::config::TransitionConfig;
use crate::sprite::Sprite;
use crate::{ContextId, ParticipantId};

/// Registration token for an animation context.
///
/// The parent relation is an identifier, never an ownership edge, so a
/// context's destruction does not require visiting its children.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextInfo {
    pub id: ContextId,
    pub parent: Option<ContextId>,
    /// Opaque to the core; delivered to the playback primitive untouched.
    pub config: Option<TransitionConfig>,
}

impl ContextInfo {
    pub fn new(id: ContextId) -> Self {
        Self {
            id,
            parent: None,
            config: None,
        }
    }

    pub fn with_parent(mut self, parent: ContextId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_config(mut self, config: TransitionConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Registration token for one animatable element. The context field is a
/// back-reference resolved through the participant manager's lookup
/// tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifierInfo {
    pub id: ParticipantId,
    pub context: ContextId,
}

impl ModifierInfo {
    pub fn new(id: ParticipantId, context: ContextId) -> Self {
        Self { id, context }
    }
}

/// Per-context accumulator that receives a cycle's full sprite set and
/// produces the changeset its transition runner executes.
pub struct Animator {
    context: ContextInfo,
    sprites: Vec<Sprite>,
}

impl Animator {
    pub fn new(context: ContextInfo) -> Self {
        Self {
            context,
            sprites: Vec::new(),
        }
    }

    pub fn context(&self) -> &ContextInfo {
        &self.context
    }

    /// Assigns the subset of `sprites` relevant to this context: a sprite
    /// belongs here when either of its phases was captured under this
    /// context, so a sprite sent across a boundary lands in both the source
    /// and the destination animator.
    pub fn handle_sprites(&mut self, sprites: &[Sprite]) {
        self.sprites = sprites
            .iter()
            .filter(|sprite| sprite.belongs_to(self.context.id))
            .cloned()
            .collect();
    }

    /// Produces the immutable changeset for this cycle. Pure: repeated
    /// calls with the same assigned sprites yield equal changesets.
    pub fn to_changeset(&self) -> Changeset {
        Changeset {
            context: self.context,
            sprites: self.sprites.clone(),
        }
    }
}

/// The finalized bundle of sprites one transition runner executes for one
/// context. Built fresh every cycle and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Changeset {
    context: ContextInfo,
    sprites: Vec<Sprite>,
}

impl Changeset {
    pub fn context(&self) -> &ContextInfo {
        &self.context
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    /// True when at least one sprite needs visual reconciliation. Kept
    /// sprites whose geometry and style did not change do not count.
    pub fn has_sprites(&self) -> bool {
        self.sprites.iter().any(|sprite| !sprite.is_visual_noop())
    }
}
