#![doc = r"FLIP-style animation choreography core for reactive UI trees.

Captures participant geometry before a render-affecting mutation, lets the
host re-render, captures geometry again, and diffs the two snapshot sets
into per-context sprite changesets that transition runners play back."]

pub mod animator;
pub mod choreographer;
pub mod collections;
pub mod config;
pub mod geometry;
pub mod hash;
pub mod participant;
pub mod platform;
pub mod registry;
pub mod snapshot;
pub mod sprite;
pub mod transition;

pub use animator::{Animator, Changeset, ContextInfo, ModifierInfo};
pub use choreographer::{Choreographer, CyclePhase};
pub use config::{Easing, TransitionConfig};
pub use geometry::{Bounds, FrameDelta};
pub use participant::ParticipantManager;
pub use platform::{
    Measure, Measurement, Playback, PlaybackHandle, PlaybackOutcome, PlaybackRequest,
    RenderScheduler, StyleSample,
};
pub use registry::{ParticipantRegistry, RegistryChanges};
pub use snapshot::{Snapshot, SnapshotStore};
pub use sprite::{Sprite, SpriteKind};
pub use transition::{CancellationToken, RunOutcome, RunnerState, TransitionRunner};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an animation context, an animation boundary in the
/// UI tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of one animatable element. The id stays the same across
/// a single element's insert/move/remove lifetime; a conceptually different
/// element gets a fresh id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(u64);

impl ParticipantId {
    /// Allocates a fresh process-unique id.
    pub fn next() -> Self {
        Self(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by the choreography core.
///
/// Measurement misses and superseded cycles are recovered internally and
/// never reach this type; only failures that indicate a genuine host bug do.
#[derive(Debug, Error)]
pub enum ChoreoError {
    /// The playback primitive rejected for a reason other than cancellation.
    #[error("playback failed for participant {participant}: {reason}")]
    PlaybackFailed {
        participant: ParticipantId,
        reason: String,
    },
}
