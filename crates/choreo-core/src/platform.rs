//! Collaborator seams between the choreography core and its host UI
//! framework.
//!
//! These traits let the core delegate render scheduling, geometry
//! measurement and visual playback to the host, enabling integration with
//! different UI stacks (and deterministic doubles in tests) without the
//! core depending on any framework lifecycle directly.

use crate::config::TransitionConfig;
use crate::geometry::{Bounds, FrameDelta};
use crate::ParticipantId;

/// Style properties sampled alongside geometry, carried through to the
/// playback layer untouched.
pub type StyleSample = crate::collections::map::HashMap<String, String>;

/// Hook into the host's render loop.
pub trait RenderScheduler {
    /// Registers `callback` to run after the current synchronous UI update
    /// completes and layout is stable.
    ///
    /// The core registers at most one continuation per accepted
    /// render-cycle notification. Violating the "after layout settles"
    /// guarantee corrupts the geometric delta between the two snapshot
    /// phases.
    fn run_after_render_settles(&self, callback: Box<dyn FnOnce() + 'static>);
}

/// One synchronous geometry/style reading of a participant's element.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub bounds: Bounds,
    pub style: StyleSample,
}

/// Reads the current geometry of a participant's element.
pub trait Measure {
    /// Returns `None` when the participant is not currently attached or
    /// visible; the snapshot store records that as "no snapshot for this
    /// phase", never as an error.
    fn measure(&self, participant: ParticipantId) -> Option<Measurement>;
}

/// What a transition run asks the playback primitive to do for one sprite.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackRequest {
    /// Reconcile a geometry change: invert `delta`, then interpolate back
    /// to the final position.
    Move {
        participant: ParticipantId,
        from: Bounds,
        to: Bounds,
        delta: FrameDelta,
    },
    /// Entry treatment for an element with no prior geometry.
    Enter {
        participant: ParticipantId,
        to: Bounds,
    },
    /// Exit treatment for an element with no remaining geometry.
    Exit {
        participant: ParticipantId,
        from: Bounds,
    },
}

impl PlaybackRequest {
    pub fn participant(&self) -> ParticipantId {
        match self {
            PlaybackRequest::Move { participant, .. }
            | PlaybackRequest::Enter { participant, .. }
            | PlaybackRequest::Exit { participant, .. } => *participant,
        }
    }
}

/// Terminal settlement of one playback run.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
    /// The primitive rejected for a reason other than cancellation. This is
    /// fatal to the owning transition run and is surfaced, not swallowed.
    Failed(String),
}

/// Handle to an outstanding playback run.
pub trait PlaybackHandle {
    /// Stops the run. Implementations must snap the element to its final
    /// geometry and settle the callback with [`PlaybackOutcome::Cancelled`]
    /// if it has not settled yet; cancelling a settled run is a no-op.
    fn cancel(&self);
}

/// Drives the visual interpolation for one sprite.
pub trait Playback {
    /// Starts playback for `request` and returns a cancellation handle.
    /// `on_settled` must be invoked exactly once.
    fn animate(
        &self,
        request: PlaybackRequest,
        config: TransitionConfig,
        on_settled: Box<dyn FnOnce(PlaybackOutcome) + 'static>,
    ) -> Box<dyn PlaybackHandle>;
}
