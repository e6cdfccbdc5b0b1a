//! Executes one context's changeset against the playback collaborator.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::animator::Changeset;
use crate::platform::{Playback, PlaybackHandle, PlaybackOutcome, PlaybackRequest};
use crate::sprite::{Sprite, SpriteKind};
use crate::{ChoreoError, ParticipantId};

/// Cooperative cancellation flag threaded through a transition run and
/// checked at every suspension point.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Lifecycle of one transition run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// How a finished run resolved. Playback failure is reported separately,
/// through the `Err` arm of the completion callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

type DoneCallback = Box<dyn FnOnce(Result<RunOutcome, ChoreoError>) + 'static>;

/// Drives the playback primitive concurrently for every sprite in one
/// changeset and resolves exactly once, when all of them settle or the run
/// is cancelled.
pub struct TransitionRunner {
    inner: Rc<RunnerInner>,
}

struct RunnerInner {
    playback: Rc<dyn Playback>,
    token: CancellationToken,
    state: Cell<RunnerState>,
    outstanding: Cell<usize>,
    saw_cancelled: Cell<bool>,
    failure: RefCell<Option<ChoreoError>>,
    handles: RefCell<Vec<Box<dyn PlaybackHandle>>>,
    on_done: RefCell<Option<DoneCallback>>,
}

impl Clone for TransitionRunner {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl TransitionRunner {
    pub fn new(playback: Rc<dyn Playback>) -> Self {
        Self {
            inner: Rc::new(RunnerInner {
                playback,
                token: CancellationToken::new(),
                state: Cell::new(RunnerState::Idle),
                outstanding: Cell::new(0),
                saw_cancelled: Cell::new(false),
                failure: RefCell::new(None),
                handles: RefCell::new(Vec::new()),
                on_done: RefCell::new(None),
            }),
        }
    }

    pub fn state(&self) -> RunnerState {
        self.inner.state.get()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Runs the changeset. A changeset with no visually significant sprite
    /// resolves immediately as completed without touching playback.
    ///
    /// Runners are single-use: one changeset, one resolution.
    pub fn run(
        &self,
        changeset: Changeset,
        on_done: impl FnOnce(Result<RunOutcome, ChoreoError>) + 'static,
    ) {
        let inner = &self.inner;
        debug_assert_eq!(
            inner.state.get(),
            RunnerState::Idle,
            "transition runner is single-use"
        );
        if !changeset.has_sprites() {
            inner.state.set(RunnerState::Completed);
            on_done(Ok(RunOutcome::Completed));
            return;
        }

        let config = changeset.context().config.unwrap_or_default();
        let requests: Vec<PlaybackRequest> = changeset
            .sprites()
            .iter()
            .filter_map(playback_request)
            .collect();
        if requests.is_empty() {
            inner.state.set(RunnerState::Completed);
            on_done(Ok(RunOutcome::Completed));
            return;
        }

        inner.state.set(RunnerState::Running);
        *inner.on_done.borrow_mut() = Some(Box::new(on_done));
        inner.outstanding.set(requests.len());

        for request in requests {
            // Suspension point: a cancellation observed here stops the
            // remaining dispatches.
            if inner.token.is_cancelled() {
                RunnerInner::on_sprite_settled(
                    inner,
                    request.participant(),
                    PlaybackOutcome::Cancelled,
                );
                continue;
            }
            let participant = request.participant();
            let weak = Rc::downgrade(inner);
            let handle = inner.playback.animate(
                request,
                config,
                Box::new(move |outcome| {
                    if let Some(inner) = weak.upgrade() {
                        RunnerInner::on_sprite_settled(&inner, participant, outcome);
                    }
                }),
            );
            inner.handles.borrow_mut().push(handle);
        }
    }

    /// Cancels the run: stops every outstanding playback and guarantees the
    /// completion callback resolves as cancelled exactly once, without
    /// unwinding into the caller.
    pub fn cancel(&self) {
        let inner = &self.inner;
        inner.token.cancel();
        if inner.state.get() != RunnerState::Running {
            return;
        }

        let handles: Vec<Box<dyn PlaybackHandle>> = {
            let mut slot = inner.handles.borrow_mut();
            slot.drain(..).collect()
        };
        for handle in &handles {
            handle.cancel();
        }

        // A conforming playback settles every cancelled handle, which
        // resolves the join above. Guard against implementations that do
        // not, so the cycle join can never wedge.
        if inner.on_done.borrow().is_some() {
            inner.saw_cancelled.set(true);
            inner.outstanding.set(0);
            RunnerInner::finish(inner);
        }
    }
}

impl RunnerInner {
    fn on_sprite_settled(inner: &Rc<RunnerInner>, participant: ParticipantId, outcome: PlaybackOutcome) {
        match outcome {
            PlaybackOutcome::Completed => {}
            PlaybackOutcome::Cancelled => inner.saw_cancelled.set(true),
            PlaybackOutcome::Failed(reason) => {
                log::error!("playback failed for participant {participant}: {reason}");
                let mut failure = inner.failure.borrow_mut();
                if failure.is_none() {
                    *failure = Some(ChoreoError::PlaybackFailed {
                        participant,
                        reason,
                    });
                }
            }
        }

        let remaining = inner.outstanding.get().saturating_sub(1);
        inner.outstanding.set(remaining);
        if remaining == 0 {
            Self::finish(inner);
        }
    }

    fn finish(inner: &Rc<RunnerInner>) {
        let callback = inner.on_done.borrow_mut().take();
        let Some(callback) = callback else {
            return;
        };
        inner.handles.borrow_mut().clear();

        let failure = inner.failure.borrow_mut().take();
        let result = if let Some(err) = failure {
            inner.state.set(RunnerState::Completed);
            Err(err)
        } else if inner.saw_cancelled.get() || inner.token.is_cancelled() {
            inner.state.set(RunnerState::Cancelled);
            Ok(RunOutcome::Cancelled)
        } else {
            inner.state.set(RunnerState::Completed);
            Ok(RunOutcome::Completed)
        };
        callback(result);
    }
}

/// Maps a sprite to the playback work it needs, or `None` for sprites with
/// nothing to reconcile.
fn playback_request(sprite: &Sprite) -> Option<PlaybackRequest> {
    match sprite.kind() {
        SpriteKind::Kept | SpriteKind::Sent => {
            if sprite.is_visual_noop() {
                return None;
            }
            let before = sprite.before()?;
            let after = sprite.after()?;
            Some(PlaybackRequest::Move {
                participant: sprite.participant(),
                from: before.bounds,
                to: after.bounds,
                delta: sprite.frame_delta()?,
            })
        }
        SpriteKind::Inserted => Some(PlaybackRequest::Enter {
            participant: sprite.participant(),
            to: sprite.after()?.bounds,
        }),
        SpriteKind::Removed => Some(PlaybackRequest::Exit {
            participant: sprite.participant(),
            from: sprite.before()?.bounds,
        }),
    }
}
