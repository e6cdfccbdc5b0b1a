//! The process-wide cycle orchestrator.
//!
//! Sequences one animation pass per render cycle: capture the before-phase
//! synchronously when notified, let the host render, then diff, build
//! changesets and run transitions on the scheduled continuation. Starting a
//! new cycle's processing cancels any prior cycle's outstanding join.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::animator::{Changeset, ContextInfo, ModifierInfo};
use crate::participant::ParticipantManager;
use crate::platform::{Measure, Playback, RenderScheduler};
use crate::registry::ParticipantRegistry;
use crate::transition::{RunOutcome, TransitionRunner};
use crate::{ChoreoError, ContextId};

/// Orchestration phase of the cycle currently owned by the choreographer.
///
/// `Pending` doubles as the idempotence guard for
/// [`Choreographer::notify_render_cycle`]; it is left again at the top of
/// processing so the next mutation can open a fresh cycle even while this
/// one is still transitioning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Pending,
    Diffing,
    Transitioning,
}

/// The single coordinator external UI code talks to: registration surface
/// for contexts and sprite modifiers, plus the once-per-cycle
/// [`notify_render_cycle`](Choreographer::notify_render_cycle) entry point.
pub struct Choreographer {
    inner: Rc<ChoreographerInner>,
}

struct ChoreographerInner {
    scheduler: Rc<dyn RenderScheduler>,
    measure: Rc<dyn Measure>,
    playback: Rc<dyn Playback>,
    registry: ParticipantRegistry,
    manager: RefCell<ParticipantManager>,
    phase: Cell<CyclePhase>,
    next_cycle: Cell<u64>,
    current: RefCell<Option<Rc<CycleTask>>>,
}

impl Choreographer {
    pub fn new(
        scheduler: Rc<dyn RenderScheduler>,
        measure: Rc<dyn Measure>,
        playback: Rc<dyn Playback>,
    ) -> Self {
        Self {
            inner: Rc::new(ChoreographerInner {
                scheduler,
                measure,
                playback,
                registry: ParticipantRegistry::new(),
                manager: RefCell::new(ParticipantManager::new()),
                phase: Cell::new(CyclePhase::Idle),
                next_cycle: Cell::new(1),
                current: RefCell::new(None),
            }),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.inner.phase.get()
    }

    pub fn register_context(&self, context: ContextInfo) {
        self.inner.registry.register_context(context);
    }

    pub fn unregister_context(&self, context: ContextInfo) {
        self.inner.registry.unregister_context(context);
    }

    pub fn register_sprite_modifier(&self, modifier: ModifierInfo) {
        self.inner.registry.register_sprite_modifier(modifier);
    }

    pub fn unregister_sprite_modifier(&self, modifier: ModifierInfo) {
        self.inner.registry.unregister_sprite_modifier(modifier);
    }

    /// Opens a new cycle: clears stale snapshots, captures the before-phase
    /// synchronously (prior to the pending mutation taking visual effect)
    /// and schedules the processing continuation.
    ///
    /// Idempotent while a continuation is already pending: re-entrant calls
    /// within the same cycle are ignored.
    pub fn notify_render_cycle(&self) {
        let inner = &self.inner;
        if inner.phase.get() == CyclePhase::Pending {
            return;
        }
        inner.phase.set(CyclePhase::Pending);

        {
            let mut manager = inner.manager.borrow_mut();
            manager.clear_snapshots();
            manager.snapshot_before_render(&*inner.measure);
        }

        let weak = Rc::downgrade(inner);
        inner
            .scheduler
            .run_after_render_settles(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    ChoreographerInner::process_cycle(&inner);
                }
            }));
    }
}

impl ChoreographerInner {
    fn process_cycle(inner: &Rc<ChoreographerInner>) {
        // Leaving Pending re-arms the notification guard for the next
        // mutation.
        inner.phase.set(CyclePhase::Diffing);

        let previous = inner.current.borrow_mut().take();
        if let Some(previous) = previous {
            if !previous.is_settled() {
                log::warn!(
                    "animation cycle {} superseded; interrupting its transitions",
                    previous.cycle
                );
                previous.cancel();
            }
        }

        let cycle = inner.next_cycle.get();
        inner.next_cycle.set(cycle + 1);

        let changes = inner.registry.drain_and_clear();
        let (sprites, mut animators) = {
            let mut manager = inner.manager.borrow_mut();
            manager.update_participants(changes);
            manager.snapshot_after_render(&*inner.measure);
            manager.log_participants();
            manager.create_animators_and_sprites()
        };

        let mut launches: Vec<(TransitionRunner, Changeset)> = Vec::new();
        for animator in &mut animators {
            animator.handle_sprites(&sprites);
            let changeset = animator.to_changeset();
            if changeset.has_sprites() {
                launches.push((TransitionRunner::new(Rc::clone(&inner.playback)), changeset));
            }
        }

        if launches.is_empty() {
            inner.phase.set(CyclePhase::Idle);
            return;
        }

        inner.phase.set(CyclePhase::Transitioning);
        let task = Rc::new(CycleTask::new(cycle, launches.len()));
        *inner.current.borrow_mut() = Some(Rc::clone(&task));

        for (runner, changeset) in launches {
            task.runners.borrow_mut().push(runner.clone());
            let context = changeset.context().id;
            let task = Rc::clone(&task);
            let weak = Rc::downgrade(inner);
            runner.run(changeset, move |result| {
                CycleTask::on_runner_done(&task, context, result, &weak);
            });
        }
    }

    fn on_cycle_settled(inner: &Rc<ChoreographerInner>, cycle: u64) {
        let is_current = inner
            .current
            .borrow()
            .as_ref()
            .map(|task| task.cycle)
            == Some(cycle);
        if !is_current {
            return;
        }
        *inner.current.borrow_mut() = None;
        if inner.phase.get() == CyclePhase::Transitioning {
            inner.phase.set(CyclePhase::Idle);
        }
    }
}

/// One cycle's fan-out of transition runners and the join over them.
struct CycleTask {
    cycle: u64,
    runners: RefCell<Vec<TransitionRunner>>,
    remaining: Cell<usize>,
    settled: Cell<bool>,
}

impl CycleTask {
    fn new(cycle: u64, count: usize) -> Self {
        Self {
            cycle,
            runners: RefCell::new(Vec::with_capacity(count)),
            remaining: Cell::new(count),
            settled: Cell::new(false),
        }
    }

    fn is_settled(&self) -> bool {
        self.settled.get()
    }

    fn cancel(&self) {
        for runner in self.runners.borrow().iter() {
            runner.cancel();
        }
    }

    fn on_runner_done(
        task: &Rc<CycleTask>,
        context: ContextId,
        result: Result<RunOutcome, ChoreoError>,
        inner: &Weak<ChoreographerInner>,
    ) {
        match result {
            Ok(RunOutcome::Completed) => {}
            Ok(RunOutcome::Cancelled) => {
                log::warn!(
                    "transition for context {context} interrupted in cycle {}",
                    task.cycle
                );
            }
            Err(err) => {
                log::error!(
                    "transition for context {context} failed in cycle {}: {err}",
                    task.cycle
                );
            }
        }

        let remaining = task.remaining.get().saturating_sub(1);
        task.remaining.set(remaining);
        if remaining == 0 {
            task.settled.set(true);
            if let Some(inner) = inner.upgrade() {
                ChoreographerInner::on_cycle_settled(&inner, task.cycle);
            }
        }
    }
}
