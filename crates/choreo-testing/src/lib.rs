//! Deterministic collaborator doubles for exercising the choreography core.
//!
//! Tests drive a [`Choreographer`] end to end by stepping the render
//! scheduler by hand, scripting element geometry, and settling recorded
//! playback runs explicitly (or letting them auto-complete).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use choreo_core::collections::map::HashMap;
use choreo_core::{
    Bounds, Choreographer, ContextId, ContextInfo, Measure, Measurement, ModifierInfo,
    ParticipantId, Playback, PlaybackHandle, PlaybackOutcome, PlaybackRequest, RenderScheduler,
    StyleSample, TransitionConfig,
};

/// Render hook double: queues continuations until the test settles the
/// render, the way a host framework would after layout stabilizes.
#[derive(Default)]
pub struct ManualRenderScheduler {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl ManualRenderScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of continuations waiting for the render to settle.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs the next scheduled continuation. Returns false when none is
    /// queued.
    pub fn settle_render(&self) -> bool {
        let callback = self.queue.borrow_mut().pop_front();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Settles every queued continuation, including ones scheduled while
    /// settling. Returns how many ran.
    pub fn settle_all(&self) -> usize {
        let mut ran = 0;
        while self.settle_render() {
            ran += 1;
        }
        ran
    }
}

impl RenderScheduler for ManualRenderScheduler {
    fn run_after_render_settles(&self, callback: Box<dyn FnOnce() + 'static>) {
        self.queue.borrow_mut().push_back(callback);
    }
}

/// Measurement double backed by a mutable geometry/style table. An entry
/// missing from the table reads as a detached element.
#[derive(Default)]
pub struct ScriptedMeasure {
    bounds: RefCell<HashMap<ParticipantId, Bounds>>,
    styles: RefCell<HashMap<ParticipantId, StyleSample>>,
    measured: RefCell<Vec<ParticipantId>>,
}

impl ScriptedMeasure {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Sets (or moves) a participant's scripted geometry.
    pub fn place(&self, participant: ParticipantId, bounds: Bounds) {
        self.bounds.borrow_mut().insert(participant, bounds);
    }

    /// Sets a scripted style property for a participant.
    pub fn style(&self, participant: ParticipantId, key: &str, value: &str) {
        self.styles
            .borrow_mut()
            .entry(participant)
            .or_default()
            .insert(key.to_owned(), value.to_owned());
    }

    /// Detaches the participant: subsequent measurements miss.
    pub fn detach(&self, participant: ParticipantId) {
        self.bounds.borrow_mut().remove(&participant);
        self.styles.borrow_mut().remove(&participant);
    }

    /// The participants measured so far, in call order.
    pub fn measured(&self) -> Vec<ParticipantId> {
        self.measured.borrow().clone()
    }

    pub fn clear_measured(&self) {
        self.measured.borrow_mut().clear();
    }
}

impl Measure for ScriptedMeasure {
    fn measure(&self, participant: ParticipantId) -> Option<Measurement> {
        self.measured.borrow_mut().push(participant);
        let bounds = *self.bounds.borrow().get(&participant)?;
        let style = self
            .styles
            .borrow()
            .get(&participant)
            .cloned()
            .unwrap_or_default();
        Some(Measurement { bounds, style })
    }
}

/// One recorded playback run, held open until settled.
pub struct RecordedRun {
    request: PlaybackRequest,
    config: TransitionConfig,
    outcome: RefCell<Option<PlaybackOutcome>>,
    on_settled: RefCell<Option<Box<dyn FnOnce(PlaybackOutcome)>>>,
}

impl RecordedRun {
    pub fn request(&self) -> &PlaybackRequest {
        &self.request
    }

    pub fn config(&self) -> TransitionConfig {
        self.config
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        self.outcome.borrow().clone()
    }

    /// Settles the run with the given outcome. Settling twice is a no-op,
    /// mirroring the playback contract.
    pub fn settle(&self, outcome: PlaybackOutcome) {
        let callback = self.on_settled.borrow_mut().take();
        if let Some(callback) = callback {
            *self.outcome.borrow_mut() = Some(outcome.clone());
            callback(outcome);
        }
    }
}

struct RecordedHandle {
    run: Rc<RecordedRun>,
}

impl PlaybackHandle for RecordedHandle {
    fn cancel(&self) {
        // Snap-to-final is the playback contract; the double only records
        // the cancelled settlement.
        self.run.settle(PlaybackOutcome::Cancelled);
    }
}

/// Playback double that records every request. In manual mode runs stay
/// open until the test settles them; in auto-completing mode they settle
/// as completed synchronously.
pub struct RecordingPlayback {
    auto_complete: Cell<bool>,
    runs: RefCell<Vec<Rc<RecordedRun>>>,
}

impl RecordingPlayback {
    /// Manual settlement: runs stay open until `settle`/`complete_all`.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            auto_complete: Cell::new(false),
            runs: RefCell::new(Vec::new()),
        })
    }

    /// Every run settles as completed the moment it starts.
    pub fn auto_completing() -> Rc<Self> {
        let playback = Self::new();
        playback.auto_complete.set(true);
        playback
    }

    /// All runs recorded so far, settled or not.
    pub fn runs(&self) -> Vec<Rc<RecordedRun>> {
        self.runs.borrow().clone()
    }

    /// The still-open runs.
    pub fn unsettled(&self) -> Vec<Rc<RecordedRun>> {
        self.runs
            .borrow()
            .iter()
            .filter(|run| !run.is_settled())
            .cloned()
            .collect()
    }

    /// Settles every open run as completed. Returns how many settled.
    pub fn complete_all(&self) -> usize {
        let open = self.unsettled();
        for run in &open {
            run.settle(PlaybackOutcome::Completed);
        }
        open.len()
    }

    /// The recorded requests, in dispatch order.
    pub fn requests(&self) -> Vec<PlaybackRequest> {
        self.runs
            .borrow()
            .iter()
            .map(|run| run.request.clone())
            .collect()
    }
}

impl Playback for RecordingPlayback {
    fn animate(
        &self,
        request: PlaybackRequest,
        config: TransitionConfig,
        on_settled: Box<dyn FnOnce(PlaybackOutcome) + 'static>,
    ) -> Box<dyn PlaybackHandle> {
        let run = Rc::new(RecordedRun {
            request,
            config,
            outcome: RefCell::new(None),
            on_settled: RefCell::new(Some(on_settled)),
        });
        self.runs.borrow_mut().push(Rc::clone(&run));
        if self.auto_complete.get() {
            run.settle(PlaybackOutcome::Completed);
        }
        Box::new(RecordedHandle { run })
    }
}

/// Bundles a choreographer with the three collaborator doubles and offers
/// mount/move/unmount shorthands for scenario tests.
pub struct TestHost {
    pub scheduler: Rc<ManualRenderScheduler>,
    pub measure: Rc<ScriptedMeasure>,
    pub playback: Rc<RecordingPlayback>,
    pub choreographer: Choreographer,
}

impl TestHost {
    /// Host with manually settled playback.
    pub fn new() -> Self {
        Self::with_playback(RecordingPlayback::new())
    }

    /// Host whose playback settles as completed synchronously.
    pub fn auto_completing() -> Self {
        Self::with_playback(RecordingPlayback::auto_completing())
    }

    fn with_playback(playback: Rc<RecordingPlayback>) -> Self {
        let scheduler = ManualRenderScheduler::new();
        let measure = ScriptedMeasure::new();
        let choreographer = Choreographer::new(
            Rc::clone(&scheduler) as Rc<dyn RenderScheduler>,
            Rc::clone(&measure) as Rc<dyn Measure>,
            Rc::clone(&playback) as Rc<dyn Playback>,
        );
        Self {
            scheduler,
            measure,
            playback,
            choreographer,
        }
    }

    /// Registers a fresh animation context.
    pub fn mount_context(&self) -> ContextId {
        let id = ContextId::next();
        self.choreographer.register_context(ContextInfo::new(id));
        id
    }

    /// Registers a context with explicit attributes.
    pub fn mount_context_with(&self, info: ContextInfo) -> ContextId {
        self.choreographer.register_context(info);
        info.id
    }

    /// Mounts a fresh element under `context` at `bounds` and registers its
    /// sprite modifier.
    pub fn mount(&self, context: ContextId, bounds: Bounds) -> ModifierInfo {
        let modifier = ModifierInfo::new(ParticipantId::next(), context);
        self.measure.place(modifier.id, bounds);
        self.choreographer.register_sprite_modifier(modifier);
        modifier
    }

    /// Unmounts an element: detaches its scripted geometry and unregisters
    /// the modifier.
    pub fn unmount(&self, modifier: ModifierInfo) {
        self.measure.detach(modifier.id);
        self.choreographer.unregister_sprite_modifier(modifier);
    }

    /// Moves an element without any registration change.
    pub fn move_to(&self, modifier: ModifierInfo, bounds: Bounds) {
        self.measure.place(modifier.id, bounds);
    }

    /// Re-parents an element under a new context, keeping its identity.
    pub fn reparent(&self, modifier: ModifierInfo, context: ContextId) -> ModifierInfo {
        self.choreographer.unregister_sprite_modifier(modifier);
        let moved = ModifierInfo::new(modifier.id, context);
        self.choreographer.register_sprite_modifier(moved);
        moved
    }

    /// Notifies a render cycle and settles the continuation immediately.
    pub fn run_cycle(&self) {
        self.choreographer.notify_render_cycle();
        self.scheduler.settle_render();
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
