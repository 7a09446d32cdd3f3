//! C1 — the Scheduler / Event Loop (spec §4.1).
//!
//! Owns the event queue, the logical clock, the continuation manager and
//! the causality graph, and drives dispatch. A [`Scheduler`] is always
//! reached through an `Arc` — worker threads spawned for blocking calls
//! hold their own clone so they can post further events and park on their
//! own continuation while the loop moves on.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::causality::{CausalityGraph, CausalityIndex};
use crate::clock::{LogicalTime, SequenceCounter};
use crate::continuation::{
    current_continuation_id, park_current_and_wait, Abandoned, ContinuationId, ContinuationManager,
    Outcome, Settled,
};
use crate::entity::{Args, EntityHandle, Ordinal};
use crate::error::{EntityCause, KernelError};
use crate::event::{DebugSite, EventRecord, ResumptionRecord};
use crate::queue::{EventQueue, TieBreak};

/// Playback-speed pacing against wall-clock time (spec §2 "pacing mode").
/// `speed` is simulated time units per real second; larger runs faster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub speed: f64,
}

/// Immutable configuration a [`Scheduler`] is built with.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tie_break: TieBreak,
    pub seed: u64,
    pub causality: bool,
    pub capture_debug_sites: bool,
    pub pacing: Option<PacingConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::Fifo,
            seed: 0,
            causality: false,
            capture_debug_sites: false,
            pacing: None,
        }
    }
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for [`SchedulerConfig`], in the same vein as the rest of the
/// crate's config types.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder(SchedulerConfig);

impl SchedulerConfigBuilder {
    /// Replace the FIFO tie-break with a seeded randomized one (spec §2).
    /// Mutually exclusive with deterministic trace comparison across runs.
    pub fn randomize_ties(mut self, seed: u64) -> Self {
        self.0.tie_break = TieBreak::Randomized;
        self.0.seed = seed;
        self
    }

    pub fn track_causality(mut self, on: bool) -> Self {
        self.0.causality = on;
        self
    }

    pub fn capture_debug_sites(mut self, on: bool) -> Self {
        self.0.capture_debug_sites = on;
        self
    }

    pub fn pacing(mut self, speed: f64) -> Self {
        self.0.pacing = Some(PacingConfig { speed });
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.0
    }
}

/// The scheduler's run state (spec §4.1: `Fresh -> Running <-> Paused -> Stopped`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Fresh,
    Running,
    Paused,
    Stopped,
}

/// Observes dispatch boundaries, e.g. for logging or metrics (spec §6
/// Reporter adapter feeds off these). Registered with
/// [`Scheduler::add_observer`]; every observer sees every event.
pub trait SchedulerObserver: Send + Sync {
    fn on_event_start(&self, _time: LogicalTime, _signature: &str) {}
    fn on_event_end(&self, _time: LogicalTime, _signature: &str, _outcome: &Outcome) {}
}

/// Bookkeeping kept per in-flight continuation so that when its worker
/// thread finally finishes (possibly after several park/resume round
/// trips), the loop knows what originally blocked on it and can resolve
/// or fail that call correctly.
struct ContinuationMeta {
    blocking: bool,
    poster: Option<ContinuationId>,
    entity_name: String,
    ordinal: Ordinal,
    signature: String,
    time: LogicalTime,
    source: Option<CausalityIndex>,
}

struct Inner {
    queue: EventQueue,
    seq: SequenceCounter,
    current_time: LogicalTime,
    end_time: Option<LogicalTime>,
    state: SchedulerState,
    causality: CausalityGraph,
    meta: HashMap<ContinuationId, ContinuationMeta>,
    observers: Vec<Arc<dyn SchedulerObserver>>,
}

pub struct Scheduler {
    inner: Mutex<Inner>,
    continuations: ContinuationManager,
    config: SchedulerConfig,
    wall_origin: Mutex<Option<(Instant, LogicalTime)>>,
    stepping: AtomicBool,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Arc<Self> {
        let queue = EventQueue::new(config.tie_break, config.seed);
        let causality = CausalityGraph::new(config.causality);
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queue,
                seq: SequenceCounter::new(),
                current_time: LogicalTime::ZERO,
                end_time: None,
                state: SchedulerState::Fresh,
                causality,
                meta: HashMap::new(),
                observers: Vec::new(),
            }),
            continuations: ContinuationManager::new(),
            config,
            wall_origin: Mutex::new(None),
            stepping: AtomicBool::new(false),
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn SchedulerObserver>) {
        self.inner.lock().observers.push(observer);
    }

    pub fn current_time(&self) -> LogicalTime {
        self.inner.lock().current_time
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().state == SchedulerState::Running
    }

    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SchedulerState::Running {
            inner.state = SchedulerState::Paused;
        }
    }

    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SchedulerState::Paused {
            inner.state = SchedulerState::Running;
        }
    }

    /// Jump the clock forward with no pending events in between. Forbidden
    /// if an event exists strictly earlier than `t` (spec §4.1).
    pub fn set_time(&self, t: LogicalTime) -> Result<(), KernelError> {
        let mut inner = self.inner.lock();
        if t < inner.current_time {
            return Err(KernelError::InvalidTime {
                requested: t,
                current: inner.current_time,
            });
        }
        if let Some(qt) = inner.queue.peek_time() {
            if qt < t {
                return Err(KernelError::InvalidTime {
                    requested: t,
                    current: inner.current_time,
                });
            }
        }
        inner.current_time = t;
        Ok(())
    }

    /// Cap the run at `t`: events already queued strictly after it are
    /// dropped now, and any posted afterward are dropped silently at post
    /// time (spec §4.1 `end_at`).
    pub fn end_at(&self, t: LogicalTime) {
        let mut inner = self.inner.lock();
        inner.end_time = Some(t);
        inner.queue.discard_after(t);
    }

    /// Reset to a fresh, empty scheduler at t=0 (spec §4.1 `clear`).
    pub fn clear(&self) {
        self.continuations.abandon_all();
        let mut inner = self.inner.lock();
        inner.queue.clear();
        inner.meta.clear();
        inner.causality.clear();
        inner.current_time = LogicalTime::ZERO;
        inner.end_time = None;
        inner.state = SchedulerState::Fresh;
        *self.wall_origin.lock() = None;
    }

    #[track_caller]
    pub fn post(&self, entity: EntityHandle, ordinal: Ordinal, args: Args) -> Result<(), KernelError> {
        let loc = Location::caller();
        let time = self.inner.lock().current_time;
        self.enqueue(time, entity, ordinal, args, false, None, loc)
    }

    #[track_caller]
    pub fn post_at(
        &self,
        time: LogicalTime,
        entity: EntityHandle,
        ordinal: Ordinal,
        args: Args,
    ) -> Result<(), KernelError> {
        let loc = Location::caller();
        self.enqueue(time, entity, ordinal, args, false, None, loc)
    }

    /// Post `entity#ordinal` at `time` and suspend the calling continuation
    /// until it completes. Must be called from inside a dispatch (the
    /// generated proxy body of a `#[blocking]` method); calling it from
    /// plain Rust code is the `NotTransformed` misuse spec §7 calls out.
    ///
    /// Returns a nested result: the outer `KernelError` is a kernel-level
    /// misuse (bad time, unknown ordinal, called outside a dispatch) that
    /// never reaches the simulated model; the inner `Outcome` is what the
    /// callee actually returned or raised, exactly as spec §4.2 describes
    /// ("the call returns with the reply's value, or raises what the
    /// callee raised").
    #[track_caller]
    pub fn post_blocking(
        &self,
        time: LogicalTime,
        entity: EntityHandle,
        ordinal: Ordinal,
        args: Args,
    ) -> Result<Outcome, KernelError> {
        let loc = Location::caller();
        let id = current_continuation_id()
            .ok_or(KernelError::NotTransformed("post_blocking called outside a dispatch"))?;
        self.enqueue(time, entity, ordinal, args, true, Some(id), loc)?;
        match park_current_and_wait() {
            Ok(outcome) => Ok(outcome),
            Err(Abandoned) => Ok(Err(EntityCause::Error(
                "simulation ended while this call was still pending".into(),
            ))),
        }
    }

    fn enqueue(
        &self,
        time: LogicalTime,
        entity: EntityHandle,
        ordinal: Ordinal,
        args: Args,
        blocking: bool,
        continuation: Option<ContinuationId>,
        loc: &'static Location<'static>,
    ) -> Result<(), KernelError> {
        if !entity.valid_ordinals().contains(&ordinal) {
            return Err(KernelError::InvalidOrdinal(ordinal));
        }
        let mut inner = self.inner.lock();
        if time < inner.current_time {
            return Err(KernelError::InvalidTime {
                requested: time,
                current: inner.current_time,
            });
        }
        if let Some(end) = inner.end_time {
            if time > end {
                trace!(t = %time, end = %end, "discarding event posted beyond end_at boundary");
                return Ok(());
            }
        }
        let seq = inner.seq.next();
        let signature = entity
            .signature_for(ordinal)
            .unwrap_or_else(|| format!("{}#{}", entity.entity_name(), ordinal));
        let parent = current_continuation_id().and_then(|id| inner.meta.get(&id).and_then(|m| m.source));
        let source = inner.causality.record(time, seq, signature.clone(), parent);
        let debug_site = self.config.capture_debug_sites.then(|| DebugSite {
            file: loc.file(),
            line: loc.line(),
            poster: current_continuation_id().map(|id| id.as_u64().to_string()),
        });
        inner.queue.push(crate::event::QueueItem::Invoke(EventRecord {
            time,
            entity,
            ordinal,
            args,
            source,
            blocking,
            continuation,
            debug_site,
            sequence: seq,
        }));
        Ok(())
    }

    /// Run until the queue drains or `end_at` stops admitting further
    /// events, surfacing the first unrecovered `EntityException` (spec
    /// §4.1, §7). On `Err`, [`KernelError::diagnostic`] renders a report.
    pub fn run(self: &Arc<Self>) -> Result<(), KernelError> {
        self.inner.lock().state = SchedulerState::Running;
        let result = loop {
            {
                let inner = self.inner.lock();
                if inner.state != SchedulerState::Running {
                    break Ok(());
                }
                if let Some(end) = inner.end_time {
                    if inner.queue.peek_time().map_or(true, |t| t > end) {
                        break Ok(());
                    }
                }
            }
            self.pace_before_next();
            match self.dispatch_one() {
                Ok(true) => continue,
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.inner.lock().state = SchedulerState::Stopped;
        self.continuations.abandon_all();
        result
    }

    /// Process exactly one queue item regardless of run state; the
    /// building block for the facade's stepping mode (spec §2).
    pub fn step(self: &Arc<Self>) -> Result<bool, KernelError> {
        self.dispatch_one()
    }

    /// Wake a continuation that suspended itself directly via
    /// [`crate::continuation::park_current_and_wait`] rather than through
    /// `post_blocking` — the coordination primitives (spec §4.5) use this to
    /// resolve a waiter once their own condition is met, instead of posting
    /// a reply event to another entity. Delivery happens at the current
    /// logical time, via the same `ResumptionRecord` path a blocking call's
    /// reply takes, so the loop still resumes it through `wait_until_settled`.
    pub fn wake(&self, continuation: ContinuationId, outcome: Outcome) {
        let mut inner = self.inner.lock();
        let seq = inner.seq.next();
        let now = inner.current_time;
        inner.queue.push(crate::event::QueueItem::Resume(ResumptionRecord {
            time: now,
            sequence: seq,
            continuation,
            outcome,
        }));
    }

    /// Suspend the continuation currently running on this thread without
    /// posting any event, to be woken later by [`Scheduler::wake`]. Must be
    /// called from inside a dispatch.
    pub fn suspend_self(&self) -> Result<Outcome, KernelError> {
        match park_current_and_wait() {
            Ok(outcome) => Ok(outcome),
            Err(Abandoned) => Ok(Err(EntityCause::Error(
                "simulation ended while this call was still pending".into(),
            ))),
        }
    }

    /// Drive the loop forward by `delta` logical units, processing every
    /// event at or before the target, then advancing the clock to the
    /// target even if nothing was left to run.
    pub fn advance(self: &Arc<Self>, delta: u64) -> Result<(), KernelError> {
        let target = self.inner.lock().current_time.saturating_add(delta);
        loop {
            let next = self.inner.lock().queue.peek_time();
            match next {
                Some(t) if t <= target => {
                    if !self.dispatch_one()? {
                        break;
                    }
                }
                _ => break,
            }
        }
        let mut inner = self.inner.lock();
        if inner.current_time < target {
            inner.current_time = target;
        }
        Ok(())
    }

    fn pace_before_next(&self) {
        let Some(pacing) = self.config.pacing else { return };
        let next_time = match self.inner.lock().queue.peek_time() {
            Some(t) => t,
            None => return,
        };
        let mut origin = self.wall_origin.lock();
        let (wall0, sim0) = *origin.get_or_insert_with(|| (Instant::now(), next_time));
        let sim_delta = next_time.as_u64().saturating_sub(sim0.as_u64());
        let target_wall =
            wall0 + Duration::from_secs_f64(sim_delta as f64 / pacing.speed.max(f64::MIN_POSITIVE));
        drop(origin);
        let now = Instant::now();
        if target_wall > now {
            thread::sleep(target_wall - now);
        }
    }

    fn dispatch_one(self: &Arc<Self>) -> Result<bool, KernelError> {
        let item = {
            let mut inner = self.inner.lock();
            match inner.queue.pop() {
                Some(item) => item,
                None => return Ok(false),
            }
        };
        match item {
            crate::event::QueueItem::Invoke(ev) => self.run_invoke(ev),
            crate::event::QueueItem::Resume(r) => self.run_resume(r),
        }
    }

    fn run_invoke(self: &Arc<Self>, ev: EventRecord) -> Result<bool, KernelError> {
        let EventRecord {
            time,
            entity,
            ordinal,
            args,
            source,
            blocking,
            continuation,
            debug_site: _,
            sequence: _,
        } = ev;
        let signature = entity
            .signature_for(ordinal)
            .unwrap_or_else(|| format!("{}#{}", entity.entity_name(), ordinal));
        let entity_name = entity.entity_name().to_string();

        let id = self.continuations.begin();
        {
            let mut inner = self.inner.lock();
            inner.current_time = time;
            inner.meta.insert(
                id,
                ContinuationMeta {
                    blocking,
                    poster: continuation,
                    entity_name,
                    ordinal,
                    signature: signature.clone(),
                    time,
                    source,
                },
            );
            for obs in &inner.observers {
                obs.on_event_start(time, &signature);
            }
        }
        debug!(t = %time, sig = %signature, "dispatching event");

        let scheduler = Arc::clone(self);
        thread::Builder::new()
            .name(format!("primemover-continuation-{}", id.as_u64()))
            .spawn(move || {
                crate::facade::set_controller(Arc::clone(&scheduler));
                scheduler.continuations.run_on_current_thread(id, || {
                    let result =
                        panic::catch_unwind(AssertUnwindSafe(|| entity.dispatch(ordinal, args)));
                    let outcome = result.unwrap_or_else(|payload| Err(EntityCause::Panic(panic_message(&payload))));
                    scheduler.continuations.mark_finished(id, outcome);
                });
                crate::facade::clear_controller();
            })
            .expect("failed to spawn continuation worker thread");

        match self.continuations.wait_until_settled(id) {
            Settled::Parked => Ok(true),
            Settled::Finished(outcome) => self.retire(id, outcome),
        }
    }

    fn run_resume(self: &Arc<Self>, r: ResumptionRecord) -> Result<bool, KernelError> {
        let ResumptionRecord {
            time,
            sequence: _,
            continuation,
            outcome,
        } = r;
        self.inner.lock().current_time = time;
        self.continuations
            .resume_with(continuation, outcome)
            .map_err(|_| KernelError::ContinuationLost(continuation.as_u64()))?;
        match self.continuations.wait_until_settled(continuation) {
            Settled::Parked => Ok(true),
            Settled::Finished(outcome) => self.retire(continuation, outcome),
        }
    }

    /// A continuation's worker thread has fully returned. Resolve whoever
    /// was waiting on it, or treat an unrecovered error as terminal.
    fn retire(&self, id: ContinuationId, outcome: Outcome) -> Result<bool, KernelError> {
        let meta = {
            let mut inner = self.inner.lock();
            inner
                .meta
                .remove(&id)
                .expect("a dispatch's continuation is always registered by run_invoke")
        };
        {
            let inner = self.inner.lock();
            for obs in &inner.observers {
                obs.on_event_end(meta.time, &meta.signature, &outcome);
            }
        }
        match (meta.blocking, meta.poster, outcome) {
            (true, Some(poster), outcome) => {
                let mut inner = self.inner.lock();
                let seq = inner.seq.next();
                let now = inner.current_time;
                inner.queue.push(crate::event::QueueItem::Resume(ResumptionRecord {
                    time: now,
                    sequence: seq,
                    continuation: poster,
                    outcome,
                }));
                Ok(true)
            }
            (false, _, Err(cause)) => {
                warn!(entity = %meta.entity_name, ordinal = meta.ordinal, t = %meta.time, %cause, "unrecovered entity exception, halting run");
                let causal_trace = match meta.source {
                    Some(src) => self.inner.lock().causality.trace_from(src),
                    None => Vec::new(),
                };
                Err(KernelError::EntityException {
                    entity: meta.entity_name,
                    ordinal: meta.ordinal,
                    time: meta.time,
                    causal_trace,
                    cause,
                })
            }
            (false, _, Ok(_)) => Ok(true),
            (true, None, _) => unreachable!("EventRecord::invariants_hold: blocking implies a continuation"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "entity method panicked with a non-string payload".to_string()
    }
}
