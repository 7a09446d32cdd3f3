//! C2 — the Continuation Manager (spec §4.2).
//!
//! Spec §9 ("Continuations without host VM help") gives implementation
//! freedom: lightweight threads, stackful coroutines, CPS, or generator
//! state machines, as long as the observable behavior — "the call returns
//! with the reply's value after arbitrary simulated time" — holds. This
//! kernel uses the first option: every dispatch runs on its own OS thread
//! (since any method body may itself call a blocking facade method partway
//! through), but a single baton per continuation, checked by the scheduler
//! loop before it ever pops the next queue item, ensures only one thread is
//! ever actually executing entity code at a time — the simulation stays
//! logically single-threaded and cooperative even though real OS threads
//! carry the suspended stacks.
//!
//! A continuation is consumed exactly once, when the event it is waiting on
//! completes (spec §3 "Continuation" lifetime).

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::entity::Value;
use crate::error::EntityCause;

/// Opaque handle naming exactly one suspended blocking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationId(u64);

impl ContinuationId {
    /// Reconstruct a [`ContinuationId`] from its wire form. Continuation
    /// ids are opaque and carry no guessable structure, but coordination
    /// primitives (spec §4.5) need to round-trip one through a boxed
    /// [`crate::entity::Args`] payload when scheduling a timeout expiry
    /// event against themselves.
    pub fn from_u64(n: u64) -> Self {
        ContinuationId(n)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The outcome delivered to / reported by a continuation: either a return
/// value or the condition the method body raised.
pub type Outcome = Result<Value, EntityCause>;

#[derive(Debug)]
enum BatonState {
    /// The worker thread is running entity code; the scheduler loop is
    /// waiting for it to either park or finish.
    Running,
    /// The worker called `suspend_and_post`, posted its reply event, and
    /// handed control back to the loop; it is parked waiting for `Delivered`.
    Parked,
    /// The loop delivered a reply; the worker should wake and return it
    /// from inside `suspend_and_post`.
    Delivered(Outcome),
    /// The worker's outermost dispatch returned; `outcome` is what the
    /// loop should do with the original event (resolve a waiting poster,
    /// or treat as terminal per the failure model).
    Finished(Outcome),
    /// The simulation ended with this continuation still outstanding; the
    /// worker must unwind without running the rest of its body (spec §4.2:
    /// "terminating the simulation drops all pending continuations without
    /// running their finalizers").
    Abandoned,
}

struct Baton {
    state: Mutex<BatonState>,
    cv: Condvar,
}

thread_local! {
    /// The baton for the dispatch currently running on *this* OS thread, if
    /// any. Set by [`ContinuationManager::run_on_current_thread`] for the
    /// duration of the call, so code deep inside an entity's method body
    /// can reach [`park_current_and_wait`] through the facade without
    /// threading a handle through every call.
    static CURRENT_BATON: RefCell<Option<(ContinuationId, Arc<Baton>)>> = const { RefCell::new(None) };
}

/// Raised when the simulation ended while a continuation was still parked;
/// propagates like any other entity error, but the scheduler recognizes it
/// and does not report it as a fresh `EntityException`.
#[derive(Debug)]
pub struct Abandoned;

/// What the scheduler loop observed after waiting on a baton.
pub enum Settled {
    /// The worker called `suspend_and_post` again; it remains registered
    /// and the loop should move on to the next queue item.
    Parked,
    /// The worker's dispatch returned; the continuation is retired.
    Finished(Outcome),
}

/// Owns every in-flight continuation for one scheduler instance.
pub struct ContinuationManager {
    next_id: AtomicU64,
    batons: Mutex<HashMap<ContinuationId, Arc<Baton>>>,
}

impl Default for ContinuationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuationManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            batons: Mutex::new(HashMap::new()),
        }
    }

    /// Register a fresh continuation for a dispatch about to start on a new
    /// worker thread.
    pub fn begin(&self) -> ContinuationId {
        let id = ContinuationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let baton = Arc::new(Baton {
            state: Mutex::new(BatonState::Running),
            cv: Condvar::new(),
        });
        self.batons.lock().insert(id, baton);
        id
    }

    /// Install `id`'s baton as the current thread's baton for the duration
    /// of `body`. Does not remove the bookkeeping entry — that happens when
    /// the scheduler observes `Finished` via [`ContinuationManager::wait_until_settled`].
    pub fn run_on_current_thread<T>(&self, id: ContinuationId, body: impl FnOnce() -> T) -> T {
        let baton = self.baton(id).expect("continuation registered by begin()");
        CURRENT_BATON.with(|c| *c.borrow_mut() = Some((id, baton)));
        let result = body();
        CURRENT_BATON.with(|c| *c.borrow_mut() = None);
        result
    }

    fn baton(&self, id: ContinuationId) -> Option<Arc<Baton>> {
        self.batons.lock().get(&id).cloned()
    }

    /// Called by the worker thread's harness once its dispatch call returns
    /// (successfully, with an error, or via a caught panic).
    pub fn mark_finished(&self, id: ContinuationId, outcome: Outcome) {
        if let Some(baton) = self.baton(id) {
            let mut state = baton.state.lock();
            *state = BatonState::Finished(outcome);
            baton.cv.notify_all();
        }
    }

    /// Block the calling (scheduler loop) thread until continuation `id`
    /// either parks again or finishes. Called right after starting a fresh
    /// worker or resuming a parked one — enforces "only one runnable
    /// context at a time".
    pub fn wait_until_settled(&self, id: ContinuationId) -> Settled {
        let baton = self.baton(id).expect("continuation must still be registered");
        let mut state = baton.state.lock();
        loop {
            match &*state {
                BatonState::Running | BatonState::Delivered(_) => baton.cv.wait(&mut state),
                BatonState::Parked => return Settled::Parked,
                BatonState::Finished(_) => {
                    let BatonState::Finished(outcome) =
                        std::mem::replace(&mut *state, BatonState::Abandoned)
                    else {
                        unreachable!()
                    };
                    drop(state);
                    self.batons.lock().remove(&id);
                    return Settled::Finished(outcome);
                }
                BatonState::Abandoned => {
                    drop(state);
                    self.batons.lock().remove(&id);
                    return Settled::Finished(Err(EntityCause::Error("abandoned".into())));
                }
            }
        }
    }

    /// Deliver `outcome` to the parked continuation `id`, waking its worker
    /// thread. Returns `Err(ContinuationMissing)` if the continuation is
    /// already gone (spec §7 `ContinuationLost`).
    pub fn resume_with(&self, id: ContinuationId, outcome: Outcome) -> Result<(), ContinuationMissing> {
        let Some(baton) = self.baton(id) else {
            return Err(ContinuationMissing);
        };
        let mut state = baton.state.lock();
        *state = BatonState::Delivered(outcome);
        baton.cv.notify_all();
        Ok(())
    }

    /// Abandon every outstanding continuation (spec §4.2: terminating the
    /// simulation drops pending continuations without running finalizers).
    /// Used by `Scheduler::clear()` and at the end of `run()`.
    pub fn abandon_all(&self) {
        let map = self.batons.lock();
        for baton in map.values() {
            let mut state = baton.state.lock();
            *state = BatonState::Abandoned;
            baton.cv.notify_all();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.batons.lock().len()
    }
}

/// Park the calling (worker) thread until its continuation is resumed or
/// the simulation abandons it. Called by the facade right after it has
/// posted the reply event for a blocking call.
pub fn park_current_and_wait() -> Result<Outcome, Abandoned> {
    CURRENT_BATON.with(|c| {
        let borrowed = c.borrow();
        let (_, baton) = borrowed
            .as_ref()
            .expect("suspend_and_post called outside a dispatch");
        let mut state = baton.state.lock();
        *state = BatonState::Parked;
        baton.cv.notify_all();
        loop {
            match &*state {
                BatonState::Parked => baton.cv.wait(&mut state),
                BatonState::Delivered(_) => {
                    let BatonState::Delivered(outcome) =
                        std::mem::replace(&mut *state, BatonState::Running)
                    else {
                        unreachable!()
                    };
                    return Ok(outcome);
                }
                BatonState::Abandoned => return Err(Abandoned),
                BatonState::Running | BatonState::Finished(_) => {
                    unreachable!("worker cannot observe its own Running/Finished state while parked")
                }
            }
        }
    })
}

/// Whether the calling thread currently has a baton installed, i.e. is
/// running inside a dispatch and can legally call `suspend_and_post`.
pub fn has_current_baton() -> bool {
    CURRENT_BATON.with(|c| c.borrow().is_some())
}

/// The continuation id of the dispatch currently running on this thread, if
/// any. Used by the scheduler to find the causal parent of a freshly
/// posted event and to reject `post_blocking` calls made from outside any
/// dispatch.
pub fn current_continuation_id() -> Option<ContinuationId> {
    CURRENT_BATON.with(|c| c.borrow().as_ref().map(|(id, _)| *id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationMissing;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn begin_resume_and_finish_round_trip() {
        let mgr = Arc::new(ContinuationManager::new());
        let id = mgr.begin();

        let mgr2 = mgr.clone();
        thread::spawn(move || {
            mgr2.run_on_current_thread(id, || {
                let outcome = park_current_and_wait().expect("not abandoned");
                let n = outcome.unwrap().downcast::<i64>().map(|b| *b).unwrap_or(-1);
                mgr2.mark_finished(id, Ok(Box::new(n * 2)));
            });
        });

        // Loop-side: wait for it to park, deliver, then wait for it to finish.
        match mgr.wait_until_settled(id) {
            Settled::Parked => {}
            Settled::Finished(_) => panic!("should park before finishing"),
        }
        mgr.resume_with(id, Ok(Box::new(21_i64))).unwrap();
        match mgr.wait_until_settled(id) {
            Settled::Finished(outcome) => {
                assert_eq!(*outcome.unwrap().downcast::<i64>().unwrap(), 42);
            }
            Settled::Parked => panic!("expected finish"),
        }
        assert_eq!(mgr.outstanding(), 0);
    }

    #[test]
    fn resume_missing_continuation_errors() {
        let mgr = ContinuationManager::new();
        let never = ContinuationId::from_u64(999);
        assert!(mgr.resume_with(never, Ok(Box::new(()))).is_err());
    }
}
