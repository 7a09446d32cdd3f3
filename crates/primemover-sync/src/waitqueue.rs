//! A small FIFO waiter registry shared by the coordination primitives
//! (spec §4.5: "waiter order is stable: equal-time wakeups preserve
//! enqueue order"). Protected by a plain mutex rather than anything
//! blocking: the scheduler's single-active-continuation discipline means
//! these bodies never actually contend, the lock just satisfies `Send`.

use std::collections::VecDeque;

use parking_lot::Mutex;
use primemover_kernel::continuation::ContinuationId;

/// Reason a call suspended via [`primemover_kernel::facade::suspend_self`]
/// resumes. Carried as the woken value for primitives whose suspension
/// isn't itself the payload (`Signal`; `Channel`/`BoundedBuffer` carry the
/// exchanged item instead and don't need this).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Satisfied,
    TimedOut,
}

/// FIFO queue of parked continuations, each carrying a caller-defined
/// payload (the amount a withdrawer wants, the item a blocked putter is
/// holding, ...).
pub struct WaitQueue<P> {
    waiters: Mutex<VecDeque<(ContinuationId, P)>>,
}

impl<P> Default for WaitQueue<P> {
    fn default() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }
}

impl<P> WaitQueue<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: ContinuationId, payload: P) {
        self.waiters.lock().push_back((id, payload));
    }

    pub fn pop_front(&self) -> Option<(ContinuationId, P)> {
        self.waiters.lock().pop_front()
    }

    pub fn front_ready(&self, ready: impl Fn(&P) -> bool) -> bool {
        self.waiters.lock().front().map(|(_, p)| ready(p)).unwrap_or(false)
    }

    /// Remove `id` wherever it sits in the queue (used by a timeout expiry
    /// to cancel a still-pending wait). `None` means it already resolved
    /// through the normal path, so the expiry is a no-op.
    pub fn cancel(&self, id: ContinuationId) -> Option<P> {
        let mut waiters = self.waiters.lock();
        let pos = waiters.iter().position(|(w, _)| *w == id)?;
        waiters.remove(pos).map(|(_, payload)| payload)
    }

    pub fn drain(&self) -> Vec<(ContinuationId, P)> {
        self.waiters.lock().drain(..).collect()
    }
}
