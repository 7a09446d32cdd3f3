//! `Signal` — a condvar without a mutex (spec §4.5).
//!
//! `wait()` suspends the caller; `notify_one()` wakes the oldest waiter;
//! `notify_all()` wakes every waiter, each resuming at the current logical
//! time. Waking with no waiters queued is a no-op.

use std::sync::{Arc, OnceLock};

use primemover_kernel::continuation::ContinuationId;
use primemover_kernel::entity::EntityHandle;
use primemover_kernel::facade::{current_continuation, current_time, post_at, suspend_self, wake};
use primemover_macros::entity;

use crate::error::SyncError;
use crate::waitqueue::{WaitQueue, WakeReason};

pub struct Signal {
    waiters: WaitQueue<()>,
    self_handle: OnceLock<EntityHandle>,
}

impl Signal {
    pub fn new() -> Arc<Self> {
        let signal = Arc::new(Self {
            waiters: WaitQueue::new(),
            self_handle: OnceLock::new(),
        });
        let handle: EntityHandle = signal.clone();
        let _ = signal.self_handle.set(handle);
        signal
    }

    fn handle(&self) -> EntityHandle {
        self.self_handle
            .get()
            .cloned()
            .expect("Signal::new always installs its own handle before returning")
    }
}

#[entity]
impl Signal {
    /// Suspend the caller until `notify_one`/`notify_all` wakes it.
    #[blocking]
    fn wait(&self) -> Result<(), SyncError> {
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.waiters.push(id, ());
        match suspend_self()? {
            Ok(_) => Ok(()),
            Err(cause) => Err(cause.into()),
        }
    }

    /// Suspend the caller until woken, or until `duration` logical units
    /// pass, whichever comes first (spec §2 supplemental: cancellation via
    /// a parallel expiry event).
    #[blocking]
    fn wait_timeout(&self, duration: u64) -> Result<WakeReason, SyncError> {
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.waiters.push(id, ());
        let deadline = current_time()?.saturating_add(duration);
        post_at(deadline, self.handle(), Self::__pm_ordinal_expire(), Box::new((id,)))?;
        match suspend_self()? {
            Ok(v) => v.downcast::<WakeReason>().map(|b| *b).map_err(|_| SyncError::Abandoned),
            Err(cause) => Err(cause.into()),
        }
    }

    #[event]
    fn notify_one(&self) -> Result<(), SyncError> {
        if let Some((waiter, ())) = self.waiters.pop_front() {
            wake(waiter, Ok(Box::new(WakeReason::Satisfied)))?;
        }
        Ok(())
    }

    #[event]
    fn notify_all(&self) -> Result<(), SyncError> {
        for (waiter, ()) in self.waiters.drain() {
            wake(waiter, Ok(Box::new(WakeReason::Satisfied)))?;
        }
        Ok(())
    }

    /// Fired by the parallel expiry event a `wait_timeout` call schedules
    /// against itself. A no-op if `waiter` already resolved through
    /// `notify_one`/`notify_all` first.
    #[event]
    fn expire(&self, waiter: ContinuationId) -> Result<(), SyncError> {
        if self.waiters.cancel(waiter).is_some() {
            wake(waiter, Ok(Box::new(WakeReason::TimedOut)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_signal_has_no_waiters() {
        let s = Signal::new();
        assert!(s.waiters.pop_front().is_none());
    }
}
