//! `Channel<T>` — a synchronous rendezvous (spec §4.5, capacity zero).
//!
//! `put(x)` suspends until a `take()` is waiting; `take()` suspends until a
//! `put(x)` is waiting. When both sides are ready the exchange happens at
//! the current logical time, with FIFO fairness among same-side waiters.

use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use primemover_kernel::continuation::ContinuationId;
use primemover_kernel::entity::EntityHandle;
use primemover_kernel::facade::{current_continuation, current_time, post_at, suspend_self, wake};
use primemover_macros::entity;

use crate::error::SyncError;
use crate::waitqueue::{WaitQueue, WakeReason};

pub struct Channel<T: Send + 'static> {
    putters: WaitQueue<T>,
    takers: WaitQueue<()>,
    self_handle: OnceLock<EntityHandle>,
    _marker: PhantomData<T>,
}

impl<T: Send + 'static> Channel<T> {
    pub fn new() -> Arc<Self> {
        let chan = Arc::new(Self {
            putters: WaitQueue::new(),
            takers: WaitQueue::new(),
            self_handle: OnceLock::new(),
            _marker: PhantomData,
        });
        let handle: EntityHandle = chan.clone();
        let _ = chan.self_handle.set(handle);
        chan
    }

    fn handle(&self) -> EntityHandle {
        self.self_handle
            .get()
            .cloned()
            .expect("Channel::new always installs its own handle before returning")
    }
}

#[entity]
impl<T: Send + 'static> Channel<T> {
    #[blocking]
    fn put(&self, value: T) -> Result<(), SyncError> {
        if let Some((taker, ())) = self.takers.pop_front() {
            wake(taker, Ok(Box::new(value)))?;
            return Ok(());
        }
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.putters.push(id, value);
        match suspend_self()? {
            Ok(_) => Ok(()),
            Err(cause) => Err(cause.into()),
        }
    }

    #[blocking]
    fn take(&self) -> Result<T, SyncError> {
        if let Some((putter, value)) = self.putters.pop_front() {
            wake(putter, Ok(Box::new(())))?;
            return Ok(value);
        }
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.takers.push(id, ());
        match suspend_self()? {
            Ok(v) => v.downcast::<T>().map(|b| *b).map_err(|_| SyncError::Abandoned),
            Err(cause) => Err(cause.into()),
        }
    }

    #[blocking]
    fn put_timeout(&self, value: T, duration: u64) -> Result<WakeReason, SyncError> {
        if let Some((taker, ())) = self.takers.pop_front() {
            wake(taker, Ok(Box::new(value)))?;
            return Ok(WakeReason::Satisfied);
        }
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.putters.push(id, value);
        let deadline = current_time()?.saturating_add(duration);
        post_at(deadline, self.handle(), Self::__pm_ordinal_expire_put(), Box::new((id,)))?;
        match suspend_self()? {
            Ok(v) => v.downcast::<WakeReason>().map(|b| *b).map_err(|_| SyncError::Abandoned),
            Err(cause) => Err(cause.into()),
        }
    }

    #[blocking]
    fn take_timeout(&self, duration: u64) -> Result<Result<T, WakeReason>, SyncError> {
        if let Some((putter, value)) = self.putters.pop_front() {
            wake(putter, Ok(Box::new(())))?;
            return Ok(Ok(value));
        }
        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
        self.takers.push(id, ());
        let deadline = current_time()?.saturating_add(duration);
        post_at(deadline, self.handle(), Self::__pm_ordinal_expire_take(), Box::new((id,)))?;
        match suspend_self()? {
            Ok(v) => match v.downcast::<T>() {
                Ok(value) => Ok(Ok(*value)),
                Err(v) => match v.downcast::<WakeReason>() {
                    Ok(reason) => Ok(Err(*reason)),
                    Err(_) => Err(SyncError::Abandoned),
                },
            },
            Err(cause) => Err(cause.into()),
        }
    }

    #[event]
    fn expire_put(&self, waiter: ContinuationId) -> Result<(), SyncError> {
        if self.putters.cancel(waiter).is_some() {
            wake(waiter, Ok(Box::new(WakeReason::TimedOut)))?;
        }
        Ok(())
    }

    #[event]
    fn expire_take(&self, waiter: ContinuationId) -> Result<(), SyncError> {
        if self.takers.cancel(waiter).is_some() {
            wake(waiter, Ok(Box::new(WakeReason::TimedOut)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_channel_has_no_waiters_either_side() {
        let c: Arc<Channel<u32>> = Channel::new();
        assert!(c.putters.pop_front().is_none());
        assert!(c.takers.pop_front().is_none());
    }
}
