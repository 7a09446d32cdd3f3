//! `BoundedBuffer<T>` — a FIFO buffer of fixed capacity `N > 0` (spec §4.5).
//!
//! `put(x)` suspends when full; `take()` suspends when empty. Item order
//! and waiter order are both FIFO; multiple producers/consumers permitted.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use primemover_kernel::continuation::ContinuationId;
use primemover_kernel::facade::{current_continuation, suspend_self, wake};
use primemover_macros::entity;

use crate::error::SyncError;

struct BufferState<T> {
    items: VecDeque<T>,
    /// Producers blocked because the buffer was full when they called
    /// `put`, holding the item they haven't been able to place yet.
    pending_puts: VecDeque<(ContinuationId, T)>,
    /// Consumers blocked because the buffer was empty.
    pending_takes: VecDeque<ContinuationId>,
}

pub struct BoundedBuffer<T: Send + 'static> {
    capacity: usize,
    state: Mutex<BufferState<T>>,
    _marker: PhantomData<T>,
}

impl<T: Send + 'static> BoundedBuffer<T> {
    /// `capacity` must be greater than zero (spec §4.5); a zero-capacity
    /// request for rendezvous semantics is [`crate::channel::Channel`].
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "BoundedBuffer capacity must be > 0; use Channel for rendezvous");
        Arc::new(Self {
            capacity,
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                pending_puts: VecDeque::new(),
                pending_takes: VecDeque::new(),
            }),
            _marker: PhantomData,
        })
    }
}

#[entity]
impl<T: Send + 'static> BoundedBuffer<T> {
    #[blocking]
    fn put(&self, value: T) -> Result<(), SyncError> {
        let commit = {
            let mut st = self.state.lock();
            if let Some(taker) = st.pending_takes.pop_front() {
                Some((taker, value))
            } else if st.items.len() < self.capacity {
                st.items.push_back(value);
                None
            } else {
                let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                st.pending_puts.push_back((id, value));
                return match suspend_self()? {
                    Ok(_) => Ok(()),
                    Err(cause) => Err(cause.into()),
                };
            }
        };
        if let Some((taker, value)) = commit {
            wake(taker, Ok(Box::new(value)))?;
        }
        Ok(())
    }

    #[blocking]
    fn take(&self) -> Result<T, SyncError> {
        enum Ready<T> {
            Item(T),
            Pending(ContinuationId, T),
        }
        let ready = {
            let mut st = self.state.lock();
            if let Some(item) = st.items.pop_front() {
                if let Some((putter, value)) = st.pending_puts.pop_front() {
                    st.items.push_back(value);
                    Some(Ready::Pending(putter, item))
                } else {
                    Some(Ready::Item(item))
                }
            } else if let Some((putter, value)) = st.pending_puts.pop_front() {
                Some(Ready::Pending(putter, value))
            } else {
                let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                st.pending_takes.push_back(id);
                None
            }
        };
        match ready {
            Some(Ready::Item(item)) => Ok(item),
            Some(Ready::Pending(putter, item)) => {
                wake(putter, Ok(Box::new(())))?;
                Ok(item)
            }
            None => match suspend_self()? {
                Ok(v) => v.downcast::<T>().map(|b| *b).map_err(|_| SyncError::Abandoned),
                Err(cause) => Err(cause.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "capacity must be")]
    fn zero_capacity_is_rejected() {
        let _: Arc<BoundedBuffer<u32>> = BoundedBuffer::new(0);
    }

    #[test]
    fn fresh_buffer_is_empty() {
        let b: Arc<BoundedBuffer<u32>> = BoundedBuffer::new(2);
        assert!(b.state.lock().items.is_empty());
    }
}
