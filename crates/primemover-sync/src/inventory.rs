//! `Inventory` — a counted stock level with a finite capacity (spec §4.5).
//!
//! `deposit(n)` suspends if the level would exceed capacity; `withdraw(n)`
//! suspends if not enough stock is available. Whether a partially available
//! withdrawal is serviced immediately (taking what's there, suspending for
//! the remainder) or must wait for the full amount is controlled by
//! [`InventoryConfig::partial_withdraw`] — strict (full-amount-only) by
//! default, matching a physical stockroom rather than a queueing-theory
//! abstraction.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use primemover_kernel::continuation::ContinuationId;
use primemover_kernel::facade::{current_continuation, suspend_self, wake};
use primemover_macros::entity;

use crate::error::SyncError;

#[derive(Debug, Clone, Copy)]
pub struct InventoryConfig {
    pub capacity: u64,
    /// When `true`, a withdrawal for more than the current level takes what
    /// is available immediately and suspends only for the shortfall. When
    /// `false` (the default), a withdrawal either gets its full amount at
    /// once or suspends entirely.
    pub partial_withdraw: bool,
}

impl InventoryConfig {
    pub fn new(capacity: u64) -> Self {
        Self { capacity, partial_withdraw: false }
    }
}

struct InventoryState {
    level: u64,
    depositors: VecDeque<(ContinuationId, u64)>,
    withdrawers: VecDeque<(ContinuationId, u64)>,
}

pub struct Inventory {
    config: InventoryConfig,
    state: Mutex<InventoryState>,
}

impl Inventory {
    pub fn new(config: InventoryConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(InventoryState {
                level: 0,
                depositors: VecDeque::new(),
                withdrawers: VecDeque::new(),
            }),
        })
    }

    pub fn with_initial(config: InventoryConfig, initial: u64) -> Arc<Self> {
        assert!(initial <= config.capacity, "initial level exceeds capacity");
        Arc::new(Self {
            config,
            state: Mutex::new(InventoryState {
                level: initial,
                depositors: VecDeque::new(),
                withdrawers: VecDeque::new(),
            }),
        })
    }

    /// The current committed level, for observability outside a dispatch
    /// (reporter snapshots, tests). Not a dispatchable method.
    pub fn level_snapshot(&self) -> u64 {
        self.state.lock().level
    }

    /// Pop and wake every depositor whose amount now fits, in FIFO order,
    /// stopping at the first one that still doesn't (head-of-line blocking,
    /// matching how `withdrawers` is drained in [`Self::satisfy_withdrawers_locked`]).
    fn satisfy_depositors_locked(st: &mut InventoryState, capacity: u64) -> Vec<ContinuationId> {
        let mut woken = Vec::new();
        while let Some(&(_, amount)) = st.depositors.front() {
            if st.level + amount > capacity {
                break;
            }
            let (id, amount) = st.depositors.pop_front().unwrap();
            st.level += amount;
            woken.push(id);
        }
        woken
    }

    /// Pop and wake depositors that satisfy the current level, returning the
    /// amount each one actually took in strict mode (always its full request)
    /// or partial mode (possibly less).
    fn satisfy_withdrawers_locked(
        st: &mut InventoryState,
        partial: bool,
    ) -> Vec<(ContinuationId, u64)> {
        let mut satisfied = Vec::new();
        loop {
            let Some(&(_, requested)) = st.withdrawers.front() else { break };
            if st.level >= requested {
                let (id, requested) = st.withdrawers.pop_front().unwrap();
                st.level -= requested;
                satisfied.push((id, requested));
            } else if partial && st.level > 0 {
                let (id, _) = st.withdrawers.pop_front().unwrap();
                let taken = st.level;
                st.level = 0;
                satisfied.push((id, taken));
                break;
            } else {
                break;
            }
        }
        satisfied
    }
}

#[entity]
impl Inventory {
    #[blocking]
    fn deposit(&self, amount: u64) -> Result<(), SyncError> {
        let (woken, suspend) = {
            let mut st = self.state.lock();
            if st.level + amount <= self.config.capacity {
                st.level += amount;
                let woken = Self::satisfy_withdrawers_locked(&mut st, self.config.partial_withdraw);
                (woken, None)
            } else {
                let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                st.depositors.push_back((id, amount));
                (Vec::new(), Some(id))
            }
        };
        for (id, taken) in woken {
            wake(id, Ok(Box::new(taken)))?;
        }
        if suspend.is_some() {
            return match suspend_self()? {
                Ok(_) => Ok(()),
                Err(cause) => Err(cause.into()),
            };
        }
        Ok(())
    }

    #[blocking]
    fn withdraw(&self, amount: u64) -> Result<u64, SyncError> {
        enum Branch {
            Taken(u64, Vec<ContinuationId>),
            Suspend,
        }
        let branch = {
            let mut st = self.state.lock();
            if self.config.partial_withdraw {
                if st.level > 0 {
                    let taken = st.level.min(amount);
                    st.level -= taken;
                    let woken = Self::satisfy_depositors_locked(&mut st, self.config.capacity);
                    if taken < amount {
                        let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                        st.withdrawers.push_back((id, amount - taken));
                    }
                    Branch::Taken(taken, woken)
                } else {
                    let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                    st.withdrawers.push_back((id, amount));
                    Branch::Suspend
                }
            } else if st.level >= amount {
                st.level -= amount;
                let woken = Self::satisfy_depositors_locked(&mut st, self.config.capacity);
                Branch::Taken(amount, woken)
            } else {
                let id = current_continuation().ok_or(SyncError::NotInDispatch)?;
                st.withdrawers.push_back((id, amount));
                Branch::Suspend
            }
        };
        match branch {
            Branch::Taken(taken, woken) => {
                for id in woken {
                    wake(id, Ok(Box::new(())))?;
                }
                if taken < amount {
                    // Partial mode, shortfall already registered above.
                    return match suspend_self()? {
                        Ok(v) => {
                            let rest = v.downcast::<u64>().map(|b| *b).map_err(|_| SyncError::Abandoned)?;
                            Ok(taken + rest)
                        }
                        Err(cause) => Err(cause.into()),
                    };
                }
                Ok(taken)
            }
            Branch::Suspend => match suspend_self()? {
                Ok(v) => v.downcast::<u64>().map(|b| *b).map_err(|_| SyncError::Abandoned),
                Err(cause) => Err(cause.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_inventory_at_requested_initial_level() {
        let inv = Inventory::with_initial(InventoryConfig::new(100), 30);
        assert_eq!(inv.state.lock().level, 30);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn initial_above_capacity_rejected() {
        let _ = Inventory::with_initial(InventoryConfig::new(10), 11);
    }

    #[test]
    fn strict_is_the_default() {
        let cfg = InventoryConfig::new(50);
        assert!(!cfg.partial_withdraw);
    }
}
