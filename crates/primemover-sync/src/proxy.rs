//! Sanctioned call sites for the `#[blocking]` methods on this crate's
//! primitives (spec §4.5). An entity that wants to wait on a `Signal` or
//! exchange through a `Channel` calls these rather than reaching for
//! `post_blocking` itself — mirrors how `#[proxy_call]` is meant to be used
//! everywhere a `#[blocking]` method crosses an entity boundary.

use primemover_kernel::entity::EntityHandle;
use primemover_macros::proxy_call;

use crate::buffer::BoundedBuffer;
use crate::channel::Channel;
use crate::error::SyncError;
use crate::inventory::Inventory;
use crate::signal::Signal;
use crate::waitqueue::WakeReason;

#[proxy_call(entity = Signal, method = "wait")]
pub fn signal_wait(target: EntityHandle) -> Result<(), SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = Signal, method = "wait_timeout")]
pub fn signal_wait_timeout(target: EntityHandle, duration: u64) -> Result<WakeReason, SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = BoundedBuffer::<u64>, method = "put")]
pub fn buffer_put_u64(target: EntityHandle, value: u64) -> Result<(), SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = BoundedBuffer::<u64>, method = "take")]
pub fn buffer_take_u64(target: EntityHandle) -> Result<u64, SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = Inventory, method = "deposit")]
pub fn inventory_deposit(target: EntityHandle, amount: u64) -> Result<(), SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = Inventory, method = "withdraw")]
pub fn inventory_withdraw(target: EntityHandle, amount: u64) -> Result<u64, SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = Channel::<u64>, method = "put")]
pub fn channel_put_u64(target: EntityHandle, value: u64) -> Result<(), SyncError> {
    unreachable!("replaced by #[proxy_call]")
}

#[proxy_call(entity = Channel::<u64>, method = "take")]
pub fn channel_take_u64(target: EntityHandle) -> Result<u64, SyncError> {
    unreachable!("replaced by #[proxy_call]")
}
