//! Coordination primitives (spec §4.5): `Signal`, `Channel`, `BoundedBuffer`,
//! `Inventory`. None of these touch an OS mutex or condvar directly — each
//! is an ordinary `#[entity]` built on [`primemover_kernel`]'s facade, so
//! waiting and waking are just suspension and scheduled resumption like any
//! other entity method.

pub mod buffer;
pub mod channel;
pub mod error;
pub mod inventory;
pub mod proxy;
pub mod signal;
pub mod waitqueue;

pub use buffer::BoundedBuffer;
pub use channel::Channel;
pub use error::SyncError;
pub use inventory::{Inventory, InventoryConfig};
pub use proxy::{
    buffer_put_u64, buffer_take_u64, channel_put_u64, channel_take_u64, inventory_deposit,
    inventory_withdraw, signal_wait, signal_wait_timeout,
};
pub use signal::Signal;
pub use waitqueue::WakeReason;
