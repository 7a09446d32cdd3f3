//! Prime Mover: a discrete-event simulation kernel and compile-time
//! entity-proxy transformer.
//!
//! This crate is the user-facing facade over the workspace: re-exports of
//! the pieces most programs need (the scheduler, the `#[entity]`/
//! `#[event]`/`#[blocking]`/`#[proxy_call]` macros, the coordination
//! primitives, and the thread-local facade functions spec.md §6 calls "the
//! only things the transformer rewrites specially") plus the `check`
//! module backing the `primemover` CLI binary.

pub mod check;

pub use primemover_kernel::clock::LogicalTime;
pub use primemover_kernel::continuation::{ContinuationId, Outcome};
pub use primemover_kernel::entity::{Args, DispatchResult, EntityHandle, EntityProxy, Ordinal, Value};
pub use primemover_kernel::error::{Diagnostic, EntityCause, KernelError};
pub use primemover_kernel::reporter::{Reporter, Statistics};
pub use primemover_kernel::scheduler::{PacingConfig, Scheduler, SchedulerConfig, SchedulerObserver};

pub use primemover_macros::{entity, proxy_call};

pub use primemover_sync::{BoundedBuffer, Channel, Inventory, InventoryConfig, Signal, SyncError};

pub use primemover_otel::{render_json, snapshot_json, EventLogger};

/// Thread-local facade functions (spec.md §6): the handful of calls the
/// transformer treats specially rather than routing through `#[proxy_call]`.
pub mod facade {
    pub use primemover_kernel::facade::*;
}
