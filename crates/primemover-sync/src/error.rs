//! Error taxonomy for the coordination primitives (spec §4.5). Layered over
//! [`KernelError`] the way the teacher's workflow errors wrap lower-level
//! causes with `#[from]`, rather than inventing a parallel hierarchy.

use primemover_kernel::error::{EntityCause, KernelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A primitive's method reached facade code without a continuation
    /// installed on the calling thread — always a transformer/call-site
    /// bug, never a condition the simulated model can observe.
    #[error("coordination primitive method called outside a dispatch")]
    NotInDispatch,

    /// The simulation ended while this call was still suspended (spec §4.2:
    /// abandoned continuations unwind without running the rest of their body).
    #[error("simulation ended while suspended on a coordination primitive")]
    Abandoned,

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl From<EntityCause> for SyncError {
    fn from(_: EntityCause) -> Self {
        // The only `Err` a coordination primitive's own suspension ever
        // resolves to is the kernel reporting the run ended mid-wait; a
        // real entity exception has nowhere to originate from inside
        // `suspend_self`, since nothing is dispatched on its behalf.
        SyncError::Abandoned
    }
}
