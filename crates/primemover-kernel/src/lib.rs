//! The discrete-event scheduler, continuation manager and entity proxy
//! contract (spec §4). This crate has no notion of "real" concurrency; it
//! is a deterministic, logical-time event loop that happens to use real OS
//! threads as its continuation storage (see [`continuation`] for why).

pub mod causality;
pub mod clock;
pub mod continuation;
pub mod entity;
pub mod error;
pub mod event;
pub mod facade;
pub mod ordinal;
pub mod queue;
pub mod reporter;
pub mod scheduler;

/// Re-exports covering the surface a transformed crate or a hand-written
/// entity typically needs.
pub mod prelude {
    pub use crate::clock::LogicalTime;
    pub use crate::continuation::ContinuationId;
    pub use crate::entity::{Args, DispatchResult, EntityHandle, EntityProxy, Ordinal, Value};
    pub use crate::error::{EntityCause, Diagnostic, KernelError};
    pub use crate::facade::{
        blocking_sleep, controller, current_continuation, current_time, end_simulation,
        end_simulation_at, post, post_at, post_blocking, set_controller, simulation_is_running,
        sleep, suspend_self, wake,
    };
    pub use crate::reporter::Reporter;
    pub use crate::scheduler::{PacingConfig, Scheduler, SchedulerConfig, SchedulerObserver, SchedulerState};
}
