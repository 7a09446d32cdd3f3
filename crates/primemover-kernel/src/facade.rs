//! The thread-local facade (spec §5 "Facade / free functions").
//!
//! `#[entity]`/`#[blocking]`-generated proxy bodies never hold a reference
//! to the scheduler directly; they call these free functions, which look up
//! whatever [`Scheduler`] is currently installed on the calling thread. This
//! mirrors the contract spec §9 calls out: "a transformed method reaches
//! the kernel only through facade calls, never by holding a scheduler
//! reference directly", so swapping the installed scheduler (e.g. between
//! test cases) never requires touching generated code.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::LogicalTime;
use crate::continuation::{ContinuationId, Outcome};
use crate::entity::{Args, EntityHandle, Ordinal};
use crate::error::KernelError;
use crate::scheduler::{Scheduler, SchedulerState};

thread_local! {
    static CONTROLLER: RefCell<Option<Arc<Scheduler>>> = const { RefCell::new(None) };
}

/// Install `scheduler` as the current thread's controller. Each worker
/// thread a dispatch spawns inherits nothing automatically — the kernel
/// calls this for every continuation thread it starts, so generated code
/// never needs to.
pub fn set_controller(scheduler: Arc<Scheduler>) {
    CONTROLLER.with(|c| *c.borrow_mut() = Some(scheduler));
}

pub fn clear_controller() {
    CONTROLLER.with(|c| *c.borrow_mut() = None);
}

/// The scheduler installed on the calling thread, or
/// [`KernelError::NoController`] if none is.
pub fn controller() -> Result<Arc<Scheduler>, KernelError> {
    CONTROLLER.with(|c| c.borrow().clone()).ok_or(KernelError::NoController)
}

pub fn current_time() -> Result<LogicalTime, KernelError> {
    Ok(controller()?.current_time())
}

pub fn simulation_is_running() -> bool {
    controller().map(|s| s.state() == SchedulerState::Running).unwrap_or(false)
}

pub fn end_simulation() -> Result<(), KernelError> {
    let scheduler = controller()?;
    scheduler.end_at(scheduler.current_time());
    Ok(())
}

pub fn end_simulation_at(t: LogicalTime) -> Result<(), KernelError> {
    controller()?.end_at(t);
    Ok(())
}

#[track_caller]
pub fn post(entity: EntityHandle, ordinal: Ordinal, args: Args) -> Result<(), KernelError> {
    controller()?.post(entity, ordinal, args)
}

#[track_caller]
pub fn post_at(time: LogicalTime, entity: EntityHandle, ordinal: Ordinal, args: Args) -> Result<(), KernelError> {
    controller()?.post_at(time, entity, ordinal, args)
}

/// Suspend the calling continuation until `entity#ordinal` completes at
/// `time`. The building block every `#[blocking]`-generated call site
/// compiles down to.
#[track_caller]
pub fn post_blocking(
    time: LogicalTime,
    entity: EntityHandle,
    ordinal: Ordinal,
    args: Args,
) -> Result<Outcome, KernelError> {
    controller()?.post_blocking(time, entity, ordinal, args)
}

/// Suspend the calling continuation for `duration` logical units, via the
/// scheduler's built-in timer entity (spec §2 "sleep").
pub fn sleep(duration: u64) -> Result<(), KernelError> {
    let sched = controller()?;
    let wake_at = sched.current_time().saturating_add(duration);
    sched
        .post_blocking(wake_at, timer::handle(), timer::WAKE, Box::new(()))?
        .map(|_| ())
        .map_err(|cause| KernelError::EntityException {
            entity: "Timer".to_string(),
            ordinal: timer::WAKE,
            time: wake_at,
            causal_trace: Vec::new(),
            cause,
        })
}

/// The continuation id of the dispatch running on the calling thread, or
/// `None` outside any dispatch. The coordination primitives (spec §4.5)
/// use this to register themselves as a waiter before suspending.
pub fn current_continuation() -> Option<ContinuationId> {
    crate::continuation::current_continuation_id()
}

/// Suspend the calling continuation with no posted reply event, to be
/// woken later by [`wake`]. Building block for primitives whose blocking
/// condition is resolved by another entity's dispatch (e.g. `Signal`,
/// `Channel`) rather than by a single posted call completing.
pub fn suspend_self() -> Result<Outcome, KernelError> {
    controller()?.suspend_self()
}

/// Wake a continuation suspended via [`suspend_self`], delivering `outcome`
/// at the current logical time.
pub fn wake(continuation: ContinuationId, outcome: Outcome) -> Result<(), KernelError> {
    controller()?.wake(continuation, outcome);
    Ok(())
}

/// Really block the calling OS thread for the wall-clock equivalent of
/// `duration` logical units under the controller's pacing configuration,
/// falling back to an immediate return if pacing isn't configured. Useful
/// for a driver thread watching a live run rather than code running
/// inside a dispatch, where [`sleep`] (which suspends a continuation)
/// doesn't apply.
pub fn blocking_sleep(duration: u64, units_per_second: f64) -> Result<(), KernelError> {
    let _ = controller()?;
    if units_per_second > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(duration as f64 / units_per_second));
    }
    Ok(())
}

/// The kernel's built-in no-op entity used to implement [`sleep`] — posting
/// to it and waiting for its (instant) dispatch is how a pure time delay is
/// expressed in a model built entirely from events.
mod timer {
    use super::*;
    use crate::entity::{DispatchResult, EntityProxy};
    use std::sync::OnceLock;

    pub const WAKE: Ordinal = 0;

    struct Timer;

    impl EntityProxy for Timer {
        fn dispatch(&self, _ordinal: Ordinal, _args: Args) -> DispatchResult {
            Ok(Box::new(()))
        }
        fn signature_for(&self, _ordinal: Ordinal) -> Option<String> {
            Some("Timer#wake".to_string())
        }
        fn valid_ordinals(&self) -> &[Ordinal] {
            &[WAKE]
        }
        fn entity_name(&self) -> &str {
            "Timer"
        }
    }

    pub fn handle() -> EntityHandle {
        static TIMER: OnceLock<EntityHandle> = OnceLock::new();
        TIMER.get_or_init(|| Arc::new(Timer)).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;

    #[test]
    fn no_controller_installed_is_reported() {
        clear_controller();
        assert!(matches!(current_time(), Err(KernelError::NoController)));
    }

    #[test]
    fn installed_controller_reports_its_time() {
        let sched = Scheduler::new(SchedulerConfig::default());
        set_controller(sched.clone());
        assert_eq!(current_time().unwrap(), LogicalTime::ZERO);
        clear_controller();
    }
}
