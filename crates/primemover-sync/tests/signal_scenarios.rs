//! Reproduces the Signal scenarios from the coordination-primitives
//! contract: a single waiter woken by a later signal, and three waiters
//! woken in FIFO order by three separate signals.

use std::sync::{Arc, Mutex};

use primemover_kernel::clock::LogicalTime;
use primemover_kernel::entity::EntityHandle;
use primemover_kernel::scheduler::{Scheduler, SchedulerConfig};
use primemover_macros::entity;
use primemover_sync::{signal_wait, Signal, SyncError};

struct Trace(Mutex<Vec<String>>);

impl Trace {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Vec::new())))
    }
    fn log(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct Waiter {
    signal: Arc<Signal>,
    trace: Arc<Trace>,
}

#[entity]
impl Waiter {
    #[blocking]
    fn run(&self) -> Result<(), SyncError> {
        let before = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("waiter:before:{before}"));
        let signal_handle: EntityHandle = self.signal.clone();
        signal_wait(signal_handle)?;
        let after = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("waiter:after:{after}"));
        Ok(())
    }
}

struct Signaler {
    signal: Arc<Signal>,
    trace: Arc<Trace>,
}

#[entity]
impl Signaler {
    #[event]
    fn ring(&self) -> Result<(), SyncError> {
        let now = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("signaler:{now}"));
        let signal_handle: EntityHandle = self.signal.clone();
        primemover_kernel::facade::post(signal_handle, Signal::__pm_ordinal_notify_one(), Box::new(()))?;
        Ok(())
    }
}

#[test]
fn s1_signal_wakes_waiter() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let signal = Signal::new();
    let trace = Trace::new();

    let waiter: EntityHandle = Arc::new(Waiter { signal: signal.clone(), trace: trace.clone() });
    let signaler: EntityHandle = Arc::new(Signaler { signal: signal.clone(), trace: trace.clone() });

    sched.post_at(LogicalTime::new(0), waiter, Waiter::__pm_ordinal_run(), Box::new(())).unwrap();
    sched.post_at(LogicalTime::new(100), signaler, Signaler::__pm_ordinal_ring(), Box::new(())).unwrap();

    sched.run().unwrap();

    assert_eq!(
        trace.lines(),
        vec!["waiter:before:0", "signaler:100", "waiter:after:100"]
    );
}

#[test]
fn s2_signal_fifo_with_three_waiters() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let signal = Signal::new();
    let trace = Trace::new();

    for t in [0, 10, 20] {
        let waiter: EntityHandle = Arc::new(Waiter { signal: signal.clone(), trace: trace.clone() });
        sched.post_at(LogicalTime::new(t), waiter, Waiter::__pm_ordinal_run(), Box::new(())).unwrap();
    }
    for t in [100, 200, 300] {
        let signaler: EntityHandle = Arc::new(Signaler { signal: signal.clone(), trace: trace.clone() });
        sched.post_at(LogicalTime::new(t), signaler, Signaler::__pm_ordinal_ring(), Box::new(())).unwrap();
    }

    sched.run().unwrap();

    assert_eq!(
        trace.lines(),
        vec![
            "waiter:before:0",
            "waiter:before:10",
            "waiter:before:20",
            "signaler:100",
            "waiter:after:100",
            "signaler:200",
            "waiter:after:200",
            "signaler:300",
            "waiter:after:300",
        ]
    );
}
