//! Reproduces the bounded-buffer scenario: capacity 2, a producer puts
//! three items starting at t=0 (the third blocks until a consumer takes
//! one at t=100), the timing of each "put" settling is what's checked.

use std::sync::{Arc, Mutex};

use primemover_kernel::clock::LogicalTime;
use primemover_kernel::entity::EntityHandle;
use primemover_kernel::scheduler::{Scheduler, SchedulerConfig};
use primemover_macros::entity;
use primemover_sync::{buffer_put_u64, buffer_take_u64, BoundedBuffer, SyncError};

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

struct Producer {
    buffer: Arc<BoundedBuffer<u64>>,
    trace: Arc<Trace>,
    label: &'static str,
    value: u64,
}

#[entity]
impl Producer {
    #[blocking]
    fn run(&self) -> Result<(), SyncError> {
        let start = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("put {} start:{start}", self.label));
        let handle: EntityHandle = self.buffer.clone();
        buffer_put_u64(handle, self.value)?;
        let done = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("put {} done:{done}", self.label));
        Ok(())
    }
}

struct Consumer {
    buffer: Arc<BoundedBuffer<u64>>,
    trace: Arc<Trace>,
}

#[entity]
impl Consumer {
    #[blocking]
    fn run(&self) -> Result<(), SyncError> {
        let handle: EntityHandle = self.buffer.clone();
        let value = buffer_take_u64(handle)?;
        let now = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("take done:{now} value:{value}"));
        Ok(())
    }
}

#[test]
fn s3_bounded_buffer_blocks_third_producer() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let buffer = BoundedBuffer::<u64>::new(2);
    let trace = Trace::new();

    for (label, value) in [("A", 1u64), ("B", 2), ("C", 3)] {
        let producer: EntityHandle = Arc::new(Producer {
            buffer: buffer.clone(),
            trace: trace.clone(),
            label,
            value,
        });
        sched.post_at(LogicalTime::new(0), producer, Producer::__pm_ordinal_run(), Box::new(())).unwrap();
    }
    let consumer: EntityHandle = Arc::new(Consumer { buffer: buffer.clone(), trace: trace.clone() });
    sched.post_at(LogicalTime::new(100), consumer, Consumer::__pm_ordinal_run(), Box::new(())).unwrap();

    sched.run().unwrap();

    let lines = trace.lines();
    assert!(lines.contains(&"put A start:0".to_string()));
    assert!(lines.contains(&"put A done:0".to_string()));
    assert!(lines.contains(&"put B start:0".to_string()));
    assert!(lines.contains(&"put B done:0".to_string()));
    assert!(lines.contains(&"put C start:0".to_string()));
    assert!(lines.contains(&"put C done:100".to_string()));
}
