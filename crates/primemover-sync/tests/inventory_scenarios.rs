//! Reproduces the stock-level scenario: capacity 100, starting at 0, a
//! withdrawal for 50 posted at t=0 blocks until a deposit of 50 at t=100
//! satisfies it, returning at t=100 with level back at 0.

use std::sync::{Arc, Mutex};

use primemover_kernel::clock::LogicalTime;
use primemover_kernel::entity::EntityHandle;
use primemover_kernel::scheduler::{Scheduler, SchedulerConfig};
use primemover_macros::entity;
use primemover_sync::{inventory_deposit, inventory_withdraw, Inventory, InventoryConfig, SyncError};

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

struct Withdrawer {
    stock: Arc<Inventory>,
    trace: Arc<Trace>,
    amount: u64,
}

#[entity]
impl Withdrawer {
    #[blocking]
    fn run(&self) -> Result<(), SyncError> {
        let handle: EntityHandle = self.stock.clone();
        let taken = inventory_withdraw(handle, self.amount)?;
        let now = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("withdraw done:{now} taken:{taken}"));
        Ok(())
    }
}

struct Depositor {
    stock: Arc<Inventory>,
    trace: Arc<Trace>,
    amount: u64,
}

#[entity]
impl Depositor {
    #[blocking]
    fn run(&self) -> Result<(), SyncError> {
        let now = primemover_kernel::facade::current_time()?.as_u64();
        self.trace.log(format!("deposit start:{now}"));
        let handle: EntityHandle = self.stock.clone();
        inventory_deposit(handle, self.amount)?;
        Ok(())
    }
}

#[test]
fn s4_inventory_blocks_on_empty_then_resumes() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let stock = Inventory::with_initial(InventoryConfig::new(100), 0);
    let trace = Trace::new();

    let withdrawer: EntityHandle = Arc::new(Withdrawer { stock: stock.clone(), trace: trace.clone(), amount: 50 });
    sched.post_at(LogicalTime::new(0), withdrawer, Withdrawer::__pm_ordinal_run(), Box::new(())).unwrap();

    let depositor: EntityHandle = Arc::new(Depositor { stock: stock.clone(), trace: trace.clone(), amount: 50 });
    sched.post_at(LogicalTime::new(100), depositor, Depositor::__pm_ordinal_run(), Box::new(())).unwrap();

    sched.run().unwrap();

    assert_eq!(
        trace.lines(),
        vec!["deposit start:100", "withdraw done:100 taken:50"]
    );
    assert_eq!(stock.level_snapshot(), 0);
}
