//! The Reporter adapter (spec §6): a pluggable sink for end-of-run
//! statistics, independent of [`crate::scheduler::SchedulerObserver`] which
//! sees per-event boundaries as they happen.

use std::any::Any;
use std::collections::HashMap;

/// One named, boxed statistic. Concrete reporters (e.g. the otel crate's
/// JSON emitter) downcast the values they know how to render and ignore
/// the rest.
pub type Statistics = HashMap<String, Box<dyn Any + Send>>;

/// A consumer of end-of-run statistics (spec §6 "Reporter").
pub trait Reporter: Send + Sync {
    /// Short identifier, e.g. `"queue-depth"`.
    fn name(&self) -> &str;

    /// A free-form category string a dashboard might group by, e.g.
    /// `"gauge"` or `"histogram"`.
    fn kind(&self) -> &str;

    /// Snapshot of this reporter's current statistics.
    fn statistics(&self) -> Statistics;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u64);
    impl Reporter for Counter {
        fn name(&self) -> &str {
            "events-dispatched"
        }
        fn kind(&self) -> &str {
            "counter"
        }
        fn statistics(&self) -> Statistics {
            let mut m: Statistics = HashMap::new();
            m.insert("total".to_string(), Box::new(self.0));
            m
        }
    }

    #[test]
    fn statistics_roundtrip_through_any() {
        let r = Counter(42);
        let stats = r.statistics();
        let total = stats.get("total").unwrap().downcast_ref::<u64>().unwrap();
        assert_eq!(*total, 42);
    }
}
