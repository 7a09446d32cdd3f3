use primemover_kernel::clock::LogicalTime;
use primemover_kernel::continuation::Outcome;
use primemover_kernel::scheduler::SchedulerObserver;

/// A [`SchedulerObserver`] that turns each dispatch into a `tracing` event
/// pair at `trace` level. Install with `scheduler.add_observer(Arc::new(EventLogger))`.
///
/// Carries no state of its own; every scheduler can share one instance.
#[derive(Debug, Default)]
pub struct EventLogger;

impl SchedulerObserver for EventLogger {
    fn on_event_start(&self, time: LogicalTime, signature: &str) {
        tracing::trace!(target: "primemover::dispatch", t = time.as_u64(), signature, "dispatch start");
    }

    fn on_event_end(&self, time: LogicalTime, signature: &str, outcome: &Outcome) {
        match outcome {
            Ok(_) => {
                tracing::trace!(target: "primemover::dispatch", t = time.as_u64(), signature, "dispatch end");
            }
            Err(cause) => {
                tracing::warn!(
                    target: "primemover::dispatch",
                    t = time.as_u64(),
                    signature,
                    cause = %cause,
                    "dispatch raised"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_event_start_does_not_panic_with_no_subscriber_installed() {
        EventLogger.on_event_start(LogicalTime::new(0), "Foo::bar");
    }

    #[test]
    fn on_event_end_handles_both_outcomes() {
        EventLogger.on_event_end(LogicalTime::new(0), "Foo::bar", &Ok(Box::new(())));
    }
}
