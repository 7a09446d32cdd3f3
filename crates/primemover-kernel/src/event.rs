//! The event record and the queue item it is wrapped in (spec §3).

use crate::causality::CausalityIndex;
use crate::clock::{LogicalTime, Sequence};
use crate::continuation::{ContinuationId, Outcome};
use crate::entity::{Args, EntityHandle, Ordinal};

/// Where an [`EventRecord`] was posted from, captured only when
/// [`crate::scheduler::SchedulerConfig::capture_debug_sites`] is set (spec
/// §1, §3 `debug_site`).
#[derive(Debug, Clone)]
pub struct DebugSite {
    pub file: &'static str,
    pub line: u32,
    pub poster: Option<String>,
}

/// A scheduled invocation of an entity method at a specific logical time
/// (spec §3 "Event record").
pub struct EventRecord {
    pub time: LogicalTime,
    pub entity: EntityHandle,
    pub ordinal: Ordinal,
    pub args: Args,
    /// Populated only when causality tracking is on.
    pub source: Option<CausalityIndex>,
    /// Whether the poster is suspended awaiting this event's completion.
    pub blocking: bool,
    /// Present iff `blocking`; the suspended poster's continuation.
    pub continuation: Option<ContinuationId>,
    pub debug_site: Option<DebugSite>,
    pub sequence: Sequence,
}

impl EventRecord {
    /// Invariant from spec §3: `continuation.is_some() == blocking`.
    pub fn invariants_hold(&self) -> bool {
        self.continuation.is_some() == self.blocking
    }

    pub fn signature(&self) -> String {
        self.entity
            .signature_for(self.ordinal)
            .unwrap_or_else(|| format!("{}#{}", self.entity.entity_name(), self.ordinal))
    }
}

/// A resumption record: wakes a parked continuation with an already-known
/// outcome. Ordered by `(time, sequence)` exactly like an [`EventRecord`]
/// (spec §4.2 "A continuation's resumption is itself an event").
pub struct ResumptionRecord {
    pub time: LogicalTime,
    pub sequence: Sequence,
    pub continuation: ContinuationId,
    pub outcome: Outcome,
}

/// Either kind of item the queue orders by `(time, sequence)`.
pub enum QueueItem {
    Invoke(EventRecord),
    Resume(ResumptionRecord),
}

impl QueueItem {
    pub fn time(&self) -> LogicalTime {
        match self {
            QueueItem::Invoke(e) => e.time,
            QueueItem::Resume(r) => r.time,
        }
    }

    pub fn sequence(&self) -> Sequence {
        match self {
            QueueItem::Invoke(e) => e.sequence,
            QueueItem::Resume(r) => r.sequence,
        }
    }
}
