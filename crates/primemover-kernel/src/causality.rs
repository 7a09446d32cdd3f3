//! The causality graph (spec §3, §9 "Causality graph ownership").
//!
//! When tracking is enabled, every posted event records which event caused
//! it. Sources are stored as indices into an append-only arena rather than
//! as owning references, so `clear()` can drop the whole graph in O(1) by
//! resetting the arena instead of walking a reference graph — this is the
//! trade-off spec §9 calls out explicitly.

use crate::clock::{LogicalTime, Sequence};

/// An index into the causality arena. Cheap to copy, carried on
/// [`crate::event::EventRecord::source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CausalityIndex(u32);

#[derive(Debug, Clone)]
struct CausalityNode {
    time: LogicalTime,
    sequence: Sequence,
    signature: String,
    parent: Option<CausalityIndex>,
}

/// Append-only arena owning the causality DAG for the lifetime of a run.
/// There is no automatic pruning (documented memory hazard, spec §3) — the
/// arena only shrinks on [`CausalityGraph::clear`].
#[derive(Debug, Default)]
pub struct CausalityGraph {
    enabled: bool,
    nodes: Vec<CausalityNode>,
}

impl CausalityGraph {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            nodes: Vec::new(),
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record a new event and return its arena index, or `None` if tracking
    /// is disabled (callers should store `None` on the event's `source` in
    /// that case, matching spec §3: "only populated when causality tracking
    /// is on").
    pub fn record(
        &mut self,
        time: LogicalTime,
        sequence: Sequence,
        signature: String,
        parent: Option<CausalityIndex>,
    ) -> Option<CausalityIndex> {
        if !self.enabled {
            return None;
        }
        let idx = CausalityIndex(self.nodes.len() as u32);
        self.nodes.push(CausalityNode {
            time,
            sequence,
            signature,
            parent,
        });
        Some(idx)
    }

    /// Walk from `leaf` back to its root, oldest-first — used to build the
    /// `causal_trace` on a [`crate::error::Diagnostic`].
    pub fn trace_from(&self, leaf: CausalityIndex) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = Some(leaf);
        while let Some(idx) = cur {
            let node = &self.nodes[idx.0 as usize];
            out.push(format!("t={} seq={} {}", node.time, node.sequence.as_u64(), node.signature));
            cur = node.parent;
        }
        out.reverse();
        out
    }

    /// Drop the entire graph in O(1) (spec §9).
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_graph_never_records() {
        let mut g = CausalityGraph::new(false);
        let idx = g.record(LogicalTime::new(0), Sequence::new(0), "root".into(), None);
        assert!(idx.is_none());
        assert!(g.is_empty());
    }

    #[test]
    fn trace_walks_oldest_first() {
        let mut g = CausalityGraph::new(true);
        let root = g
            .record(LogicalTime::new(0), Sequence::new(0), "root".into(), None)
            .unwrap();
        let child = g
            .record(LogicalTime::new(5), Sequence::new(1), "child".into(), Some(root))
            .unwrap();
        let trace = g.trace_from(child);
        assert_eq!(trace.len(), 2);
        assert!(trace[0].contains("root"));
        assert!(trace[1].contains("child"));
    }

    #[test]
    fn clear_drops_everything() {
        let mut g = CausalityGraph::new(true);
        g.record(LogicalTime::new(0), Sequence::new(0), "a".into(), None);
        assert_eq!(g.len(), 1);
        g.clear();
        assert_eq!(g.len(), 0);
    }
}
