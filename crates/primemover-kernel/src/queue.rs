//! The event queue: a priority structure ordered by `(time, sequence)`,
//! with an optional randomization mode for exposing races in user models
//! (spec §3 "Event queue").
//!
//! Same-time events are grouped in arrival (sequence) order. In FIFO mode
//! popping a group always takes its oldest member; in randomized mode the
//! group is drawn from uniformly without replacement.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::LogicalTime;
use crate::event::QueueItem;

/// Tie-break policy for events sharing the same logical time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// FIFO by posting order (spec default).
    Fifo,
    /// Uniform draw without replacement among same-time events. Mutually
    /// exclusive with deterministic trace comparison (spec §9).
    Randomized,
}

pub struct EventQueue {
    by_time: BTreeMap<LogicalTime, VecDeque<QueueItem>>,
    len: usize,
    tie_break: TieBreak,
    rng: StdRng,
}

impl EventQueue {
    pub fn new(tie_break: TieBreak, seed: u64) -> Self {
        Self {
            by_time: BTreeMap::new(),
            len: 0,
            tie_break,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn push(&mut self, item: QueueItem) {
        self.by_time.entry(item.time()).or_default().push_back(item);
        self.len += 1;
    }

    /// Remove and return the earliest item, or `None` if empty.
    pub fn pop(&mut self) -> Option<QueueItem> {
        let &earliest = self.by_time.keys().next()?;
        let bucket = self.by_time.get_mut(&earliest)?;
        let item = match self.tie_break {
            TieBreak::Fifo => bucket.pop_front(),
            TieBreak::Randomized => {
                let idx = self.rng.gen_range(0..bucket.len());
                bucket.remove(idx)
            }
        };
        if bucket.is_empty() {
            self.by_time.remove(&earliest);
        }
        if item.is_some() {
            self.len -= 1;
        }
        item
    }

    pub fn peek_time(&self) -> Option<LogicalTime> {
        self.by_time.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Drop every pending item (`Scheduler::clear`).
    pub fn clear(&mut self) {
        self.by_time.clear();
        self.len = 0;
    }

    /// Discard every item strictly after `cutoff` (used by `end_at` per
    /// spec §4.1: "events strictly after `t` are discarded at their pop
    /// time" — we evict eagerly here instead, which is observably
    /// equivalent and avoids popping work the loop would just discard).
    pub fn discard_after(&mut self, cutoff: LogicalTime) {
        let tail: Vec<LogicalTime> = self
            .by_time
            .range((std::ops::Bound::Excluded(cutoff), std::ops::Bound::Unbounded))
            .map(|(&t, _)| t)
            .collect();
        for t in tail {
            if let Some(bucket) = self.by_time.remove(&t) {
                self.len -= bucket.len();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Sequence;
    use crate::continuation::ContinuationId;
    use crate::event::ResumptionRecord;

    fn resume(time: u64, seq: u64) -> QueueItem {
        QueueItem::Resume(ResumptionRecord {
            time: LogicalTime::new(time),
            sequence: Sequence::new(seq),
            continuation: ContinuationId::from_u64(0),
            outcome: Ok(Box::new(())),
        })
    }

    #[test]
    fn fifo_pop_is_ascending_time_then_sequence() {
        let mut q = EventQueue::new(TieBreak::Fifo, 0);
        q.push(resume(10, 0));
        q.push(resume(0, 1));
        q.push(resume(0, 2));
        let a = q.pop().unwrap();
        let b = q.pop().unwrap();
        let c = q.pop().unwrap();
        assert_eq!(a.time(), LogicalTime::new(0));
        assert_eq!(a.sequence(), Sequence::new(1));
        assert_eq!(b.time(), LogicalTime::new(0));
        assert_eq!(b.sequence(), Sequence::new(2));
        assert_eq!(c.time(), LogicalTime::new(10));
    }

    #[test]
    fn discard_after_drops_strictly_later_items() {
        let mut q = EventQueue::new(TieBreak::Fifo, 0);
        q.push(resume(0, 0));
        q.push(resume(5, 1));
        q.push(resume(10, 2));
        q.discard_after(LogicalTime::new(5));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn empty_queue_pops_none() {
        let mut q = EventQueue::new(TieBreak::Fifo, 0);
        assert!(q.pop().is_none());
    }
}
