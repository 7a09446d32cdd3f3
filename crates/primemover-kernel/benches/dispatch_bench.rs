use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primemover_kernel::clock::LogicalTime;
use primemover_kernel::entity::{Args, DispatchResult, EntityHandle, EntityProxy, Ordinal};
use primemover_kernel::event::{EventRecord, QueueItem};
use primemover_kernel::ordinal::{assign_ordinal, hash_signature};
use primemover_kernel::queue::{EventQueue, TieBreak};
use std::collections::HashSet;
use std::sync::Arc;

struct Noop;
impl EntityProxy for Noop {
    fn dispatch(&self, _ordinal: Ordinal, _args: Args) -> DispatchResult {
        Ok(Box::new(()))
    }
    fn signature_for(&self, _ordinal: Ordinal) -> Option<String> {
        None
    }
    fn valid_ordinals(&self) -> &[Ordinal] {
        &[0]
    }
    fn entity_name(&self) -> &str {
        "Noop"
    }
}

fn bench_ordinal_assignment(c: &mut Criterion) {
    c.bench_function("assign_ordinal/cold_space", |b| {
        b.iter(|| {
            let mut used = HashSet::new();
            for i in 0..256u32 {
                let name = format!("method_{i}");
                black_box(assign_ordinal(&name, "", None, 4096, &mut used).unwrap());
            }
        })
    });

    c.bench_function("hash_signature", |b| {
        b.iter(|| black_box(hash_signature("take", "i64,String")))
    });
}

fn bench_queue_push_pop(c: &mut Criterion) {
    let entity: EntityHandle = Arc::new(Noop);
    c.bench_function("event_queue/fifo_push_pop_1k", |b| {
        b.iter(|| {
            let mut q = EventQueue::new(TieBreak::Fifo, 0);
            for t in 0..1000u64 {
                q.push(QueueItem::Invoke(EventRecord {
                    time: LogicalTime::new(t % 50),
                    entity: entity.clone(),
                    ordinal: 0,
                    args: Box::new(()),
                    source: None,
                    blocking: false,
                    continuation: None,
                    debug_site: None,
                    sequence: primemover_kernel::clock::Sequence::new(t),
                }));
            }
            while let Some(item) = q.pop() {
                black_box(item);
            }
        })
    });
}

criterion_group!(benches, bench_ordinal_assignment, bench_queue_push_pop);
criterion_main!(benches);
