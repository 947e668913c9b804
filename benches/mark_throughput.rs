//! Mark-path benchmarks.
//!
//! The mark path sits on the host's block write path, so its cost is the
//! engine's most visible overhead: one hash plus two CAS ratchets.
//!
//! - `mark/hot_block`: same block repeatedly (slots already current,
//!   CAS short-circuits)
//! - `mark/uniform`: blocks spread over the keyspace (realistic write
//!   pattern)
//! - `mark/contended`: many threads ratcheting the same small table
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench mark_throughput
//! ```

use blocktrack::{BlockId, ContainerId, Lsn, TrackingTable};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

fn block(blkno: u32) -> BlockId {
    BlockId::new(ContainerId::new(1, 2, 3), 0, blkno)
}

fn bench_mark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hot_block", |b| {
        let table = TrackingTable::new(1 << 20);
        let bid = block(7);
        let mut lsn = 1u64;
        b.iter(|| {
            lsn += 1;
            table.mark(black_box(&bid), Lsn::new(lsn));
        });
    });

    group.bench_function("uniform", |b| {
        let table = TrackingTable::new(1 << 20);
        let mut lsn = 1u64;
        let mut blkno = 0u32;
        b.iter(|| {
            lsn += 1;
            blkno = blkno.wrapping_add(0x9E37_79B9);
            table.mark(black_box(&block(blkno)), Lsn::new(lsn));
        });
    });

    group.finish();
}

fn bench_contended_mark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark_contended");
    let threads = 4;
    group.throughput(Throughput::Elements(threads as u64 * 10_000));

    group.bench_function(format!("{threads}_threads_small_table"), |b| {
        b.iter(|| {
            let table = Arc::new(TrackingTable::new(64));
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let table = Arc::clone(&table);
                    std::thread::spawn(move || {
                        for i in 0..10_000u64 {
                            let lsn = Lsn::new(t as u64 * 10_000 + i + 1);
                            table.mark(&block((i % 256) as u32), lsn);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mark, bench_contended_mark);
criterion_main!(benches);
