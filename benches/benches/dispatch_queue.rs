// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_dispatch::{Dispatcher, MergeKey, Priority};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");
    for n in [100_usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("mixed_priorities_n{n}"), |b| {
            b.iter_batched(
                || {
                    let dispatcher = Dispatcher::new();
                    let counter = Arc::new(AtomicUsize::new(0));
                    for i in 0..n {
                        let counter = counter.clone();
                        let priority = Priority::ALL[i % Priority::COUNT];
                        dispatcher.enqueue(priority, move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                            Ok(())
                        });
                    }
                    dispatcher
                },
                |dispatcher| black_box(dispatcher.process()),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    // 64 windows, each invalidated 32 times per turn.
    group.throughput(Throughput::Elements(64 * 32));
    group.bench_function("render_pass_w64_x32", |b| {
        let dispatcher = Dispatcher::new();
        b.iter(|| {
            for _ in 0..32 {
                for window in 0..64 {
                    dispatcher.enqueue_merged(
                        Priority::Render,
                        MergeKey::render_pass(window),
                        || Ok(()),
                    );
                }
            }
            black_box(dispatcher.process())
        });
    });
    group.finish();
}

fn bench_operation(c: &mut Criterion) {
    c.bench_function("enqueue_with_operation_abort_half", |b| {
        b.iter_batched(
            Dispatcher::new,
            |dispatcher| {
                let ops: Vec<_> = (0..256)
                    .map(|_| dispatcher.enqueue_with_operation(Priority::Normal, || Ok(())))
                    .collect();
                for op in ops.iter().step_by(2) {
                    op.abort();
                }
                black_box(dispatcher.process())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_drain, bench_merge, bench_operation);
criterion_main!(benches);
