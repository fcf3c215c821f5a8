//! Benchmarks for spark-stores
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_stores::{batch, derived, writable, Store};

// =============================================================================
// STORE BENCHMARKS
// =============================================================================

fn bench_store_create(c: &mut Criterion) {
    c.bench_function("store_create", |b| b.iter(|| black_box(writable(0i32))));
}

fn bench_store_set_idle(c: &mut Criterion) {
    let s = writable(0i32);
    let mut n = 0;
    c.bench_function("store_set_idle", |b| {
        b.iter(|| {
            n += 1;
            s.set(black_box(n))
        })
    });
}

fn bench_store_set_same_value(c: &mut Criterion) {
    let s = writable(42i32);
    let _sub = s.subscribe(|_| {});
    c.bench_function("store_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let s = writable(0i32);
    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| s.subscribe(|v| {
            black_box(v);
        }))
    });
}

fn bench_notify_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify_subscribers");
    for count in [1usize, 10, 100] {
        let s = writable(0i32);
        let _subs: Vec<_> = (0..count)
            .map(|_| {
                s.subscribe(|v| {
                    black_box(v);
                })
            })
            .collect();
        let mut n = 0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                n += 1;
                s.set(n)
            })
        });
    }
    group.finish();
}

// =============================================================================
// DERIVED BENCHMARKS
// =============================================================================

fn bench_derived_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_chain");
    for depth in [1usize, 10, 50] {
        let root = writable(0i32);
        let mut tail = root.readonly();
        for _ in 0..depth {
            tail = derived(tail.clone(), |v| v + 1);
        }
        let _sub = tail.subscribe(|_| {});
        let mut n = 0;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                n += 1;
                root.set(n)
            })
        });
    }
    group.finish();
}

fn bench_derived_wide(c: &mut Criterion) {
    let stores: Vec<Store<i32>> = (0..64).map(writable).collect();
    let total = derived(stores.clone(), |values| values.iter().sum::<i32>());
    let _sub = total.subscribe(|_| {});
    let mut n = 0;
    c.bench_function("derived_wide_64_batch", |b| {
        b.iter(|| {
            n += 1;
            batch(|| {
                for s in &stores {
                    s.set(n);
                }
            });
            black_box(total.get())
        })
    });
}

criterion_group!(
    store_benches,
    bench_store_create,
    bench_store_set_idle,
    bench_store_set_same_value,
    bench_subscribe_unsubscribe,
    bench_notify_subscribers,
);

criterion_group!(derived_benches, bench_derived_chain, bench_derived_wide);

criterion_main!(store_benches, derived_benches);
