//! Tree key ordering benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvmirror_bench::utils::mixed_keys;
use kvmirror_storage::{sort_records, sort_tree_keys, tree_key_cmp, RemoteRecord};

/// Benchmark single comparisons across key shapes.
fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    group.bench_function("int_int", |b| {
        b.iter(|| tree_key_cmp(black_box("123"), black_box("1234")));
    });

    group.bench_function("int_string", |b| {
        b.iter(|| tree_key_cmp(black_box("42"), black_box("answer")));
    });

    group.bench_function("padded_tie", |b| {
        b.iter(|| tree_key_cmp(black_box("7"), black_box("007")));
    });

    group.bench_function("out_of_range", |b| {
        b.iter(|| tree_key_cmp(black_box("2147483648"), black_box("-2147483649")));
    });

    group.finish();
}

/// Benchmark sorting keys and records.
fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for count in [100, 1_000, 10_000] {
        let keys = mixed_keys(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("keys", count), &keys, |b, keys| {
            b.iter(|| {
                let mut keys = keys.clone();
                sort_tree_keys(&mut keys);
                black_box(keys);
            });
        });

        let records: Vec<RemoteRecord> = keys
            .iter()
            .map(|key| RemoteRecord::new(key.as_str(), b"null".to_vec()))
            .collect();
        group.bench_with_input(BenchmarkId::new("records", count), &records, |b, records| {
            b.iter(|| {
                let mut records = records.clone();
                sort_records(&mut records);
                black_box(records);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compare, bench_sort);
criterion_main!(benches);
