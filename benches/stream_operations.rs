use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::executor::block_on;
use pushflow::framing::{encode_frame, FrameDecoder};
use pushflow::prelude::*;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

fn bench_basic_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic_operations");

    // Test different data sizes
    for size in [1_000i64, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("map_filter", size), size, |b, &size| {
            let pipeline = range(0, size - 1, 1)
                .map(|x| black_box(x * 2))
                .filter(|x| black_box(x % 4 == 0));
            b.iter(|| black_box(block_on(pipeline.collect()).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("fold", size), size, |b, &size| {
            let pipeline = range(0, size - 1, 1).fold(0i64, |acc, x| black_box(acc + x));
            b.iter(|| black_box(block_on(pipeline.collect()).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("partition_flatten", size), size, |b, &size| {
            let pipeline = range(0, size - 1, 1).partition(100).map(|chunk| black_box(chunk.len()));
            b.iter(|| black_box(block_on(pipeline.collect()).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("reduce_right", size), size, |b, &size| {
            let pipeline = range(0, size - 1, 1).reduce_right(|a, b| black_box(a ^ b));
            b.iter(|| black_box(block_on(pipeline.collect()).unwrap()));
        });
    }

    group.finish();
}

fn bench_limit_over_unbounded(c: &mut Criterion) {
    c.bench_function("integers_limit_10k", |b| {
        let pipeline = integers(0, 1).skip(10).limit(10_000);
        b.iter(|| black_box(block_on(pipeline.collect()).unwrap()));
    });
}

fn bench_map_async(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("map_async");

    for size in [100i64, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("spawned_resolve", size), size, |b, &size| {
            b.to_async(&rt).iter(|| async move {
                let result = range(1, size, 1)
                    .map_async(|x, resolve| {
                        tokio::spawn(async move { resolve.resolve(black_box(x * 3)) });
                    })
                    .collect()
                    .await;
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    let messages: Vec<Value> = (0..1_000)
        .map(|i| json!({"id": i, "url": format!("http://host/{}", i), "tags": ["a", "b"]}))
        .collect();
    let mut wire = Vec::new();
    for message in &messages {
        wire.extend(encode_frame(message).unwrap());
    }
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("encode_1k", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(encode_frame(message).unwrap());
            }
        })
    });

    for chunk_size in [64usize, 8192].iter() {
        let id = BenchmarkId::new("decode_1k", chunk_size);
        group.bench_with_input(id, chunk_size, |b, &chunk_size| {
            b.iter(|| {
                let mut decoder = FrameDecoder::default();
                let mut decoded = 0;
                for chunk in wire.chunks(chunk_size) {
                    decoded += decoder.push_messages::<Value>(chunk).len();
                }
                black_box(decoded)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_operations,
    bench_limit_over_unbounded,
    bench_map_async,
    bench_framing
);
criterion_main!(benches);
