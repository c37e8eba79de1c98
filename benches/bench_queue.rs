//! Throughput benchmarks for `put_nowait`/`get_nowait`, parameterized by
//! element size the same way the original benchmark harness compared
//! queue implementations across payload sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringshm::Queue;

const CAPACITY: i64 = 4096;

fn cleanup(name: &str) {
    let _ = ringshm::segment::Segment::unlink(name);
}

fn bench_single_thread_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_get single-thread");

    for element_size in [8usize, 64, 1024, 4096] {
        group.throughput(Throughput::Bytes(element_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(element_size),
            &element_size,
            |b, &element_size| {
                let name = format!("/ringshm-bench-{element_size}-{}", std::process::id());
                cleanup(&name);
                let queue = Queue::create(&name, Some(element_size as i64), Some(CAPACITY)).unwrap();
                let payload = vec![0u8; element_size];

                b.iter(|| {
                    queue.put_nowait(black_box(&payload)).unwrap();
                    let _ = black_box(queue.get_nowait().unwrap());
                });

                queue.close();
                cleanup(&name);
            },
        );
    }

    group.finish();
}

fn bench_sustained_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_get sustained");
    const MESSAGES: usize = 50_000;
    group.throughput(Throughput::Elements(MESSAGES as u64));
    group.sample_size(20);

    group.bench_function("8B_x_50k", |b| {
        let name = format!("/ringshm-bench-sustained-{}", std::process::id());
        cleanup(&name);
        let queue = Queue::create(&name, Some(8), Some(CAPACITY)).unwrap();
        let payload = [0u8; 8];

        b.iter(|| {
            for _ in 0..MESSAGES {
                while queue.put_nowait(black_box(&payload)).is_err() {
                    let _ = queue.get_nowait();
                }
                let _ = black_box(queue.get_nowait());
            }
        });

        queue.close();
        cleanup(&name);
    });

    group.finish();
}

criterion_group!(benches, bench_single_thread_put_get, bench_sustained_throughput);
criterion_main!(benches);
