//! Performance benchmarks for payload fan-out.

use barometer_watch::{Barometer, BarometerConfig, Payload, RecordingBridge};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn create_barometer() -> Barometer<RecordingBridge> {
    Barometer::new(
        RecordingBridge::new(),
        BarometerConfig {
            sink_capacity: 100_000,
            ..Default::default()
        },
    )
    .unwrap()
}

fn sample() -> Payload {
    Payload {
        timestamp: 100.0,
        pressure: 1013.25,
        ..Default::default()
    }
}

/// Benchmark delivering one payload to a growing number of callback watches
fn bench_callback_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("callback_fanout");

    for watchers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("watchers", watchers),
            &watchers,
            |b, &watchers| {
                let barometer = create_barometer();
                for _ in 0..watchers {
                    barometer
                        .watch(|p| {
                            black_box(p.pressure);
                        })
                        .unwrap();
                }

                let payload = sample();
                b.iter(|| {
                    black_box(barometer.dispatch(&payload));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark draining a queue of samples through the sink
fn bench_dispatch_pending(c: &mut Criterion) {
    c.bench_function("dispatch_pending_1000", |b| {
        let barometer = create_barometer();
        barometer.watch(|p| {
            black_box(p.altitude);
        })
        .unwrap();
        let sink = barometer.sink();

        b.iter(|| {
            for _ in 0..1000 {
                sink.emit(sample());
            }
            black_box(barometer.dispatch_pending());
        });
    });
}

/// Benchmark the watch / clear_watch session cycle
fn bench_watch_cycle(c: &mut Criterion) {
    c.bench_function("watch_clear_cycle", |b| {
        let barometer = create_barometer();
        b.iter(|| {
            let id = barometer.watch(|_| {}).unwrap();
            barometer.clear_watch(black_box(id));
        });
    });
}

criterion_group!(
    benches,
    bench_callback_fanout,
    bench_dispatch_pending,
    bench_watch_cycle
);
criterion_main!(benches);
