//! Performance benchmarks for the calculator plugin.
//!
//! Run with: cargo bench
//!
//! Target performance:
//! - Simple expressions: well below one poll interval (10ms)
//! - Global query round trip: < 50ms

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nova_qalculate::{
    BuiltinCalculator, GlobalQueryHandler, MemorySettingsStore, Plugin, Query, QueryAdapter,
    Settings, TriggerQueryHandler,
};

fn plugin() -> Plugin {
    Plugin::with_calculator(
        BuiltinCalculator::with_data_dir(None),
        Arc::new(MemorySettingsStore::default()),
    )
    .expect("plugin initializes without data files")
}

/// Benchmark trigger queries end to end.
fn bench_trigger_query(c: &mut Criterion) {
    let plugin = plugin();
    let mut group = c.benchmark_group("trigger_query");

    let expressions = [
        ("simple_add", "2 + 2"),
        ("complex_expr", "(10 + 5) * 2 / 3"),
        ("power", "2^100"),
        ("sqrt", "sqrt(144)"),
        ("scientific", "sin(3.14159) + cos(0)"),
        ("units", "10 km to mi"),
        ("factorial", "200!"),
    ];

    for (name, expr) in expressions {
        group.bench_with_input(BenchmarkId::from_parameter(name), &expr, |b, expr| {
            b.iter(|| {
                let query = Query::with_trigger("=", *expr);
                black_box(plugin.handle_trigger_query(black_box(&query)))
            })
        });
    }

    group.finish();
}

/// Benchmark global queries, including inputs that are not math.
fn bench_global_query(c: &mut Criterion) {
    let plugin = plugin();
    let mut group = c.benchmark_group("global_query");

    for input in ["1+1", "firefox", "1/0"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), &input, |b, input| {
            b.iter(|| black_box(plugin.handle_global_query(&Query::new(*input))))
        });
    }

    group.finish();
}

/// Benchmark the effect of the poll interval on latency.
fn bench_poll_interval(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_interval");

    for millis in [1u64, 10] {
        let adapter = QueryAdapter::new(BuiltinCalculator::with_data_dir(None), &Settings::default())
            .with_poll_interval(Duration::from_millis(millis));
        group.bench_with_input(BenchmarkId::from_parameter(millis), &millis, |b, _| {
            b.iter(|| black_box(adapter.evaluate_text("3^40 / 7", true, || true)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_trigger_query,
    bench_global_query,
    bench_poll_interval,
);

criterion_main!(benches);
