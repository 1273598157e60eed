//! JSON logger benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mortar_core::{JsonLogger, Level};
use serde_json::json;
use std::io;

fn bench_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_logger");

    let logger = JsonLogger::new(io::sink()).with_field("service", "bench");
    group.bench_function("info_with_fields", |b| {
        b.iter(|| {
            logger.info(
                black_box("incoming request completed"),
                json!({ "http.route": "/orders", "http.response.status_code": 200 }),
            )
        })
    });

    // Entries below the minimum level return before serializing
    let quiet = JsonLogger::new(io::sink()).with_level(Level::Error);
    group.bench_function("filtered", |b| {
        b.iter(|| quiet.debug(black_box("dropped"), json!({ "n": 1 })))
    });

    group.bench_function("by_status", |b| {
        b.iter(|| logger.log_by_status(black_box(503), "outgoing request", json!({})))
    });

    group.finish();
}

criterion_group!(benches, bench_log);
criterion_main!(benches);
