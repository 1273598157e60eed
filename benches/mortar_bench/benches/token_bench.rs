//! CSRF token benchmarks
//!
//! Token checks run on every state-changing request, so verification cost
//! (including the constant-time comparison) matters more than generation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mortar_csrf::{generate_secret, generate_token, generate_token_at, unix_now, verify_token};
use std::time::Duration;

const MAX_AGE: Duration = Duration::from_secs(3600);

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf_generate");
    let secret = generate_secret().unwrap();

    group.bench_function("secret", |b| b.iter(|| generate_secret().unwrap()));
    group.bench_function("token", |b| b.iter(|| generate_token(black_box(&secret))));

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf_verify");
    let secret = generate_secret().unwrap();
    let valid = generate_token(&secret);
    let expired = generate_token_at(&secret, unix_now() - 7200);
    let forged = format!("{}:{}", unix_now(), "0".repeat(64));

    for (name, token) in [
        ("valid", &valid),
        ("expired", &expired),
        ("forged", &forged),
        ("malformed", &"not-a-token".to_string()),
    ] {
        group.bench_with_input(BenchmarkId::new("token", name), token, |b, token| {
            b.iter(|| verify_token(black_box(token), black_box(&secret), MAX_AGE))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_verify);
criterion_main!(benches);
