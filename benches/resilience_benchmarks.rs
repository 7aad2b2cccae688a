use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use resilience::circuit_breaker::{CircuitBreakerConfig, HealthTracker};
use resilience::config::ResilienceConfig;
use resilience::fallback::{FallbackResolver, StaticFallbacks};
use resilience::rate_limit::SlidingWindowLimiter;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

fn benchmark_tracker_record_success(c: &mut Criterion) {
    let tracker = HealthTracker::new(
        HashMap::from([("qloo".to_string(), 5)]),
        CircuitBreakerConfig::default(),
    );

    c.bench_function("tracker_record_success", |b| {
        b.iter(|| tracker.record_success(black_box("qloo")))
    });
}

fn benchmark_tracker_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_scale");

    for num_dependencies in [4, 64, 1024].iter() {
        let names: Vec<String> = (0..*num_dependencies)
            .map(|i| format!("dependency-{}", i))
            .collect();
        // Unconfigured thresholds keep every circuit closed
        let tracker = HealthTracker::new(HashMap::new(), CircuitBreakerConfig::default());

        group.bench_with_input(
            BenchmarkId::from_parameter(num_dependencies),
            num_dependencies,
            |b, &_num| {
                let mut rng = rand::thread_rng();
                b.iter(|| {
                    let name = &names[rng.gen_range(0..names.len())];
                    tracker.record_failure(name, "timeout");
                    black_box(tracker.is_open(name))
                })
            },
        );
    }
    group.finish();
}

fn benchmark_static_fallback_resolution(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let chain = vec![
        "cached_recommendations".to_string(),
        "popular_items".to_string(),
    ];
    let data = StaticFallbacks::new().with("qloo", "popular_items", json!(["Dune", "Arrival"]));

    c.bench_function("static_fallback_resolution", |b| {
        b.to_async(&rt).iter(|| async {
            let resolver = FallbackResolver::new("qloo", &chain, &data);
            black_box(resolver.resolve::<Value>(Vec::new()).await)
        })
    });
}

fn benchmark_limiter_admission(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    // A short window keeps the admission log small while never blocking
    let limiter = SlidingWindowLimiter::new(1_000_000, Duration::from_millis(1));

    c.bench_function("limiter_admission", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(limiter.acquire().await) })
    });
}

fn benchmark_config_parsing(c: &mut Criterion) {
    let yaml = r#"
circuit_breaker:
  reset_timeout_secs: 300
dependencies:
  qloo:
    max_retries: 3
    retry_delay_ms: 1000
    fallback_chain: ["cached_recommendations", "popular_items"]
    circuit_breaker_threshold: 5
  search:
    max_retries: 2
    retry_delay_ms: 500
    fallback_chain: ["cached_results"]
    circuit_breaker_threshold: 3
static_fallbacks:
  qloo:
    popular_items: ["Dune"]
"#;

    c.bench_function("config_parsing", |b| {
        b.iter(|| black_box(ResilienceConfig::from_yaml(yaml)))
    });
}

criterion_group!(
    benches,
    benchmark_tracker_record_success,
    benchmark_tracker_scale,
    benchmark_static_fallback_resolution,
    benchmark_limiter_admission,
    benchmark_config_parsing
);
criterion_main!(benches);
