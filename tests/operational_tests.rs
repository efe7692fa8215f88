use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pulse_metrics::operational::{MetricsBuilder, OperationalMetrics};
use pulse_metrics::{Metric, MetricError, MetricOptions, Registry, TagPolicy, Tags};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn registered_names(registry: &Registry) -> HashSet<String> {
    let mut names = HashSet::new();
    registry.each(|m| {
        names.insert(m.name().to_string());
    });
    names
}

#[test]
fn record_operation_creates_counter_timer_pair() {
    let registry = Registry::without_cleanup();
    let om = OperationalMetrics::new(registry.clone());

    om.record_operation("login", "success", Duration::from_millis(10))
        .unwrap();
    om.record_operation("login", "success", Duration::from_millis(20))
        .unwrap();

    let names = registered_names(&registry);
    assert!(names.contains("login_total"));
    assert!(names.contains("login_duration"));
    assert_eq!(names.len(), 2);

    let counter = registry.counter(MetricOptions::new("login_total")).unwrap();
    assert_eq!(counter.value(), 2);

    let timer = registry.timer(MetricOptions::new("login_duration")).unwrap();
    let snap = timer.snapshot();
    assert_eq!(snap.count, 2);
    assert_eq!(snap.sum, 30_000_000);
}

#[test]
fn record_error_categorizes_by_tags() {
    let registry = Registry::without_cleanup();
    let om = OperationalMetrics::new(registry.clone());

    om.record_error("generate_nonce", "crypto_error", "random_generation")
        .unwrap();
    om.record_error("generate_nonce", "crypto_error", "random_generation")
        .unwrap();

    let counter = registry
        .counter(MetricOptions::new("generate_nonce_errors_total"))
        .unwrap();
    assert_eq!(counter.value(), 2);
    assert_eq!(counter.tags()["error_type"], "crypto_error");
    assert_eq!(counter.tags()["error_category"], "random_generation");
}

#[test]
fn repeated_records_reuse_cached_handles() {
    let registry = Registry::without_cleanup();
    let om = OperationalMetrics::new(registry.clone());

    for _ in 0..50 {
        om.record_operation("checkout", "success", Duration::from_millis(1))
            .unwrap();
    }

    // Exactly one counter/timer pair, no per-call registrations.
    assert_eq!(registry.len(), 2);
    let counter = registry
        .counter(MetricOptions::new("checkout_total"))
        .unwrap();
    assert_eq!(counter.value(), 50);
}

#[test]
fn context_fans_out_one_operation_per_dimension() {
    let registry = Registry::without_cleanup();
    let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));

    let context = tags(&[("provider", "password"), ("user_type", "premium")]);
    builder
        .record_with_context("auth", "success", Duration::from_millis(15), &context)
        .unwrap();

    let names = registered_names(&registry);
    let expected = [
        "auth_total",
        "auth_duration",
        "auth_provider_total",
        "auth_provider_duration",
        "auth_user_type_total",
        "auth_user_type_duration",
    ];
    for name in expected {
        assert!(names.contains(name), "missing {name}");
    }
    assert_eq!(names.len(), expected.len());

    // The derived operation's status is the context value.
    let derived = registry
        .counter(MetricOptions::new("auth_provider_total"))
        .unwrap();
    assert_eq!(derived.value(), 1);
    assert_eq!(derived.tags()["status"], "password");

    // The derived timer rode the same duration.
    let derived_timer = registry
        .timer(MetricOptions::new("auth_provider_duration"))
        .unwrap();
    assert_eq!(derived_timer.snapshot().sum, 15_000_000);
}

#[test]
fn empty_context_records_only_the_primary_operation() {
    let registry = Registry::without_cleanup();
    let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));

    builder
        .record_with_context("ping", "ok", Duration::from_millis(1), &Tags::new())
        .unwrap();

    assert_eq!(registry.len(), 2);
}

#[test]
fn empty_operation_and_status_are_harmless() {
    let registry = Registry::without_cleanup();
    let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));

    builder
        .record_with_context("", "", Duration::ZERO, &Tags::new())
        .unwrap();

    let names = registered_names(&registry);
    assert!(names.contains("_total"));
    assert!(names.contains("_duration"));
}

#[test]
fn security_events_record_zero_duration() {
    let registry = Registry::without_cleanup();
    let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));

    let context = tags(&[("ip", "10.0.0.1")]);
    builder
        .record_security_event("brute_force", "blocked", &context)
        .unwrap();

    let names = registered_names(&registry);
    assert!(names.contains("security_brute_force_total"));
    assert!(names.contains("security_brute_force_duration"));
    assert!(names.contains("security_brute_force_ip_total"));
    assert!(names.contains("security_brute_force_ip_duration"));

    let counter = registry
        .counter(MetricOptions::new("security_brute_force_total"))
        .unwrap();
    assert_eq!(counter.value(), 1);
    assert_eq!(counter.tags()["status"], "blocked");

    let timer = registry
        .timer(MetricOptions::new("security_brute_force_duration"))
        .unwrap();
    let snap = timer.snapshot();
    assert_eq!(snap.count, 1);
    assert_eq!(snap.sum, 0);
}

#[test]
fn business_values_ride_the_duration_shape() {
    let registry = Registry::without_cleanup();
    let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));

    builder
        .record_business_metric("payment_processing", "completed", 2.5, &Tags::new())
        .unwrap();

    let timer = registry
        .timer(MetricOptions::new("business_payment_processing_duration"))
        .unwrap();
    let snap = timer.snapshot();
    assert_eq!(snap.count, 1);
    // 2.5 is interpreted as milliseconds.
    assert_eq!(snap.sum, 2_500_000);

    // Negative values clamp to a zero duration instead of failing.
    builder
        .record_business_metric("refund", "issued", -4.0, &Tags::new())
        .unwrap();
    let timer = registry
        .timer(MetricOptions::new("business_refund_duration"))
        .unwrap();
    assert_eq!(timer.snapshot().sum, 0);
}

#[test]
fn registry_failures_surface_through_the_builder() {
    let policy = TagPolicy {
        max_cardinality: 2,
        ..TagPolicy::default()
    };
    let registry = Registry::new(policy, Duration::ZERO);
    // Both slots under "busy_total" taken by non-counter kinds, so the
    // builder's counter creation trips the circuit breaker.
    registry.gauge(MetricOptions::new("busy_total")).unwrap();
    registry.histogram(MetricOptions::new("busy_total")).unwrap();

    let builder = MetricsBuilder::new(OperationalMetrics::new(registry));
    let err = builder
        .record_with_context("busy", "ok", Duration::ZERO, &Tags::new())
        .unwrap_err();
    assert!(matches!(err, MetricError::CardinalityExceeded { .. }));
}

#[test]
fn fan_out_is_safe_under_concurrent_recording() {
    let registry = Registry::without_cleanup();
    let builder = Arc::new(MetricsBuilder::new(OperationalMetrics::new(
        registry.clone(),
    )));

    std::thread::scope(|s| {
        for _ in 0..8 {
            let builder = builder.clone();
            s.spawn(move || {
                let context = tags(&[("region", "us")]);
                for _ in 0..100 {
                    builder
                        .record_with_context("sync", "ok", Duration::from_micros(5), &context)
                        .unwrap();
                }
            });
        }
    });

    let counter = registry.counter(MetricOptions::new("sync_total")).unwrap();
    assert_eq!(counter.value(), 800);
    let derived = registry
        .counter(MetricOptions::new("sync_region_total"))
        .unwrap();
    assert_eq!(derived.value(), 800);
}
