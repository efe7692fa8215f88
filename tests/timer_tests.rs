use std::time::{Duration, Instant};

use pulse_metrics::{Metric, MetricKind, MetricOptions, Registry, Tags};

fn registry() -> Registry {
    Registry::without_cleanup()
}

#[test]
fn record_observes_nanoseconds() {
    let registry = registry();
    let timer = registry.timer(MetricOptions::new("op_duration")).unwrap();

    timer.record(Duration::from_millis(3));

    let snap = timer.snapshot();
    assert_eq!(snap.count, 1);
    assert_eq!(snap.sum, 3_000_000);
    assert_eq!(snap.min, 3_000_000);
    assert_eq!(snap.max, 3_000_000);
}

#[test]
fn record_since_measures_elapsed_time() {
    let registry = registry();
    let timer = registry.timer(MetricOptions::new("op_duration")).unwrap();

    let start = Instant::now();
    std::thread::sleep(Duration::from_millis(5));
    timer.record_since(start);

    let snap = timer.snapshot();
    assert_eq!(snap.count, 1);
    // At least the slept 5ms, in nanoseconds.
    assert!(snap.min >= 5_000_000);
}

#[test]
fn time_invokes_closure_once_and_returns_its_result() {
    let registry = registry();
    let timer = registry.timer(MetricOptions::new("op_duration")).unwrap();

    let mut calls = 0;
    let (result, elapsed) = timer.time(|| {
        calls += 1;
        std::thread::sleep(Duration::from_millis(5));
        "done"
    });

    assert_eq!(calls, 1);
    assert_eq!(result, "done");
    assert!(elapsed >= Duration::from_millis(5));

    let snap = timer.snapshot();
    assert_eq!(snap.count, 1);
    assert!(snap.min >= 5_000_000);
}

#[test]
fn timer_kind_and_metadata() {
    let registry = registry();
    let timer = registry
        .timer(
            MetricOptions::new("op_duration")
                .with_description("Operation duration")
                .with_unit("nanoseconds")
                .with_tag("operation", "login"),
        )
        .unwrap();

    assert_eq!(timer.kind(), MetricKind::Timer);
    assert_eq!(timer.name(), "op_duration");
    assert_eq!(timer.unit(), "nanoseconds");
    assert_eq!(timer.tags()["operation"], "login");
}

#[test]
fn timer_and_histogram_share_a_name_as_distinct_entries() {
    let registry = registry();
    let timer = registry.timer(MetricOptions::new("latency")).unwrap();
    let histogram = registry.histogram(MetricOptions::new("latency")).unwrap();

    timer.record(Duration::from_secs(1));
    assert_eq!(timer.snapshot().count, 1);
    assert_eq!(histogram.snapshot().count, 0);
    assert_eq!(registry.len(), 2);
}

#[test]
fn with_derives_independent_timer() {
    let registry = registry();
    let timer = registry
        .timer(MetricOptions::new("op_duration").with_tag("operation", "login"))
        .unwrap();
    timer.record(Duration::from_millis(1));

    let mut extra = Tags::new();
    extra.insert("provider".into(), "sso".into());
    let derived = timer.with(&extra);

    assert_eq!(derived.snapshot().count, 0);
    assert_eq!(derived.tags().len(), 2);
    assert_eq!(derived.kind(), MetricKind::Timer);

    assert_eq!(timer.tags().len(), 1);
    assert_eq!(timer.snapshot().count, 1);
    assert_eq!(registry.len(), 1);
}
