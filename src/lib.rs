//! # Pulse Metrics
//!
//! A high-performance, thread-safe metrics collection engine for Rust
//! applications: named, tagged counters, gauges, histograms and timers that
//! can be mutated from arbitrarily many threads, plus a [`Registry`] that
//! owns their identity and lifecycle.
//!
//! ## Overview
//!
//! - **Lock-free primitives**: every mutation is a handful of atomic
//!   operations; no primitive ever takes a lock, and no mutation can fail or
//!   block. Shared extrema (histogram min/max) are maintained with
//!   compare-and-swap retry loops.
//! - **Identity-managed lifecycle**: the [`Registry`] creates-or-returns
//!   primitives keyed by `(kind, name)`, enforces a per-name cardinality
//!   circuit breaker and tag validation policy, and evicts entries past
//!   their time-to-live via a cancellable background sweep.
//! - **Cheap tagged views**: `with(tags)` on any primitive derives a new,
//!   independent, zero-seeded instance with merged tags, without touching
//!   the registry.
//! - **Contextual fan-out**: the [`operational`] module records one logical
//!   event as a primary counter/timer pair plus one derived pair per context
//!   dimension, using pooled scratch tag maps to stay allocation-free on the
//!   steady-state path.
//! - **Exporter-friendly**: backends iterate the live set with
//!   [`Registry::each`] and read each primitive's metadata and numeric state
//!   through first-class accessors; no serialization is imposed here.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use pulse_metrics::{MetricOptions, Registry};
//!
//! let registry = Registry::without_cleanup();
//!
//! let requests = registry.counter(
//!     MetricOptions::new("requests_total").with_tag("service", "api"),
//! )?;
//! requests.increment();
//!
//! let latency = registry.timer(MetricOptions::new("request_latency"))?;
//! latency.record(Duration::from_millis(42));
//!
//! let in_flight = registry.gauge(MetricOptions::new("in_flight"))?;
//! in_flight.increment();
//! in_flight.decrement();
//!
//! assert_eq!(requests.value(), 1);
//! assert_eq!(latency.snapshot().count, 1);
//! # Ok::<(), pulse_metrics::MetricError>(())
//! ```
//!
//! ## Thread Safety
//!
//! Primitives are mutated concurrently without locks:
//!
//! ```
//! use std::thread;
//! use pulse_metrics::{MetricOptions, Registry};
//!
//! let registry = Registry::without_cleanup();
//! let counter = registry.counter(MetricOptions::new("ops_total"))?;
//!
//! thread::scope(|s| {
//!     for _ in 0..8 {
//!         let counter = counter.clone();
//!         s.spawn(move || {
//!             for _ in 0..1000 {
//!                 counter.increment();
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(counter.value(), 8000);
//! # Ok::<(), pulse_metrics::MetricError>(())
//! ```
//!
//! ## Failure Model
//!
//! All failures are synchronous and happen at creation time: an empty name,
//! a tag set violating the [`TagPolicy`], malformed histogram buckets, or the
//! per-name cardinality cap. They surface as [`MetricError`] from the
//! registry call and are never downgraded to silently-ignored no-op metrics.
//! Steady-state mutation (`increment`, `set`, `observe`, `record`) is total
//! and infallible.

pub mod error;
pub mod operational;
pub mod options;
pub mod registry;
pub mod tags;
pub mod types;

pub use error::{BucketError, MetricError, Result, TagError};
pub use operational::{MetricsBuilder, OperationalMetrics, TagPool};
pub use options::MetricOptions;
pub use registry::{
    get_counter, get_gauge, get_histogram, get_timer, global, MetricHandle, Registry,
};
pub use tags::{merge_tags, validate_tags, TagPolicy, Tags};
pub use types::{
    exponential_buckets, linear_buckets, Counter, Gauge, Histogram, HistogramSnapshot, Metric,
    MetricKind, Timer,
};
