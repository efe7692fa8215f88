//! Construction options for metrics.

use std::time::Duration;

use crate::tags::Tags;

/// Configuration for creating a metric through the
/// [`Registry`](crate::registry::Registry).
///
/// Only `name` is required. Everything else defaults to empty/zero:
///
/// - `buckets` applies to histograms and timers only; when empty, default
///   boundaries are used.
/// - `ttl` of zero means the metric never expires.
///
/// Options are validated eagerly when they reach the registry: an empty name,
/// a tag set violating the registry's [`TagPolicy`](crate::tags::TagPolicy),
/// or malformed bucket boundaries fail the whole creation call.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pulse_metrics::MetricOptions;
///
/// let opts = MetricOptions::new("http_requests_total")
///     .with_description("Total HTTP requests served")
///     .with_unit("count")
///     .with_tag("service", "gateway")
///     .with_ttl(Duration::from_secs(600));
/// assert_eq!(opts.name, "http_requests_total");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricOptions {
    /// Unique identifier for the metric. Required, non-empty.
    pub name: String,
    /// Human-readable description of what the metric measures.
    pub description: String,
    /// Unit of measurement (e.g. "milliseconds", "bytes").
    pub unit: String,
    /// Dimensional metadata attached to the metric.
    pub tags: Tags,
    /// Custom histogram bucket boundaries. Empty means defaults.
    pub buckets: Vec<f64>,
    /// How long the registry keeps the metric alive. Zero means forever.
    pub ttl: Duration,
}

impl MetricOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}
