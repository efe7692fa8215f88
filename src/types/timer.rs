use std::time::{Duration, Instant};

use crate::error::BucketError;
use crate::options::MetricOptions;
use crate::tags::Tags;
use crate::types::{Histogram, HistogramSnapshot, Metric, MetricKind};

/// A duration-specialized metric: a thin facade over a [`Histogram`] that
/// observes elapsed time in nanoseconds.
///
/// Not a distinct storage type; everything recorded lands in the underlying
/// histogram's count/sum/min/max/buckets.
#[derive(Debug)]
pub struct Timer {
    histogram: Histogram,
}

impl Timer {
    pub(crate) fn new(opts: &MetricOptions) -> Result<Self, BucketError> {
        Ok(Self {
            histogram: Histogram::with_kind(opts, MetricKind::Timer)?,
        })
    }

    /// Records a duration.
    #[inline]
    pub fn record(&self, duration: Duration) {
        self.histogram.observe(duration.as_nanos() as f64);
    }

    /// Records the time elapsed since `start`.
    #[inline]
    pub fn record_since(&self, start: Instant) {
        self.record(start.elapsed());
    }

    /// Measures wall-clock time around `f`, records it, and returns the
    /// closure's result together with the measured duration. The closure is
    /// always invoked exactly once.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> (R, Duration) {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        self.record(elapsed);
        (result, elapsed)
    }

    /// The underlying histogram's current state.
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.histogram.snapshot()
    }

    /// The underlying histogram's bucket boundaries.
    pub fn boundaries(&self) -> &[f64] {
        self.histogram.boundaries()
    }

    /// Returns a new, independent timer over a fresh zeroed histogram with
    /// merged tags; not tracked by any registry.
    pub fn with(&self, extra: &Tags) -> Timer {
        Timer {
            histogram: self.histogram.with(extra),
        }
    }
}

impl Metric for Timer {
    fn name(&self) -> &str {
        self.histogram.name()
    }

    fn description(&self) -> &str {
        self.histogram.description()
    }

    fn unit(&self) -> &str {
        self.histogram.unit()
    }

    fn kind(&self) -> MetricKind {
        self.histogram.kind()
    }

    fn tags(&self) -> &Tags {
        self.histogram.tags()
    }
}
