use std::sync::atomic::{AtomicI64, Ordering};

use crate::options::MetricOptions;
use crate::tags::Tags;
use crate::types::{impl_metric, MetricKind, MetricMeta};

/// A current point-in-time measurement. Freely settable, no monotonicity.
#[derive(Debug)]
pub struct Gauge {
    meta: MetricMeta,
    value: AtomicI64,
}

impl Gauge {
    pub(crate) fn new(opts: &MetricOptions) -> Self {
        Self {
            meta: MetricMeta::from_options(opts, MetricKind::Gauge),
            value: AtomicI64::new(0),
        }
    }

    /// Sets the gauge to `value`, truncated to an integer.
    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value as i64, Ordering::Relaxed);
    }

    /// Adds `delta` (may be negative) to the gauge.
    #[inline]
    pub fn add(&self, delta: f64) {
        self.value.fetch_add(delta as i64, Ordering::Relaxed);
    }

    /// Increments the gauge by 1.
    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the gauge by 1.
    #[inline]
    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current gauge value.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Returns a new, independent gauge seeded at zero with merged tags.
    /// Same derived-view semantics as [`Counter::with`](crate::Counter::with).
    pub fn with(&self, extra: &Tags) -> Gauge {
        Gauge {
            meta: self.meta.derive(extra),
            value: AtomicI64::new(0),
        }
    }
}

impl_metric!(Gauge);
