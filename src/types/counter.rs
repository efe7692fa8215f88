use std::sync::atomic::{AtomicU64, Ordering};

use crate::options::MetricOptions;
use crate::tags::Tags;
use crate::types::{impl_metric, MetricKind, MetricMeta};

/// A monotonically increasing value.
#[derive(Debug)]
pub struct Counter {
    meta: MetricMeta,
    value: AtomicU64,
}

impl Counter {
    pub(crate) fn new(opts: &MetricOptions) -> Self {
        Self {
            meta: MetricMeta::from_options(opts, MetricKind::Counter),
            value: AtomicU64::new(0),
        }
    }

    /// Increments the counter by 1.
    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increases the counter by `delta`, floored to an integer.
    ///
    /// Non-positive deltas are silently ignored: counters never decrease, and
    /// a negative or zero delta is treated as a no-op rather than an error.
    #[inline]
    pub fn add(&self, delta: f64) {
        if delta > 0.0 {
            self.value.fetch_add(delta as u64, Ordering::Relaxed);
        }
    }

    /// Current counter value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Returns a new, independent counter carrying this counter's tags merged
    /// with `extra`.
    ///
    /// The derived counter starts at zero, shares no storage with `self`, and
    /// is not tracked by any registry (it is never expired or iterated). This
    /// keeps tagged views allocation-cheap on hot paths.
    pub fn with(&self, extra: &Tags) -> Counter {
        Counter {
            meta: self.meta.derive(extra),
            value: AtomicU64::new(0),
        }
    }
}

impl_metric!(Counter);
