use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::BucketError;
use crate::options::MetricOptions;
use crate::tags::Tags;
use crate::types::{impl_metric, MetricKind, MetricMeta};

/// Default bucket boundaries: exponential coverage from 1ms-scale to 10k.
const DEFAULT_BOUNDARIES: [f64; 8] = [0.001, 0.01, 0.1, 1.0, 10.0, 100.0, 1000.0, 10000.0];

/// A statistical distribution of observed values.
///
/// State is a fixed set of atomics: total count, running sum, running
/// min/max, and one occurrence counter per bucket (the last bucket is the
/// implicit `+inf` overflow slot). All of it is updated lock-free, so
/// `observe` is safe on arbitrarily hot paths.
///
/// Bucket boundaries are immutable after construction and must be strictly
/// positive and strictly ascending; a violation fails creation, it is never
/// deferred to first use.
///
/// # Consistency
///
/// [`Histogram::snapshot`] loads each field independently. Under heavy
/// concurrent `observe` traffic the fields may reflect slightly different
/// moments (e.g. `count` one observation ahead of a bucket slot). This
/// relaxation is intentional: it keeps the write path free of locks, and the
/// fields converge at every quiescent point, where
/// `sum(buckets) == count` holds exactly.
#[derive(Debug)]
pub struct Histogram {
    meta: MetricMeta,
    boundaries: Vec<f64>,
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
    sum: AtomicU64,
    /// Stored 0 means "no observations yet".
    min: AtomicU64,
    max: AtomicU64,
}

/// A point-in-time view of a histogram's state.
///
/// `min` and `max` are meaningful only once `count > 0`; before the first
/// observation both read as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    /// Per-bucket occurrence counts; one slot per boundary plus the trailing
    /// `+inf` slot.
    pub buckets: Vec<u64>,
}

impl Histogram {
    pub(crate) fn new(opts: &MetricOptions) -> Result<Self, BucketError> {
        Self::with_kind(opts, MetricKind::Histogram)
    }

    pub(crate) fn with_kind(opts: &MetricOptions, kind: MetricKind) -> Result<Self, BucketError> {
        let boundaries = if opts.buckets.is_empty() {
            DEFAULT_BOUNDARIES.to_vec()
        } else {
            opts.buckets.clone()
        };
        validate_buckets(&boundaries)?;

        let buckets = (0..boundaries.len() + 1)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            meta: MetricMeta::from_options(opts, kind),
            boundaries,
            buckets,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(0),
            max: AtomicU64::new(0),
        })
    }

    /// Records a value in the histogram.
    ///
    /// The value is floored into the running sum and min/max tracking
    /// (negative values floor to 0). Bucket location is a binary search over
    /// the boundaries, so large boundary arrays stay cheap.
    pub fn observe(&self, value: f64) {
        let v = value as u64;

        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(v, Ordering::Relaxed);

        let index = self.bucket_index(value);
        self.buckets[index].fetch_add(1, Ordering::Relaxed);

        self.update_min(v);
        self.update_max(v);
    }

    /// First boundary `>= value` wins; a value beyond every boundary lands in
    /// the trailing `+inf` slot. A value exactly equal to a boundary belongs
    /// to that boundary's bucket.
    fn bucket_index(&self, value: f64) -> usize {
        self.boundaries.partition_point(|&b| b < value)
    }

    /// Lowers the shared minimum to `v` if it improves it, via a
    /// compare-and-swap retry loop. A stored 0 means "unset", so the first
    /// observation always wins. A plain load-then-store here would race:
    /// two threads could both pass the comparison and the larger value could
    /// land last.
    fn update_min(&self, v: u64) {
        let mut current = self.min.load(Ordering::Relaxed);
        loop {
            if current != 0 && v >= current {
                break;
            }
            match self
                .min
                .compare_exchange_weak(current, v, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Raises the shared maximum to `v` if it improves it. Same CAS-retry
    /// discipline as [`Histogram::update_min`].
    fn update_max(&self, v: u64) {
        let mut current = self.max.load(Ordering::Relaxed);
        while v > current {
            match self
                .max
                .compare_exchange_weak(current, v, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// The configured bucket boundaries (without the implicit `+inf` slot).
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Captures the current state. See the type-level note on cross-field
    /// consistency under concurrent writers.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let buckets = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();

        HistogramSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.load(Ordering::Relaxed),
            min: self.min.load(Ordering::Relaxed),
            max: self.max.load(Ordering::Relaxed),
            buckets,
        }
    }

    /// Returns a new, independent histogram with the same boundaries, zeroed
    /// state, and merged tags. Like every derived view it is not tracked by
    /// any registry.
    pub fn with(&self, extra: &Tags) -> Histogram {
        let buckets = (0..self.boundaries.len() + 1)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Histogram {
            meta: self.meta.derive(extra),
            boundaries: self.boundaries.clone(),
            buckets,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }
}

impl_metric!(Histogram);

/// Ensures bucket boundaries are strictly positive and strictly ascending.
pub(crate) fn validate_buckets(boundaries: &[f64]) -> Result<(), BucketError> {
    for (index, &value) in boundaries.iter().enumerate() {
        if value <= 0.0 {
            return Err(BucketError::NonPositive { index, value });
        }
    }
    for index in 1..boundaries.len() {
        if boundaries[index] <= boundaries[index - 1] {
            return Err(BucketError::NotAscending {
                index,
                prev: boundaries[index - 1],
                current: boundaries[index],
            });
        }
    }
    Ok(())
}

/// Generates `count` linearly spaced boundaries starting at `start`.
/// Returns an empty vector when `count` is zero.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + i as f64 * width).collect()
}

/// Generates `count` exponentially spaced boundaries starting at `start`,
/// each `factor` times the previous. Returns an empty vector when the inputs
/// cannot produce a valid ascending series (`count == 0`, `start <= 0`, or
/// `factor <= 1`).
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    if count == 0 || start <= 0.0 || factor <= 1.0 {
        return Vec::new();
    }

    let mut buckets = Vec::with_capacity(count);
    let mut current = start;
    for _ in 0..count {
        buckets.push(current);
        current *= factor;
    }
    buckets
}
