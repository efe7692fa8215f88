//! Error types for metric creation and registration.
//!
//! All failures in this crate are synchronous, creation-time failures: tag
//! policy violations, malformed histogram bucket boundaries, and the per-name
//! cardinality circuit breaker. Steady-state mutation (`increment`, `observe`,
//! `set`, ...) never fails.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetricError>;

/// A tag set violated the configured [`TagPolicy`](crate::tags::TagPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("too many tags: {count} exceeds maximum of {max}")]
    TooManyKeys { count: usize, max: usize },

    #[error("tag key '{key}' exceeds maximum length of {max}")]
    KeyTooLong { key: String, max: usize },

    #[error("tag value for key '{key}' exceeds maximum length of {max}")]
    ValueTooLong { key: String, max: usize },

    #[error("tag keys cannot be empty")]
    EmptyKey,

    #[error("tag key '{key}' is not allowed")]
    DisallowedKey { key: String },
}

/// Histogram bucket boundaries failed validation.
///
/// Boundaries must be strictly positive and strictly ascending. Both checks
/// run at construction time so a bad configuration can never reach the
/// observation hot path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BucketError {
    #[error("bucket boundary at index {index} must be positive, got {value}")]
    NonPositive { index: usize, value: f64 },

    #[error(
        "bucket boundaries must be in ascending order: bucket[{index}]={current} <= previous boundary {prev}"
    )]
    NotAscending {
        index: usize,
        prev: f64,
        current: f64,
    },
}

/// Top-level error type for registry and primitive construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// Metric names are identity; an empty name is rejected eagerly.
    #[error("metric name must not be empty")]
    InvalidName,

    #[error("tag validation failed: {0}")]
    InvalidTags(#[from] TagError),

    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(#[from] BucketError),

    /// The per-name instance cap was reached. This is a protective circuit
    /// breaker against unbounded tag-driven metric explosion and is never
    /// silently downgraded.
    #[error("cardinality limit exceeded for metric '{name}': {current} >= {max}")]
    CardinalityExceeded {
        name: String,
        current: usize,
        max: usize,
    },
}
