//! Metric primitives: lock-free numeric state machines built on atomics.
//!
//! Every primitive is safe to mutate from arbitrarily many threads without
//! locks. Mutation never blocks and never fails; all fallible validation
//! happens at construction time, before a primitive exists.

mod counter;
mod gauge;
mod histogram;
mod timer;

use std::fmt;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{exponential_buckets, linear_buckets, Histogram, HistogramSnapshot};
pub use timer::Timer;

use crate::options::MetricOptions;
use crate::tags::{merge_tags, Tags};

/// The available metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically increasing value.
    Counter,
    /// Current point-in-time measurement.
    Gauge,
    /// Statistical distribution of values.
    Histogram,
    /// Duration distribution; a histogram observing nanoseconds.
    Timer,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Counter,
        MetricKind::Gauge,
        MetricKind::Histogram,
        MetricKind::Timer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common read-only surface of every metric primitive.
///
/// Exporters walking [`Registry::each`](crate::registry::Registry::each) use
/// this to read identity and metadata; the numeric state is read through each
/// primitive's own `value()`/`snapshot()` accessor.
pub trait Metric {
    /// Unique identifier for the metric.
    fn name(&self) -> &str;
    /// Human-readable description of what the metric measures.
    fn description(&self) -> &str;
    /// Unit of measurement.
    fn unit(&self) -> &str;
    /// The metric type.
    fn kind(&self) -> MetricKind;
    /// Dimensional metadata. Never mutated after construction.
    fn tags(&self) -> &Tags;
}

/// Identity and metadata shared by all primitives.
#[derive(Debug, Clone)]
pub(crate) struct MetricMeta {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) unit: String,
    pub(crate) kind: MetricKind,
    pub(crate) tags: Tags,
}

impl MetricMeta {
    pub(crate) fn from_options(opts: &MetricOptions, kind: MetricKind) -> Self {
        Self {
            name: opts.name.clone(),
            description: opts.description.clone(),
            unit: opts.unit.clone(),
            kind,
            tags: opts.tags.clone(),
        }
    }

    /// Metadata for a derived tagged view: same identity, merged tags.
    pub(crate) fn derive(&self, extra: &Tags) -> Self {
        Self {
            tags: merge_tags(&self.tags, extra),
            ..self.clone()
        }
    }
}

macro_rules! impl_metric {
    ($ty:ty) => {
        impl crate::types::Metric for $ty {
            fn name(&self) -> &str {
                &self.meta.name
            }

            fn description(&self) -> &str {
                &self.meta.description
            }

            fn unit(&self) -> &str {
                &self.meta.unit
            }

            fn kind(&self) -> crate::types::MetricKind {
                self.meta.kind
            }

            fn tags(&self) -> &crate::tags::Tags {
                &self.meta.tags
            }
        }
    };
}

pub(crate) use impl_metric;
