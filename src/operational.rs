//! High-level operational recording built on top of the registry.
//!
//! This layer exists for the hot path where one logical event should also be
//! sliced by several context dimensions. It keeps a pool of reusable scratch
//! tag maps (checked out, filled, used, cleared, returned) so steady-state
//! recording does not allocate a fresh map per call, and it caches the
//! counter/timer handles it resolves so repeat events skip the registry
//! entirely.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::options::MetricOptions;
use crate::registry::Registry;
use crate::tags::Tags;
use crate::types::{Counter, Timer};

/// Initial capacity of a scratch tag map.
const SCRATCH_TAG_CAPACITY: usize = 8;

/// Upper bound on retained scratch maps; checkouts beyond this are served by
/// fresh allocations and dropped on return.
const MAX_POOLED_MAPS: usize = 64;

/// A concurrent pool of reusable scratch [`Tags`] maps.
///
/// Checkout hands out an owned map wrapped in a guard; the guard clears the
/// map and returns it to the free list on drop. Ownership makes it
/// impossible for two borrowers to hold the same buffer at once.
#[derive(Debug, Default)]
pub struct TagPool {
    free: Mutex<Vec<Tags>>,
}

impl TagPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a scratch map out of the pool, allocating one only when the
    /// free list is empty.
    pub fn checkout(&self) -> PooledTags<'_> {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        PooledTags {
            pool: self,
            tags: recycled.unwrap_or_else(|| Tags::with_capacity(SCRATCH_TAG_CAPACITY)),
        }
    }

    fn give_back(&self, mut tags: Tags) {
        tags.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < MAX_POOLED_MAPS {
            free.push(tags);
        }
    }

    /// Number of maps currently resting in the pool.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// RAII guard over a checked-out scratch map. Dereferences to [`Tags`];
/// cleared and returned to its pool on drop.
#[derive(Debug)]
pub struct PooledTags<'a> {
    pool: &'a TagPool,
    tags: Tags,
}

impl Deref for PooledTags<'_> {
    type Target = Tags;

    fn deref(&self) -> &Tags {
        &self.tags
    }
}

impl DerefMut for PooledTags<'_> {
    fn deref_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }
}

impl Drop for PooledTags<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.tags));
    }
}

/// Registry-backed recorder for common operational patterns: error events
/// and (operation, status, duration) samples.
///
/// Resolved handles are cached per operation/status so the registry's lock
/// is only touched the first time a given shape is recorded.
#[derive(Debug)]
pub struct OperationalMetrics {
    registry: Registry,
    error_counters: DashMap<String, Arc<Counter>>,
    operation_counters: DashMap<String, Arc<Counter>>,
    operation_timers: DashMap<String, Arc<Timer>>,
    scratch: TagPool,
}

impl OperationalMetrics {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            error_counters: DashMap::new(),
            operation_counters: DashMap::new(),
            operation_timers: DashMap::new(),
            scratch: TagPool::new(),
        }
    }

    /// The registry this recorder resolves metrics against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Records an error event categorized by type and category.
    ///
    /// Increments the `{operation}_errors_total` counter tagged with
    /// `operation`, `error_type` and `error_category`.
    pub fn record_error(
        &self,
        operation: &str,
        error_type: &str,
        error_category: &str,
    ) -> Result<()> {
        let mut tags = self.scratch.checkout();
        tags.insert("operation".into(), operation.into());
        tags.insert("error_type".into(), error_type.into());
        tags.insert("error_category".into(), error_category.into());

        let counter = self.error_counter(operation, error_type, error_category, &tags)?;
        counter.increment();
        Ok(())
    }

    /// Records one operation sample: a status-tagged count plus a duration.
    ///
    /// Increments the `{operation}_total` counter tagged with `operation` and
    /// `status`, and records `duration` into the `{operation}_duration`
    /// timer tagged with `operation`.
    pub fn record_operation(&self, operation: &str, status: &str, duration: Duration) -> Result<()> {
        {
            let mut tags = self.scratch.checkout();
            tags.insert("operation".into(), operation.into());

            let timer = self.operation_timer(operation, &tags)?;
            timer.record(duration);
        }

        let mut tags = self.scratch.checkout();
        tags.insert("operation".into(), operation.into());
        tags.insert("status".into(), status.into());

        let counter = self.operation_counter(operation, status, &tags)?;
        counter.increment();
        Ok(())
    }

    fn error_counter(
        &self,
        operation: &str,
        error_type: &str,
        error_category: &str,
        tags: &Tags,
    ) -> Result<Arc<Counter>> {
        let key = format!("error:{operation}:{error_type}:{error_category}");
        if let Some(counter) = self.error_counters.get(&key) {
            return Ok(counter.clone());
        }

        let counter = self.registry.counter(
            MetricOptions::new(format!("{operation}_errors_total"))
                .with_description(format!("Total number of errors for {operation} operation"))
                .with_unit("count")
                .with_tags(tags.clone()),
        )?;
        debug!(%key, "cached operational error counter");
        self.error_counters.insert(key, counter.clone());
        Ok(counter)
    }

    fn operation_timer(&self, operation: &str, tags: &Tags) -> Result<Arc<Timer>> {
        let key = format!("timer:{operation}");
        if let Some(timer) = self.operation_timers.get(&key) {
            return Ok(timer.clone());
        }

        let timer = self.registry.timer(
            MetricOptions::new(format!("{operation}_duration"))
                .with_description(format!("Duration of {operation} operation"))
                .with_unit("nanoseconds")
                .with_tags(tags.clone()),
        )?;
        debug!(%key, "cached operational timer");
        self.operation_timers.insert(key, timer.clone());
        Ok(timer)
    }

    fn operation_counter(&self, operation: &str, status: &str, tags: &Tags) -> Result<Arc<Counter>> {
        let key = format!("counter:{operation}:{status}");
        if let Some(counter) = self.operation_counters.get(&key) {
            return Ok(counter.clone());
        }

        let counter = self.registry.counter(
            MetricOptions::new(format!("{operation}_total"))
                .with_description(format!("Total number of {operation} operations"))
                .with_unit("count")
                .with_tags(tags.clone()),
        )?;
        debug!(%key, "cached operational counter");
        self.operation_counters.insert(key, counter.clone());
        Ok(counter)
    }
}

/// Fans one logical event out into a primary metric plus one derived metric
/// per context dimension.
///
/// For every `(key, value)` pair in the context, a derived operation named
/// `{operation}_{key}` is recorded with status `value` and the same
/// duration, so a single call populates per-dimension breakdowns without the
/// caller allocating a tag map per dimension.
///
/// All entry points are total over their input: empty or absent context
/// records only the primary operation, and empty operation/status strings
/// simply produce oddly-named but harmless metrics. Failures from the
/// registry (tag policy, cardinality) surface in the returned `Result` and
/// leave already-recorded dimensions in place.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pulse_metrics::operational::{MetricsBuilder, OperationalMetrics};
/// use pulse_metrics::{Registry, Tags};
///
/// let registry = Registry::without_cleanup();
/// let builder = MetricsBuilder::new(OperationalMetrics::new(registry.clone()));
///
/// let mut context = Tags::new();
/// context.insert("provider".into(), "password".into());
/// builder.record_with_context("login", "success", Duration::from_millis(12), &context)?;
///
/// // Primary + one derived operation, each a counter/timer pair.
/// assert_eq!(registry.len(), 4);
/// # Ok::<(), pulse_metrics::MetricError>(())
/// ```
#[derive(Debug)]
pub struct MetricsBuilder {
    om: OperationalMetrics,
}

impl MetricsBuilder {
    pub fn new(om: OperationalMetrics) -> Self {
        Self { om }
    }

    /// The underlying operational recorder.
    pub fn operational(&self) -> &OperationalMetrics {
        &self.om
    }

    /// Records `operation` with its status and duration, then one derived
    /// `{operation}_{key}` sample per context pair.
    pub fn record_with_context(
        &self,
        operation: &str,
        status: &str,
        duration: Duration,
        context: &Tags,
    ) -> Result<()> {
        self.om.record_operation(operation, status, duration)?;

        for (key, value) in context {
            let contextual = format!("{operation}_{key}");
            self.om.record_operation(&contextual, value, duration)?;
        }
        Ok(())
    }

    /// Records a security event as operation `security_{event_type}` with the
    /// action taken as its status. Security events are point-in-time, so the
    /// recorded duration is zero.
    pub fn record_security_event(
        &self,
        event_type: &str,
        action: &str,
        context: &Tags,
    ) -> Result<()> {
        let operation = format!("security_{event_type}");
        self.om.record_operation(&operation, action, Duration::ZERO)?;

        for (key, value) in context {
            let contextual = format!("{operation}_{key}");
            self.om
                .record_operation(&contextual, value, Duration::ZERO)?;
        }
        Ok(())
    }

    /// Records a business measurement as operation `business_{metric_type}`
    /// with `category` as its status.
    ///
    /// The numeric value is interpreted as milliseconds and converted into a
    /// duration so it can ride the same counter/timer storage as operation
    /// samples. This shape reuse is deliberate; non-finite or negative
    /// values clamp to zero since durations are unsigned.
    pub fn record_business_metric(
        &self,
        metric_type: &str,
        category: &str,
        value: f64,
        context: &Tags,
    ) -> Result<()> {
        let operation = format!("business_{metric_type}");
        let duration = millis_to_duration(value);
        self.om.record_operation(&operation, category, duration)?;

        for (key, context_value) in context {
            let contextual = format!("{operation}_{key}");
            self.om
                .record_operation(&contextual, context_value, duration)?;
        }
        Ok(())
    }
}

fn millis_to_duration(value: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((value * 1_000_000.0) as u64)
}
