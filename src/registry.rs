//! Metric identity and lifecycle management.
//!
//! The [`Registry`] is the sole authority over metric identity: it creates or
//! returns primitives keyed by `(kind, name)`, enforces the per-name
//! cardinality circuit breaker, stamps entries with an optional time-to-live,
//! and runs the background sweep that evicts expired entries. Application
//! code never constructs primitives directly; it goes through the registry
//! and keeps the returned handle.
//!
//! Lookup is kept cheap for the common "already exists" case: a shared read
//! lock resolves hits, and only a miss escalates to the write lock with a
//! double-checked re-lookup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MetricError, Result};
use crate::options::MetricOptions;
use crate::tags::{validate_tags, TagPolicy, Tags};
use crate::types::{Counter, Gauge, Histogram, Metric, MetricKind, Timer};

/// Default interval between background sweep passes.
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// A type-erased handle to a registered primitive, as yielded by
/// [`Registry::each`]. Cloning is cheap (it clones an `Arc`).
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Timer(Arc<Timer>),
}

impl MetricHandle {
    pub fn as_counter(&self) -> Option<&Arc<Counter>> {
        match self {
            MetricHandle::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Arc<Gauge>> {
        match self {
            MetricHandle::Gauge(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Arc<Histogram>> {
        match self {
            MetricHandle::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Arc<Timer>> {
        match self {
            MetricHandle::Timer(t) => Some(t),
            _ => None,
        }
    }
}

impl Metric for MetricHandle {
    fn name(&self) -> &str {
        match self {
            MetricHandle::Counter(m) => m.name(),
            MetricHandle::Gauge(m) => m.name(),
            MetricHandle::Histogram(m) => m.name(),
            MetricHandle::Timer(m) => m.name(),
        }
    }

    fn description(&self) -> &str {
        match self {
            MetricHandle::Counter(m) => m.description(),
            MetricHandle::Gauge(m) => m.description(),
            MetricHandle::Histogram(m) => m.description(),
            MetricHandle::Timer(m) => m.description(),
        }
    }

    fn unit(&self) -> &str {
        match self {
            MetricHandle::Counter(m) => m.unit(),
            MetricHandle::Gauge(m) => m.unit(),
            MetricHandle::Histogram(m) => m.unit(),
            MetricHandle::Timer(m) => m.unit(),
        }
    }

    fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(m) => m.kind(),
            MetricHandle::Gauge(m) => m.kind(),
            MetricHandle::Histogram(m) => m.kind(),
            MetricHandle::Timer(m) => m.kind(),
        }
    }

    fn tags(&self) -> &Tags {
        match self {
            MetricHandle::Counter(m) => m.tags(),
            MetricHandle::Gauge(m) => m.tags(),
            MetricHandle::Histogram(m) => m.tags(),
            MetricHandle::Timer(m) => m.tags(),
        }
    }
}

/// Registry lookup key. Tags are deliberately not part of identity: two
/// primitives that differ only by tags are separate instances created by
/// separate calls, while the same `(kind, name)` always resolves to the same
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetricKey {
    kind: MetricKind,
    name: String,
}

/// One registered primitive plus its lifecycle information.
#[derive(Debug)]
struct RegistryEntry {
    metric: MetricHandle,
    ttl: Duration,
    /// Absolute expiration deadline; `None` means the entry is immortal.
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct RegistryState {
    metrics: HashMap<MetricKey, RegistryEntry>,
    /// Live instance count per metric name, across all kinds.
    cardinality: HashMap<String, usize>,
}

#[derive(Debug)]
struct RegistryInner {
    state: RwLock<RegistryState>,
    policy: TagPolicy,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    swept_total: AtomicU64,
}

/// Thread-safe collection of metrics with TTL-based eviction.
///
/// Cloning a `Registry` produces another handle to the same underlying
/// collection, so it can be passed freely across threads and tasks.
///
/// # Examples
///
/// ```
/// use pulse_metrics::{Metric, MetricOptions, Registry};
///
/// let registry = Registry::without_cleanup();
/// let requests = registry.counter(
///     MetricOptions::new("requests_total").with_tag("service", "api"),
/// )?;
/// requests.increment();
///
/// // Same identity resolves to the same instance.
/// let again = registry.counter(MetricOptions::new("requests_total"))?;
/// assert_eq!(again.value(), 1);
///
/// // Exporters walk the live set through `each`.
/// let mut names = Vec::new();
/// registry.each(|metric| names.push(metric.name().to_string()));
/// assert_eq!(names, vec!["requests_total".to_string()]);
/// # Ok::<(), pulse_metrics::MetricError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry with the given tag policy and background sweep
    /// interval. An interval of zero disables the background sweep entirely
    /// ([`Registry::manual_cleanup`] still works).
    ///
    /// The sweep task is spawned on the ambient tokio runtime. When no
    /// runtime is available the registry still functions fully; it only logs
    /// a warning and leaves eviction to manual cleanup.
    pub fn new(policy: TagPolicy, cleanup_interval: Duration) -> Self {
        let inner = Arc::new(RegistryInner {
            state: RwLock::new(RegistryState::default()),
            policy,
            sweeper: Mutex::new(None),
            swept_total: AtomicU64::new(0),
        });

        if cleanup_interval > Duration::ZERO {
            spawn_sweeper(&inner, cleanup_interval);
        }

        Self { inner }
    }

    /// Default policy, five-minute background sweep.
    pub fn with_defaults() -> Self {
        Self::new(TagPolicy::default(), DEFAULT_CLEANUP_INTERVAL)
    }

    /// Default policy, no background sweep; entries with a TTL are only
    /// evicted by [`Registry::manual_cleanup`].
    pub fn without_cleanup() -> Self {
        Self::new(TagPolicy::default(), Duration::ZERO)
    }

    /// The tag policy this registry enforces.
    pub fn policy(&self) -> &TagPolicy {
        &self.inner.policy
    }

    /// Creates or retrieves the counter registered under `opts.name`.
    pub fn counter(&self, opts: MetricOptions) -> Result<Arc<Counter>> {
        let handle = self.get_or_create(MetricKind::Counter, &opts, |opts| {
            Ok(MetricHandle::Counter(Arc::new(Counter::new(opts))))
        })?;
        match handle {
            MetricHandle::Counter(c) => Ok(c),
            _ => unreachable!("counter identity resolved to a different kind"),
        }
    }

    /// Creates or retrieves the gauge registered under `opts.name`.
    pub fn gauge(&self, opts: MetricOptions) -> Result<Arc<Gauge>> {
        let handle = self.get_or_create(MetricKind::Gauge, &opts, |opts| {
            Ok(MetricHandle::Gauge(Arc::new(Gauge::new(opts))))
        })?;
        match handle {
            MetricHandle::Gauge(g) => Ok(g),
            _ => unreachable!("gauge identity resolved to a different kind"),
        }
    }

    /// Creates or retrieves the histogram registered under `opts.name`.
    ///
    /// Bucket boundaries from `opts` are validated here; an invalid series
    /// fails the call with [`MetricError::InvalidBuckets`].
    pub fn histogram(&self, opts: MetricOptions) -> Result<Arc<Histogram>> {
        let handle = self.get_or_create(MetricKind::Histogram, &opts, |opts| {
            Ok(MetricHandle::Histogram(Arc::new(Histogram::new(opts)?)))
        })?;
        match handle {
            MetricHandle::Histogram(h) => Ok(h),
            _ => unreachable!("histogram identity resolved to a different kind"),
        }
    }

    /// Creates or retrieves the timer registered under `opts.name`.
    pub fn timer(&self, opts: MetricOptions) -> Result<Arc<Timer>> {
        let handle = self.get_or_create(MetricKind::Timer, &opts, |opts| {
            Ok(MetricHandle::Timer(Arc::new(Timer::new(opts)?)))
        })?;
        match handle {
            MetricHandle::Timer(t) => Ok(t),
            _ => unreachable!("timer identity resolved to a different kind"),
        }
    }

    /// Shared creation path: validate, fast read-locked lookup, then
    /// double-checked creation under the write lock. Concurrent callers
    /// racing on the same `(kind, name)` all observe the same instance.
    fn get_or_create(
        &self,
        kind: MetricKind,
        opts: &MetricOptions,
        build: impl FnOnce(&MetricOptions) -> Result<MetricHandle>,
    ) -> Result<MetricHandle> {
        if opts.name.is_empty() {
            return Err(MetricError::InvalidName);
        }
        validate_tags(&opts.tags, &self.inner.policy)?;

        let key = MetricKey {
            kind,
            name: opts.name.clone(),
        };

        {
            let state = read_lock(&self.inner.state);
            if let Some(entry) = state.metrics.get(&key) {
                return Ok(entry.metric.clone());
            }
        }

        let mut state = write_lock(&self.inner.state);

        // Another thread may have created the entry between the read unlock
        // and this write lock.
        if let Some(entry) = state.metrics.get(&key) {
            return Ok(entry.metric.clone());
        }

        let current = state.cardinality.get(&opts.name).copied().unwrap_or(0);
        if current >= self.inner.policy.max_cardinality {
            return Err(MetricError::CardinalityExceeded {
                name: opts.name.clone(),
                current,
                max: self.inner.policy.max_cardinality,
            });
        }

        let metric = build(opts)?;
        let expires_at = (opts.ttl > Duration::ZERO).then(|| Instant::now() + opts.ttl);
        state.metrics.insert(
            key,
            RegistryEntry {
                metric: metric.clone(),
                ttl: opts.ttl,
                expires_at,
            },
        );
        *state.cardinality.entry(opts.name.clone()).or_insert(0) += 1;

        Ok(metric)
    }

    /// Removes every kind-variant registered under `name`, adjusting the
    /// cardinality table accordingly. Unregistering an unknown name is a
    /// no-op.
    pub fn unregister(&self, name: &str) {
        let mut state = write_lock(&self.inner.state);
        let RegistryState {
            metrics,
            cardinality,
        } = &mut *state;

        let mut removed = 0usize;
        for kind in MetricKind::ALL {
            let key = MetricKey {
                kind,
                name: name.to_string(),
            };
            if metrics.remove(&key).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            if let Some(count) = cardinality.get_mut(name) {
                *count = count.saturating_sub(removed);
                if *count == 0 {
                    cardinality.remove(name);
                }
            }
        }
    }

    /// Invokes `visitor` once per registered metric, holding the shared lock
    /// only for the duration of the iteration. Entries that are past their
    /// TTL but not yet swept are still visited.
    ///
    /// The visitor must not create or unregister metrics on this registry;
    /// doing so re-enters the identity lock and deadlocks.
    pub fn each<F>(&self, mut visitor: F)
    where
        F: FnMut(&MetricHandle),
    {
        let state = read_lock(&self.inner.state);
        for entry in state.metrics.values() {
            visitor(&entry.metric);
        }
    }

    /// Number of currently registered entries, across all kinds.
    pub fn len(&self) -> usize {
        read_lock(&self.inner.state).metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronously evicts every entry whose deadline has passed.
    pub fn manual_cleanup(&self) {
        self.inner.sweep();
    }

    /// Stops the background sweep task. Idempotent, and safe to call while
    /// the registry is in use: creation, lookup and iteration keep working
    /// after `close`, only the periodic eviction stops.
    pub fn close(&self) {
        let handle = lock_sweeper(&self.inner.sweeper).take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("metrics registry background cleanup stopped");
        }
    }

    /// Total number of entries evicted by sweeps over this registry's
    /// lifetime.
    pub fn swept_total(&self) -> u64 {
        self.inner.swept_total.load(Ordering::Relaxed)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RegistryInner {
    /// One sweep pass: prune expired entries and fix up cardinality under
    /// the write lock. Returns the number of evicted entries.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = write_lock(&self.state);
        let RegistryState {
            metrics,
            cardinality,
        } = &mut *state;

        let before = metrics.len();
        metrics.retain(|key, entry| {
            let expired = entry.ttl > Duration::ZERO
                && entry.expires_at.is_some_and(|deadline| now > deadline);
            if expired {
                let drop_row = match cardinality.get_mut(&key.name) {
                    Some(count) => {
                        *count = count.saturating_sub(1);
                        *count == 0
                    }
                    None => false,
                };
                if drop_row {
                    cardinality.remove(&key.name);
                }
            }
            !expired
        });

        let evicted = before - metrics.len();
        if evicted > 0 {
            self.swept_total.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, remaining = metrics.len(), "swept expired metrics");
        }
        evicted
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }
}

/// Spawns the periodic sweep task on the ambient tokio runtime. The task
/// holds only a weak reference so an abandoned registry is not kept alive by
/// its own janitor; once the last strong handle drops, the task exits on its
/// next tick.
fn spawn_sweeper(inner: &Arc<RegistryInner>, cleanup_interval: Duration) {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!(
                interval_secs = cleanup_interval.as_secs(),
                "no tokio runtime available; metrics background cleanup disabled"
            );
            return;
        }
    };

    let weak: Weak<RegistryInner> = Arc::downgrade(inner);
    let task = handle.spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        // The first tick completes immediately; skip it so the first real
        // sweep happens one full interval after construction.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match weak.upgrade() {
                Some(inner) => {
                    inner.sweep();
                }
                None => break,
            }
        }
    });

    *lock_sweeper(&inner.sweeper) = Some(task);
}

fn read_lock(lock: &RwLock<RegistryState>) -> std::sync::RwLockReadGuard<'_, RegistryState> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock(lock: &RwLock<RegistryState>) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock_sweeper(
    sweeper: &Mutex<Option<JoinHandle<()>>>,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    sweeper.lock().unwrap_or_else(PoisonError::into_inner)
}

static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Process-wide default registry, lazily constructed on first use and alive
/// for the process lifetime.
///
/// It runs no background sweep of its own, so it is safe to touch from
/// synchronous code before any async runtime exists; callers relying on TTL
/// eviction either call [`Registry::manual_cleanup`] or construct an
/// explicit registry inside a runtime. Explicit registries remain the
/// first-class path; this singleton exists for ergonomic top-level use.
pub fn global() -> &'static Registry {
    GLOBAL_REGISTRY.get_or_init(Registry::without_cleanup)
}

/// Creates or retrieves a counter from the global registry.
pub fn get_counter(opts: MetricOptions) -> Result<Arc<Counter>> {
    global().counter(opts)
}

/// Creates or retrieves a gauge from the global registry.
pub fn get_gauge(opts: MetricOptions) -> Result<Arc<Gauge>> {
    global().gauge(opts)
}

/// Creates or retrieves a histogram from the global registry.
pub fn get_histogram(opts: MetricOptions) -> Result<Arc<Histogram>> {
    global().histogram(opts)
}

/// Creates or retrieves a timer from the global registry.
pub fn get_timer(opts: MetricOptions) -> Result<Arc<Timer>> {
    global().timer(opts)
}
