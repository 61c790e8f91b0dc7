//! The crawler-facing count filter
//!
//! [`CountFilter`] ties the pieces together for one crawl job: it owns the
//! [`CounterStore`], the job's [`LimitConfig`] and an evaluator, and talks
//! back to the crawler through a [`ShutdownHook`] and a [`StatsSink`].
//!
//! The crawler calls three methods:
//!
//! - [`on_page_fetched`](CountFilter::on_page_fetched) once per completed fetch
//! - [`on_item_produced`](CountFilter::on_item_produced) once per extracted item
//! - [`should_allow`](CountFilter::should_allow) before dispatching a request

use crate::core::{
    Counter, CounterStore, Decision, EvaluationMode, LimitConfig, OverflowPolicy, ShutdownReason,
    ThresholdEvaluator,
};
use crate::host::{HostNormalizer, UrlHostNormalizer};
use crate::settings::FilterSettings;
use crate::stats::{NoopStats, StatsSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stats key incremented for every dropped request
pub const DROPPED_REQUESTS_KEY: &str = "count_filter/dropped_requests";
/// Stats key incremented when the filter requests a shutdown
pub const SHUTDOWN_KEY: &str = "count_filter/shutdown";

/// Callback used to terminate the crawl job
pub trait ShutdownHook: Send + Sync {
    /// Request job termination with a machine-readable reason,
    /// e.g. `closespider_counters_overflow`
    fn close(&self, reason: &str);
}

impl<F> ShutdownHook for F
where
    F: Fn(&str) + Send + Sync,
{
    fn close(&self, reason: &str) {
        self(reason)
    }
}

/// Hook for deployments that never shut down from the filter
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShutdown;

impl ShutdownHook for NoShutdown {
    fn close(&self, reason: &str) {
        tracing::debug!(reason, "shutdown requested without a shutdown hook");
    }
}

/// Page/item count filter for one crawl job
///
/// # Example
///
/// ```
/// use count_filter::{CountFilter, Decision, DropReason, LimitConfig, MemoryStats};
/// use std::sync::Arc;
///
/// let stats = Arc::new(MemoryStats::new());
/// let filter = CountFilter::builder()
///     .limits(LimitConfig::new().with_page_host_count(2))
///     .stats(stats.clone())
///     .build();
///
/// filter.on_page_fetched("http://quotes.toscrape.com/page/1/");
/// filter.on_page_fetched("http://quotes.toscrape.com/page/2/");
///
/// assert_eq!(
///     filter.should_allow("http://quotes.toscrape.com/page/3/"),
///     Decision::Drop(DropReason::PageHostCount)
/// );
/// assert!(filter.should_allow("http://books.toscrape.com/").is_allowed());
/// assert_eq!(stats.get_value("count_filter/dropped_requests"), 1);
/// ```
pub struct CountFilter {
    store: Arc<CounterStore>,
    limits: Option<LimitConfig>,
    evaluator: ThresholdEvaluator,
    normalizer: Box<dyn HostNormalizer>,
    shutdown: Box<dyn ShutdownHook>,
    stats: Box<dyn StatsSink>,
    shutdown_requested: AtomicBool,
}

/// Builder for configuring a CountFilter
pub struct CountFilterBuilder {
    store: Option<Arc<CounterStore>>,
    limits: Option<LimitConfig>,
    settings: FilterSettings,
    evaluator: Option<ThresholdEvaluator>,
    normalizer: Box<dyn HostNormalizer>,
    shutdown: Box<dyn ShutdownHook>,
    stats: Box<dyn StatsSink>,
}

impl CountFilter {
    pub fn builder() -> CountFilterBuilder {
        CountFilterBuilder {
            store: None,
            limits: None,
            settings: FilterSettings::default(),
            evaluator: None,
            normalizer: Box::new(UrlHostNormalizer),
            shutdown: Box::new(NoShutdown),
            stats: Box::new(NoopStats),
        }
    }

    /// Record a completed fetch of `request_url`
    pub fn on_page_fetched(&self, request_url: &str) {
        self.on_event(Counter::Page, request_url);
    }

    /// Record an item extracted from the response at `response_url`
    pub fn on_item_produced(&self, response_url: &str) {
        self.on_event(Counter::Item, response_url);
    }

    /// Decide whether a request for `request_url` may be dispatched
    ///
    /// Drops are counted in the stats sink. A shutdown decision invokes the
    /// shutdown hook the first time it is reached; later calls keep
    /// returning the shutdown decision without calling the hook again.
    pub fn should_allow(&self, request_url: &str) -> Decision {
        let host = self.normalizer.host(request_url);
        let decision = self.evaluate_host(&host);

        match decision {
            Decision::Allow => {}
            Decision::Drop(reason) => {
                tracing::debug!(
                    url = request_url,
                    host = %host,
                    reason = reason.as_str(),
                    "dropping request (count overflow)"
                );
                self.stats.inc_value(DROPPED_REQUESTS_KEY);
                self.stats.inc_value(reason.stats_key());
            }
            Decision::ShutDown(reason) => self.request_shutdown(reason),
        }

        decision
    }

    /// Evaluate the limits for a host without side effects
    pub fn evaluate_host(&self, host: &str) -> Decision {
        self.evaluator.evaluate(&self.store, self.limits.as_ref(), host)
    }

    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }

    pub fn limits(&self) -> Option<&LimitConfig> {
        self.limits.as_ref()
    }

    pub fn evaluator(&self) -> ThresholdEvaluator {
        self.evaluator
    }

    /// Whether the shutdown hook has been invoked
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    fn on_event(&self, counter: Counter, url: &str) {
        let host = self.normalizer.host(url);
        self.store.record(counter, &host);
        tracing::trace!(counter = counter.as_str(), host = %host, "recorded event");

        if self.evaluator.mode() == EvaluationMode::WholeJob {
            if let Decision::ShutDown(reason) = self.evaluate_host(&host) {
                self.request_shutdown(reason);
            }
        }
    }

    fn request_shutdown(&self, reason: ShutdownReason) {
        if self.shutdown_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!(
            reason = reason.as_str(),
            page_count = self.store.global(Counter::Page),
            item_count = self.store.global(Counter::Item),
            "shutting down (count overflow)"
        );
        self.stats.inc_value(SHUTDOWN_KEY);
        self.shutdown.close(reason.close_reason());
    }
}

impl CountFilterBuilder {
    /// Limits of the job; without them every request is allowed
    pub fn limits(mut self, limits: LimitConfig) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn maybe_limits(mut self, limits: Option<LimitConfig>) -> Self {
        self.limits = limits;
        self
    }

    /// Settings used for the ignore list and the evaluator
    pub fn settings(mut self, settings: FilterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the evaluator derived from the settings
    pub fn evaluator(mut self, evaluator: ThresholdEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn mode(self, mode: EvaluationMode, policy: OverflowPolicy) -> Self {
        self.evaluator(ThresholdEvaluator::new(mode, policy))
    }

    /// Use an existing store instead of building one from the settings
    pub fn store(mut self, store: Arc<CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn normalizer(mut self, normalizer: impl HostNormalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn shutdown_hook(mut self, hook: impl ShutdownHook + 'static) -> Self {
        self.shutdown = Box::new(hook);
        self
    }

    pub fn stats(mut self, stats: impl StatsSink + 'static) -> Self {
        self.stats = Box::new(stats);
        self
    }

    pub fn build(self) -> CountFilter {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(self.settings.counter_store()));
        let evaluator = self.evaluator.unwrap_or_else(|| self.settings.evaluator());

        CountFilter {
            store,
            limits: self.limits,
            evaluator,
            normalizer: self.normalizer,
            shutdown: self.shutdown,
            stats: self.stats,
            shutdown_requested: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DropReason;
    use crate::stats::MemoryStats;
    use parking_lot::Mutex;

    fn recording_hook() -> (Arc<Mutex<Vec<String>>>, impl ShutdownHook) {
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        (reasons, move |reason: &str| sink.lock().push(reason.to_string()))
    }

    #[test]
    fn test_without_limits_everything_is_allowed() {
        let filter = CountFilter::builder().build();
        for _ in 0..100 {
            filter.on_page_fetched("http://example.com/");
        }

        assert_eq!(filter.should_allow("http://example.com/"), Decision::Allow);
        assert_eq!(filter.store().global(Counter::Page), 100);
    }

    #[test]
    fn test_drop_updates_stats() {
        let stats = Arc::new(MemoryStats::new());
        let filter = CountFilter::builder()
            .limits(LimitConfig::new().with_item_count(1))
            .stats(stats.clone())
            .build();

        filter.on_item_produced("http://example.com/a");
        assert_eq!(
            filter.should_allow("http://example.com/b"),
            Decision::Drop(DropReason::ItemCount)
        );
        filter.should_allow("http://example.com/c");

        assert_eq!(stats.get_value(DROPPED_REQUESTS_KEY), 2);
        assert_eq!(stats.get_value("dropped_requests/item_count_filtering"), 2);
        assert_eq!(stats.get_value(SHUTDOWN_KEY), 0);
    }

    #[test]
    fn test_shutdown_hook_fires_once() {
        let (reasons, hook) = recording_hook();
        let stats = Arc::new(MemoryStats::new());
        let filter = CountFilter::builder()
            .limits(LimitConfig::new().with_page_count(1))
            .settings(FilterSettings {
                close_spider: true,
                ..Default::default()
            })
            .shutdown_hook(hook)
            .stats(stats.clone())
            .build();

        filter.on_page_fetched("http://example.com/");
        assert!(!filter.is_shutdown_requested());

        for _ in 0..3 {
            assert_eq!(
                filter.should_allow("http://example.com/next"),
                Decision::ShutDown(ShutdownReason::CountersOverflow)
            );
        }

        assert!(filter.is_shutdown_requested());
        assert_eq!(*reasons.lock(), vec!["closespider_counters_overflow"]);
        assert_eq!(stats.get_value(SHUTDOWN_KEY), 1);
        assert_eq!(stats.get_value(DROPPED_REQUESTS_KEY), 0);
    }

    #[test]
    fn test_whole_job_checks_after_each_event() {
        let (reasons, hook) = recording_hook();
        let filter = CountFilter::builder()
            .limits(LimitConfig::new().with_page_count(2).with_item_count(10))
            .settings(FilterSettings {
                mode: crate::settings::FilterMode::WholeJob,
                ..Default::default()
            })
            .shutdown_hook(hook)
            .build();

        filter.on_page_fetched("http://example.com/1");
        assert!(reasons.lock().is_empty());

        filter.on_page_fetched("http://example.com/2");
        assert_eq!(
            *reasons.lock(),
            vec!["closespider_global_counters_overflow"]
        );

        filter.on_item_produced("http://example.com/2");
        assert_eq!(reasons.lock().len(), 1);
    }

    #[test]
    fn test_custom_normalizer_and_shared_store() {
        let store = Arc::new(CounterStore::new());
        let filter = CountFilter::builder()
            .store(Arc::clone(&store))
            .normalizer(|url: &str| url.split('/').nth(2).unwrap_or_default().to_string())
            .limits(LimitConfig::new().with_page_host_count(1))
            .build();

        filter.on_page_fetched("http://a.com/x");

        assert_eq!(store.host(Counter::Page, "a.com"), 1);
        assert!(!filter.should_allow("http://a.com/y").is_allowed());
        assert!(filter.should_allow("http://b.com/y").is_allowed());
    }

    #[test]
    fn test_closure_shutdown_hook() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&closed);
        let filter = CountFilter::builder()
            .limits(LimitConfig::new().with_page_count(1))
            .mode(EvaluationMode::WholeJob, OverflowPolicy::Any)
            .shutdown_hook(move |reason: &str| {
                assert_eq!(reason, "closespider_global_counters_overflow");
                flag.store(true, Ordering::SeqCst);
            })
            .build();

        filter.on_page_fetched("http://example.com/");
        assert!(closed.load(Ordering::SeqCst));
    }
}
