use super::limits::{LimitConfig, Metric};
use super::store::{Counter, CounterStore};
use std::fmt;

/// Why a single request was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    PageCount,
    ItemCount,
    PageHostCount,
    ItemHostCount,
}

impl DropReason {
    /// Stable reason code, e.g. `page_count_filter`
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::PageCount => "page_count_filter",
            DropReason::ItemCount => "item_count_filter",
            DropReason::PageHostCount => "page_host_count_filter",
            DropReason::ItemHostCount => "item_host_count_filter",
        }
    }

    /// Stats key incremented for drops with this reason
    pub fn stats_key(&self) -> &'static str {
        match self {
            DropReason::PageCount => "dropped_requests/page_count_filtering",
            DropReason::ItemCount => "dropped_requests/item_count_filtering",
            DropReason::PageHostCount => "dropped_requests/page_host_count_filtering",
            DropReason::ItemHostCount => "dropped_requests/item_host_count_filtering",
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            DropReason::PageCount => Metric::PageCount,
            DropReason::ItemCount => Metric::ItemCount,
            DropReason::PageHostCount => Metric::PageHostCount,
            DropReason::ItemHostCount => Metric::ItemHostCount,
        }
    }

    fn from_metric(metric: Metric) -> Self {
        match metric {
            Metric::PageCount => DropReason::PageCount,
            Metric::ItemCount => DropReason::ItemCount,
            Metric::PageHostCount => DropReason::PageHostCount,
            Metric::ItemHostCount => DropReason::ItemHostCount,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the whole job should stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownReason {
    /// Total overflow detected while filtering a request
    CountersOverflow,
    /// Total overflow of the global counters in whole-job mode
    GlobalCountersOverflow,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CountersOverflow => "counters_overflow",
            ShutdownReason::GlobalCountersOverflow => "global_counters_overflow",
        }
    }

    /// Reason handed to the shutdown hook
    pub fn close_reason(&self) -> &'static str {
        match self {
            ShutdownReason::CountersOverflow => "closespider_counters_overflow",
            ShutdownReason::GlobalCountersOverflow => "closespider_global_counters_overflow",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating the limits for one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Let the request proceed
    Allow,
    /// Reject this request only
    Drop(DropReason),
    /// Terminate the whole job
    ShutDown(ShutdownReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Reason code of a drop or shutdown, `None` for `Allow`
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::Drop(reason) => Some(reason.as_str()),
            Decision::ShutDown(reason) => Some(reason.as_str()),
        }
    }
}

/// How the per-metric overflow flags combine into a total overflow
///
/// Only enabled metrics take part. What differs is how metrics without a
/// limit are treated:
///
/// - [`Any`](OverflowPolicy::Any): one enabled metric over is enough
/// - [`AllConfigured`](OverflowPolicy::AllConfigured): every enabled metric
///   must be over; unset metrics are skipped, and with nothing enabled there
///   is never a total overflow
/// - [`RequireAllConfigured`](OverflowPolicy::RequireAllConfigured): every
///   metric in scope must be enabled and over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    Any,
    #[default]
    AllConfigured,
    RequireAllConfigured,
}

/// Where the evaluator runs and what it may decide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Checked before each request is dispatched
    ///
    /// Produces drops for the individual request. A total overflow is only
    /// turned into a shutdown when `shutdown` is set.
    PerRequest { shutdown: bool },
    /// Checked to decide whether the whole job goes on
    ///
    /// Only the global metrics are in scope, and the only outcomes are
    /// `Allow` and `ShutDown`.
    WholeJob,
}

impl Default for EvaluationMode {
    fn default() -> Self {
        EvaluationMode::PerRequest { shutdown: false }
    }
}

impl EvaluationMode {
    fn metrics(&self) -> &'static [Metric] {
        match self {
            EvaluationMode::PerRequest { .. } => &Metric::ALL,
            EvaluationMode::WholeJob => &Metric::GLOBAL,
        }
    }
}

/// Per-metric overflow flags for one host
///
/// A flag is set when the metric has an enabled limit and its current count
/// is at or past that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overflow {
    pub page_count: bool,
    pub item_count: bool,
    pub page_host_count: bool,
    pub item_host_count: bool,
}

impl Overflow {
    pub fn get(&self, metric: Metric) -> bool {
        match metric {
            Metric::PageCount => self.page_count,
            Metric::ItemCount => self.item_count,
            Metric::PageHostCount => self.page_host_count,
            Metric::ItemHostCount => self.item_host_count,
        }
    }

    pub fn any(&self) -> bool {
        Metric::ALL.iter().any(|&metric| self.get(metric))
    }
}

/// Turns counts and limits into a [`Decision`]
///
/// Evaluation is a pure read of the store: it never records anything and
/// never fails. Missing or empty limits always allow.
///
/// # Example
///
/// ```
/// use count_filter::{CounterStore, Decision, DropReason, LimitConfig, ThresholdEvaluator};
///
/// let store = CounterStore::new();
/// let evaluator = ThresholdEvaluator::per_request();
/// let limits = LimitConfig::new().with_page_count(1);
///
/// assert_eq!(evaluator.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);
///
/// store.record_page("example.com");
/// assert_eq!(
///     evaluator.evaluate(&store, Some(&limits), "example.com"),
///     Decision::Drop(DropReason::PageCount)
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThresholdEvaluator {
    mode: EvaluationMode,
    policy: OverflowPolicy,
}

impl ThresholdEvaluator {
    pub fn new(mode: EvaluationMode, policy: OverflowPolicy) -> Self {
        ThresholdEvaluator { mode, policy }
    }

    /// Per-request evaluator that only ever drops
    pub fn per_request() -> Self {
        Self::new(
            EvaluationMode::PerRequest { shutdown: false },
            OverflowPolicy::AllConfigured,
        )
    }

    /// Whole-job evaluator that shuts down once any global limit is reached
    pub fn whole_job() -> Self {
        Self::new(EvaluationMode::WholeJob, OverflowPolicy::Any)
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Compute the overflow flag of every metric for `host`
    pub fn overflow(&self, store: &CounterStore, limits: &LimitConfig, host: &str) -> Overflow {
        let over = |metric: Metric| -> bool {
            match limits.get(metric) {
                Some(limit) => current_count(store, metric, host) >= limit,
                None => false,
            }
        };

        Overflow {
            page_count: over(Metric::PageCount),
            item_count: over(Metric::ItemCount),
            page_host_count: over(Metric::PageHostCount),
            item_host_count: over(Metric::ItemHostCount),
        }
    }

    /// Decide what happens to the current unit of work for `host`
    pub fn evaluate(
        &self,
        store: &CounterStore,
        limits: Option<&LimitConfig>,
        host: &str,
    ) -> Decision {
        let Some(limits) = limits.filter(|limits| !limits.is_empty()) else {
            return Decision::Allow;
        };

        let overflow = self.overflow(store, limits, host);

        match self.mode {
            EvaluationMode::WholeJob => {
                if self.total_overflow(limits, &overflow) {
                    Decision::ShutDown(ShutdownReason::GlobalCountersOverflow)
                } else {
                    Decision::Allow
                }
            }
            EvaluationMode::PerRequest { shutdown } => {
                if shutdown && self.total_overflow(limits, &overflow) {
                    return Decision::ShutDown(ShutdownReason::CountersOverflow);
                }

                Metric::ALL
                    .iter()
                    .find(|&&metric| overflow.get(metric))
                    .map_or(Decision::Allow, |&metric| {
                        Decision::Drop(DropReason::from_metric(metric))
                    })
            }
        }
    }

    /// Whether the flags add up to a total overflow under this policy
    pub fn total_overflow(&self, limits: &LimitConfig, overflow: &Overflow) -> bool {
        let scope = self.mode.metrics();
        let mut enabled = scope.iter().filter(|&&metric| limits.is_enabled(metric)).peekable();

        match self.policy {
            OverflowPolicy::Any => enabled.any(|&metric| overflow.get(metric)),
            OverflowPolicy::AllConfigured => {
                enabled.peek().is_some() && enabled.all(|&metric| overflow.get(metric))
            }
            OverflowPolicy::RequireAllConfigured => scope
                .iter()
                .all(|&metric| limits.is_enabled(metric) && overflow.get(metric)),
        }
    }
}

fn current_count(store: &CounterStore, metric: Metric, host: &str) -> u64 {
    match metric {
        Metric::PageCount => store.global(Counter::Page),
        Metric::ItemCount => store.global(Counter::Item),
        Metric::PageHostCount => store.host(Counter::Page, host),
        Metric::ItemHostCount => store.host(Counter::Item, host),
    }
}
