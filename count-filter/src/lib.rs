//! # count-filter
//!
//! A page and item counting filter for web crawlers.
//!
//! ## Overview
//!
//! A crawl job often has a budget: stop after N pages, after N scraped
//! items, or after N pages from any single site. `count-filter` keeps the
//! running counts and answers, for every request the crawler is about to
//! dispatch, whether it may proceed:
//!
//! - **Allow**: the request goes on
//! - **Drop**: this one request is skipped
//! - **ShutDown**: the whole job should terminate
//!
//! Counts are cumulative for the lifetime of the job. There is no decay or
//! time window.
//!
//! ## Quick Start
//!
//! ```
//! use count_filter::{CountFilter, Decision, LimitConfig};
//!
//! let filter = CountFilter::builder()
//!     .limits(LimitConfig::new().with_page_count(100).with_item_host_count(20))
//!     .build();
//!
//! // Report events as they happen
//! filter.on_page_fetched("https://example.com/catalogue/page-1.html");
//! filter.on_item_produced("https://example.com/catalogue/page-1.html");
//!
//! // Ask before dispatching a request
//! match filter.should_allow("https://example.com/catalogue/page-2.html") {
//!     Decision::Allow => println!("dispatch"),
//!     Decision::Drop(reason) => println!("skipped: {reason}"),
//!     Decision::ShutDown(reason) => println!("stopping: {reason}"),
//! }
//! ```
//!
//! ## Limits
//!
//! [`LimitConfig`] holds four optional limits. A limit of zero or no limit at
//! all disables the metric.
//!
//! - **`page_count`**: pages fetched in the whole job
//! - **`item_count`**: items produced in the whole job
//! - **`page_host_count`**: pages fetched from the request's host
//! - **`item_host_count`**: items produced from the request's host
//!
//! A metric overflows once its count reaches the limit (`count >= limit`).
//!
//! ## Modes
//!
//! The [`ThresholdEvaluator`] runs in one of two [`EvaluationMode`]s:
//!
//! - **Per request**: overflowing metrics drop the request. Metrics are checked
//!   in the order `page_count`, `item_count`, `page_host_count`,
//!   `item_host_count`, and the first one over its limit names the
//!   [`DropReason`]. With shutdown enabled, a total overflow stops the job.
//! - **Whole job**: only the global metrics count, and the only outcomes are
//!   allow or shut down.
//!
//! What makes an overflow "total" is an explicit [`OverflowPolicy`].
//!
//! ## Lower-level use
//!
//! The [`CounterStore`] and [`ThresholdEvaluator`] can be used on their own:
//!
//! ```
//! use count_filter::{
//!     CounterStore, Decision, EvaluationMode, LimitConfig, OverflowPolicy, ShutdownReason,
//!     ThresholdEvaluator,
//! };
//!
//! let store = CounterStore::new();
//! let evaluator = ThresholdEvaluator::new(EvaluationMode::WholeJob, OverflowPolicy::Any);
//! let limits = LimitConfig::new().with_page_count(1).with_item_count(1);
//!
//! store.record_page("quotes.toscrape.com");
//!
//! assert_eq!(
//!     evaluator.evaluate(&store, Some(&limits), "quotes.toscrape.com"),
//!     Decision::ShutDown(ShutdownReason::GlobalCountersOverflow)
//! );
//! ```
//!
//! ## Thread Safety
//!
//! Every operation takes `&self`. Share a [`CountFilter`] or a
//! [`CounterStore`] between worker threads with an `Arc`; increments are
//! never lost.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for the per-host maps

pub mod core;
pub mod filter;
pub mod host;
pub mod settings;
pub mod stats;

pub use crate::core::{
    Counter, CounterSnapshot, CounterStore, CounterStoreBuilder, Decision, DropReason,
    EvaluationMode, LimitConfig, Metric, Overflow, OverflowPolicy, ShutdownReason,
    ThresholdEvaluator,
};
pub use filter::{
    CountFilter, CountFilterBuilder, DROPPED_REQUESTS_KEY, NoShutdown, SHUTDOWN_KEY, ShutdownHook,
};
pub use host::{HostNormalizer, UrlHostNormalizer, normalize_host};
pub use settings::{FilterMode, FilterSettings, SettingsError};
pub use stats::{MemoryStats, NoopStats, StatsSink};
