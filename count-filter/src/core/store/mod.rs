use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "ahash")]
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
#[cfg(not(feature = "ahash"))]
use std::collections::{HashMap, HashSet};


// Configuration constants
const DEFAULT_HOST_CAPACITY: usize = 64;

/// Kind of event counted by a [`CounterStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// A page was fetched
    Page,
    /// An item was produced from a response
    Item,
}

impl Counter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::Page => "page_count",
            Counter::Item => "item_count",
        }
    }
}

/// Running page and item counts for one crawl job
///
/// Keeps a global total for each [`Counter`] plus a per-host breakdown.
/// Counts only grow: nothing in the store decrements or resets them.
///
/// All methods take `&self`, so a store can be shared between worker
/// threads behind an `Arc`. Global totals are atomics; per-host counts sit
/// behind a read-write lock that is held only for the map access.
///
/// Hosts in the ignore list still count toward the global totals but never
/// get a per-host entry.
///
/// # Example
///
/// ```
/// use count_filter::{Counter, CounterStore};
///
/// let store = CounterStore::builder().ignore_host("cdn.example.com").build();
///
/// store.record_page("example.com");
/// store.record_page("cdn.example.com");
/// store.record_item("example.com");
///
/// assert_eq!(store.global(Counter::Page), 2);
/// assert_eq!(store.host(Counter::Page, "example.com"), 1);
/// assert_eq!(store.host(Counter::Page, "cdn.example.com"), 0);
/// assert_eq!(store.host(Counter::Item, "example.com"), 1);
/// ```
pub struct CounterStore {
    page_total: AtomicU64,
    item_total: AtomicU64,
    page_hosts: RwLock<HashMap<String, u64>>,
    item_hosts: RwLock<HashMap<String, u64>>,
    ignore_hosts: HashSet<String>,
}

/// Builder for configuring a CounterStore
///
/// ```
/// use count_filter::CounterStore;
///
/// let store = CounterStore::builder()
///     .host_capacity(10_000)
///     .ignore_hosts(["static.example.com", "CDN.example.com"])
///     .build();
///
/// assert!(store.is_ignored("cdn.example.com"));
/// ```
pub struct CounterStoreBuilder {
    host_capacity: usize,
    ignore_hosts: HashSet<String>,
}

/// Owned copy of every counter in a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub page_count: u64,
    pub item_count: u64,
    pub page_host_counts: Vec<(String, u64)>,
    pub item_host_counts: Vec<(String, u64)>,
}

impl CounterStore {
    /// Create an empty store with no ignored hosts
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CounterStoreBuilder {
        CounterStoreBuilder {
            host_capacity: DEFAULT_HOST_CAPACITY,
            ignore_hosts: HashSet::new(),
        }
    }

    /// Record one event of `counter` for `host`
    pub fn record(&self, counter: Counter, host: &str) {
        saturating_increment(self.total(counter));

        if self.is_ignored(host) {
            tracing::trace!(counter = counter.as_str(), host, "host ignored, global count only");
            return;
        }

        let mut hosts = self.hosts(counter).write();
        if let Some(count) = hosts.get_mut(host) {
            *count = count.saturating_add(1);
        } else {
            hosts.insert(host.to_owned(), 1);
        }
    }

    /// Record a fetched page for `host`
    pub fn record_page(&self, host: &str) {
        self.record(Counter::Page, host);
    }

    /// Record a produced item for `host`
    pub fn record_item(&self, host: &str) {
        self.record(Counter::Item, host);
    }

    /// Global total for `counter`
    pub fn global(&self, counter: Counter) -> u64 {
        self.total(counter).load(Ordering::Acquire)
    }

    /// Count of `counter` for one host, zero for hosts never seen
    pub fn host(&self, counter: Counter, host: &str) -> u64 {
        self.hosts(counter).read().get(host).copied().unwrap_or(0)
    }

    /// Number of distinct hosts with a count for `counter`
    pub fn host_count_len(&self, counter: Counter) -> usize {
        self.hosts(counter).read().len()
    }

    pub fn is_ignored(&self, host: &str) -> bool {
        !self.ignore_hosts.is_empty() && self.ignore_hosts.contains(host)
    }

    /// Copy out all counters, host entries sorted by host name
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            page_count: self.global(Counter::Page),
            item_count: self.global(Counter::Item),
            page_host_counts: sorted_entries(&self.page_hosts.read()),
            item_host_counts: sorted_entries(&self.item_hosts.read()),
        }
    }

    fn total(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Page => &self.page_total,
            Counter::Item => &self.item_total,
        }
    }

    fn hosts(&self, counter: Counter) -> &RwLock<HashMap<String, u64>> {
        match counter {
            Counter::Page => &self.page_hosts,
            Counter::Item => &self.item_hosts,
        }
    }
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStoreBuilder {
    /// Expected number of distinct hosts, used to pre-size the host maps
    pub fn host_capacity(mut self, capacity: usize) -> Self {
        self.host_capacity = capacity;
        self
    }

    /// Exempt a host from per-host counting
    ///
    /// Hosts are compared after trimming and lowercasing.
    pub fn ignore_host(mut self, host: impl AsRef<str>) -> Self {
        let host = host.as_ref().trim().to_lowercase();
        if !host.is_empty() {
            self.ignore_hosts.insert(host);
        }
        self
    }

    pub fn ignore_hosts<I, S>(self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hosts.into_iter().fold(self, |builder, host| builder.ignore_host(host))
    }

    pub fn build(self) -> CounterStore {
        CounterStore {
            page_total: AtomicU64::new(0),
            item_total: AtomicU64::new(0),
            page_hosts: RwLock::new(HashMap::with_capacity(self.host_capacity)),
            item_hosts: RwLock::new(HashMap::with_capacity(self.host_capacity)),
            ignore_hosts: self.ignore_hosts,
        }
    }
}

fn saturating_increment(total: &AtomicU64) {
    // fetch_update only fails when the closure returns None, which happens at u64::MAX
    let _ = total.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1));
}

fn sorted_entries(hosts: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = hosts
        .iter()
        .map(|(host, count)| (host.clone(), *count))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    entries
}
