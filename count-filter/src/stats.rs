//! Stats sinks for observability
//!
//! The filter reports drops and shutdowns as named counters, e.g.
//! `count_filter/dropped_requests`. A crawler forwards them to its own stats
//! collector by implementing [`StatsSink`]; [`MemoryStats`] keeps them in
//! memory and can render them in Prometheus text format.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Fire-and-forget sink for named counters
pub trait StatsSink: Send + Sync {
    /// Increment the counter `key` by one
    fn inc_value(&self, key: &str);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl StatsSink for NoopStats {
    fn inc_value(&self, _key: &str) {}
}

/// In-memory named counters
///
/// ```
/// use count_filter::{MemoryStats, StatsSink};
///
/// let stats = MemoryStats::new();
/// stats.inc_value("count_filter/dropped_requests");
/// stats.inc_value("count_filter/dropped_requests");
///
/// assert_eq!(stats.get_value("count_filter/dropped_requests"), 2);
/// assert_eq!(stats.get_value("unknown"), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStats {
    values: Mutex<BTreeMap<String, u64>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, key: &str) -> u64 {
        self.values.lock().get(key).copied().unwrap_or(0)
    }

    /// All counters, ordered by key
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.values
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect()
    }

    /// Export counters in Prometheus text format
    ///
    /// Every key becomes a label of a single `count_filter_events_total`
    /// counter family.
    pub fn export_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        // ~60 chars per line
        let mut output = String::with_capacity(128 + snapshot.len() * 60);

        output.push_str("# HELP count_filter_events_total Count filter events by stats key\n");
        output.push_str("# TYPE count_filter_events_total counter\n");
        for (key, value) in snapshot {
            let _ = writeln!(
                output,
                "count_filter_events_total{{key=\"{}\"}} {value}",
                escape_label(&key)
            );
        }

        output
    }
}

impl StatsSink for MemoryStats {
    fn inc_value(&self, key: &str) {
        let mut values = self.values.lock();
        if let Some(value) = values.get_mut(key) {
            *value = value.saturating_add(1);
        } else {
            values.insert(key.to_owned(), 1);
        }
    }
}

impl<S: StatsSink + ?Sized> StatsSink for std::sync::Arc<S> {
    fn inc_value(&self, key: &str) {
        (**self).inc_value(key)
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
