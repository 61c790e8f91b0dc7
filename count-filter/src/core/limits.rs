use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One of the four limited metrics
///
/// The two global metrics are compared against the job-wide totals, the two
/// host metrics against the counters of the host a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    PageCount,
    ItemCount,
    PageHostCount,
    ItemHostCount,
}

impl Metric {
    /// All metrics, in the order they are checked
    pub const ALL: [Metric; 4] = [
        Metric::PageCount,
        Metric::ItemCount,
        Metric::PageHostCount,
        Metric::ItemHostCount,
    ];

    /// Metrics without a per-host breakdown
    pub const GLOBAL: [Metric; 2] = [Metric::PageCount, Metric::ItemCount];

    /// Key of this metric in a limits mapping
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PageCount => "page_count",
            Metric::ItemCount => "item_count",
            Metric::PageHostCount => "page_host_count",
            Metric::ItemHostCount => "item_host_count",
        }
    }

    pub fn is_per_host(&self) -> bool {
        matches!(self, Metric::PageHostCount | Metric::ItemHostCount)
    }
}

/// Per-job count limits
///
/// Every limit is optional. `None` and `Some(0)` both mean the metric is not
/// limited, so a default `LimitConfig` never filters anything.
///
/// # Example
///
/// ```
/// use count_filter::{LimitConfig, Metric};
///
/// let limits = LimitConfig::new().with_page_count(100).with_item_host_count(10);
///
/// assert_eq!(limits.get(Metric::PageCount), Some(100));
/// assert_eq!(limits.get(Metric::ItemCount), None);
/// assert!(!limits.is_empty());
/// ```
///
/// Deserializing goes through [`LimitConfig::from_value`], so a malformed
/// field disables that limit instead of failing the whole config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct LimitConfig {
    pub page_count: Option<u64>,
    pub item_count: Option<u64>,
    pub page_host_count: Option<u64>,
    pub item_host_count: Option<u64>,
}

impl LimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_count(mut self, limit: u64) -> Self {
        self.page_count = Some(limit);
        self
    }

    pub fn with_item_count(mut self, limit: u64) -> Self {
        self.item_count = Some(limit);
        self
    }

    pub fn with_page_host_count(mut self, limit: u64) -> Self {
        self.page_host_count = Some(limit);
        self
    }

    pub fn with_item_host_count(mut self, limit: u64) -> Self {
        self.item_host_count = Some(limit);
        self
    }

    /// Enabled limit for a metric, `None` when absent or zero
    pub fn get(&self, metric: Metric) -> Option<u64> {
        let raw = match metric {
            Metric::PageCount => self.page_count,
            Metric::ItemCount => self.item_count,
            Metric::PageHostCount => self.page_host_count,
            Metric::ItemHostCount => self.item_host_count,
        };
        raw.filter(|&limit| limit > 0)
    }

    pub fn is_enabled(&self, metric: Metric) -> bool {
        self.get(metric).is_some()
    }

    /// True when no metric has an enabled limit
    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|&metric| !self.is_enabled(metric))
    }

    /// Build limits from loosely shaped data such as a job's JSON settings
    ///
    /// Returns `None` when `value` is not an object, which leaves the filter
    /// disabled for the job. Inside an object, a field that is not a
    /// non-negative integer is read as disabled and unknown keys are ignored.
    ///
    /// ```
    /// use count_filter::LimitConfig;
    /// use serde_json::json;
    ///
    /// let raw = json!({"page_count": 10, "item_count": "x"});
    /// let limits = LimitConfig::from_value(&raw).unwrap();
    /// assert_eq!(limits.page_count, Some(10));
    /// assert_eq!(limits.item_count, None);
    ///
    /// assert!(LimitConfig::from_value(&json!([1, 2, 3])).is_none());
    /// ```
    pub fn from_value(value: &Value) -> Option<Self> {
        let Some(map) = value.as_object() else {
            tracing::debug!(
                kind = value_kind(value),
                "ignoring count limits that are not a mapping"
            );
            return None;
        };

        let field = |metric: Metric| -> Option<u64> {
            let raw = map.get(metric.as_str())?;
            let limit = raw.as_u64();
            if limit.is_none() {
                tracing::debug!(
                    metric = metric.as_str(),
                    value = %raw,
                    "ignoring malformed count limit"
                );
            }
            limit
        };

        Some(LimitConfig {
            page_count: field(Metric::PageCount),
            item_count: field(Metric::ItemCount),
            page_host_count: field(Metric::PageHostCount),
            item_host_count: field(Metric::ItemHostCount),
        })
    }
}

impl From<Value> for LimitConfig {
    fn from(value: Value) -> Self {
        Self::from_value(&value).unwrap_or_default()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
