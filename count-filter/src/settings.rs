//! Filter settings
//!
//! Settings are plain data with serde support, so a crawler can embed them
//! in its own configuration. [`FilterSettings::from_env`] reads them from
//! environment variables with the `COUNT_FILTER_` prefix:
//!
//! ```bash
//! export COUNT_FILTER_CLOSE_SPIDER=true
//! export COUNT_FILTER_IGNORE_HOSTS=cdn.example.com,static.example.com
//! export COUNT_FILTER_REQUIRE_ALL_CONFIGURED=false
//! export COUNT_FILTER_MODE=per_request
//! ```

use crate::core::{CounterStore, EvaluationMode, OverflowPolicy, ThresholdEvaluator};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "COUNT_FILTER";

/// Errors raised while loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read count filter settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("ignore host must be a host name, not a URL: {0}")]
    InvalidIgnoreHost(String),
}

/// Which evaluator the filter runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Filter each request, dropping those over a limit
    #[default]
    PerRequest,
    /// Only decide whether the whole job goes on
    WholeJob,
}

/// Job-level settings of the count filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Shut the job down on a total overflow instead of only dropping
    pub close_spider: bool,
    /// Hosts exempt from per-host counting
    pub ignore_hosts: Vec<String>,
    /// Only treat the overflow as total when every metric is limited
    pub require_all_configured: bool,
    pub mode: FilterMode,
}

impl FilterSettings {
    /// Read settings from `COUNT_FILTER_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_env_source(None)
    }

    /// Like [`from_env`](Self::from_env) but reading from `source` when given
    pub fn from_env_source(
        source: Option<config::Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let settings: FilterSettings = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ignore_hosts")
                    .source(source),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check that ignore hosts are host names
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(host) = self
            .ignore_hosts
            .iter()
            .find(|host| host.contains("://") || host.contains('/'))
        {
            return Err(SettingsError::InvalidIgnoreHost(host.clone()));
        }
        Ok(())
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        match (self.require_all_configured, self.mode) {
            (true, _) => OverflowPolicy::RequireAllConfigured,
            (false, FilterMode::PerRequest) => OverflowPolicy::AllConfigured,
            (false, FilterMode::WholeJob) => OverflowPolicy::Any,
        }
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        match self.mode {
            FilterMode::PerRequest => EvaluationMode::PerRequest {
                shutdown: self.close_spider,
            },
            FilterMode::WholeJob => EvaluationMode::WholeJob,
        }
    }

    /// Evaluator configured from these settings
    pub fn evaluator(&self) -> ThresholdEvaluator {
        ThresholdEvaluator::new(self.evaluation_mode(), self.overflow_policy())
    }

    /// Empty counter store honoring the ignore list
    pub fn counter_store(&self) -> CounterStore {
        CounterStore::builder()
            .ignore_hosts(&self.ignore_hosts)
            .build()
    }
}
