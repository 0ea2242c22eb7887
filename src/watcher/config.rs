//! Runtime configuration for the subscription watcher.

use anyhow::{bail, Result};
use std::time::Duration;

const MAX_LOOK_BEHIND_MINUTES: u32 = 24 * 60;
const MAX_TICKER_INTERVAL_SECONDS: u32 = 3600;
const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(60);

/// Validated watcher settings.
///
/// All instances go through [`WatcherConfig::new`] so invariants hold before
/// any component observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    look_behind_minutes: u32,
    ticker_interval_seconds: u32,
    metrics_interval: Duration,
}

impl WatcherConfig {
    /// Builds a configuration, rejecting out-of-range values: the look-behind
    /// must stay within the API's 24-hour window cap and the ticker within
    /// one hour.
    pub fn new(look_behind_minutes: u32, ticker_interval_seconds: u32) -> Result<Self> {
        let config = Self {
            look_behind_minutes,
            ticker_interval_seconds,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Overrides the metrics reporter cadence.
    pub fn with_metrics_interval(mut self, interval: Duration) -> Result<Self> {
        self.metrics_interval = interval;
        self.validate()?;
        Ok(self)
    }

    /// How far before the request time the first window of a content type
    /// reaches back.
    pub fn look_behind(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.look_behind_minutes))
    }

    /// Period of the generator tick.
    pub fn ticker_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.ticker_interval_seconds))
    }

    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.look_behind_minutes == 0 {
            bail!("look_behind_minutes must be greater than 0");
        }
        if self.look_behind_minutes > MAX_LOOK_BEHIND_MINUTES {
            bail!("look_behind_minutes must be less than or equal to 24 hours");
        }
        if self.ticker_interval_seconds == 0 {
            bail!("ticker_interval_seconds must be greater than 0");
        }
        if self.ticker_interval_seconds > MAX_TICKER_INTERVAL_SECONDS {
            bail!("ticker_interval_seconds must be less than or equal to 1 hour");
        }
        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }
        Ok(())
    }
}
