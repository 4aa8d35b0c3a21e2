//! Runtime configuration for discovery and pacing
//!
//! Values resolve with CLI → TOML file → compiled default priority. The
//! resulting [`ExpandConfig`] is passed explicitly to the client and the
//! scheduler at construction.

use gcat_common::config::ExpandSection;
use gcat_common::{Error, Result};
use std::time::Duration;

/// Default per-attempt HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Default number of additional attempts after the first failure
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default backoff unit; attempt `n` waits `n` times this long
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1500);

/// Default concurrent expansions per batch
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default pause between batches
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(800);

/// Largest accepted `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Largest accepted backoff unit
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Discovery configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandConfig {
    /// Upper bound on a single HTTP attempt (request + body)
    pub request_timeout: Duration,
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Linear backoff unit between attempts
    pub retry_backoff: Duration,
    /// Records expanded concurrently within one batch
    pub concurrency: usize,
    /// Pause before starting each batch after the first
    pub batch_delay: Duration,
    /// Identifying client header
    pub user_agent: String,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            concurrency: DEFAULT_CONCURRENCY,
            batch_delay: DEFAULT_BATCH_DELAY,
            user_agent: default_user_agent(),
        }
    }
}

/// `gcat-expand/<crate version>`
pub fn default_user_agent() -> String {
    format!("gcat-expand/{}", env!("CARGO_PKG_VERSION"))
}

impl ExpandConfig {
    /// Resolve from CLI overrides layered over the config file section
    pub fn resolve(file: &ExpandSection, cli: &ExpandSection) -> Result<Self> {
        let defaults = Self::default();

        let request_timeout = match cli.request_timeout_secs.or(file.request_timeout_secs) {
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| {
                Error::Config(format!("request_timeout_secs must be a positive number, got {}", secs))
            })?,
            None => defaults.request_timeout,
        };

        let config = Self {
            request_timeout,
            max_retries: cli.max_retries.or(file.max_retries).unwrap_or(defaults.max_retries),
            retry_backoff: cli
                .retry_backoff_ms
                .or(file.retry_backoff_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            concurrency: cli.concurrency.or(file.concurrency).unwrap_or(defaults.concurrency),
            batch_delay: cli
                .batch_delay_ms
                .or(file.batch_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_delay),
            user_agent: cli
                .user_agent
                .clone()
                .or_else(|| file.user_agent.clone())
                .unwrap_or(defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or disable discovery
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be greater than zero".to_string()));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::Config(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }
        if self.retry_backoff > MAX_RETRY_BACKOFF {
            return Err(Error::Config(format!(
                "retry backoff must be at most {}ms, got {}ms",
                MAX_RETRY_BACKOFF.as_millis(),
                self.retry_backoff.as_millis()
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent must not be empty".to_string()));
        }
        Ok(())
    }
}
