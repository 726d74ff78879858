//! Harvest configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. [`HarvestConfig::default`]
//! 2. an optional YAML file (`--config`)
//! 3. command-line flags and environment variables (see [`crate::cli`])
//!
//! ```yaml
//! host: www.federalreserve.gov
//! start_year: 2006
//! end_year: 2024
//! concurrency: 4
//! request_interval_ms: 500
//! jitter_ms: 100
//! malformed: skip
//! ```

use crate::errors::HarvestError;
use crate::scrapers::urls::{EARLIEST_YEAR, create_url_list};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// What to do with a listing row whose date cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log it, record it in the report, and keep going.
    #[default]
    Skip,
    /// Fail the harvest on the first malformed row.
    Abort,
}

/// Effective settings of one harvest.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Bare host name of the source site, without scheme.
    pub host: String,
    /// Path prefix of the yearly listing pages.
    pub prefix: String,
    /// Listing page suffix for years after the legacy cutoff.
    pub suffix: String,
    pub start_year: i32,
    pub end_year: i32,
    /// Maximum requests in flight.
    pub concurrency: usize,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound of the random jitter added to each retry delay.
    pub jitter_ms: u64,
    /// Minimum gap between the starts of two requests.
    pub request_interval_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub malformed: MalformedPolicy,
    pub diagnostics: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            host: "www.federalreserve.gov".to_string(),
            prefix: "/newsevents/speech/".to_string(),
            suffix: "-speeches.htm".to_string(),
            start_year: 2012,
            end_year: 2024,
            concurrency: 4,
            max_retries: 4,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ms: 250,
            request_interval_ms: 250,
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            malformed: MalformedPolicy::Skip,
            diagnostics: false,
        }
    }
}

impl HarvestConfig {
    /// Load a YAML config file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, HarvestError> {
        let raw = fs::read_to_string(path).await?;
        let config: HarvestConfig = serde_yaml::from_str(&raw)?;
        info!("Loaded configuration file");
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful harvest.
    pub fn validate(&self) -> Result<(), HarvestError> {
        let bad = |msg: String| -> Result<(), HarvestError> { Err(HarvestError::Config(msg)) };

        if self.host.trim().is_empty() {
            return bad("host must not be empty".to_string());
        }
        if self.host.contains('/') {
            return bad(format!("host {:?} must be a bare host name", self.host));
        }
        if !self.prefix.starts_with('/') {
            return bad(format!("prefix {:?} must start with '/'", self.prefix));
        }
        if self.start_year < EARLIEST_YEAR {
            return bad(format!(
                "start_year {} is before the earliest listing year {EARLIEST_YEAR}",
                self.start_year
            ));
        }
        if self.end_year < self.start_year {
            return bad(format!(
                "end_year {} is before start_year {}",
                self.end_year, self.start_year
            ));
        }
        if self.concurrency == 0 {
            return bad("concurrency must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return bad("timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Listing paths for every configured year, oldest first.
    pub fn listing_paths(&self) -> Vec<String> {
        create_url_list(self.start_year, self.end_year, &self.prefix, &self.suffix)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
