//! Configuration types for arxiv-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry behavior for upstream requests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per request, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Wait before the retry that follows failed attempt `attempt` (1-based)
    ///
    /// With the defaults this is 2, 4, 8, ... seconds, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        // A negative multiplier with an odd exponent yields negative seconds
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_delay)
    }
}

/// Scheduling policy shared by the transport and the harvest loop
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestPolicy {
    /// Retry schedule for each page request
    pub retry: RetryConfig,
    /// Fixed wait between consecutive page requests
    pub page_delay: Duration,
}

impl Default for HarvestPolicy {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            page_delay: default_page_delay(),
        }
    }
}

/// Process configuration, read once at startup
///
/// Every field has a default so an empty JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// OAI-PMH endpoint (default: "https://oaipmh.arxiv.org/oai")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Metadata format requested from the repository (default: "oai_dc")
    #[serde(default = "default_metadata_prefix")]
    pub metadata_prefix: String,

    /// Taxonomy codes to keep, e.g. "cs.AI" (default: cs.AI, cs.LG)
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Records published more than this many days ago are pruned (default: 30)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Window length used when the snapshot gives no resume point (default: 7)
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,

    /// Allowed submission-to-announcement lag (default: 5, None disables)
    ///
    /// Records published earlier than `start_date - publication_lag_days` were
    /// only updated in the window, not newly published, and are skipped.
    #[serde(default = "default_publication_lag_days")]
    pub publication_lag_days: Option<u32>,

    /// Snapshot file (default: "arxiv_recent.json")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Wait between pages to respect upstream rate limits (default: 3 seconds)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub page_delay: Duration,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            metadata_prefix: default_metadata_prefix(),
            categories: default_categories(),
            retention_days: default_retention_days(),
            default_lookback_days: default_lookback_days(),
            publication_lag_days: default_publication_lag_days(),
            output_path: default_output_path(),
            request_timeout: default_request_timeout(),
            page_delay: default_page_delay(),
            retry: RetryConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: HarvestConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reject settings the harvester cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base_url must not be empty", "base_url"));
        }
        if self.metadata_prefix.trim().is_empty() {
            return Err(Error::config(
                "metadata_prefix must not be empty",
                "metadata_prefix",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "max_attempts must be at least 1",
                "retry.max_attempts",
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(Error::config(
                "backoff_multiplier must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        Ok(())
    }

    /// Scheduling policy for this configuration
    pub fn policy(&self) -> HarvestPolicy {
        HarvestPolicy {
            retry: self.retry.clone(),
            page_delay: self.page_delay,
        }
    }
}

fn default_base_url() -> String {
    "https://oaipmh.arxiv.org/oai".to_string()
}

fn default_metadata_prefix() -> String {
    "oai_dc".to_string()
}

fn default_categories() -> Vec<String> {
    vec!["cs.AI".to_string(), "cs.LG".to_string()]
}

fn default_retention_days() -> u32 {
    30
}

fn default_lookback_days() -> u32 {
    7
}

fn default_publication_lag_days() -> Option<u32> {
    Some(5)
}

fn default_output_path() -> PathBuf {
    PathBuf::from("arxiv_recent.json")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_page_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Durations are stored as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
