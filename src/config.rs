//! Runtime configuration.
//!
//! Defaults reproduce the production crawl settings. An optional YAML file
//! can override any subset of fields; CLI flags are applied on top of that in
//! `main`.
//!
//! ```yaml
//! jokes:
//!   max_continuations: 3
//!   fetch:
//!     pacing: { min_ms: 0, max_ms: 0 }
//! news:
//!   ingest_url: http://localhost:4000
//! ```

use crate::error::ConfigError;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// An inclusive range of milliseconds from which a delay is drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    #[cfg(test)]
    pub const ZERO: DelayRange = DelayRange::fixed(0);

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    #[cfg(test)]
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng().random_range(self.min_ms..=self.max_ms))
    }
}

/// Attempt ceiling, delays, and timeouts for the fetch client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Primary attempts per fetch before failing or escalating.
    pub max_attempts: u32,
    /// Delay before every primary attempt.
    pub pacing: DelayRange,
    /// Delay after a failed primary attempt that will be retried.
    pub backoff: DelayRange,
    /// Timeout for article body fetches.
    pub timeout_ms: u64,
    /// Timeout for listing pages, continuations, and the alternate fetch.
    pub listing_timeout_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pacing: DelayRange::new(2_000, 5_000),
            backoff: DelayRange::new(5_000, 10_000),
            timeout_ms: 15_000,
            listing_timeout_ms: 10_000,
        }
    }
}

impl FetchPolicy {
    /// Same ceilings as the default with every delay removed.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            pacing: DelayRange::ZERO,
            backoff: DelayRange::ZERO,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }
}

/// Joke catalog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JokesConfig {
    /// Category index page; category links must live under this URL.
    pub base_url: String,
    /// "Load more" endpoint, queried with `page` and `category`.
    pub continuation_url: String,
    pub output_dir: String,
    /// Destination of the concatenated category files.
    pub combined_file: String,
    pub max_continuations: usize,
    pub continuation_delay_ms: u64,
    pub fetch: FetchPolicy,
}

impl Default for JokesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.laughfactory.com/jokes".to_string(),
            continuation_url: "https://www.laughfactory.com/jokes/ajax/load_more".to_string(),
            output_dir: "jokes".to_string(),
            combined_file: "combined_jokes.txt".to_string(),
            max_continuations: 10,
            continuation_delay_ms: 1_000,
            fetch: FetchPolicy::default(),
        }
    }
}

impl JokesConfig {
    pub fn continuation_delay(&self) -> Duration {
        Duration::from_millis(self.continuation_delay_ms)
    }
}

/// News homepage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub homepage_url: String,
    /// Base URL of the ingestion API; records go to `<ingest_url>/news/create`.
    pub ingest_url: String,
    pub max_stories: usize,
    /// Story containers inspected on the homepage.
    pub max_candidates: usize,
    pub fetch: FetchPolicy,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            homepage_url: "https://www.nytimes.com".to_string(),
            ingest_url: "http://localhost:4000".to_string(),
            max_stories: 5,
            max_candidates: 10,
            fetch: FetchPolicy::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// User agents rotated across primary fetch attempts.
    pub user_agents: Vec<String>,
    pub jokes: JokesConfig,
    pub news: NewsConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
            jokes: JokesConfig::default(),
            news: NewsConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Parse a YAML document; absent fields keep their defaults.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&yaml, path)?;
        info!(path, "Loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
jokes:
  max_continuations: 3
  fetch:
    pacing: { min_ms: 0, max_ms: 0 }
news:
  ingest_url: http://ingest.local:9000
"#;
        let config = HarvestConfig::from_yaml(yaml, "test.yaml").unwrap();
        assert_eq!(config.jokes.max_continuations, 3);
        assert_eq!(config.jokes.fetch.pacing, DelayRange::ZERO);
        assert_eq!(config.jokes.fetch.max_attempts, 3);
        assert_eq!(config.jokes.fetch.backoff, DelayRange::new(5_000, 10_000));
        assert_eq!(config.news.ingest_url, "http://ingest.local:9000");
        assert_eq!(config.news.max_stories, 5);
        assert_eq!(config.user_agents.len(), 4);
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let err = HarvestConfig::from_yaml("jokes: [1, 2", "bad.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_delay_sample_stays_in_range() {
        let range = DelayRange::new(5, 10);
        for _ in 0..50 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
        }
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
    }

    #[test]
    fn test_immediate_policy_has_no_delays() {
        let policy = FetchPolicy::immediate();
        assert_eq!(policy.pacing.sample(), Duration::ZERO);
        assert_eq!(policy.backoff.sample(), Duration::ZERO);
        assert_eq!(policy.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_load_without_path_returns_defaults() {
        let config = HarvestConfig::load(None).await.unwrap();
        assert_eq!(config, HarvestConfig::default());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_read_error() {
        let err = HarvestConfig::load(Some("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
