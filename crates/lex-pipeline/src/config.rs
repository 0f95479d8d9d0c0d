//! Pipeline configuration
//!
//! Thresholds, budgets and version stamps are injected into the
//! [`Pipeline`](crate::Pipeline) at construction. No stage reads the
//! environment.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Prompt template version stamped into the audit trail
    pub version_prompt: String,
    /// Model version stamped into the audit trail
    pub version_modelo: String,
    /// Minimum characters for a candidate document to satisfy a source
    pub min_source_chars: usize,
    /// Minimum share of query terms a candidate must contain
    pub min_relevance: f64,
    /// Minimum faithfulness score for approval
    pub faithfulness_threshold: f64,
    /// Claims resolved concurrently
    pub max_concurrent_claims: usize,
    /// Budget for one fetch attempt in milliseconds
    pub fetch_timeout_ms: u64,
    /// Budget for resolving one claim in milliseconds
    pub claim_timeout_ms: u64,
    /// Budget for the whole run in milliseconds
    pub pipeline_timeout_ms: u64,
    /// Extra attempts for transient fetch errors
    pub fetch_retries: u32,
    /// Extra attempts for transient collaborator errors
    pub collaborator_retries: u32,
    /// Base delay between attempts in milliseconds (doubles each attempt)
    pub retry_backoff_ms: u64,
    /// Days the run's artefacts are retained
    pub retention_days: u32,
    /// Fetch result cache
    pub cache: CacheConfig,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns [`ConfigError`] on syntax errors or out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_relevance) {
            return Err(ConfigError::Invalid(format!(
                "min_relevance must be in [0, 1], got {}",
                self.min_relevance
            )));
        }
        if !(0.0..=1.0).contains(&self.faithfulness_threshold) {
            return Err(ConfigError::Invalid(format!(
                "faithfulness_threshold must be in [0, 1], got {}",
                self.faithfulness_threshold
            )));
        }
        if self.max_concurrent_claims == 0 {
            return Err(ConfigError::Invalid("max_concurrent_claims must be positive".into()));
        }
        if self.fetch_timeout_ms == 0 || self.claim_timeout_ms == 0 || self.pipeline_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if self.claim_timeout_ms > self.pipeline_timeout_ms {
            return Err(ConfigError::Invalid(
                "claim_timeout_ms must not exceed pipeline_timeout_ms".into(),
            ));
        }
        Ok(())
    }

    /// With minimum source length
    #[inline]
    #[must_use]
    pub fn with_min_source_chars(mut self, chars: usize) -> Self {
        self.min_source_chars = chars;
        self
    }

    /// With minimum relevance
    #[inline]
    #[must_use]
    pub fn with_min_relevance(mut self, relevance: f64) -> Self {
        self.min_relevance = relevance;
        self
    }

    /// With faithfulness threshold
    #[inline]
    #[must_use]
    pub fn with_faithfulness_threshold(mut self, threshold: f64) -> Self {
        self.faithfulness_threshold = threshold;
        self
    }

    /// With worker pool size
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_claims(mut self, max: usize) -> Self {
        self.max_concurrent_claims = max;
        self
    }

    /// With per-fetch timeout
    #[inline]
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = duration_ms(timeout);
        self
    }

    /// With per-claim timeout
    #[inline]
    #[must_use]
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout_ms = duration_ms(timeout);
        self
    }

    /// With global timeout
    #[inline]
    #[must_use]
    pub fn with_pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_timeout_ms = duration_ms(timeout);
        self
    }

    /// With fetch retry budget
    #[inline]
    #[must_use]
    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    /// With model collaborator retry budget
    #[inline]
    #[must_use]
    pub fn with_collaborator_retries(mut self, retries: u32) -> Self {
        self.collaborator_retries = retries;
        self
    }

    /// With retry base delay
    #[inline]
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = duration_ms(backoff);
        self
    }

    /// With fetch cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Per-fetch timeout
    #[inline]
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Per-claim timeout
    #[inline]
    #[must_use]
    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_timeout_ms)
    }

    /// Global timeout
    #[inline]
    #[must_use]
    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(6);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version_prompt: "lex-prompts/1.0".to_string(),
            version_modelo: "plantilla-determinista/1.0".to_string(),
            min_source_chars: 200,
            min_relevance: 0.2,
            faithfulness_threshold: 0.7,
            max_concurrent_claims: 4,
            fetch_timeout_ms: 8_000,
            claim_timeout_ms: 20_000,
            pipeline_timeout_ms: 55_000,
            fetch_retries: 2,
            collaborator_retries: 1,
            retry_backoff_ms: 200,
            retention_days: 1_825,
            cache: CacheConfig::default(),
        }
    }
}

/// Fetch result cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether fetch results are cached
    pub enabled: bool,
    /// Maximum cached entries
    pub max_capacity: u64,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Cache disabled
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 1_024,
            ttl_secs: 600,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline_timeout(), Duration::from_secs(55));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            min_source_chars = 50
            faithfulness_threshold = 0.8

            [cache]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.min_source_chars, 50);
        assert!((config.faithfulness_threshold - 0.8).abs() < f64::EPSILON);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_capacity, 1_024);
        assert_eq!(config.max_concurrent_claims, 4);
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("min_relevance = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("max_concurrent_claims = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("claim_timeout_ms = 90000"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("min_source_chars = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn backoff_doubles() {
        let config = PipelineConfig::default().with_retry_backoff(Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
    }
}
