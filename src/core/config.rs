//! Pipeline configuration
//!
//! All tunable constants of the pipeline live here. The confidence weights
//! and threshold have no principled derivation; they are knobs, and the
//! defaults only reproduce the behavior the pipeline was designed around.

use crate::core::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for one pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // === INTENT CLASSIFICATION ===
    /// Weight of the keyword score in the combined confidence
    pub keyword_weight: f64,

    /// Weight of the context score in the combined confidence
    ///
    /// Must sum to 1.0 with `keyword_weight`.
    pub context_weight: f64,

    /// Confidence below which an utterance is handed to the AI orchestrator
    pub confidence_threshold: f64,

    // === CONVERSATION CONTEXT ===
    /// Turns kept in the per-session history; oldest evicted first
    pub history_capacity: usize,

    /// Maximum number of recent operation tags derived from history
    pub recent_operation_limit: usize,

    // === AI ORCHESTRATION ===
    /// Time-to-live of cached AI outcomes, in seconds
    pub cache_ttl_secs: u64,

    /// Deadline for a single provider call, in milliseconds
    ///
    /// A timed out call counts as a provider failure.
    pub provider_timeout_ms: u64,

    /// AI actions with a confidence below this are skipped
    pub min_action_confidence: f64,

    /// Ordered provider list; earlier entries are tried first
    pub providers: Vec<ProviderConfig>,

    // === EXECUTION ===
    /// Execution attempts per command, including the first
    pub max_attempts: u32,

    /// Base of the exponential backoff after a raised dispatch fault
    ///
    /// Attempt `n` (0-based) waits `base × 2^n` before the next one.
    pub retry_base_delay_ms: u64,

    /// Deadline for a single dispatch attempt, in milliseconds
    pub dispatch_timeout_ms: u64,

    // === PARAMETERS ===
    /// Offset applied for relative phrases ("next to it", "above it")
    pub relative_offset: f64,

    /// Largest radius/dimension parameter repair leaves untouched
    pub max_dimension: f64,
}

/// One LLM endpoint in the provider priority list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name used in logs
    pub id: String,
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // Classification (0.7 keyword / 0.3 context, threshold 0.7)
            keyword_weight: 0.7,
            context_weight: 0.3,
            confidence_threshold: 0.7,

            // Context
            history_capacity: 10,
            recent_operation_limit: 5,

            // AI
            cache_ttl_secs: 300,
            provider_timeout_ms: 30_000,
            min_action_confidence: 0.0,
            providers: Vec::new(),

            // Execution
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            dispatch_timeout_ms: 10_000,

            // Parameters
            relative_offset: 5.0,
            max_dimension: 1000.0,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate().map_err(PipelineError::Config)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, value) in [
            ("keyword_weight", self.keyword_weight),
            ("context_weight", self.context_weight),
            ("confidence_threshold", self.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} ({}) must be within [0, 1]", name, value));
            }
        }

        if (self.keyword_weight + self.context_weight - 1.0).abs() > 1e-6 {
            return Err(format!(
                "keyword_weight ({}) + context_weight ({}) must equal 1.0",
                self.keyword_weight, self.context_weight
            ));
        }

        if self.history_capacity == 0 {
            return Err("history_capacity must be at least 1".into());
        }

        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }

        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be positive".into());
        }

        if self.relative_offset <= 0.0 || self.max_dimension <= 0.0 {
            return Err("relative_offset and max_dimension must be positive".into());
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = PipelineConfig {
            keyword_weight: 0.8,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            confidence_threshold = 0.6
            max_attempts = 5

            [[providers]]
            id = "primary"
            api_url = "https://api.example.com/v1/chat/completions"
            model = "test-model"
            api_key_env = "PRIMARY_KEY"
            "#,
        )
        .unwrap();

        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.keyword_weight, 0.7);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].max_tokens, 4096);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let result = PipelineConfig::from_toml_str("history_capacity = 0");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
