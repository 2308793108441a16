//! Settings Models
//!
//! Analyzer configuration. Every policy number the orchestrator uses lives here
//! and nowhere else.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use recap_llm::{DeploymentProfile, ProviderConfig};

use super::strategy::ExecutionStrategy;

/// Token thresholds for `auto` strategy selection.
///
/// | estimate | strategy |
/// |---|---|
/// | `<= basic_max_tokens` | basic |
/// | `<= hybrid_max_tokens` | hybrid |
/// | above | advanced |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyThresholds {
    #[serde(default = "default_basic_max_tokens")]
    pub basic_max_tokens: u64,
    #[serde(default = "default_hybrid_max_tokens")]
    pub hybrid_max_tokens: u64,
}

fn default_basic_max_tokens() -> u64 {
    8_000
}

fn default_hybrid_max_tokens() -> u64 {
    48_000
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            basic_max_tokens: default_basic_max_tokens(),
            hybrid_max_tokens: default_hybrid_max_tokens(),
        }
    }
}

impl StrategyThresholds {
    pub fn strategy_for(&self, estimated_tokens: u64) -> ExecutionStrategy {
        if estimated_tokens <= self.basic_max_tokens {
            ExecutionStrategy::Basic
        } else if estimated_tokens <= self.hybrid_max_tokens {
            ExecutionStrategy::Hybrid
        } else {
            ExecutionStrategy::Advanced
        }
    }

    /// UI label for a transcript of the given size.
    pub fn label_for(&self, estimated_tokens: u64) -> &'static str {
        self.strategy_for(estimated_tokens).label()
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Attempt cap per call, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Randomization factor in `[0, 1)`
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    16_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err("retry.maxAttempts must be between 1 and 10".to_string());
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err("retry.initialBackoffMs cannot exceed retry.maxBackoffMs".to_string());
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err("retry.multiplier must be at least 1.0".to_string());
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err("retry.jitter must be in [0, 1)".to_string());
        }
        Ok(())
    }
}

fn default_deployments() -> Vec<DeploymentProfile> {
    vec![
        DeploymentProfile::new("standard", 128_000, false),
        DeploymentProfile::new("extended", 400_000, true),
    ]
}

fn default_context_safety_margin() -> f64 {
    0.8
}

fn default_max_concurrency() -> usize {
    3
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_advanced_cascade_passes() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_max_digest_chars() -> usize {
    4_000
}

fn default_link_min_keyword_overlap() -> f64 {
    0.34
}

/// Analyzer configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub strategy_thresholds: StrategyThresholds,
    /// Static deployment catalog
    #[serde(default = "default_deployments")]
    pub deployments: Vec<DeploymentProfile>,
    /// Fraction of a deployment's limit the estimate may use
    #[serde(default = "default_context_safety_margin")]
    pub context_safety_margin: f64,
    /// Concurrent model calls within one independent phase set
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-call timeout; expiry counts as a transient failure
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Window passes in the advanced strategy (8 or 9)
    #[serde(default = "default_advanced_cascade_passes")]
    pub advanced_cascade_passes: u32,
    /// Feed the digest of earlier passes forward. Off makes passes independent.
    #[serde(default = "default_true")]
    pub cascade_digest: bool,
    #[serde(default = "default_max_digest_chars")]
    pub max_digest_chars: usize,
    /// Minimum keyword overlap for description-based linking
    #[serde(default = "default_link_min_keyword_overlap")]
    pub link_min_keyword_overlap: f64,
    #[serde(default = "default_true")]
    pub run_evaluation_by_default: bool,
    /// Validate the provider before any model call
    #[serde(default = "default_true")]
    pub preflight_health_check: bool,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            strategy_thresholds: StrategyThresholds::default(),
            deployments: default_deployments(),
            context_safety_margin: default_context_safety_margin(),
            max_concurrency: default_max_concurrency(),
            retry: RetryConfig::default(),
            call_timeout_secs: default_call_timeout_secs(),
            advanced_cascade_passes: default_advanced_cascade_passes(),
            cascade_digest: true,
            max_digest_chars: default_max_digest_chars(),
            link_min_keyword_overlap: default_link_min_keyword_overlap(),
            run_evaluation_by_default: true,
            preflight_health_check: true,
            provider: ProviderConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let thresholds = &self.strategy_thresholds;
        if thresholds.basic_max_tokens == 0 {
            return Err("strategyThresholds.basicMaxTokens must be positive".to_string());
        }
        if thresholds.basic_max_tokens >= thresholds.hybrid_max_tokens {
            return Err(format!(
                "strategyThresholds.basicMaxTokens ({}) must be below hybridMaxTokens ({})",
                thresholds.basic_max_tokens, thresholds.hybrid_max_tokens
            ));
        }

        if self.deployments.is_empty() {
            return Err("at least one deployment must be configured".to_string());
        }
        let mut ids = HashSet::new();
        for deployment in &self.deployments {
            if deployment.id.trim().is_empty() {
                return Err("deployment id cannot be empty".to_string());
            }
            if deployment.token_limit == 0 {
                return Err(format!("deployment '{}' has a zero token limit", deployment.id));
            }
            if !ids.insert(deployment.id.as_str()) {
                return Err(format!("duplicate deployment id '{}'", deployment.id));
            }
        }

        if !(self.context_safety_margin > 0.0 && self.context_safety_margin <= 1.0) {
            return Err("contextSafetyMargin must be in (0, 1]".to_string());
        }

        if self.max_concurrency == 0 || self.max_concurrency > 32 {
            return Err("maxConcurrency must be between 1 and 32".to_string());
        }

        self.retry.validate()?;

        if self.call_timeout_secs == 0 {
            return Err("callTimeoutSecs must be at least 1".to_string());
        }

        if !(8..=9).contains(&self.advanced_cascade_passes) {
            return Err(format!(
                "advancedCascadePasses must be 8 or 9, got {}",
                self.advanced_cascade_passes
            ));
        }

        if self.max_digest_chars < 200 {
            return Err("maxDigestChars must be at least 200".to_string());
        }

        if !(self.link_min_keyword_overlap > 0.0 && self.link_min_keyword_overlap <= 1.0) {
            return Err("linkMinKeywordOverlap must be in (0, 1]".to_string());
        }

        Ok(())
    }
}
