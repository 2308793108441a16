//! Strategy Selector
//!
//! Resolves the requested strategy to an executable one. Explicit requests are
//! used as-is; `auto` is a pure function of the token estimate and the
//! configured thresholds.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::settings::StrategyThresholds;
use crate::models::strategy::{AnalysisStrategy, ExecutionStrategy};

/// Result of strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDecision {
    pub strategy: ExecutionStrategy,
    pub was_auto_selected: bool,
    pub estimated_tokens: u64,
    /// Human-readable reasoning for the decision
    pub reasoning: String,
}

/// Picks basic / hybrid / advanced.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    thresholds: StrategyThresholds,
}

impl StrategySelector {
    pub fn new(thresholds: StrategyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &StrategyThresholds {
        &self.thresholds
    }

    /// Select the strategy for a transcript of `estimated_tokens`.
    ///
    /// `None` and `Some(Auto)` both mean automatic selection.
    pub fn select(
        &self,
        estimated_tokens: u64,
        requested: Option<AnalysisStrategy>,
    ) -> StrategyDecision {
        let requested = requested.unwrap_or_default();
        let decision = match requested.concrete() {
            Some(strategy) => StrategyDecision {
                strategy,
                was_auto_selected: false,
                estimated_tokens,
                reasoning: format!("{} strategy requested explicitly", strategy.label()),
            },
            None => {
                let strategy = self.thresholds.strategy_for(estimated_tokens);
                StrategyDecision {
                    strategy,
                    was_auto_selected: true,
                    estimated_tokens,
                    reasoning: self.auto_reasoning(strategy, estimated_tokens),
                }
            }
        };

        info!(
            "Strategy selected: {} (auto={}, estimated_tokens={})",
            decision.strategy, decision.was_auto_selected, estimated_tokens
        );
        decision
    }

    fn auto_reasoning(&self, strategy: ExecutionStrategy, estimated_tokens: u64) -> String {
        let t = &self.thresholds;
        match strategy {
            ExecutionStrategy::Basic => format!(
                "~{} tokens is within the basic limit of {}",
                estimated_tokens, t.basic_max_tokens
            ),
            ExecutionStrategy::Hybrid => format!(
                "~{} tokens is above {} and within the hybrid limit of {}",
                estimated_tokens, t.basic_max_tokens, t.hybrid_max_tokens
            ),
            ExecutionStrategy::Advanced => format!(
                "~{} tokens exceeds the hybrid limit of {}",
                estimated_tokens, t.hybrid_max_tokens
            ),
        }
    }
}
