//! Strategy Models
//!
//! `AnalysisStrategy` is what a caller may ask for; `ExecutionStrategy` is what
//! actually runs. `auto` has no executable counterpart, so it can never reach
//! the executor.

use serde::{Deserialize, Serialize};

/// Requested analysis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    Basic,
    Hybrid,
    Advanced,
    #[default]
    Auto,
}

impl AnalysisStrategy {
    /// The executable strategy, or `None` for `auto`.
    pub fn concrete(&self) -> Option<ExecutionStrategy> {
        match self {
            AnalysisStrategy::Basic => Some(ExecutionStrategy::Basic),
            AnalysisStrategy::Hybrid => Some(ExecutionStrategy::Hybrid),
            AnalysisStrategy::Advanced => Some(ExecutionStrategy::Advanced),
            AnalysisStrategy::Auto => None,
        }
    }
}

impl std::fmt::Display for AnalysisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStrategy::Basic => write!(f, "basic"),
            AnalysisStrategy::Hybrid => write!(f, "hybrid"),
            AnalysisStrategy::Advanced => write!(f, "advanced"),
            AnalysisStrategy::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for AnalysisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(AnalysisStrategy::Basic),
            "hybrid" => Ok(AnalysisStrategy::Hybrid),
            "advanced" => Ok(AnalysisStrategy::Advanced),
            "auto" => Ok(AnalysisStrategy::Auto),
            other => Err(format!(
                "Invalid strategy: {}. Must be 'basic', 'hybrid', 'advanced', or 'auto'",
                other
            )),
        }
    }
}

/// Concrete call-count plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One call covering every section and output
    Basic,
    /// Two concurrent extraction calls and a consolidation call
    Hybrid,
    /// Cascading window passes and a consolidation call
    Advanced,
}

impl ExecutionStrategy {
    /// Human-readable label for the strategy.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionStrategy::Basic => "Basic",
            ExecutionStrategy::Hybrid => "Hybrid",
            ExecutionStrategy::Advanced => "Advanced",
        }
    }

    /// Short description of the strategy.
    pub fn description(&self) -> &'static str {
        match self {
            ExecutionStrategy::Basic => {
                "Single request covering all sections and outputs. Best for short transcripts."
            }
            ExecutionStrategy::Hybrid => {
                "Section and entity extraction run side by side, then one consolidation request."
            }
            ExecutionStrategy::Advanced => {
                "Cascading passes over consecutive transcript windows, each seeing a digest of the earlier passes, then consolidation."
            }
        }
    }

    /// Number of model calls (and progress units) the strategy makes, retries excluded.
    pub fn total_units(&self, cascade_passes: u32) -> u32 {
        match self {
            ExecutionStrategy::Basic => 1,
            ExecutionStrategy::Hybrid => 3,
            ExecutionStrategy::Advanced => cascade_passes + 1,
        }
    }

    /// Return all available strategies.
    pub fn all() -> Vec<ExecutionStrategy> {
        vec![
            ExecutionStrategy::Basic,
            ExecutionStrategy::Hybrid,
            ExecutionStrategy::Advanced,
        ]
    }
}

impl From<ExecutionStrategy> for AnalysisStrategy {
    fn from(strategy: ExecutionStrategy) -> Self {
        match strategy {
            ExecutionStrategy::Basic => AnalysisStrategy::Basic,
            ExecutionStrategy::Hybrid => AnalysisStrategy::Hybrid,
            ExecutionStrategy::Advanced => AnalysisStrategy::Advanced,
        }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        AnalysisStrategy::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_has_no_concrete_strategy() {
        assert_eq!(AnalysisStrategy::Auto.concrete(), None);
        assert_eq!(
            AnalysisStrategy::Hybrid.concrete(),
            Some(ExecutionStrategy::Hybrid)
        );
    }

    #[test]
    fn test_total_units() {
        assert_eq!(ExecutionStrategy::Basic.total_units(8), 1);
        assert_eq!(ExecutionStrategy::Hybrid.total_units(8), 3);
        assert_eq!(ExecutionStrategy::Advanced.total_units(8), 9);
        assert_eq!(ExecutionStrategy::Advanced.total_units(9), 10);
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&AnalysisStrategy::Auto).unwrap();
        assert_eq!(json, "\"auto\"");
        let parsed: ExecutionStrategy = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(parsed, ExecutionStrategy::Advanced);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Hybrid".parse::<AnalysisStrategy>(), Ok(AnalysisStrategy::Hybrid));
        assert!("turbo".parse::<AnalysisStrategy>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for strategy in ExecutionStrategy::all() {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy));
        }
    }
}
