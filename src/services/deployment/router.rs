//! Deployment Router
//!
//! Picks the smallest deployment whose usable context (limit times the safety
//! margin) fits the request estimate. There is no truncation fallback: a request
//! that fits nowhere fails with `ContextTooLarge`.

use tracing::{info, warn};

use recap_llm::DeploymentProfile;

use crate::models::analysis::DeploymentChoice;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct DeploymentRouter {
    /// Sorted by token limit, ascending
    profiles: Vec<DeploymentProfile>,
    safety_margin: f64,
}

impl DeploymentRouter {
    pub fn new(mut profiles: Vec<DeploymentProfile>, safety_margin: f64) -> AppResult<Self> {
        profiles.retain(|p| p.token_limit > 0);
        if profiles.is_empty() {
            return Err(AppError::configuration(
                "deployment catalog returned no usable deployments",
            ));
        }
        if !(safety_margin > 0.0 && safety_margin <= 1.0) {
            return Err(AppError::configuration(format!(
                "context safety margin must be in (0, 1], got {}",
                safety_margin
            )));
        }
        profiles.sort_by_key(|p| p.token_limit);
        Ok(Self {
            profiles,
            safety_margin,
        })
    }

    pub fn profiles(&self) -> &[DeploymentProfile] {
        &self.profiles
    }

    /// Tokens of `profile` the estimate may use.
    pub fn usable_limit(&self, profile: &DeploymentProfile) -> u64 {
        (profile.token_limit as f64 * self.safety_margin).floor() as u64
    }

    pub fn select(&self, estimated_tokens: u64) -> AppResult<DeploymentChoice> {
        let chosen = self
            .profiles
            .iter()
            .find(|p| estimated_tokens <= self.usable_limit(p));

        match chosen {
            Some(profile) => {
                let choice = DeploymentChoice {
                    deployment_id: profile.id.clone(),
                    token_limit: profile.token_limit,
                    estimated_tokens,
                    utilization_percentage: round2(
                        estimated_tokens as f64 / profile.token_limit as f64 * 100.0,
                    ),
                    is_extended_context: profile.extended_context,
                };
                info!(
                    "Deployment selected: {} ({} / {} tokens, {:.1}%)",
                    choice.deployment_id,
                    estimated_tokens,
                    choice.token_limit,
                    choice.utilization_percentage
                );
                Ok(choice)
            }
            None => {
                let largest_limit = self
                    .profiles
                    .last()
                    .map(|p| p.token_limit)
                    .unwrap_or_default();
                warn!(
                    "No deployment fits {} tokens (largest limit {}, margin {})",
                    estimated_tokens, largest_limit, self.safety_margin
                );
                Err(AppError::ContextTooLarge {
                    estimated_tokens,
                    largest_limit,
                })
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
