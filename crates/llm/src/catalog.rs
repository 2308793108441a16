//! Deployment Catalog
//!
//! The collaborator that lists the deployments a request may be routed to.
//! Queried once at request start.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::LlmResult;

/// A named model endpoint with a fixed context window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProfile {
    pub id: String,
    pub token_limit: u64,
    #[serde(default)]
    pub extended_context: bool,
}

impl DeploymentProfile {
    pub fn new(id: impl Into<String>, token_limit: u64, extended_context: bool) -> Self {
        Self {
            id: id.into(),
            token_limit,
            extended_context,
        }
    }
}

#[async_trait]
pub trait DeploymentCatalog: Send + Sync {
    async fn list_deployments(&self) -> LlmResult<Vec<DeploymentProfile>>;
}

/// Catalog backed by a fixed list, usually from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDeploymentCatalog {
    profiles: Vec<DeploymentProfile>,
}

impl StaticDeploymentCatalog {
    pub fn new(profiles: Vec<DeploymentProfile>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl DeploymentCatalog for StaticDeploymentCatalog {
    async fn list_deployments(&self) -> LlmResult<Vec<DeploymentProfile>> {
        Ok(self.profiles.clone())
    }
}
