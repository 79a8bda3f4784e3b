//! Discovery contract: maps a module (and optional instance) to the network
//! address the executor forwards to.

use super::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A deployed, reachable instance of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDescriptor {
    /// Instance id, unique per module.
    pub inst_id: String,
    /// Module id this instance serves.
    pub srvc_id: String,
    /// Base URL, e.g. `http://localhost:9231`.
    pub url: String,
}

impl DeploymentDescriptor {
    pub fn new(
        inst_id: impl Into<String>,
        srvc_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            inst_id: inst_id.into(),
            srvc_id: srvc_id.into(),
            url: url.into(),
        }
    }
}

#[async_trait]
pub trait Discovery: Send + Sync {
    /// Base URL of `instance_id` of `module_id`, or of any instance when
    /// `instance_id` is `None`.  [`GatewayError::InstanceNotFound`] when
    /// nothing is deployed.
    async fn resolve_address(
        &self,
        module_id: &str,
        instance_id: Option<&str>,
    ) -> Result<String, GatewayError>;
}
