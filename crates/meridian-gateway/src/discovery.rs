//! In-memory [`Discovery`] implementation.

use async_trait::async_trait;
use meridian_kernel::gateway::{DeploymentDescriptor, Discovery, GatewayError};
use tokio::sync::RwLock;
use tracing::info;

/// Registry of deployed module instances, in registration order.
#[derive(Default)]
pub struct InMemoryDiscovery {
    instances: RwLock<Vec<DeploymentDescriptor>>,
}

impl InMemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance.  The `(srvc_id, inst_id)` pair must be unique.
    pub async fn register(&self, deployment: DeploymentDescriptor) -> Result<(), GatewayError> {
        let mut instances = self.instances.write().await;
        if instances
            .iter()
            .any(|d| d.srvc_id == deployment.srvc_id && d.inst_id == deployment.inst_id)
        {
            return Err(GatewayError::DuplicateInstance(
                deployment.srvc_id,
                deployment.inst_id,
            ));
        }
        info!(module = %deployment.srvc_id, instance = %deployment.inst_id, url = %deployment.url, "instance registered");
        instances.push(deployment);
        Ok(())
    }

    /// All instances, optionally restricted to one module.
    pub async fn list(&self, module_id: Option<&str>) -> Vec<DeploymentDescriptor> {
        self.instances
            .read()
            .await
            .iter()
            .filter(|d| module_id.is_none_or(|m| d.srvc_id == m))
            .cloned()
            .collect()
    }

    pub async fn remove(&self, module_id: &str, instance_id: &str) -> Result<(), GatewayError> {
        let mut instances = self.instances.write().await;
        let before = instances.len();
        instances.retain(|d| !(d.srvc_id == module_id && d.inst_id == instance_id));
        if instances.len() == before {
            return Err(GatewayError::InstanceNotFound(module_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Discovery for InMemoryDiscovery {
    async fn resolve_address(
        &self,
        module_id: &str,
        instance_id: Option<&str>,
    ) -> Result<String, GatewayError> {
        self.instances
            .read()
            .await
            .iter()
            .find(|d| d.srvc_id == module_id && instance_id.is_none_or(|i| d.inst_id == i))
            .map(|d| d.url.clone())
            .ok_or_else(|| GatewayError::InstanceNotFound(module_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_first_or_named_instance() {
        let discovery = InMemoryDiscovery::new();
        discovery
            .register(DeploymentDescriptor::new("i1", "sample-1.0.0", "http://a:1"))
            .await
            .unwrap();
        discovery
            .register(DeploymentDescriptor::new("i2", "sample-1.0.0", "http://b:2"))
            .await
            .unwrap();

        assert_eq!(
            discovery.resolve_address("sample-1.0.0", None).await.unwrap(),
            "http://a:1"
        );
        assert_eq!(
            discovery.resolve_address("sample-1.0.0", Some("i2")).await.unwrap(),
            "http://b:2"
        );
        assert_eq!(
            discovery.resolve_address("sample-1.0.0", Some("i3")).await,
            Err(GatewayError::InstanceNotFound("sample-1.0.0".into()))
        );
    }

    #[tokio::test]
    async fn duplicate_and_remove() {
        let discovery = InMemoryDiscovery::new();
        let d = DeploymentDescriptor::new("i1", "sample-1.0.0", "http://a:1");
        discovery.register(d.clone()).await.unwrap();
        assert!(discovery.register(d).await.is_err());

        discovery.remove("sample-1.0.0", "i1").await.unwrap();
        assert!(discovery.list(None).await.is_empty());
        assert!(discovery.remove("sample-1.0.0", "i1").await.is_err());
    }
}
