//! Shared application state for the gateway server

use crate::backend::{ModuleClient, PipelineExecutor};
use crate::discovery::InMemoryDiscovery;
use crate::error::GatewayResult;
use crate::modules::ModuleManager;
use crate::pull::PullManager;
use crate::router::PipelineResolver;
use crate::server::GatewayServerConfig;
use crate::store::{InMemoryCatalogStore, InMemoryTenantStore};
use crate::tenants::TenantManager;
use meridian_kernel::gateway::{CatalogStore, PullDescriptor, TenantStore};
use std::sync::Arc;
use std::time::Duration;

/// State shared across all request handlers
pub struct AppState {
    pub modules: Arc<ModuleManager>,
    pub tenants: TenantManager,
    pub discovery: Arc<InMemoryDiscovery>,
    pub resolver: PipelineResolver,
    pub executor: PipelineExecutor,
    pub pull: PullManager,
    /// Used when a pull request names no URLs.
    pub default_pull: PullDescriptor,
}

impl AppState {
    /// Wire every component over the given stores.
    pub fn new(
        config: &GatewayServerConfig,
        catalog: Arc<dyn CatalogStore>,
        tenants: Arc<dyn TenantStore>,
    ) -> GatewayResult<Self> {
        let client = ModuleClient::new(Duration::from_millis(config.request_timeout_ms))?;
        let discovery = Arc::new(InMemoryDiscovery::new());
        let modules = Arc::new(ModuleManager::new(Arc::clone(&catalog), Arc::clone(&tenants)));

        Ok(Self {
            tenants: TenantManager::new(Arc::clone(&tenants), Arc::clone(&catalog))
                .with_references(modules.references()),
            resolver: PipelineResolver::new(tenants, catalog)
                .with_cache(config.plan_cache_capacity),
            executor: PipelineExecutor::new(discovery.clone(), client.clone()),
            pull: PullManager::new(
                client.http().clone(),
                Arc::clone(&modules),
                Duration::from_millis(config.probe_timeout_ms),
            ),
            default_pull: PullDescriptor::new(config.pull_urls.iter().cloned()),
            modules,
            discovery,
        })
    }

    /// State over fresh in-memory stores.
    pub fn in_memory(config: &GatewayServerConfig) -> GatewayResult<Self> {
        Self::new(
            config,
            Arc::new(InMemoryCatalogStore::new()),
            Arc::new(InMemoryTenantStore::new()),
        )
    }
}
