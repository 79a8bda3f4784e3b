//! Tenant records and enabled-module sets.
//!
//! [`TenantManager`] guards the invariant that every module id a tenant has
//! enabled exists in the catalog, then hands whole snapshots to the
//! [`TenantStore`], which applies each as a single write.

use crate::error::GatewayResult;
use crate::modules::ReferenceLock;
use meridian_kernel::gateway::{
    CatalogStore, GatewayError, Tenant, TenantDescriptor, TenantStore,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct TenantManager {
    tenants: Arc<dyn TenantStore>,
    catalog: Arc<dyn CatalogStore>,
    references: ReferenceLock,
}

impl TenantManager {
    pub fn new(tenants: Arc<dyn TenantStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            tenants,
            catalog,
            references: ReferenceLock::default(),
        }
    }

    /// Share the module manager's lock so deletes cannot race enables.
    pub fn with_references(mut self, references: ReferenceLock) -> Self {
        self.references = references;
        self
    }

    #[instrument(skip(self, tenant), fields(tenant = %tenant.id()))]
    pub async fn insert(&self, tenant: Tenant) -> GatewayResult<()> {
        let _refs = self.references.read().await;
        self.check_enabled(tenant.id(), &tenant.enabled).await?;
        self.tenants.insert(tenant).await?;
        info!("tenant created");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> GatewayResult<Tenant> {
        self.tenants
            .get(id)
            .await?
            .ok_or_else(|| GatewayError::TenantNotFound(id.to_string()).into())
    }

    pub async fn list(&self) -> GatewayResult<Vec<Tenant>> {
        Ok(self.tenants.list().await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> GatewayResult<()> {
        self.tenants.delete(id).await?;
        info!("tenant removed");
        Ok(())
    }

    /// Replace the tenant's whole enabled set.  Returns the new set version.
    #[instrument(skip(self, enabled), fields(modules = enabled.len()))]
    pub async fn set_enabled(
        &self,
        tenant_id: &str,
        enabled: BTreeMap<String, bool>,
    ) -> GatewayResult<u64> {
        let _refs = self.references.read().await;
        if self.tenants.get(tenant_id).await?.is_none() {
            return Err(GatewayError::TenantNotFound(tenant_id.to_string()).into());
        }
        self.check_enabled(tenant_id, &enabled).await?;
        let version = self.tenants.set_enabled(tenant_id, enabled).await?;
        info!(version, "enabled set replaced");
        Ok(version)
    }

    /// Enable one module on top of the current set.
    pub async fn enable_module(&self, tenant_id: &str, module_id: &str) -> GatewayResult<u64> {
        let mut enabled = self.get(tenant_id).await?.enabled;
        enabled.insert(module_id.to_string(), true);
        self.set_enabled(tenant_id, enabled).await
    }

    /// Disable one module.  [`GatewayError::ModuleNotFound`] if it was not enabled.
    pub async fn disable_module(&self, tenant_id: &str, module_id: &str) -> GatewayResult<u64> {
        let mut enabled = self.get(tenant_id).await?.enabled;
        if enabled.remove(module_id) != Some(true) {
            return Err(GatewayError::ModuleNotFound(module_id.to_string()).into());
        }
        self.set_enabled(tenant_id, enabled).await
    }

    /// Enabled module ids of a tenant in lexical order.
    pub async fn enabled_modules(&self, tenant_id: &str) -> GatewayResult<Vec<String>> {
        Ok(self
            .get(tenant_id)
            .await?
            .enabled_ids()
            .map(str::to_string)
            .collect())
    }

    /// Rewrite tenant metadata, creating the tenant if needed.
    #[instrument(skip(self, descriptor), fields(tenant = %descriptor.id))]
    pub async fn update_descriptor(&self, descriptor: TenantDescriptor) -> GatewayResult<()> {
        if descriptor.id.trim().is_empty() {
            return Err(crate::error::GatewayImplError::InvalidRequest(
                "tenant id cannot be empty".to_string(),
            ));
        }
        self.tenants.update_descriptor(descriptor).await?;
        Ok(())
    }

    async fn check_enabled(
        &self,
        tenant_id: &str,
        enabled: &BTreeMap<String, bool>,
    ) -> GatewayResult<()> {
        for (module, on) in enabled {
            if *on && self.catalog.get(module).await?.is_none() {
                return Err(GatewayError::DanglingModuleReference {
                    tenant: tenant_id.to_string(),
                    module: module.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}
