//! Module catalog management.
//!
//! [`ModuleManager`] is the only writer of the catalog.  It validates
//! descriptors, checks interface dependencies, and refuses to delete a module
//! that any tenant still has enabled.

use crate::error::GatewayResult;
use meridian_kernel::gateway::{
    CatalogStore, GatewayError, ModuleDescriptor, ModuleFilter, TenantStore,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Lock between writers of tenant references and module deletion.
///
/// Enabling holds it shared from the catalog check to the tenant write;
/// deletion holds it exclusively from the usage scan to the catalog delete.
pub type ReferenceLock = Arc<RwLock<()>>;

pub struct ModuleManager {
    catalog: Arc<dyn CatalogStore>,
    tenants: Arc<dyn TenantStore>,
    references: ReferenceLock,
}

impl ModuleManager {
    pub fn new(catalog: Arc<dyn CatalogStore>, tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            catalog,
            tenants,
            references: ReferenceLock::default(),
        }
    }

    /// The lock a [`crate::tenants::TenantManager`] must share.
    pub fn references(&self) -> ReferenceLock {
        Arc::clone(&self.references)
    }

    /// Register one module.
    #[instrument(skip(self, descriptor), fields(module = %descriptor.id))]
    pub async fn create(&self, descriptor: ModuleDescriptor, check_deps: bool) -> GatewayResult<()> {
        descriptor.validate()?;
        if check_deps {
            let existing = self.catalog.list(&ModuleFilter::default()).await?;
            check_dependencies(&existing, std::slice::from_ref(&descriptor))?;
        }
        self.catalog.insert(descriptor).await?;
        info!("module registered");
        Ok(())
    }

    /// Register a batch of modules in one transaction.
    ///
    /// Every descriptor is validated, and with `check_deps` every requirement
    /// must be met by the catalog plus the batch itself.  Id conflicts with
    /// the catalog or within the batch fail the whole batch.
    #[instrument(skip(self, descriptors), fields(count = descriptors.len()))]
    pub async fn create_list(
        &self,
        descriptors: Vec<ModuleDescriptor>,
        check_deps: bool,
    ) -> GatewayResult<()> {
        if descriptors.is_empty() {
            debug!("empty batch, nothing to insert");
            return Ok(());
        }
        for md in &descriptors {
            md.validate()?;
        }
        if check_deps {
            let existing = self.catalog.list(&ModuleFilter::default()).await?;
            check_dependencies(&existing, &descriptors)?;
        }
        self.catalog.bulk_insert(descriptors, true).await?;
        info!("module batch registered");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> GatewayResult<ModuleDescriptor> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| GatewayError::ModuleNotFound(id.to_string()).into())
    }

    pub async fn list(&self, filter: &ModuleFilter) -> GatewayResult<Vec<ModuleDescriptor>> {
        Ok(self.catalog.list(filter).await?)
    }

    /// Remove a module.  Fails while any tenant has it enabled.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> GatewayResult<()> {
        let _refs = self.references.write().await;
        if self.catalog.get(id).await?.is_none() {
            return Err(GatewayError::ModuleNotFound(id.to_string()).into());
        }
        if let Some(tenant) = self
            .tenants
            .list()
            .await?
            .into_iter()
            .find(|t| t.is_enabled(id))
        {
            return Err(GatewayError::ModuleInUse {
                module: id.to_string(),
                tenant: tenant.id().to_string(),
            }
            .into());
        }
        self.catalog.delete(id).await?;
        info!("module removed");
        Ok(())
    }
}

/// Every requirement in `batch` must be provided by `existing` or `batch`.
pub fn check_dependencies(
    existing: &[ModuleDescriptor],
    batch: &[ModuleDescriptor],
) -> Result<(), GatewayError> {
    let provided: Vec<_> = existing
        .iter()
        .chain(batch)
        .flat_map(|md| md.provides.iter())
        .collect();
    for md in batch {
        for required in &md.requires {
            if !provided.iter().any(|p| required.is_satisfied_by(p)) {
                return Err(GatewayError::MissingDependency {
                    module: md.id.clone(),
                    interface: required.id.clone(),
                    version: required.version.clone(),
                });
            }
        }
    }
    Ok(())
}
