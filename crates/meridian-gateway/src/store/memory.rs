//! In-memory [`CatalogStore`] and [`TenantStore`] implementations.
//!
//! Each store keeps its records behind a single `RwLock`, so every write
//! (including a bulk insert or an enabled-set replacement) is applied under
//! one lock acquisition and readers never see a partial update.

use async_trait::async_trait;
use meridian_kernel::gateway::tenant::normalize_enabled;
use meridian_kernel::gateway::{
    CatalogStore, GatewayError, ModuleDescriptor, ModuleFilter, Tenant, TenantDescriptor,
    TenantStore,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// [`CatalogStore`] backed by an ordered map.
///
/// Suitable for single-node deployments and tests.  Durable stores belong in
/// separate crates implementing the same trait.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    modules: RwLock<BTreeMap<String, ModuleDescriptor>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get(&self, id: &str) -> Result<Option<ModuleDescriptor>, GatewayError> {
        Ok(self.modules.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &ModuleFilter) -> Result<Vec<ModuleDescriptor>, GatewayError> {
        Ok(self
            .modules
            .read()
            .await
            .values()
            .filter(|md| filter.accepts(md))
            .cloned()
            .collect())
    }

    async fn insert(&self, descriptor: ModuleDescriptor) -> Result<(), GatewayError> {
        let mut modules = self.modules.write().await;
        if modules.contains_key(&descriptor.id) {
            return Err(GatewayError::DuplicateModule(descriptor.id));
        }
        modules.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    async fn bulk_insert(
        &self,
        descriptors: Vec<ModuleDescriptor>,
        validate_conflicts: bool,
    ) -> Result<(), GatewayError> {
        let mut modules = self.modules.write().await;
        if validate_conflicts {
            let mut seen = HashSet::new();
            for md in &descriptors {
                if modules.contains_key(&md.id) || !seen.insert(md.id.as_str()) {
                    return Err(GatewayError::DuplicateModule(md.id.clone()));
                }
            }
        }
        for md in descriptors {
            modules.insert(md.id.clone(), md);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.modules
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::ModuleNotFound(id.to_string()))
    }
}

/// [`TenantStore`] backed by an ordered map.
///
/// Enabled-set versions come from one store-wide counter, so a tenant that is
/// deleted and recreated never reuses a version.
pub struct InMemoryTenantStore {
    tenants: RwLock<BTreeMap<String, Tenant>>,
    versions: AtomicU64,
}

impl Default for InMemoryTenantStore {
    fn default() -> Self {
        Self {
            tenants: RwLock::new(BTreeMap::new()),
            versions: AtomicU64::new(1),
        }
    }
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get(&self, id: &str) -> Result<Option<Tenant>, GatewayError> {
        Ok(self.tenants.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, GatewayError> {
        Ok(self.tenants.read().await.values().cloned().collect())
    }

    async fn insert(&self, mut tenant: Tenant) -> Result<(), GatewayError> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(tenant.id()) {
            return Err(GatewayError::DuplicateTenant(tenant.id().to_string()));
        }
        tenant.enabled = normalize_enabled(std::mem::take(&mut tenant.enabled));
        tenant.enabled_version = self.next_version();
        tenants.insert(tenant.id().to_string(), tenant);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.tenants
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::TenantNotFound(id.to_string()))
    }

    async fn set_enabled(
        &self,
        id: &str,
        enabled: BTreeMap<String, bool>,
    ) -> Result<u64, GatewayError> {
        let mut tenants = self.tenants.write().await;
        let tenant = tenants
            .get_mut(id)
            .ok_or_else(|| GatewayError::TenantNotFound(id.to_string()))?;
        tenant.enabled = normalize_enabled(enabled);
        tenant.enabled_version = self.next_version();
        Ok(tenant.enabled_version)
    }

    async fn update_descriptor(&self, descriptor: TenantDescriptor) -> Result<(), GatewayError> {
        let mut tenants = self.tenants.write().await;
        match tenants.get_mut(&descriptor.id) {
            Some(tenant) => tenant.descriptor = descriptor,
            None => {
                let mut tenant = Tenant::new(descriptor);
                tenant.enabled_version = self.next_version();
                tenants.insert(tenant.id().to_string(), tenant);
            }
        }
        Ok(())
    }
}
