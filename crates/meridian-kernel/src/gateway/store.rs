//! Storage contracts for the module catalog and tenants.
//!
//! The gateway never talks to a database directly; it is handed trait
//! objects implementing [`CatalogStore`] and [`TenantStore`] at construction.
//! Every call is a suspension point, so both traits are async.

use super::descriptor::ModuleDescriptor;
use super::error::GatewayError;
use super::tenant::{Tenant, TenantDescriptor};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Selection criteria for [`CatalogStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFilter {
    /// Only modules of this product.
    pub product: Option<String>,
}

impl ModuleFilter {
    pub fn product(product: impl Into<String>) -> Self {
        Self {
            product: Some(product.into()),
        }
    }

    pub fn accepts(&self, md: &ModuleDescriptor) -> bool {
        self.product.as_deref().is_none_or(|p| md.product() == p)
    }
}

/// Durable keyed storage of module descriptors.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ModuleDescriptor>, GatewayError>;

    /// Descriptors accepted by `filter`, ordered by id.
    async fn list(&self, filter: &ModuleFilter) -> Result<Vec<ModuleDescriptor>, GatewayError>;

    /// Insert one descriptor; [`GatewayError::DuplicateModule`] if the id exists.
    async fn insert(&self, descriptor: ModuleDescriptor) -> Result<(), GatewayError>;

    /// Insert a batch as one transaction: either every descriptor is stored or
    /// none is.  With `validate_conflicts`, an id already stored or repeated
    /// within the batch fails the whole batch.
    async fn bulk_insert(
        &self,
        descriptors: Vec<ModuleDescriptor>,
        validate_conflicts: bool,
    ) -> Result<(), GatewayError>;

    /// Remove a descriptor; [`GatewayError::ModuleNotFound`] if absent.
    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

/// Durable keyed storage of tenants.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Tenant>, GatewayError>;

    async fn list(&self) -> Result<Vec<Tenant>, GatewayError>;

    /// [`GatewayError::DuplicateTenant`] if the id exists.
    async fn insert(&self, tenant: Tenant) -> Result<(), GatewayError>;

    /// [`GatewayError::TenantNotFound`] if absent.
    async fn delete(&self, id: &str) -> Result<(), GatewayError>;

    /// Replace the enabled map of a tenant in one atomic write and return the
    /// new enabled-set version.  [`GatewayError::TenantNotFound`] if absent.
    async fn set_enabled(
        &self,
        id: &str,
        enabled: BTreeMap<String, bool>,
    ) -> Result<u64, GatewayError>;

    /// Rewrite tenant metadata keeping its enabled map; creates the tenant
    /// when it does not exist.
    async fn update_descriptor(&self, descriptor: TenantDescriptor) -> Result<(), GatewayError>;
}
