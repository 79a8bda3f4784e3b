//! Pipeline resolution.
//!
//! [`build_plan`] is the pure core: given the descriptors of a tenant's
//! enabled modules and a `(method, path)` pair it returns the ordered
//! [`ExecutionPlan`].  [`PipelineResolver`] loads those descriptors from the
//! stores and optionally memoizes plans in a [`PlanCache`].

use super::cache::{PlanCache, PlanKey};
use crate::error::GatewayResult;
use meridian_kernel::gateway::{
    CatalogStore, ExecutionPlan, GatewayError, HttpMethod, ModuleDescriptor, Phase,
    PipelineEntry, RouteFilter, TenantStore, path::strip_query,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolve the execution plan for one request.
///
/// Exactly one handler across `modules` must match.  Filters below the
/// handler's level become `pre` entries, the rest `post` entries; each
/// partition is sorted by level, then module id, then declaration order.
pub fn build_plan(
    tenant_id: &str,
    modules: &[ModuleDescriptor],
    method: &HttpMethod,
    path: &str,
) -> Result<ExecutionPlan, GatewayError> {
    let path = strip_query(path);

    let mut handlers: Vec<PipelineEntry> = modules
        .iter()
        .flat_map(|md| {
            md.handlers()
                .filter(|h| h.matches(method, path))
                .map(|h| PipelineEntry::handler(md.id.clone(), h.clone()))
        })
        .collect();

    let handler = match handlers.len() {
        0 => {
            return Err(GatewayError::NoRouteMatch {
                tenant: tenant_id.to_string(),
                method: method.as_str().to_string(),
                path: path.to_string(),
            });
        }
        1 => handlers.remove(0),
        _ => {
            let mut owners: Vec<String> = handlers.into_iter().map(|e| e.module_id).collect();
            owners.sort();
            owners.dedup();
            return Err(GatewayError::AmbiguousRoute {
                method: method.as_str().to_string(),
                path: path.to_string(),
                modules: owners,
            });
        }
    };

    let (mut pre, mut post): (Vec<_>, Vec<_>) = modules
        .iter()
        .flat_map(|md| {
            md.filters
                .iter()
                .filter(|f| f.matches(method, path))
                .map(|f| (md.id.as_str(), f))
        })
        .partition(|(_, f)| f.level < handler.level);

    // stable sort keeps declaration order within one module
    pre.sort_by(|a, b| (a.1.level, a.0).cmp(&(b.1.level, b.0)));
    post.sort_by(|a, b| (a.1.level, a.0).cmp(&(b.1.level, b.0)));

    let into_entries = |list: Vec<(&str, &RouteFilter)>, phase: Phase| {
        list.into_iter()
            .map(|(id, f)| PipelineEntry::filter(id, f.clone(), phase))
            .collect::<Vec<_>>()
    };

    Ok(ExecutionPlan::new(
        into_entries(pre, Phase::Pre),
        handler,
        into_entries(post, Phase::Post),
    ))
}

/// Loads a tenant's enabled modules and resolves plans against them.
pub struct PipelineResolver {
    tenants: Arc<dyn TenantStore>,
    catalog: Arc<dyn CatalogStore>,
    cache: Option<PlanCache>,
}

impl PipelineResolver {
    pub fn new(tenants: Arc<dyn TenantStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            tenants,
            catalog,
            cache: None,
        }
    }

    /// Builder: memoize up to `capacity` plans.  `0` disables caching.
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| PlanCache::new(capacity));
        self
    }

    /// Drop cached plans of a tenant that no longer exists.
    pub fn forget_tenant(&self, tenant_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_tenant(tenant_id);
        }
    }

    #[instrument(skip_all, fields(tenant = %tenant_id, method = %method, path = %path))]
    pub async fn resolve(
        &self,
        tenant_id: &str,
        method: &HttpMethod,
        path: &str,
    ) -> GatewayResult<Arc<ExecutionPlan>> {
        let tenant = self
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| GatewayError::TenantNotFound(tenant_id.to_string()))?;

        let key = PlanKey::new(tenant_id, tenant.enabled_version, method, strip_query(path));
        if let Some(plan) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!("plan cache hit");
            return Ok(plan);
        }

        let mut modules = Vec::new();
        for id in tenant.enabled_ids() {
            let md = self.catalog.get(id).await?.ok_or_else(|| {
                GatewayError::MissingDescriptor {
                    tenant: tenant_id.to_string(),
                    module: id.to_string(),
                }
            })?;
            modules.push(md);
        }

        let plan = Arc::new(build_plan(tenant_id, &modules, method, path)?);
        debug!(entries = plan.len(), "plan resolved");
        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::clone(&plan));
        }
        Ok(plan)
    }
}
