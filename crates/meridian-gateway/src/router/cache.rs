//! Resolved-plan cache

use dashmap::DashMap;
use meridian_kernel::gateway::{ExecutionPlan, HttpMethod};
use std::sync::Arc;

/// Cache key.  The enabled-set version makes stale entries unreachable as
/// soon as the tenant's enabled set is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    tenant: String,
    version: u64,
    method: &'static str,
    path: String,
}

impl PlanKey {
    pub fn new(tenant: &str, version: u64, method: &HttpMethod, path: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            version,
            method: method.as_str(),
            path: path.to_string(),
        }
    }
}

/// Bounded map of resolved plans.
///
/// Only successful resolutions are stored.  Once `capacity` entries are held
/// the map is cleared before the next insert; unreachable (old-version)
/// entries go with it.
pub struct PlanCache {
    plans: DashMap<PlanKey, Arc<ExecutionPlan>>,
    capacity: usize,
}

impl PlanCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            plans: DashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &PlanKey) -> Option<Arc<ExecutionPlan>> {
        self.plans.get(key).map(|p| Arc::clone(p.value()))
    }

    pub fn insert(&self, key: PlanKey, plan: Arc<ExecutionPlan>) {
        if self.plans.len() >= self.capacity {
            self.plans.clear();
        }
        self.plans.insert(key, plan);
    }

    /// Drop every plan cached for `tenant`.
    pub fn invalidate_tenant(&self, tenant: &str) {
        self.plans.retain(|k, _| k.tenant != tenant);
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
