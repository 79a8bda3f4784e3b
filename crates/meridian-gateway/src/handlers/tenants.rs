//! Tenant endpoints
//!
//! GET    /_/proxy/tenants                        - list tenants
//! POST   /_/proxy/tenants                        - create a tenant
//! GET    /_/proxy/tenants/{id}                   - one tenant with its enabled set
//! PUT    /_/proxy/tenants/{id}                   - upsert tenant metadata
//! DELETE /_/proxy/tenants/{id}                   - remove a tenant
//! GET    /_/proxy/tenants/{id}/modules           - enabled module ids
//! PUT    /_/proxy/tenants/{id}/modules           - replace the enabled set
//! POST   /_/proxy/tenants/{id}/modules           - enable one module
//! DELETE /_/proxy/tenants/{id}/modules/{module}  - disable one module

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use meridian_kernel::gateway::{Tenant, TenantDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{GatewayImplError, GatewayResult};
use crate::state::AppState;

/// Request body for POST /_/proxy/tenants
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    #[serde(flatten)]
    pub descriptor: TenantDescriptor,
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
}

/// Request body for PUT /_/proxy/tenants/{id}; the path supplies the id.
#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Request and response body naming one module.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: String,
}

/// GET /_/proxy/tenants
pub async fn list_tenants(State(state): State<Arc<AppState>>) -> GatewayResult<Json<Vec<Tenant>>> {
    Ok(Json(state.tenants.list().await?))
}

/// POST /_/proxy/tenants
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenantRequest>,
) -> GatewayResult<impl IntoResponse> {
    if req.descriptor.id.trim().is_empty() {
        return Err(GatewayImplError::InvalidRequest("tenant id cannot be empty".into()));
    }
    let id = req.descriptor.id.clone();
    state
        .tenants
        .insert(Tenant::new(req.descriptor).with_enabled(req.enabled))
        .await?;
    Ok((StatusCode::CREATED, Json(state.tenants.get(&id).await?)))
}

/// GET /_/proxy/tenants/{id}
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<Json<Tenant>> {
    Ok(Json(state.tenants.get(&id).await?))
}

/// PUT /_/proxy/tenants/{id}
pub async fn update_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTenantRequest>,
) -> GatewayResult<Json<Tenant>> {
    if let Some(body_id) = &req.id
        && body_id != &id
    {
        return Err(GatewayImplError::InvalidRequest(format!(
            "tenant id '{body_id}' does not match path '{id}'"
        )));
    }
    let descriptor = TenantDescriptor {
        id: id.clone(),
        name: req.name,
        description: req.description,
    };
    state.tenants.update_descriptor(descriptor).await?;
    Ok(Json(state.tenants.get(&id).await?))
}

/// DELETE /_/proxy/tenants/{id}
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<StatusCode> {
    state.tenants.delete(&id).await?;
    state.resolver.forget_tenant(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /_/proxy/tenants/{id}/modules
pub async fn list_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<Json<Vec<ModuleRef>>> {
    let ids = state.tenants.enabled_modules(&id).await?;
    Ok(Json(ids.into_iter().map(|id| ModuleRef { id }).collect()))
}

/// PUT /_/proxy/tenants/{id}/modules
pub async fn replace_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(enabled): Json<BTreeMap<String, bool>>,
) -> GatewayResult<impl IntoResponse> {
    let version = state.tenants.set_enabled(&id, enabled).await?;
    Ok(Json(json!({ "id": id, "enabledVersion": version })))
}

/// POST /_/proxy/tenants/{id}/modules
pub async fn enable_module(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(module): Json<ModuleRef>,
) -> GatewayResult<impl IntoResponse> {
    state.tenants.enable_module(&id, &module.id).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// DELETE /_/proxy/tenants/{id}/modules/{module}
pub async fn disable_module(
    State(state): State<Arc<AppState>>,
    Path((id, module)): Path<(String, String)>,
) -> GatewayResult<StatusCode> {
    state.tenants.disable_module(&id, &module).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the tenant router sub-tree
pub fn tenants_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_/proxy/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/_/proxy/tenants/{id}",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route(
            "/_/proxy/tenants/{id}/modules",
            get(list_enabled).put(replace_enabled).post(enable_module),
        )
        .route("/_/proxy/tenants/{id}/modules/{module}", delete(disable_module))
}
