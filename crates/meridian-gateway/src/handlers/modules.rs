//! Module catalog endpoints
//!
//! GET    /_/proxy/modules         - list the catalog (brief unless `full=true`)
//! POST   /_/proxy/modules         - register a module
//! GET    /_/proxy/modules/{id}    - one descriptor
//! DELETE /_/proxy/modules/{id}    - remove a module nobody has enabled
//! POST   /_/proxy/pull/modules    - pull missing modules from a remote registry

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use meridian_kernel::gateway::{ModuleDescriptor, ModuleFilter, PullDescriptor};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{GatewayImplError, GatewayResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListModulesQuery {
    /// Return whole descriptors instead of briefs.
    #[serde(default)]
    pub full: bool,
    /// Only modules of this product.
    pub product: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateModuleQuery {
    /// Skip the interface dependency check when `false`.
    pub check: Option<bool>,
}

/// GET /_/proxy/modules
pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListModulesQuery>,
) -> GatewayResult<Response> {
    let filter = ModuleFilter {
        product: q.product,
    };
    let modules = state.modules.list(&filter).await?;
    if q.full {
        Ok(Json(modules).into_response())
    } else {
        let briefs: Vec<_> = modules.iter().map(ModuleDescriptor::brief).collect();
        Ok(Json(briefs).into_response())
    }
}

/// POST /_/proxy/modules
pub async fn create_module(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CreateModuleQuery>,
    Json(descriptor): Json<ModuleDescriptor>,
) -> GatewayResult<impl IntoResponse> {
    state
        .modules
        .create(descriptor.clone(), q.check.unwrap_or(true))
        .await?;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// GET /_/proxy/modules/{id}
pub async fn get_module(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<Json<ModuleDescriptor>> {
    Ok(Json(state.modules.get(&id).await?))
}

/// DELETE /_/proxy/modules/{id}
pub async fn delete_module(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<StatusCode> {
    state.modules.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /_/proxy/pull/modules
///
/// Body is a [`PullDescriptor`]; an empty body or an empty URL list falls
/// back to the configured default registries.
pub async fn pull_modules(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> GatewayResult<impl IntoResponse> {
    let requested = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let pd: PullDescriptor = serde_json::from_slice(&body)
            .map_err(|e| GatewayImplError::InvalidRequest(format!("pull descriptor: {e}")))?;
        Some(pd).filter(|pd| !pd.urls.is_empty())
    };
    let descriptor = requested.as_ref().unwrap_or(&state.default_pull);
    let added = state.pull.pull(descriptor).await?;
    Ok(Json(added))
}

/// Build the module router sub-tree
pub fn modules_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_/proxy/modules", get(list_modules).post(create_module))
        .route("/_/proxy/modules/{id}", get(get_module).delete(delete_module))
        .route("/_/proxy/pull/modules", post(pull_modules))
}
