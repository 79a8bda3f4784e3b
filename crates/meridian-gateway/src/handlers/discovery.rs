//! Deployment discovery endpoints
//!
//! GET    /_/discovery/modules                - list instances (`?srvcId=` to narrow)
//! POST   /_/discovery/modules                - register an instance of a catalog module
//! DELETE /_/discovery/modules/{srvc}/{inst}  - remove an instance

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use meridian_kernel::gateway::DeploymentDescriptor;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::GatewayResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesQuery {
    pub srvc_id: Option<String>,
}

/// GET /_/discovery/modules
pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListInstancesQuery>,
) -> Json<Vec<DeploymentDescriptor>> {
    Json(state.discovery.list(q.srvc_id.as_deref()).await)
}

/// POST /_/discovery/modules
pub async fn register_instance(
    State(state): State<Arc<AppState>>,
    Json(deployment): Json<DeploymentDescriptor>,
) -> GatewayResult<impl IntoResponse> {
    // an instance must belong to a known module
    state.modules.get(&deployment.srvc_id).await?;
    state.discovery.register(deployment.clone()).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

/// DELETE /_/discovery/modules/{srvc}/{inst}
pub async fn remove_instance(
    State(state): State<Arc<AppState>>,
    Path((srvc, inst)): Path<(String, String)>,
) -> GatewayResult<StatusCode> {
    state.discovery.remove(&srvc, &inst).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the discovery router sub-tree
pub fn discovery_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/_/discovery/modules",
            get(list_instances).post(register_instance),
        )
        .route("/_/discovery/modules/{srvc}/{inst}", delete(remove_instance))
}
