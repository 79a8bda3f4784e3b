//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the admin API and the tenant pipeline proxy into
//! one axum service.  Every path outside the admin tree is proxied: the
//! tenant header selects the tenant, the resolver builds its plan and the
//! executor runs it.

use crate::error::{GatewayImplError, GatewayResult};
use crate::handlers::{discovery_router, health_router, modules_router, tenants_router};
use crate::state::AppState;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use meridian_kernel::gateway::{GatewayRequest, GatewayResponse, HttpMethod, headers};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 9130).
    pub port: u16,
    /// Interface to bind (default: `0.0.0.0`).
    pub bind_address: String,
    /// Timeout of one module call.
    pub request_timeout_ms: u64,
    /// Timeout of one registry version probe during a pull.
    pub probe_timeout_ms: u64,
    /// Registries tried when a pull request names none.
    pub pull_urls: Vec<String>,
    /// Resolved plans kept in memory; `0` disables the cache.
    pub plan_cache_capacity: usize,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 9130,
            bind_address: "0.0.0.0".to_string(),
            request_timeout_ms: 30_000,
            probe_timeout_ms: 5_000,
            pull_urls: Vec::new(),
            plan_cache_capacity: 1024,
        }
    }
}

impl GatewayServerConfig {
    /// Defaults overridden by `MERIDIAN_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Override fields from `MERIDIAN_*` variables that are set and parse.
    pub fn with_env(mut self) -> Self {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
        }

        if let Some(port) = parsed("MERIDIAN_PORT") {
            self.port = port;
        }
        if let Ok(bind) = std::env::var("MERIDIAN_BIND") {
            self.bind_address = bind;
        }
        if let Some(ms) = parsed("MERIDIAN_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = ms;
        }
        if let Some(ms) = parsed("MERIDIAN_PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = ms;
        }
        if let Some(capacity) = parsed("MERIDIAN_PLAN_CACHE") {
            self.plan_cache_capacity = capacity;
        }
        if let Ok(urls) = std::env::var("MERIDIAN_PULL_URLS") {
            self.pull_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

pub struct GatewayServer {
    config: GatewayServerConfig,
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Server over fresh in-memory stores.
    pub fn new(config: GatewayServerConfig) -> GatewayResult<Self> {
        let state = Arc::new(AppState::in_memory(&config)?);
        Ok(Self { config, state })
    }

    /// Server over caller-built state (custom stores).
    pub fn with_state(config: GatewayServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the axum [`Router`]: admin API plus the proxy fallback.
    pub fn build_app(&self) -> Router {
        build_app(Arc::clone(&self.state))
    }

    /// Bind `{bind_address}:{port}` and serve until the process exits.
    pub async fn start(self) -> std::io::Result<()> {
        let app = self.build_app();
        let addr = self.config.addr();
        info!(addr = %addr, "Meridian gateway starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await
    }
}

/// Router over an existing state.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_router())
        .merge(modules_router())
        .merge(tenants_router())
        .merge(discovery_router())
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy
// ─────────────────────────────────────────────────────────────────────────────

/// Tenant pipeline proxy: resolve the plan, run it, relay the result.
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match proxy(&state, method, uri, headers, body).await {
        Ok(resp) => build_axum_response(resp),
        Err(err) => {
            warn!(error = %err, "proxy request failed");
            err.into_response()
        }
    }
}

async fn proxy(
    state: &AppState,
    method: Method,
    uri: Uri,
    header_map: HeaderMap,
    body: Bytes,
) -> GatewayResult<GatewayResponse> {
    // query string is forwarded, never matched
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let http_method = axum_method_to_kernel(&method).ok_or_else(|| {
        GatewayImplError::InvalidRequest(format!("method '{method}' is not supported"))
    })?;

    let request_id = header_map
        .get(headers::REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut req = GatewayRequest::new(&request_id, &path, http_method);
    for (name, value) in &header_map {
        if let Ok(v) = value.to_str() {
            req = req.with_header(name.as_str(), v);
        }
    }
    req = req.with_body(body.to_vec());

    let tenant = req
        .tenant()
        .ok_or_else(|| {
            GatewayImplError::InvalidRequest(format!("missing {} header", headers::TENANT))
        })?
        .to_string();

    let plan = state
        .resolver
        .resolve(&tenant, &req.method, req.route_path())
        .await?;
    debug!(request_id = %request_id, tenant = %tenant, entries = plan.len(), "executing pipeline");

    let mut resp = state.executor.execute(&plan, req).await?;
    resp.headers
        .insert(headers::REQUEST_ID.to_string(), request_id);
    Ok(resp)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Convert an axum [`Method`] to the kernel [`HttpMethod`].
///
/// Returns `None` for methods the kernel does not model (`CONNECT`, `TRACE`).
fn axum_method_to_kernel(m: &Method) -> Option<HttpMethod> {
    HttpMethod::from_str_ci(m.as_str())
}

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (k, v) in &resp.headers {
        if headers::is_mergeable(k) {
            builder = builder.header(k, v);
        }
    }
    builder
        .body(Body::from(resp.body))
        .unwrap_or_else(|e| {
            GatewayImplError::Internal(format!("response build: {e}")).into_response()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use meridian_kernel::gateway::{
        InterfaceDescriptor, ModuleDescriptor, RouteHandler, Tenant, TenantDescriptor,
    };
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<AppState>) {
        let server = GatewayServer::new(GatewayServerConfig::default()).unwrap();
        (server.build_app(), server.state())
    }

    async fn body_string(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn config_defaults() {
        let cfg = GatewayServerConfig::default();
        assert_eq!(cfg.addr(), "0.0.0.0:9130");
        assert_eq!(cfg.plan_cache_capacity, 1024);
    }

    #[test]
    fn config_from_partial_json() {
        let cfg: GatewayServerConfig =
            serde_json::from_str(r#"{ "port": 9200, "pull_urls": ["http://a:9130"] }"#).unwrap();
        assert_eq!(cfg.port, 9200);
        assert_eq!(cfg.pull_urls, ["http://a:9130"]);
        assert_eq!(cfg.request_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn version_endpoint_is_plain_text() {
        let (app, _) = app();
        let resp = app
            .oneshot(Request::get("/_/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn proxy_requires_tenant_header() {
        let (app, _) = app();
        let resp = app
            .oneshot(Request::get("/testb").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn proxy_unknown_tenant_is_not_found() {
        let (app, _) = app();
        let resp = app
            .oneshot(
                Request::get("/testb")
                    .header(headers::TENANT, "nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_string(resp).await.contains("TENANT_NOT_FOUND"));
    }

    #[tokio::test]
    async fn proxy_without_matching_handler_is_not_found() {
        let (app, state) = app();
        state
            .modules
            .create(
                ModuleDescriptor::new("sample-1.0.0").with_interface(
                    InterfaceDescriptor::new("sample", "1.0")
                        .with_handler(RouteHandler::new(&["GET"], "/testb")),
                ),
                true,
            )
            .await
            .unwrap();
        state
            .tenants
            .insert(
                Tenant::new(TenantDescriptor::new("t1"))
                    .with_enabled(BTreeMap::from([("sample-1.0.0".to_string(), true)])),
            )
            .await
            .unwrap();

        let resp = app
            .oneshot(
                Request::delete("/testb")
                    .header(headers::TENANT, "t1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_string(resp).await.contains("NO_ROUTE"));
    }
}
