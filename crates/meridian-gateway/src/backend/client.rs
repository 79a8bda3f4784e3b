//! HTTP client for module calls.
//!
//! [`ModuleClient`] forwards a [`GatewayRequest`] to `{base_url}{req.path}`
//! and relays the response verbatim.  It never interprets status codes; the
//! executor decides what a non-2xx answer means for the pipeline.

use crate::error::{GatewayImplError, GatewayResult};
use meridian_kernel::gateway::{GatewayRequest, GatewayResponse, headers::is_mergeable};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct ModuleClient {
    client: Client,
}

impl ModuleClient {
    /// Build a client whose calls time out after `timeout`.
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayImplError::Internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, sharing its connection pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Send `req` to the module at `base_url`.
    #[instrument(skip(self, req), fields(module = %module_id, path = %req.path))]
    pub async fn call(
        &self,
        module_id: &str,
        base_url: &str,
        req: &GatewayRequest,
    ) -> GatewayResult<GatewayResponse> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), req.path);
        debug!(url = %url, "calling module");

        let method = Method::from_bytes(req.method.as_str().as_bytes())
            .map_err(|e| GatewayImplError::Internal(format!("method: {e}")))?;
        let mut builder = self.client.request(method, &url);

        // hop-by-hop and framing headers are set by the client itself
        for (key, value) in req.headers.iter().filter(|(k, _)| is_mergeable(k)) {
            builder = builder.header(key, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let start = Instant::now();
        let network = |source| GatewayImplError::Network {
            module_id: module_id.to_string(),
            source,
        };
        let upstream = builder.send().await.map_err(network)?;
        let status = upstream.status().as_u16();

        // One value per name: repeated headers are comma-joined, except
        // `set-cookie`, which cannot be joined and keeps only its last value.
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in upstream.headers() {
            let Ok(v) = value.to_str() else { continue };
            if *name != reqwest::header::SET_COOKIE
                && let Some(prev) = headers.get_mut(name.as_str())
            {
                prev.push_str(", ");
                prev.push_str(v);
                continue;
            }
            headers.insert(name.to_string(), v.to_string());
        }
        let body = upstream.bytes().await.map_err(network)?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(status, latency_ms, "module answered");

        let mut resp = GatewayResponse::new(status, module_id);
        resp.headers = headers;
        resp.body = body.to_vec();
        resp.latency_ms = latency_ms;
        Ok(resp)
    }
}
