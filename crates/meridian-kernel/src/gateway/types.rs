//! Core HTTP data types shared by the resolver, executor and server.
//!
//! These types carry no runtime dependencies beyond `serde` and `std`, so the
//! executor can move them across task boundaries freely.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known header names understood by the gateway (all lowercase).
pub mod headers {
    /// Tenant identifier header; required on every proxied request.
    pub const TENANT: &str = "x-meridian-tenant";
    /// Opaque bearer token, forwarded to modules untouched.
    pub const TOKEN: &str = "x-meridian-token";
    /// Per-request correlation id assigned by the gateway.
    pub const REQUEST_ID: &str = "x-meridian-request-id";
    /// Id of the module a pipeline entry belongs to.
    pub const MODULE_ID: &str = "x-meridian-module-id";
    /// Target operation name of the matched handler, when declared.
    pub const OPERATION: &str = "x-meridian-operation";

    /// Entity / hop-by-hop headers that are never merged between stages.
    pub const UNMERGED: &[&str] = &[
        "content-length",
        "transfer-encoding",
        "connection",
        "keep-alive",
        "host",
        "date",
        "server",
    ];

    /// Headers describing a stage's own body; dropped with that body.
    pub const ENTITY: &[&str] = &["content-type", "content-encoding"];

    /// Whether `name` describes a message body.
    pub fn is_entity(name: &str) -> bool {
        ENTITY.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Whether a header produced by one stage may be merged into another.
    pub fn is_mergeable(name: &str) -> bool {
        !UNMERGED.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs used in REST and proxy scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// A request flowing through a tenant pipeline.
///
/// The executor mutates a single `GatewayRequest` as stages run: `pre`
/// filters may add headers or (for `request-response`) replace the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// Request path including any query string, e.g. `/testb?x=1`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, path, and method.
    pub fn new(id: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            method,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// The path without its query string; this is what routes match against.
    pub fn route_path(&self) -> &str {
        super::path::strip_query(&self.path)
    }

    /// Value of the tenant header, if present and non-empty.
    pub fn tenant(&self) -> Option<&str> {
        self.headers
            .get(headers::TENANT)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// A response produced by a pipeline entry (or the whole pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// HTTP status code (100–599).
    pub status: u16,
    /// Response headers (lowercased names).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Id of the module that produced this response.
    pub module_id: String,
    /// Round-trip latency in milliseconds (gateway → module → gateway).
    pub latency_ms: u64,
}

impl GatewayResponse {
    /// Construct a minimal response.
    pub fn new(status: u16, module_id: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            module_id: module_id.into(),
            latency_ms: 0,
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// `true` for 2xx statuses. Anything else short-circuits a pipeline.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
