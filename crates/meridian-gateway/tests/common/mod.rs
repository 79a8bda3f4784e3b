//! Shared fixtures: a gateway and stand-in modules on loopback ports.

use axum::{
    Router,
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, post},
};
use meridian_gateway::server::{GatewayServer, GatewayServerConfig};
use serde_json::{Value, json};

pub const DEAD_URL: &str = "http://127.0.0.1:1";
pub const TOKEN: &str = "secret-token";

/// Serve `app` on a random loopback port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start a gateway over fresh in-memory stores.
pub async fn start_gateway() -> String {
    let config = GatewayServerConfig {
        request_timeout_ms: 5_000,
        probe_timeout_ms: 1_000,
        ..Default::default()
    };
    let server = GatewayServer::new(config).unwrap();
    spawn(server.build_app()).await
}

/// `POST /authn/login` handler plus a token-checking `headers` filter.
pub fn auth_module() -> Router {
    Router::new()
        .route("/authn/login", post(|| async { ([("x-meridian-token", TOKEN)], "logged in") }))
        .fallback(|headers: HeaderMap, body: Bytes| async move {
            // filter calls never carry a body
            if !body.is_empty() {
                return (StatusCode::INTERNAL_SERVER_ERROR, "body sent to headers filter")
                    .into_response();
            }
            match headers.get("x-meridian-token").and_then(|v| v.to_str().ok()) {
                Some(TOKEN) => ([("x-auth-checked", "yes")], "").into_response(),
                _ => (StatusCode::UNAUTHORIZED, "missing or bad token").into_response(),
            }
        })
}

/// Handler for `GET,POST /testb`.
pub fn sample_module() -> Router {
    Router::new().route(
        "/testb",
        any(|method: Method, body: Bytes| async move {
            if method == Method::POST {
                format!("It works {}", String::from_utf8_lossy(&body))
            } else {
                "It works".to_string()
            }
        }),
    )
}

/// `request-response` post filter appending a marker to the body.
pub fn sample2_module() -> Router {
    Router::new().route(
        "/testb",
        any(|body: Bytes| async move {
            (
                [("x-sample2", "seen")],
                format!("{} (filtered)", String::from_utf8_lossy(&body)),
            )
        }),
    )
}

pub fn auth_descriptor() -> Value {
    json!({
        "id": "auth-1.0.0",
        "name": "authentication",
        "provides": [{
            "id": "authn",
            "version": "1.0",
            "handlers": [{ "methods": ["POST"], "path": "/authn/login" }]
        }]
    })
}

pub fn auth_filter_descriptor() -> Value {
    json!({
        "id": "auth-2.0.0",
        "provides": [{
            "id": "authn",
            "version": "2.0",
            "handlers": [{ "methods": ["POST"], "path": "/authn/login" }]
        }],
        "filters": [{ "methods": ["*"], "pathPattern": "/*", "level": "10", "type": "headers" }]
    })
}

pub fn sample_descriptor() -> Value {
    json!({
        "id": "sample-1.0.0",
        "provides": [{
            "id": "sample",
            "version": "1.0",
            "handlers": [{ "methods": ["GET", "POST"], "path": "/testb" }]
        }]
    })
}

pub fn sample2_descriptor() -> Value {
    json!({
        "id": "sample2-1.0.0",
        "filters": [{ "methods": ["GET", "POST"], "path": "/testb", "level": 31, "type": "request-response" }]
    })
}

/// Thin admin-API client.
pub struct Admin {
    pub base: String,
    pub http: reqwest::Client,
}

impl Admin {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.http
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.http
            .put(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
    }

    /// Register a descriptor and one deployed instance of it.
    pub async fn deploy(&self, descriptor: Value, url: &str) {
        let id = descriptor["id"].as_str().unwrap().to_string();
        let resp = self.post("/_/proxy/modules", &descriptor).await;
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED, "register {id}");
        let resp = self
            .post(
                "/_/discovery/modules",
                &json!({ "instId": format!("{id}-1"), "srvcId": id, "url": url }),
            )
            .await;
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED, "deploy {id}");
    }
}
