//! Pipeline execution.
//!
//! [`PipelineExecutor`] runs an [`ExecutionPlan`] strictly in order, one
//! module call at a time.  What each call receives and what happens to its
//! answer depends on the entry's phase and [`FilterType`]:
//!
//! | entry                     | receives                        | effect                                   |
//! |---------------------------|---------------------------------|------------------------------------------|
//! | `headers`                 | request headers, no body        | headers merged (pre: request + response) |
//! | pre `request-only`        | full request                    | discarded                                |
//! | pre `request-response`    | full request                    | body becomes the request body            |
//! | handler                   | full request                    | becomes the current response             |
//! | post `request-only`       | current response body           | discarded                                |
//! | post `request-response`   | current response body           | replaces status and body                 |
//!
//! The first non-2xx answer ends the chain and is returned as is.

use super::client::ModuleClient;
use crate::error::{GatewayImplError, GatewayResult};
use meridian_kernel::gateway::{
    Discovery, ExecutionPlan, FilterType, GatewayRequest, GatewayResponse, Phase, PipelineEntry,
    headers,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct PipelineExecutor {
    discovery: Arc<dyn Discovery>,
    client: ModuleClient,
}

impl PipelineExecutor {
    pub fn new(discovery: Arc<dyn Discovery>, client: ModuleClient) -> Self {
        Self { discovery, client }
    }

    #[instrument(skip_all, fields(request_id = %req.id, entries = plan.len()))]
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        mut req: GatewayRequest,
    ) -> GatewayResult<GatewayResponse> {
        // no entry runs unless every address resolves
        let mut addresses = Vec::with_capacity(plan.len());
        for entry in plan.iter() {
            addresses.push(self.discovery.resolve_address(&entry.module_id, None).await?);
        }

        let mut current: Option<GatewayResponse> = None;
        let mut response_headers: HashMap<String, String> = HashMap::new();

        for (entry, address) in plan.iter().zip(&addresses) {
            let outgoing = outgoing_request(entry, &req, current.as_ref());
            let resp = self.client.call(&entry.module_id, address, &outgoing).await?;

            if !resp.is_success() {
                warn!(module = %entry.module_id, status = resp.status, "pipeline short-circuited");
                return Ok(resp);
            }
            debug!(module = %entry.module_id, phase = ?entry.phase, status = resp.status, "entry done");

            match (entry.phase, entry.filter_type()) {
                (Phase::Handler, _) => {
                    merge_headers(&mut response_headers, &resp.headers);
                    current = Some(resp);
                }
                (_, FilterType::RequestOnly) => {}
                (Phase::Pre, FilterType::Headers) => {
                    merge_metadata(&mut req.headers, &resp.headers);
                    merge_metadata(&mut response_headers, &resp.headers);
                }
                (Phase::Pre, FilterType::RequestResponse) => {
                    merge_headers(&mut req.headers, &resp.headers);
                    req.body = resp.body;
                }
                (Phase::Post, FilterType::Headers) => {
                    merge_metadata(&mut response_headers, &resp.headers);
                }
                (Phase::Post, FilterType::RequestResponse) => {
                    merge_headers(&mut response_headers, &resp.headers);
                    if let Some(cur) = current.as_mut() {
                        cur.status = resp.status;
                        cur.body = resp.body;
                        cur.module_id = resp.module_id;
                    }
                }
            }
        }

        let mut final_resp = current.ok_or_else(|| {
            GatewayImplError::Internal("execution plan produced no handler response".to_string())
        })?;
        final_resp.headers = response_headers;
        Ok(final_resp)
    }
}

/// The request an entry is sent.
fn outgoing_request(
    entry: &PipelineEntry,
    req: &GatewayRequest,
    current: Option<&GatewayResponse>,
) -> GatewayRequest {
    let mut out = GatewayRequest {
        id: req.id.clone(),
        path: req.path.clone(),
        method: req.method.clone(),
        headers: req.headers.clone(),
        body: Vec::new(),
    };

    match (entry.phase, entry.filter_type()) {
        (_, FilterType::Headers) => {
            out.headers.remove("content-type");
        }
        (Phase::Post, _) => {
            out.headers.remove("content-type");
            if let Some(cur) = current {
                out.body = cur.body.clone();
                if let Some(ct) = cur.headers.get("content-type") {
                    out.headers.insert("content-type".to_string(), ct.clone());
                }
            }
        }
        _ => out.body = req.body.clone(),
    }

    out.headers.insert(headers::REQUEST_ID.to_string(), req.id.clone());
    out.headers
        .insert(headers::MODULE_ID.to_string(), entry.module_id.clone());
    match entry.operation() {
        Some(op) => {
            out.headers.insert(headers::OPERATION.to_string(), op.to_string());
        }
        None => {
            out.headers.remove(headers::OPERATION);
        }
    }
    out
}

/// Later values win; hop-by-hop and framing headers are skipped.
fn merge_headers(into: &mut HashMap<String, String>, from: &HashMap<String, String>) {
    for (k, v) in from {
        let k = k.to_ascii_lowercase();
        if headers::is_mergeable(&k) {
            into.insert(k, v.clone());
        }
    }
}

/// Like [`merge_headers`] for stages whose body is discarded: their entity
/// headers describe that body and are skipped too.
fn merge_metadata(into: &mut HashMap<String, String>, from: &HashMap<String, String>) {
    for (k, v) in from {
        let k = k.to_ascii_lowercase();
        if headers::is_mergeable(&k) && !headers::is_entity(&k) {
            into.insert(k, v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::InMemoryDiscovery;
    use axum::{
        Router,
        body::Bytes,
        http::{HeaderMap, StatusCode},
        routing::any,
    };
    use meridian_kernel::gateway::{
        DeploymentDescriptor, HttpMethod, RouteFilter, RouteHandler,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn header(h: &HeaderMap, name: &str) -> String {
        h.get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn executor(discovery: Arc<InMemoryDiscovery>) -> PipelineExecutor {
        PipelineExecutor::new(discovery, ModuleClient::new(Duration::from_secs(5)).unwrap())
    }

    async fn register(discovery: &InMemoryDiscovery, module: &str, url: &str) {
        discovery
            .register(DeploymentDescriptor::new(format!("{module}-inst"), module, url))
            .await
            .unwrap();
    }

    fn handler_entry(module: &str) -> PipelineEntry {
        PipelineEntry::handler(module, RouteHandler::new(&["GET", "POST"], "/testb"))
    }

    fn filter_entry(module: &str, level: u8, ty: FilterType, phase: Phase) -> PipelineEntry {
        PipelineEntry::filter(module, RouteFilter::new(&["*"], "/testb", level, ty), phase)
    }

    fn request() -> GatewayRequest {
        GatewayRequest::new("req-1", "/testb", HttpMethod::Post)
            .with_header("x-meridian-tenant", "t1")
            .with_header("content-type", "text/plain")
            .with_body(b"payload".to_vec())
    }

    /// Handler echoing the body and the headers a pre filter may inject.
    fn sample_handler() -> Router {
        Router::new().route(
            "/testb",
            any(|headers: HeaderMap, body: Bytes| async move {
                let seen = header(&headers, "x-pre-added");
                (
                    [("x-handler", "sample".to_string()), ("x-seen-pre", seen)],
                    format!("It works {}", String::from_utf8_lossy(&body)),
                )
            }),
        )
    }

    #[tokio::test]
    async fn handler_only_plan_returns_handler_response() {
        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;

        let plan = ExecutionPlan::new(vec![], handler_entry("sample-1.0.0"), vec![]);
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"It works payload");
        assert_eq!(resp.headers.get("x-handler").map(String::as_str), Some("sample"));
    }

    #[tokio::test]
    async fn headers_filter_never_sees_a_body() {
        let seen_body = Arc::new(Mutex::new(None::<usize>));
        let seen = Arc::clone(&seen_body);
        let filter = Router::new().route(
            "/testb",
            any(move |body: Bytes| {
                let seen = Arc::clone(&seen);
                async move {
                    *seen.lock().unwrap() = Some(body.len());
                    ([("x-pre-added", "yes")], "filter body must be ignored")
                }
            }),
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "hdr-1.0.0", &spawn(filter).await).await;
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;

        let plan = ExecutionPlan::new(
            vec![filter_entry("hdr-1.0.0", 10, FilterType::Headers, Phase::Pre)],
            handler_entry("sample-1.0.0"),
            vec![],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(*seen_body.lock().unwrap(), Some(0));
        assert_eq!(resp.body, b"It works payload");
        assert_eq!(resp.headers.get("x-seen-pre").map(String::as_str), Some("yes"));
        assert_eq!(resp.headers.get("x-pre-added").map(String::as_str), Some("yes"));
    }

    #[tokio::test]
    async fn post_request_response_transforms_handler_output() {
        let upper = Router::new().route(
            "/testb",
            any(|body: Bytes| async move {
                (
                    StatusCode::CREATED,
                    [("x-post", "upper")],
                    String::from_utf8_lossy(&body).to_uppercase(),
                )
            }),
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;
        register(&discovery, "sample2-1.0.0", &spawn(upper).await).await;

        let plan = ExecutionPlan::new(
            vec![],
            handler_entry("sample-1.0.0"),
            vec![filter_entry("sample2-1.0.0", 31, FilterType::RequestResponse, Phase::Post)],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(resp.status, 201);
        assert_eq!(resp.body, b"IT WORKS PAYLOAD");
        assert_eq!(resp.headers.get("x-handler").map(String::as_str), Some("sample"));
        assert_eq!(resp.headers.get("x-post").map(String::as_str), Some("upper"));
    }

    #[tokio::test]
    async fn pre_request_response_rewrites_request_body() {
        let rewrite = Router::new().route("/testb", any(|| async { "rewritten" }));
        let audit = Router::new().route("/testb", any(|| async { "ignored" }));

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "rw-1.0.0", &spawn(rewrite).await).await;
        register(&discovery, "audit-1.0.0", &spawn(audit).await).await;
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;

        let plan = ExecutionPlan::new(
            vec![
                filter_entry("rw-1.0.0", 5, FilterType::RequestResponse, Phase::Pre),
                filter_entry("audit-1.0.0", 6, FilterType::RequestOnly, Phase::Pre),
            ],
            handler_entry("sample-1.0.0"),
            vec![],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();
        assert_eq!(resp.body, b"It works rewritten");
    }

    #[tokio::test]
    async fn failing_filter_short_circuits() {
        let calls = Arc::new(Mutex::new(0u32));
        let counted = Arc::clone(&calls);
        let handler = Router::new().route(
            "/testb",
            any(move || {
                let counted = Arc::clone(&counted);
                async move {
                    *counted.lock().unwrap() += 1;
                    "handler ran"
                }
            }),
        );
        let deny = Router::new().route(
            "/testb",
            any(|| async { (StatusCode::UNAUTHORIZED, "no token") }),
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "auth-1.0.0", &spawn(deny).await).await;
        register(&discovery, "sample-1.0.0", &spawn(handler).await).await;

        let plan = ExecutionPlan::new(
            vec![filter_entry("auth-1.0.0", 10, FilterType::Headers, Phase::Pre)],
            handler_entry("sample-1.0.0"),
            vec![],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(resp.status, 401);
        assert_eq!(resp.body, b"no token");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn unresolvable_entry_fails_before_any_call() {
        let calls = Arc::new(Mutex::new(0u32));
        let counted = Arc::clone(&calls);
        let filter = Router::new().route(
            "/testb",
            any(move || {
                let counted = Arc::clone(&counted);
                async move {
                    *counted.lock().unwrap() += 1;
                    "ok"
                }
            }),
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "hdr-1.0.0", &spawn(filter).await).await;

        let plan = ExecutionPlan::new(
            vec![filter_entry("hdr-1.0.0", 10, FilterType::Headers, Phase::Pre)],
            handler_entry("sample-1.0.0"),
            vec![],
        );
        let err = executor(discovery).execute(&plan, request()).await.unwrap_err();

        assert!(matches!(
            err,
            GatewayImplError::Kernel(meridian_kernel::gateway::GatewayError::InstanceNotFound(_))
        ));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn network_failure_aborts_the_chain() {
        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", "http://127.0.0.1:1").await;

        let plan = ExecutionPlan::new(vec![], handler_entry("sample-1.0.0"), vec![]);
        let err = executor(discovery).execute(&plan, request()).await.unwrap_err();
        assert!(matches!(err, GatewayImplError::Network { .. }));
    }

    /// Router answering `reply` with `headers`, recording the body it got.
    fn recording(
        reply: &'static str,
        headers: Vec<(&'static str, &'static str)>,
    ) -> (Router, Arc<Mutex<Option<Vec<u8>>>>) {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let app = Router::new().route(
            "/testb",
            any(move |body: Bytes| {
                let slot = Arc::clone(&slot);
                let headers = headers.clone();
                async move {
                    *slot.lock().unwrap() = Some(body.to_vec());
                    let mut resp = axum::response::Response::new(axum::body::Body::from(reply));
                    for (k, v) in headers {
                        resp.headers_mut().insert(k, v.parse().unwrap());
                    }
                    resp
                }
            }),
        );
        (app, seen)
    }

    #[tokio::test]
    async fn headers_filter_keeps_request_content_type() {
        let (filter, _) = recording("ok", vec![("content-type", "application/x-filter")]);
        let handler = Router::new().route(
            "/testb",
            any(|headers: HeaderMap| async move {
                format!("saw {}", header(&headers, "content-type"))
            }),
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "hdr-1.0.0", &spawn(filter).await).await;
        register(&discovery, "sample-1.0.0", &spawn(handler).await).await;

        let plan = ExecutionPlan::new(
            vec![filter_entry("hdr-1.0.0", 10, FilterType::Headers, Phase::Pre)],
            handler_entry("sample-1.0.0"),
            vec![],
        );
        let req = GatewayRequest::new("req-1", "/testb", HttpMethod::Post)
            .with_header("content-type", "application/json")
            .with_body(br#"{"a":1}"#.to_vec());
        let resp = executor(discovery).execute(&plan, req).await.unwrap();

        assert_eq!(resp.body, b"saw application/json");
        assert_eq!(
            resp.headers.get("content-type").map(String::as_str),
            Some("text/plain; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn post_headers_filter_adds_headers_only() {
        let (filter, seen) = recording(
            "filter body",
            vec![("x-post-h", "yes"), ("content-type", "application/x-filter")],
        );

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;
        register(&discovery, "hdr-1.0.0", &spawn(filter).await).await;

        let plan = ExecutionPlan::new(
            vec![],
            handler_entry("sample-1.0.0"),
            vec![filter_entry("hdr-1.0.0", 40, FilterType::Headers, Phase::Post)],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some(&b""[..]));
        assert_eq!(resp.body, b"It works payload");
        assert_eq!(resp.headers.get("x-post-h").map(String::as_str), Some("yes"));
        assert_eq!(
            resp.headers.get("content-type").map(String::as_str),
            Some("text/plain; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn post_request_only_sees_response_and_is_discarded() {
        let (audit, seen) = recording("audit says hi", vec![("x-audit", "1")]);

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;
        register(&discovery, "audit-1.0.0", &spawn(audit).await).await;

        let plan = ExecutionPlan::new(
            vec![],
            handler_entry("sample-1.0.0"),
            vec![filter_entry("audit-1.0.0", 40, FilterType::RequestOnly, Phase::Post)],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some(&b"It works payload"[..]));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"It works payload");
        assert!(!resp.headers.contains_key("x-audit"));
    }

    #[tokio::test]
    async fn failing_post_filter_short_circuits() {
        let fail = Router::new().route(
            "/testb",
            any(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "post failed") }),
        );
        let (late, seen) = recording("late", vec![]);

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(sample_handler()).await).await;
        register(&discovery, "fail-1.0.0", &spawn(fail).await).await;
        register(&discovery, "late-1.0.0", &spawn(late).await).await;

        let plan = ExecutionPlan::new(
            vec![],
            handler_entry("sample-1.0.0"),
            vec![
                filter_entry("fail-1.0.0", 40, FilterType::RequestResponse, Phase::Post),
                filter_entry("late-1.0.0", 50, FilterType::Headers, Phase::Post),
            ],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, b"post failed");
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn later_post_headers_override_earlier_ones() {
        let (first, _) = recording("", vec![("x-stage", "first")]);
        let (second, _) = recording("", vec![("x-stage", "second")]);
        let handler = Router::new().route("/testb", any(|| async { ([("x-stage", "handler")], "body") }));

        let discovery = Arc::new(InMemoryDiscovery::new());
        register(&discovery, "sample-1.0.0", &spawn(handler).await).await;
        register(&discovery, "first-1.0.0", &spawn(first).await).await;
        register(&discovery, "second-1.0.0", &spawn(second).await).await;

        let plan = ExecutionPlan::new(
            vec![],
            handler_entry("sample-1.0.0"),
            vec![
                filter_entry("first-1.0.0", 40, FilterType::Headers, Phase::Post),
                filter_entry("second-1.0.0", 50, FilterType::Headers, Phase::Post),
            ],
        );
        let resp = executor(discovery).execute(&plan, request()).await.unwrap();

        assert_eq!(resp.body, b"body");
        assert_eq!(resp.headers.get("x-stage").map(String::as_str), Some("second"));
    }

    #[test]
    fn merge_skips_hop_by_hop_headers() {
        let mut into = HashMap::from([("x-a".to_string(), "1".to_string())]);
        let from = HashMap::from([
            ("X-A".to_string(), "2".to_string()),
            ("content-length".to_string(), "10".to_string()),
            ("connection".to_string(), "close".to_string()),
        ]);
        merge_headers(&mut into, &from);
        assert_eq!(into, HashMap::from([("x-a".to_string(), "2".to_string())]));
    }

    #[test]
    fn metadata_merge_skips_entity_headers() {
        let mut into = HashMap::from([("content-type".to_string(), "application/json".to_string())]);
        let from = HashMap::from([
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("content-encoding".to_string(), "gzip".to_string()),
            ("x-b".to_string(), "1".to_string()),
        ]);
        merge_metadata(&mut into, &from);
        assert_eq!(into["content-type"], "application/json");
        assert!(!into.contains_key("content-encoding"));
        assert_eq!(into["x-b"], "1");
    }

    #[test]
    fn module_headers_are_attached() {
        let entry = PipelineEntry::handler(
            "sample-1.0.0",
            RouteHandler::new(&["POST"], "/testb").with_operation("create"),
        );
        let out = outgoing_request(&entry, &request(), None);
        assert_eq!(out.headers[headers::MODULE_ID], "sample-1.0.0");
        assert_eq!(out.headers[headers::REQUEST_ID], "req-1");
        assert_eq!(out.headers[headers::OPERATION], "create");
        assert_eq!(out.headers[headers::TENANT], "t1");
        assert_eq!(out.body, b"payload");
    }
}
