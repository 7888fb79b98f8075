//! In-process fake lookup / broker HTTP servers
//!
//! Shared by the unit tests and, through the `test-support` feature, by the
//! workspace's end-to-end tests.

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port; returns `host:port`
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr.to_string()
}

/// Address nothing listens on
pub async fn unreachable_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Broker node entry of a fake `/nodes` response
#[derive(Debug, Clone)]
pub struct FakeNode {
    pub host: String,
    pub tcp_port: u16,
    pub http_port: u16,
}

impl FakeNode {
    pub fn new(host: &str, tcp_port: u16, http_port: u16) -> Self {
        Self {
            host: host.to_string(),
            tcp_port,
            http_port,
        }
    }

    /// Node whose admin plane is an already running server at `http_addr`
    pub fn at(http_addr: &str) -> Self {
        let (host, port) = http_addr.rsplit_once(':').unwrap();
        let http_port: u16 = port.parse().unwrap();
        Self::new(host, 4150, http_port)
    }
}

/// Node list served by a running fake lookup; edits show up in the next
/// `/nodes` response
pub type LookupNodes = Arc<Mutex<Vec<FakeNode>>>;

/// Lookup answering `GET /nodes` with `nodes`
pub async fn fake_lookup(nodes: Vec<FakeNode>) -> String {
    fake_lookup_shared(nodes).await.0
}

/// Lookup whose node list can change while it runs
pub async fn fake_lookup_shared(nodes: Vec<FakeNode>) -> (String, LookupNodes) {
    let shared: LookupNodes = Arc::new(Mutex::new(nodes));
    let router = Router::new()
        .route("/nodes", get(list_nodes))
        .with_state(Arc::clone(&shared));
    (serve(router).await, shared)
}

async fn list_nodes(State(nodes): State<LookupNodes>) -> Json<serde_json::Value> {
    let producers: Vec<_> = nodes
        .lock()
        .unwrap()
        .iter()
        .map(|n| {
            serde_json::json!({
                "remote_address": format!("{}:40000", n.host),
                "hostname": n.host,
                "broadcast_address": n.host,
                "tcp_port": n.tcp_port,
                "http_port": n.http_port,
                "version": "1.2.1",
                "tombstones": [],
                "topics": []
            })
        })
        .collect();
    Json(serde_json::json!({ "producers": producers }))
}

/// Requests received by a fake broker node (`path?query`)
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Logged requests whose path starts with `path`
pub fn requests_on(log: &RequestLog, path: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.starts_with(path))
        .cloned()
        .collect()
}

#[derive(Clone)]
struct NodeState {
    log: RequestLog,
    status: StatusCode,
}

async fn record(State(state): State<NodeState>, uri: Uri) -> StatusCode {
    state.log.lock().unwrap().push(uri.to_string());
    state.status
}

async fn record_pub(
    State(state): State<NodeState>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> StatusCode {
    let mut entry = format!("/pub topic={}", params.get("topic").cloned().unwrap_or_default());
    if let Some(defer) = params.get("defer") {
        entry.push_str(&format!(" defer={defer}"));
    }
    entry.push_str(&format!(" body={body}"));
    state.log.lock().unwrap().push(entry);
    state.status
}

/// Broker node answering admin and publish requests with `status`
pub async fn fake_broker(status: StatusCode) -> (String, RequestLog) {
    let log: RequestLog = Arc::default();
    let state = NodeState {
        log: Arc::clone(&log),
        status,
    };
    let router = Router::new()
        .route("/topic/create", post(record))
        .route("/topic/delete", post(record))
        .route("/channel/create", post(record))
        .route("/channel/delete", post(record))
        .route("/pub", post(record_pub))
        .with_state(state);
    (serve(router).await, log)
}
