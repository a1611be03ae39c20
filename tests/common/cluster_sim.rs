// Simulated rqlite cluster served over real HTTP
//
// Every node listens on its own ephemeral port. Nodes share one view of who
// the leader is; followers answer writes with a 307 pointing at the leader,
// the way a real cluster does. A cluster started with credentials rejects
// requests whose Authorization header does not match.

use super::fixtures;
use axum::extract::{RawQuery, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Per-node counters and switches.
#[derive(Debug)]
pub struct SimulatedNode {
    pub addr: SocketAddr,
    down: AtomicBool,
    hits: AtomicUsize,
    last_query: Mutex<Option<String>>,
    last_authorization: Mutex<Option<String>>,
}

impl SimulatedNode {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            down: AtomicBool::new(false),
            hits: AtomicUsize::new(0),
            last_query: Mutex::new(None),
            last_authorization: Mutex::new(None),
        }
    }

    pub fn raft_addr(index: usize) -> String {
        format!("raft-{}:4002", index)
    }
}

#[derive(Debug)]
struct Shared {
    nodes: Vec<SimulatedNode>,
    leader: AtomicUsize,
    /// Required `Authorization` header value, if any.
    authorization: Option<String>,
}

impl Shared {
    fn status_body(&self) -> String {
        let raft: Vec<String> = (0..self.nodes.len()).map(SimulatedNode::raft_addr).collect();
        let api: Vec<String> = self.nodes.iter().map(|n| n.addr.to_string()).collect();
        let members: Vec<(&str, &str)> = raft
            .iter()
            .zip(api.iter())
            .map(|(r, a)| (r.as_str(), a.as_str()))
            .collect();
        let leader = SimulatedNode::raft_addr(self.leader.load(Ordering::SeqCst));
        fixtures::status_body(&leader, &members)
    }
}

#[derive(Clone)]
struct NodeCtx {
    shared: Arc<Shared>,
    index: usize,
}

impl NodeCtx {
    fn node(&self) -> &SimulatedNode {
        &self.shared.nodes[self.index]
    }

    /// Count the request; `Some` carries the reply of a node that is down
    /// or of a request that failed authentication.
    fn enter(&self, headers: &HeaderMap) -> Option<Response> {
        let node = self.node();
        node.hits.fetch_add(1, Ordering::SeqCst);

        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *node.last_authorization.lock() = presented.clone();

        if node.down.load(Ordering::SeqCst) {
            return Some((StatusCode::SERVICE_UNAVAILABLE, "node is down").into_response());
        }
        match &self.shared.authorization {
            Some(expected) if presented.as_ref() != Some(expected) => {
                Some((StatusCode::UNAUTHORIZED, "unauthorized").into_response())
            }
            _ => None,
        }
    }
}

/// A running multi-node cluster.
pub struct FakeCluster {
    shared: Arc<Shared>,
    servers: Vec<JoinHandle<()>>,
}

impl FakeCluster {
    /// Start `size` nodes with node 0 as leader.
    pub async fn start(size: usize) -> std::io::Result<Self> {
        Self::launch(size, None).await
    }

    /// Start `size` nodes that only accept basic auth as `user`/`password`.
    pub async fn start_with_auth(size: usize, user: &str, password: &str) -> std::io::Result<Self> {
        Self::launch(size, Some(Self::expected_authorization(user, password))).await
    }

    async fn launch(size: usize, authorization: Option<String>) -> std::io::Result<Self> {
        let mut listeners = Vec::with_capacity(size);
        for _ in 0..size {
            listeners.push(TcpListener::bind("127.0.0.1:0").await?);
        }

        let nodes = listeners
            .iter()
            .map(|l| l.local_addr().map(SimulatedNode::new))
            .collect::<std::io::Result<Vec<_>>>()?;
        let shared = Arc::new(Shared {
            nodes,
            leader: AtomicUsize::new(0),
            authorization,
        });

        let servers = listeners
            .into_iter()
            .enumerate()
            .map(|(index, listener)| {
                let app = router(NodeCtx {
                    shared: shared.clone(),
                    index,
                });
                tokio::spawn(async move {
                    let _ = axum::serve(listener, app).await;
                })
            })
            .collect();

        Ok(Self { shared, servers })
    }

    /// DSN pointing at node `index`.
    pub fn dsn(&self, index: usize, params: &str) -> String {
        let mut dsn = format!("http://{}", self.addr(index));
        if !params.is_empty() {
            dsn.push('?');
            dsn.push_str(params);
        }
        dsn
    }

    pub fn addr(&self, index: usize) -> String {
        self.shared.nodes[index].addr.to_string()
    }

    pub fn size(&self) -> usize {
        self.shared.nodes.len()
    }

    pub fn set_leader(&self, index: usize) {
        self.shared.leader.store(index, Ordering::SeqCst);
    }

    pub fn set_down(&self, index: usize, down: bool) {
        self.shared.nodes[index].down.store(down, Ordering::SeqCst);
    }

    /// Requests node `index` has received, including refused ones.
    pub fn hits(&self, index: usize) -> usize {
        self.shared.nodes[index].hits.load(Ordering::SeqCst)
    }

    pub fn reset_hits(&self) {
        for node in &self.shared.nodes {
            node.hits.store(0, Ordering::SeqCst);
        }
    }

    /// `Authorization` header of the last request node `index` received.
    pub fn last_authorization(&self, index: usize) -> Option<String> {
        self.shared.nodes[index].last_authorization.lock().clone()
    }

    /// Header value the cluster expects for `user`/`password`.
    pub fn expected_authorization(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
    }

    /// Query string of the last `/db/*` request node `index` served.
    pub fn last_query(&self, index: usize) -> Option<String> {
        self.shared.nodes[index].last_query.lock().clone()
    }
}

impl Drop for FakeCluster {
    fn drop(&mut self) {
        for server in &self.servers {
            server.abort();
        }
    }
}

fn router(ctx: NodeCtx) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/db/query", post(query))
        .route("/db/execute", post(execute))
        .with_state(ctx)
}

async fn status(State(ctx): State<NodeCtx>, headers: HeaderMap) -> Response {
    if let Some(refused) = ctx.enter(&headers) {
        return refused;
    }
    json_response(ctx.shared.status_body())
}

async fn query(
    State(ctx): State<NodeCtx>,
    headers: HeaderMap,
    RawQuery(params): RawQuery,
) -> Response {
    if let Some(refused) = ctx.enter(&headers) {
        return refused;
    }
    *ctx.node().last_query.lock() = params;
    json_response(fixtures::query_body(ctx.index as i64))
}

async fn execute(
    State(ctx): State<NodeCtx>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(params): RawQuery,
) -> Response {
    if let Some(refused) = ctx.enter(&headers) {
        return refused;
    }

    let leader = ctx.shared.leader.load(Ordering::SeqCst);
    if leader != ctx.index {
        let target = format!(
            "http://{}{}",
            ctx.shared.nodes[leader].addr,
            uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/db/execute")
        );
        return Redirect::temporary(&target).into_response();
    }

    *ctx.node().last_query.lock() = params;
    json_response(fixtures::execute_body(&[(ctx.index as i64 + 1, 1)]))
}

fn json_response(body: String) -> Response {
    ([("content-type", "application/json")], body).into_response()
}
