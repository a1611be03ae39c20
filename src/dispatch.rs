//! Failover request execution.
//!
//! A [`Dispatcher`] turns one logical operation into at most one HTTP attempt
//! per known peer, leader first, and returns the first answer that decodes.
//! Peers that fail to connect, time out, answer with a non-2xx status or
//! send an undecodable body are skipped. When a reply shows the request was
//! redirected, the directory is flagged stale; the refresh itself is left to
//! the next logical call.

use crate::cluster::{ClusterStatus, Directory, DirectoryCell, Peer};
use crate::config::ConsistencyLevel;
use crate::error::{Result, RqliteError};
use crate::transport::{HttpRequest, Method, Transport};
use crate::types::{ExecuteResponse, QueryResponse};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Logical operation against the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Status,
    Query,
    Execute,
}

impl Operation {
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Status => "/status",
            Operation::Query => "/db/query",
            Operation::Execute => "/db/execute",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::Status => Method::Get,
            Operation::Query | Operation::Execute => Method::Post,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Status => "status",
            Operation::Query => "query",
            Operation::Execute => "execute",
        })
    }
}

/// Full URL of `op` on `peer`.
///
/// Queries and writes carry `?timings&transaction&level=<level>`; atomic
/// writes additionally carry `&atomic`.
pub fn request_url(peer: &Peer, op: Operation, level: ConsistencyLevel, atomic: bool) -> String {
    let mut url = peer.base_url();
    url.push_str(op.path());

    if matches!(op, Operation::Query | Operation::Execute) {
        url.push_str("?timings&transaction&level=");
        url.push_str(level.as_str());
    }
    if op == Operation::Execute && atomic {
        url.push_str("&atomic");
    }

    url
}

/// Executes operations against the cluster with peer failover.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    directory: DirectoryCell,
    level: ConsistencyLevel,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, directory: Directory, level: ConsistencyLevel) -> Self {
        Self {
            transport,
            directory: DirectoryCell::new(directory),
            level,
        }
    }

    /// The directory this dispatcher walks.
    pub fn directory(&self) -> &DirectoryCell {
        &self.directory
    }

    pub fn consistency_level(&self) -> ConsistencyLevel {
        self.level
    }

    /// Fetch the status of the first peer that answers.
    pub async fn status(&self) -> Result<ClusterStatus> {
        self.dispatch(Operation::Status, None, false).await
    }

    /// Run a query whose statements are already JSON-encoded.
    pub async fn query(&self, body: &[u8]) -> Result<QueryResponse> {
        self.dispatch(Operation::Query, Some(body), false).await
    }

    /// Run a write whose statements are already JSON-encoded.
    pub async fn execute(&self, body: &[u8], atomic: bool) -> Result<ExecuteResponse> {
        self.dispatch(Operation::Execute, Some(body), atomic).await
    }

    /// Try `op` on each peer in leader-first order until one answers with
    /// a decodable `T`.
    ///
    /// Fails with [`RqliteError::NoPeers`] when the directory is empty and
    /// with [`RqliteError::PeersUnavailable`] when every peer failed.
    #[instrument(skip_all, fields(op = %op, atomic = atomic))]
    pub async fn dispatch<T: DeserializeOwned>(
        &self,
        op: Operation,
        body: Option<&[u8]>,
        atomic: bool,
    ) -> Result<T> {
        let directory = self.directory.snapshot();
        if directory.is_empty() {
            return Err(RqliteError::NoPeers);
        }

        for peer in directory.peers() {
            match self.attempt(peer, op, body, atomic).await {
                Ok(value) => return Ok(value),
                Err(e) => debug!(peer = %peer, error = %e, "Peer attempt failed"),
            }
        }

        Err(RqliteError::PeersUnavailable)
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        peer: &Peer,
        op: Operation,
        body: Option<&[u8]>,
        atomic: bool,
    ) -> Result<T> {
        let mut request = HttpRequest::new(op.method(), request_url(peer, op, self.level, atomic))
            .header(CONTENT_TYPE, APPLICATION_JSON);
        if let Some(creds) = peer.credentials() {
            request = request.basic_auth(creds.clone());
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = self.transport.send(request).await?;

        if response.redirected {
            warn!(peer = %peer, "Request was redirected, marking cluster directory stale");
            self.directory.mark_stale();
        }

        if !response.is_success() {
            return Err(RqliteError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| RqliteError::Deserialization(e.to_string()))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("directory", &self.directory)
            .field("level", &self.level)
            .finish()
    }
}
