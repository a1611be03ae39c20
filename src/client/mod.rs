//! Client handle for rqlite clusters.
//!
//! A [`Client`] owns the cluster directory, the consistency level and the
//! credentials of one connection. It is cheap to clone and safe to share
//! between tasks; all clones see the same directory.

use crate::cluster::{ClusterStatus, Directory, Peer, StatusFetcher};
use crate::config::{ClientConfig, ConsistencyLevel};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{ExecuteResponse, QueryResponse};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Handle to an rqlite cluster.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    seed: Peer,
    dispatcher: Dispatcher,
}

impl Client {
    /// Open a connection described by a connection string.
    ///
    /// Discovers the cluster topology before returning; fails if no peer
    /// answers the initial status request.
    pub async fn open(dsn: &str) -> Result<Self> {
        let config = ClientConfig::from_dsn(dsn)?;
        Self::connect(config).await
    }

    /// Open a connection from an explicit configuration.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::open_with_transport(config, Arc::new(transport)).await
    }

    /// Open a connection using a caller-supplied transport.
    pub async fn open_with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let client = Self::unverified(config, transport);
        let directory = client.refresh().await?;

        info!(
            leader = %directory.leader().map(ToString::to_string).unwrap_or_default(),
            peers = directory.len(),
            level = %client.inner.config.consistency_level,
            "Connected to cluster"
        );
        Ok(client)
    }

    /// A client seeded with the configured address as the leader guess,
    /// before any topology discovery.
    fn unverified(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let seed = config.seed_peer();
        let dispatcher = Dispatcher::new(
            transport,
            Directory::seed(seed.clone()),
            config.consistency_level,
        );
        Self {
            inner: Arc::new(ClientInner {
                config,
                seed,
                dispatcher,
            }),
        }
    }

    /// Run read statements and return one result per statement.
    ///
    /// Per-statement failures are reported in each result's `error` field,
    /// not as an `Err`.
    pub async fn query<I>(&self, statements: I) -> Result<QueryResponse>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let body = encode_statements(statements)?;
        self.refresh_if_stale().await;
        self.inner.dispatcher.query(&body).await
    }

    /// Run write statements and return one result per statement.
    pub async fn execute<I>(&self, statements: I) -> Result<ExecuteResponse>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.execute_with(statements, false).await
    }

    /// Run write statements as one transaction: all commit or none do.
    pub async fn execute_atomic<I>(&self, statements: I) -> Result<ExecuteResponse>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.execute_with(statements, true).await
    }

    pub async fn execute_with<I>(&self, statements: I, atomic: bool) -> Result<ExecuteResponse>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let body = encode_statements(statements)?;
        self.refresh_if_stale().await;
        self.inner.dispatcher.execute(&body, atomic).await
    }

    /// Cluster, runtime and build metadata of the first peer that answers.
    pub async fn status(&self) -> Result<ClusterStatus> {
        self.refresh_if_stale().await;
        self.inner.dispatcher.status().await
    }

    /// Re-discover the topology now and install it.
    pub async fn refresh(&self) -> Result<Directory> {
        StatusFetcher::new(&self.inner.dispatcher, &self.inner.seed)
            .refresh()
            .await
    }

    /// Snapshot of the known peers, leader first.
    pub fn peer_list(&self) -> Vec<Peer> {
        self.directory().to_vec()
    }

    /// Snapshot of the current directory.
    pub fn directory(&self) -> Directory {
        self.inner.dispatcher.directory().snapshot()
    }

    /// The believed leader.
    pub fn leader(&self) -> Option<Peer> {
        self.directory().leader().cloned()
    }

    /// Whether a redirect has been seen since the last refresh.
    pub fn is_stale(&self) -> bool {
        self.inner.dispatcher.directory().is_stale()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn consistency_level(&self) -> ConsistencyLevel {
        self.inner.config.consistency_level
    }

    pub fn timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    /// Refresh the directory if a redirect flagged it stale.
    ///
    /// A failed refresh re-flags the directory and lets the caller's
    /// operation proceed with the old peer list.
    async fn refresh_if_stale(&self) {
        let cell = self.inner.dispatcher.directory();
        if !cell.take_stale() {
            return;
        }
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Failed to refresh stale cluster directory");
            cell.mark_stale();
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

fn encode_statements<I>(statements: I) -> Result<Vec<u8>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let statements: Vec<I::Item> = statements.into_iter().collect();
    let refs: Vec<&str> = statements.iter().map(AsRef::as_ref).collect();
    Ok(serde_json::to_vec(&refs)?)
}
