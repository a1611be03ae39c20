//! Wire schema of the `/status` endpoint and topology extraction.
//!
//! Field names follow what the server emits. Capitalised aliases are
//! accepted as well, since older servers and proxies vary in casing.
//! Diagnostic sub-records tolerate missing fields; the `store` record, which
//! carries the topology, is required.

use super::directory::Directory;
use super::peer::Peer;
use crate::error::{Result, RqliteError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Cluster, runtime and build metadata reported by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default, alias = "Runtime")]
    pub runtime: RuntimeStatus,
    #[serde(default, alias = "HTTP")]
    pub http: HttpStatus,
    #[serde(default, alias = "Node")]
    pub node: NodeStatus,
    #[serde(alias = "Store")]
    pub store: StoreStatus,
    #[serde(default, rename = "last_backup_time", alias = "LastBackup")]
    pub last_backup: Option<String>,
    #[serde(default, alias = "Build")]
    pub build: BuildStatus,
}

impl ClusterStatus {
    /// Raft address of the current leader, if the node knows one.
    pub fn leader_raft_addr(&self) -> Option<&str> {
        Some(self.store.leader.as_str()).filter(|l| !l.is_empty())
    }

    /// Map from raft address to client-facing `host:port`.
    pub fn api_peers(&self) -> &BTreeMap<String, String> {
        &self.store.meta.api_peers
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeStatus {
    #[serde(rename = "GOARCH", alias = "goarch")]
    pub goarch: String,
    #[serde(rename = "GOOS", alias = "goos")]
    pub goos: String,
    #[serde(rename = "GOMAXPROCS", alias = "gomaxprocs")]
    pub gomaxprocs: i64,
    #[serde(rename = "numCPU", alias = "NumCPU", alias = "num_cpu")]
    pub num_cpu: i64,
    #[serde(rename = "numGoroutine", alias = "NumGoroutine", alias = "num_goroutine")]
    pub num_goroutine: i64,
    #[serde(alias = "Version")]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStatus {
    #[serde(alias = "Addr")]
    pub addr: String,
    #[serde(alias = "Auth")]
    pub auth: String,
    #[serde(alias = "Redirect")]
    pub redirect: String,
    pub conn_idle_timeout: String,
    pub conn_tx_timeout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    pub start_time: String,
    #[serde(alias = "Uptime")]
    pub uptime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildStatus {
    #[serde(alias = "Branch")]
    pub branch: String,
    #[serde(alias = "Commit")]
    pub commit: String,
    #[serde(alias = "Version")]
    pub version: String,
    pub build_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreStatus {
    #[serde(alias = "Addr")]
    pub addr: String,
    pub apply_timeout: String,
    #[serde(rename = "db_conf", alias = "DB")]
    pub db: DbStatus,
    #[serde(alias = "Dir")]
    pub dir: String,
    pub heartbeat_timeout: String,
    /// Raft address of the leader.
    #[serde(alias = "Leader")]
    pub leader: String,
    #[serde(alias = "Meta")]
    pub meta: MetaStatus,
    pub open_timeout: String,
    #[serde(alias = "Peers")]
    pub peers: Vec<String>,
    #[serde(alias = "Raft")]
    pub raft: RaftStatus,
    pub snapshot_threshold: i64,
    #[serde(alias = "Sqlite3")]
    pub sqlite3: Sqlite3Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbStatus {
    #[serde(rename = "DSN", alias = "dsn")]
    pub dsn: String,
    #[serde(rename = "Memory", alias = "memory")]
    pub memory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaStatus {
    /// Raft address to client-facing `host:port`.
    #[serde(rename = "APIPeers", alias = "api_peers")]
    pub api_peers: BTreeMap<String, String>,
}

/// Raft statistics. The server reports these as strings; numbers are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftStatus {
    #[serde(deserialize_with = "lenient_string")]
    pub applied_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub commit_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub fsm_pending: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_contact: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_log_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_log_term: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_snapshot_index: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_snapshot_term: String,
    #[serde(deserialize_with = "lenient_string")]
    pub num_peers: String,
    #[serde(alias = "State", deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(alias = "Term", deserialize_with = "lenient_string")]
    pub term: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sqlite3Status {
    #[serde(alias = "DNS")]
    pub dns: String,
    #[serde(alias = "FKConstraints")]
    pub fk_constraints: String,
    #[serde(alias = "Path")]
    pub path: String,
    #[serde(alias = "Version")]
    pub version: String,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected string, got {}", other))),
    }
}

/// Build a leader-first directory from a node's status report.
///
/// `template` supplies the scheme and credentials every peer inherits. The
/// leader is resolved through `store.meta.APIPeers`; the remaining members
/// follow in map order. Fails with [`RqliteError::LeaderNotFound`] when the
/// reported leader has no usable address in the map.
pub fn directory_from_status(status: &ClusterStatus, template: &Peer) -> Result<Directory> {
    let leader_raft = status.leader_raft_addr().ok_or(RqliteError::LeaderNotFound)?;
    let api_peers = status.api_peers();

    let leader = api_peers
        .get(leader_raft)
        .and_then(|addr| Peer::from_api_addr(template, addr))
        .ok_or(RqliteError::LeaderNotFound)?;

    let followers = api_peers
        .iter()
        .filter(|(raft_addr, _)| raft_addr.as_str() != leader_raft)
        .filter_map(|(raft_addr, api_addr)| {
            let peer = Peer::from_api_addr(template, api_addr);
            if peer.is_none() {
                warn!(raft_addr = %raft_addr, api_addr = %api_addr, "Ignoring malformed peer address");
            }
            peer
        });

    Ok(Directory::new(std::iter::once(leader).chain(followers)))
}
