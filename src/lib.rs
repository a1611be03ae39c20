//! rqlite-client - A leader-aware HTTP client for rqlite clusters.
//!
//! rqlite is a distributed SQL database built on SQLite and Raft, reachable
//! only over HTTP. Writes must reach the leader, and the leader moves. This
//! crate keeps a leader-first view of the cluster and fails over between
//! nodes so callers never track topology themselves.
//!
//! # Features
//!
//! - **Topology discovery**: the cluster's own status report decides who
//!   the leader is and which members exist.
//! - **Transparent failover**: each call tries every known node, leader
//!   first, and returns the first usable answer.
//! - **Lazy refresh on redirects**: a redirected request marks the view
//!   stale, and the next call re-discovers the topology before dispatching.
//! - **Pluggable transport**: the HTTP layer sits behind a trait, with a
//!   `reqwest` implementation by default.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Client: query | execute | status | peer_list               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Dispatcher: leader-first peer walk, redirect detection     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Cluster: Peer | Directory (swappable) | Status fetcher     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transport: HTTP exchange (reqwest)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use rqlite_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> rqlite_client::Result<()> {
//!     let client = Client::open("http://localhost:4001?timeout=500&consistency_level=weak").await?;
//!
//!     client.execute(["CREATE TABLE foo (id INTEGER NOT NULL PRIMARY KEY, name TEXT)"]).await?;
//!     let written = client.execute(["INSERT INTO foo(name) VALUES('fiona')"]).await?;
//!     for (idx, err) in written.errors() {
//!         eprintln!("statement {} failed: {}", idx, err);
//!     }
//!
//!     let rows = client.query(["SELECT * FROM foo"]).await?;
//!     println!("{:?}", rows.results[0].values);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod client;
pub mod cluster;
pub mod dispatch;
pub mod observability;
pub mod transport;

pub use client::Client;
pub use cluster::{ClusterStatus, Directory, Peer};
pub use config::{ClientConfig, ConsistencyLevel};
pub use error::{Result, RqliteError};
pub use types::{ExecuteResponse, ExecuteResult, QueryResponse, QueryResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
