//! Cluster membership model.
//!
//! This module handles the client's view of the cluster:
//! - Peer addresses
//! - The leader-first directory and its shared, swappable cell
//! - The status wire schema and topology extraction
//! - Status fetching, which refreshes the directory

mod directory;
mod fetcher;
mod peer;
mod status;

pub use directory::{Directory, DirectoryCell};
pub use fetcher::StatusFetcher;
pub use peer::{Credentials, Peer, Scheme, DEFAULT_HOST, DEFAULT_PORT};
pub use status::{
    directory_from_status, BuildStatus, ClusterStatus, DbStatus, HttpStatus, MetaStatus,
    NodeStatus, RaftStatus, RuntimeStatus, Sqlite3Status, StoreStatus,
};
