//! Topology discovery through the status endpoint.

use super::directory::Directory;
use super::peer::Peer;
use super::status::directory_from_status;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use tracing::{debug, info};

/// Re-derives the cluster topology from a live status call.
///
/// The status request goes through the dispatcher like any other operation,
/// so it is tried on each known peer in leader-first order. The new
/// directory is built off-lock and only swapped in once it is complete.
pub struct StatusFetcher<'a> {
    dispatcher: &'a Dispatcher,
    template: &'a Peer,
}

impl<'a> StatusFetcher<'a> {
    /// `template` supplies the scheme and credentials of discovered peers.
    pub fn new(dispatcher: &'a Dispatcher, template: &'a Peer) -> Self {
        Self {
            dispatcher,
            template,
        }
    }

    /// Fetch the topology without installing it.
    pub async fn fetch(&self) -> Result<Directory> {
        let status = self.dispatcher.status().await?;
        directory_from_status(&status, self.template)
    }

    /// Fetch the topology and install it as the current directory.
    ///
    /// On failure the current directory is left untouched. A redirect
    /// observed while the fetch was in flight keeps the directory stale.
    pub async fn refresh(&self) -> Result<Directory> {
        let cell = self.dispatcher.directory();
        let epoch = cell.stale_epoch();
        let directory = self.fetch().await?;
        let previous = cell.replace_since(directory.clone(), epoch);

        if previous.leader() != directory.leader() {
            info!(
                leader = %display_leader(&directory),
                previous = %display_leader(&previous),
                peers = directory.len(),
                "Cluster leader changed"
            );
        } else {
            debug!(leader = %display_leader(&directory), peers = directory.len(), "Cluster directory refreshed");
        }

        Ok(directory)
    }
}

fn display_leader(directory: &Directory) -> String {
    directory
        .leader()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".to_string())
}
