//! Leader-first view of the cluster's peers.
//!
//! A [`Directory`] is an immutable snapshot: the first peer is the leader as of
//! the last successful status fetch, the rest are followers. The client keeps
//! the current snapshot in a [`DirectoryCell`], which only ever swaps whole
//! snapshots, so a reader sees either the old list or the new one.

use super::peer::Peer;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, leader-first list of peers.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    peers: Arc<[Peer]>,
}

impl Directory {
    /// Create a directory from peers in leader-first order.
    ///
    /// Later duplicates of an address are dropped, keeping the first position.
    pub fn new(peers: impl IntoIterator<Item = Peer>) -> Self {
        let mut seen = HashSet::new();
        let peers: Vec<Peer> = peers
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self {
            peers: peers.into(),
        }
    }

    /// Create a directory holding a single, unverified leader guess.
    pub fn seed(peer: Peer) -> Self {
        Self {
            peers: Arc::from(vec![peer]),
        }
    }

    /// Peers in leader-first order.
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// The believed leader.
    pub fn leader(&self) -> Option<&Peer> {
        self.peers.first()
    }

    pub fn followers(&self) -> &[Peer] {
        self.peers.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Peer> {
        self.peers.to_vec()
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.peers[..] == other.peers[..]
    }
}

impl Eq for Directory {}

#[derive(Debug, Default)]
struct DirectoryState {
    directory: Directory,
    stale: bool,
    /// Number of `mark_stale` calls so far.
    marks: u64,
}

/// Shared slot holding the current directory and its "possibly stale" flag.
///
/// The lock is held only long enough to clone or swap an `Arc`; it is never
/// held across network I/O.
#[derive(Debug, Default)]
pub struct DirectoryCell {
    state: Mutex<DirectoryState>,
}

impl DirectoryCell {
    pub fn new(directory: Directory) -> Self {
        Self {
            state: Mutex::new(DirectoryState {
                directory,
                stale: false,
                marks: 0,
            }),
        }
    }

    /// A complete snapshot of the current directory.
    pub fn snapshot(&self) -> Directory {
        self.state.lock().directory.clone()
    }

    /// Atomically install a new directory. Clears the stale flag.
    pub fn replace(&self, directory: Directory) {
        let mut state = self.state.lock();
        state.directory = directory;
        state.stale = false;
    }

    /// Install a directory built from a fetch that started when
    /// [`stale_epoch`](Self::stale_epoch) returned `epoch`, and return the
    /// one it replaced.
    ///
    /// The stale flag is cleared only if nothing marked the directory stale
    /// since then; a redirect seen mid-fetch survives the swap.
    pub fn replace_since(&self, directory: Directory, epoch: u64) -> Directory {
        let mut state = self.state.lock();
        if state.marks == epoch {
            state.stale = false;
        }
        std::mem::replace(&mut state.directory, directory)
    }

    /// Record that the believed leader may be out of date.
    pub fn mark_stale(&self) {
        let mut state = self.state.lock();
        state.stale = true;
        state.marks += 1;
    }

    /// Opaque counter that changes every time the directory is marked stale.
    pub fn stale_epoch(&self) -> u64 {
        self.state.lock().marks
    }

    pub fn is_stale(&self) -> bool {
        self.state.lock().stale
    }

    /// Clear the stale flag, returning whether it was set.
    ///
    /// Only one of several concurrent callers observes `true`.
    pub fn take_stale(&self) -> bool {
        std::mem::take(&mut self.state.lock().stale)
    }
}
