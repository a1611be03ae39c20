//! Cluster peer addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Port rqlite listens on for its HTTP API when none is given.
pub const DEFAULT_PORT: &str = "4001";

/// Host used when the connection string names none.
pub const DEFAULT_HOST: &str = "localhost";

/// URL scheme used to reach a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One cluster member's client-facing HTTP address.
///
/// Peers are immutable. Two peers are equal when they point at the same
/// address; credentials are not part of a peer's identity.
#[derive(Debug, Clone)]
pub struct Peer {
    scheme: Scheme,
    credentials: Option<Credentials>,
    host: String,
    port: String,
}

impl Peer {
    /// Create a new peer.
    pub fn new(
        scheme: Scheme,
        credentials: Option<Credentials>,
        host: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            scheme,
            credentials,
            host: host.into(),
            port: port.into(),
        }
    }

    /// Create a peer from a `host:port` address as reported in the cluster's
    /// member map, inheriting scheme and credentials from `template`.
    ///
    /// Returns `None` when the address has no usable host or port.
    pub fn from_api_addr(template: &Peer, addr: &str) -> Option<Self> {
        let (host, port) = split_host_port(addr)?;
        Some(Self::new(
            template.scheme,
            template.credentials.clone(),
            host,
            port,
        ))
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// The `host:port` form of this peer's address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of this peer, `scheme://host:port`.
    ///
    /// Credentials are never part of the URL; they travel as basic auth.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.host == other.host && self.port == other.port
    }
}

impl Eq for Peer {}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print credentials.
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Split `host:port` on the last colon. Bracketed IPv6 hosts keep their brackets.
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    let (host, port) = addr.trim().rsplit_once(':')?;
    if host.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return None;
    }
    Some((host, port))
}
