//! Client configuration and connection-string parsing.
//!
//! A connection string has the form
//!
//! ```text
//! scheme://[user[:password]@]host[:port][?timeout=<ms>&consistency_level=<none|weak|strong>]
//! ```
//!
//! An empty string is valid and means `http://localhost:4001` with the
//! default timeout (100 ms) and consistency level (`strong`).

use crate::cluster::{Credentials, Peer, Scheme, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{Result, RqliteError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Characters escaped in the user-info part of a connection string.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Read-freshness guarantee requested on every query and write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    /// Read from the local node's SQLite database without leader checks.
    None,
    /// The node checks that it is the leader before reading.
    Weak,
    /// The read goes through the Raft log.
    #[default]
    Strong,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::None => "none",
            ConsistencyLevel::Weak => "weak",
            ConsistencyLevel::Strong => "strong",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = RqliteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ConsistencyLevel::None),
            "weak" => Ok(ConsistencyLevel::Weak),
            "strong" => Ok(ConsistencyLevel::Strong),
            _ => Err(RqliteError::InvalidConfig {
                field: "consistency_level".to_string(),
                reason: format!("unknown level {:?}", s),
            }),
        }
    }
}

/// Configuration of a client handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme used for every peer.
    pub scheme: Scheme,
    /// Host of the initial leader guess.
    pub host: String,
    /// Port of the initial leader guess.
    pub port: String,
    /// Static basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Per-request timeout. Zero disables the timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Consistency level sent with queries and writes.
    pub consistency_level: ConsistencyLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            consistency_level: ConsistencyLevel::Strong,
        }
    }
}

impl ClientConfig {
    /// Parse a connection string.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Ok(Self::default());
        }

        let url = parse_dsn_url(dsn)?;
        if url.cannot_be_a_base() {
            return Err(RqliteError::InvalidDsn(format!(
                "URL could not be fully understood: {:?}",
                dsn
            )));
        }

        let mut config = Self {
            scheme: if url.scheme() == "https" {
                Scheme::Https
            } else {
                Scheme::Http
            },
            ..Self::default()
        };

        if !url.username().is_empty() {
            config.credentials = Some(Credentials::new(
                decode_userinfo("user", url.username())?,
                decode_userinfo("password", url.password().unwrap_or_default())?,
            ));
        }

        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            config.host = host.to_string();
        }
        if let Some(port) = url.port().map(|p| p.to_string()).or_else(|| explicit_port(dsn)) {
            config.port = port;
        }

        let mut timeout_seen = false;
        let mut level_seen = false;
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "timeout" if !timeout_seen => {
                    timeout_seen = true;
                    let ms: u64 = value.parse().map_err(|e| RqliteError::InvalidConfig {
                        field: "timeout".to_string(),
                        reason: format!("{:?}: {}", value, e),
                    })?;
                    config.timeout = Duration::from_millis(ms);
                }
                "consistency_level" if !level_seen => {
                    level_seen = true;
                    config.consistency_level = value.parse()?;
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RqliteError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RqliteError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(RqliteError::InvalidConfig {
                field: "host".to_string(),
                reason: "Host must not be empty".to_string(),
            });
        }

        if self.port.is_empty() || self.port.parse::<u16>().is_err() {
            return Err(RqliteError::InvalidConfig {
                field: "port".to_string(),
                reason: format!("{:?} is not a valid port", self.port),
            });
        }

        if let Some(creds) = &self.credentials {
            if creds.user.is_empty() {
                return Err(RqliteError::InvalidConfig {
                    field: "credentials.user".to_string(),
                    reason: "User must not be empty when credentials are set".to_string(),
                });
            }
        }

        Ok(())
    }

    /// The initial, unverified leader guess. Also the template whose scheme
    /// and credentials every discovered peer inherits.
    pub fn seed_peer(&self) -> Peer {
        Peer::new(
            self.scheme,
            self.credentials.clone(),
            self.host.clone(),
            self.port.clone(),
        )
    }

    /// Render this configuration back into a connection string.
    pub fn to_dsn(&self) -> String {
        let mut dsn = format!("{}://", self.scheme);
        if let Some(creds) = &self.credentials {
            dsn.push_str(&format!(
                "{}:{}@",
                utf8_percent_encode(&creds.user, USERINFO),
                utf8_percent_encode(&creds.password, USERINFO)
            ));
        }
        dsn.push_str(&format!("{}:{}", self.host, self.port));
        dsn.push_str(&format!(
            "?timeout={}&consistency_level={}",
            self.timeout.as_millis(),
            self.consistency_level
        ));
        dsn
    }
}

fn decode_userinfo(part: &str, raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| RqliteError::InvalidDsn(format!("{} is not valid UTF-8: {}", part, e)))
}

fn parse_dsn_url(dsn: &str) -> Result<Url> {
    // Forms without a scheme, such as "?timeout=50", resolve against the default address.
    let head = dsn.split(['?', '#']).next().unwrap_or_default();
    let url = if head.contains(':') {
        Url::parse(dsn)
    } else {
        Url::parse(&format!("http://{}:{}/", DEFAULT_HOST, DEFAULT_PORT))
            .and_then(|base| base.join(dsn))
    };
    url.map_err(|e| RqliteError::InvalidDsn(format!("{:?}: {}", dsn, e)))
}

/// Port written out in the authority even when it is the scheme's default,
/// which the URL parser normalises away.
fn explicit_port(dsn: &str) -> Option<String> {
    let rest = dsn.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (host, port) = host_port.rsplit_once(':')?;
    if host.contains(':') && !host.ends_with(']') {
        return None;
    }
    (!port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())).then(|| port.to_string())
}

/// Logging configuration for binaries built on this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive.
    pub log_level: String,
    /// Emit JSON-formatted logs.
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
