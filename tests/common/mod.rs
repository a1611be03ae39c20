//! Common test utilities for integration tests.

pub mod cluster_sim;

use async_trait::async_trait;
use parking_lot::Mutex;
use rqlite_client::transport::{HttpRequest, HttpResponse, Transport};
use rqlite_client::{Result, RqliteError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Re-export common types
pub use assertions::*;
pub use cluster_sim::*;
pub use fixtures::*;

/// How a scripted peer answers one route.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond {
        status: u16,
        body: String,
        redirected: bool,
    },
    Refuse,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Respond {
            status: 200,
            body: body.into(),
            redirected: false,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Respond {
            status,
            body: body.into(),
            redirected: false,
        }
    }

    /// A 200 reached only after following a redirect.
    pub fn redirected(body: impl Into<String>) -> Self {
        Reply::Respond {
            status: 200,
            body: body.into(),
            redirected: true,
        }
    }
}

/// In-memory transport answering from a table keyed by `(host:port, path)`.
///
/// Unscripted routes behave like a refused connection. Every request is
/// recorded, including refused ones.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), Reply>>,
    route_delays: Mutex<HashMap<(String, String), Duration>>,
    log: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn on(&self, addr: &str, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .insert((addr.to_string(), path.to_string()), reply);
        self
    }

    /// Delay replies on one route, overriding [`with_delay`](Self::with_delay).
    pub fn delay_on(&self, addr: &str, path: &str, delay: Duration) -> &Self {
        self.route_delays
            .lock()
            .insert((addr.to_string(), path.to_string()), delay);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    /// URLs requested so far, in order.
    pub fn urls(&self) -> Vec<String> {
        self.log.lock().iter().map(|r| r.url.clone()).collect()
    }

    /// Number of requests sent to `addr`.
    pub fn hits(&self, addr: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|r| route_of(&r.url).map_or(false, |(a, _)| a == addr))
            .count()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let route = route_of(&request.url)
            .ok_or_else(|| RqliteError::Network(format!("bad url {}", request.url)))?;
        self.log.lock().push(request);

        let delay = self.route_delays.lock().get(&route).copied().or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.routes.lock().get(&route).cloned();
        match reply {
            Some(Reply::Respond {
                status,
                body,
                redirected,
            }) => Ok(HttpResponse {
                status,
                body: body.into_bytes(),
                redirected,
            }),
            _ => Err(RqliteError::Network(format!(
                "connection refused: {}",
                route.0
            ))),
        }
    }
}

/// `(host:port, path)` of a request URL.
pub fn route_of(url: &str) -> Option<(String, String)> {
    let url = reqwest::Url::parse(url).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some((format!("{}:{}", host, port), url.path().to_string()))
}

/// Query string of a request URL, without the leading `?`.
pub fn query_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url).ok()?.query().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_of() {
        assert_eq!(
            route_of("http://u:p@10.0.0.1:4003/db/query?timings&level=weak"),
            Some(("10.0.0.1:4003".to_string(), "/db/query".to_string()))
        );
        assert_eq!(
            route_of("https://db.example.com/status"),
            Some(("db.example.com:443".to_string(), "/status".to_string()))
        );
        assert_eq!(route_of("not a url"), None);
    }
}
