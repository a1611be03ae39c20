//! HTTP transport used by the dispatcher.
//!
//! The dispatcher only needs one request/response exchange per attempt and
//! to know whether the server redirected it elsewhere. [`Transport`] captures
//! that contract; [`ReqwestTransport`] implements it on top of `reqwest`.

use crate::cluster::Credentials;
use crate::error::{Result, RqliteError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Sent as an `Authorization: Basic` header.
    pub basic_auth: Option<Credentials>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, credentials: Credentials) -> Self {
        self.basic_auth = Some(credentials);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response to an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// The server pointed the request at another location, whether or not
    /// the transport followed it.
    pub redirected: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange.
///
/// Implementations apply their own timeout. An `Err` means no response was
/// obtained; any response, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    /// A zero timeout disables it.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(format!("rqlite-client/{}", env!("CARGO_PKG_VERSION")));
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| RqliteError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| RqliteError::Network(format!("Invalid URL {:?}: {}", request.url, e)))?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(creds) = &request.basic_auth {
            builder = builder.basic_auth(&creds.user, Some(&creds.password));
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let redirected = response.status().is_redirection() || moved(&url, response.url());
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            body,
            redirected,
        })
    }
}

/// Whether the final URL of a followed request points somewhere else.
fn moved(requested: &Url, fin: &Url) -> bool {
    requested.host_str() != fin.host_str()
        || requested.port_or_known_default() != fin.port_or_known_default()
        || requested.path() != fin.path()
}
