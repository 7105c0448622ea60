use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{BoxError, Error};
use crate::options::Method;

/// One HTTP round-trip, as handed to a [`Transport`].
#[derive(Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Absolute URL, base URL plus resolved path.
    pub url: String,
    pub username: String,
    pub password: String,
    /// JSON body, sent on every verb.
    pub body: Map<String, Value>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("body", &self.body)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .finish()
    }
}

/// What came back: status code and raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Executes HTTP requests on behalf of the client.
///
/// Implement this to plug in another HTTP stack or an in-memory fake. An `Err`
/// means the exchange itself failed; any HTTP status, including 4xx and 5xx,
/// is an `Ok`.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, BoxError>> + Send;
}

/// Default transport backed by an async `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the underlying client. `timeout` is left to reqwest's default
    /// (none) when `None`; `verify = false` accepts invalid TLS certificates.
    pub fn new(timeout: Option<Duration>, verify: bool) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(Self { http })
    }

    /// Wraps an already configured client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, BoxError>> + Send {
        execute(self.http.clone(), request)
    }
}

async fn execute(
    http: reqwest::Client,
    request: TransportRequest,
) -> Result<TransportResponse, BoxError> {
    let mut req = http
        .request(request.method.into(), &request.url)
        .basic_auth(&request.username, Some(&request.password));

    req = req.json(&request.body);
    for (name, value) in &request.headers {
        req = req.header(name.as_str(), value.as_str());
    }
    if !request.query.is_empty() {
        req = req.query(&request.query);
    }
    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;

    Ok(TransportResponse { status, body })
}
