use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::runtime::{Builder as RuntimeBuilder, Handle};
use tracing::field::Empty;
use tracing::{Span, debug, instrument, warn};

use crate::config::load_config;
use crate::credential::Credential;
use crate::diagnostics::{Diagnostic, DiagnosticSink, tracing_sink};
use crate::error::Error;
use crate::options::{Method, RequestDescriptor, RequestOptions};
use crate::response::{ApiResponse, parse_response};
use crate::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::util::query_pairs;

/// Basic-auth username. Mailchimp ignores it; only the key (password) counts.
const AUTH_USER: &str = "any";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key, `<key>-<datacenter>`.
    pub key: String,
    /// Overrides the base URL derived from the datacenter, e.g. for a proxy
    /// or a local mock. No trailing slash needed.
    pub url: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Defaults to `mailchimp-rs/<crate version>`.
    pub user_agent: Option<String>,
    /// Per-request timeout on the default transport. None by default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            url: None,
            verify: true,
            user_agent: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

/// Mailchimp v3 client.
///
/// Holds the credential and base URL for its whole life; every call builds
/// its own request, so one client can serve any number of concurrent calls.
/// Cloning is cheap.
///
/// Two delivery styles are offered: the async methods (`get`, `post`, ...,
/// `request`) return futures, and the `*_with_callback` variants hand the
/// result to a closure instead.
pub struct Client<T = ReqwestTransport> {
    credential: Credential,
    base_url: String,
    user_agent: String,
    transport: Arc<T>,
    diagnostics: DiagnosticSink,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            credential: self.credential.clone(),
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            transport: Arc::clone(&self.transport),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Client<ReqwestTransport> {
    /// Creates a client for `api_key` with the default transport.
    ///
    /// Fails with [`Error::InvalidCredential`] unless the key looks like
    /// `<key>-<datacenter>`.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        Self::from_config(ClientConfig::new(api_key))
    }

    /// Creates a client from the `MAILCHIMP_API_KEY` environment variable,
    /// with `MAILCHIMP_URL` optionally overriding the base URL.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = load_config()?;
        Ok(Self::from_config(cfg)?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config.timeout, config.verify)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client sending requests through `transport`.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, Error> {
        let credential = Credential::parse(&config.key)?;
        let base_url = match config.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => credential.base_url(),
        };
        let user_agent = config
            .user_agent
            .unwrap_or_else(|| format!("mailchimp-rs/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            credential,
            base_url,
            user_agent,
            transport: Arc::new(transport),
            diagnostics: tracing_sink(),
        })
    }

    /// Routes diagnostics (such as an option overwritten by an explicit
    /// argument) to `sink` instead of the log.
    pub fn with_diagnostics<F>(mut self, sink: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.diagnostics = Arc::new(sink);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// `GET`. `query` replaces any query set on `options`.
    pub async fn get(
        &self,
        options: impl Into<RequestOptions>,
        query: Option<Map<String, Value>>,
    ) -> Result<ApiResponse, Error> {
        let options = self.prepare(options.into(), Method::Get, query);
        self.request(Some(options)).await
    }

    /// `POST`. `body` replaces any body set on `options`.
    pub async fn post(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
    ) -> Result<ApiResponse, Error> {
        let options = self.prepare(options.into(), Method::Post, body);
        self.request(Some(options)).await
    }

    pub async fn patch(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
    ) -> Result<ApiResponse, Error> {
        let options = self.prepare(options.into(), Method::Patch, body);
        self.request(Some(options)).await
    }

    pub async fn put(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
    ) -> Result<ApiResponse, Error> {
        let options = self.prepare(options.into(), Method::Put, body);
        self.request(Some(options)).await
    }

    pub async fn delete(&self, options: impl Into<RequestOptions>) -> Result<ApiResponse, Error> {
        let options = self.prepare(options.into(), Method::Delete, None);
        self.request(Some(options)).await
    }

    /// Runs a call described by `options`.
    ///
    /// `None` fails with [`Error::MissingOptions`]. Any status outside
    /// 200..=299 becomes [`Error::Api`].
    pub async fn request(&self, options: Option<RequestOptions>) -> Result<ApiResponse, Error> {
        let descriptor = RequestDescriptor::from_options(options)?;
        self.execute(descriptor).await
    }

    /// Sends an already resolved descriptor.
    #[instrument(
        name = "mailchimp_request",
        skip_all,
        fields(
            http.method = Empty,
            http.url = Empty,
            http.status_code = Empty,
        )
    )]
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, Error> {
        let request = self.build_request(descriptor);

        let span = Span::current();
        span.record("http.method", request.method.as_str());
        span.record("http.url", request.url.as_str());
        debug!(query = ?request.query, "sending request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(Error::Transport)?;

        span.record("http.status_code", response.status);
        let result = parse_response(response);
        if let Err(Error::Api(e)) = &result {
            warn!(status = e.status(), "mailchimp returned an error: {}", e);
        }
        result
    }

    /// Turns a descriptor into the wire request handed to the transport.
    /// The body is always sent as JSON, `{}` when empty, whatever the verb.
    pub fn build_request(&self, descriptor: RequestDescriptor) -> TransportRequest {
        TransportRequest {
            method: descriptor.method,
            url: format!("{}{}", self.base_url, descriptor.path),
            username: AUTH_USER.to_string(),
            password: self.credential.api_key().to_string(),
            body: descriptor.body,
            query: descriptor.query.as_ref().map(query_pairs).unwrap_or_default(),
            headers: vec![("User-Agent".to_string(), self.user_agent.clone())],
        }
    }

    /// Sets the verb and moves the explicit data argument into its slot
    /// (`query` for GET, `body` otherwise), reporting an overwrite.
    fn prepare(
        &self,
        mut options: RequestOptions,
        method: Method,
        data: Option<Map<String, Value>>,
    ) -> RequestOptions {
        options.method = Some(method);

        let (field, slot) = match method {
            Method::Get => ("query", &mut options.query),
            Method::Post | Method::Patch | Method::Put => ("body", &mut options.body),
            Method::Delete => return options,
        };

        if let Some(data) = data {
            if slot.is_some() {
                (self.diagnostics)(&Diagnostic::OptionOverwritten { field });
            }
            *slot = Some(data);
        }
        options
    }
}

impl<T: Transport> Client<T> {
    /// Runs `options` and hands the outcome to `callback`.
    ///
    /// Inside a tokio runtime the call is spawned and this returns at once.
    /// Outside one, a single-threaded runtime is started and the callback has
    /// run by the time this returns.
    pub fn request_with_callback<F>(&self, options: Option<RequestOptions>, callback: F)
    where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let client = self.clone();

        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                let result = client.request(options).await;
                callback(result);
            });
            return;
        }

        match RuntimeBuilder::new_current_thread().enable_all().build() {
            Ok(runtime) => {
                let result = runtime.block_on(client.request(options));
                callback(result);
            }
            Err(e) => callback(Err(Error::Transport(Box::new(e)))),
        }
    }

    pub fn get_with_callback<F>(
        &self,
        options: impl Into<RequestOptions>,
        query: Option<Map<String, Value>>,
        callback: F,
    ) where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let options = self.prepare(options.into(), Method::Get, query);
        self.request_with_callback(Some(options), callback);
    }

    pub fn post_with_callback<F>(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
        callback: F,
    ) where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let options = self.prepare(options.into(), Method::Post, body);
        self.request_with_callback(Some(options), callback);
    }

    pub fn patch_with_callback<F>(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
        callback: F,
    ) where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let options = self.prepare(options.into(), Method::Patch, body);
        self.request_with_callback(Some(options), callback);
    }

    pub fn put_with_callback<F>(
        &self,
        options: impl Into<RequestOptions>,
        body: Option<Map<String, Value>>,
        callback: F,
    ) where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let options = self.prepare(options.into(), Method::Put, body);
        self.request_with_callback(Some(options), callback);
    }

    pub fn delete_with_callback<F>(&self, options: impl Into<RequestOptions>, callback: F)
    where
        F: FnOnce(Result<ApiResponse, Error>) + Send + 'static,
    {
        let options = self.prepare(options.into(), Method::Delete, None);
        self.request_with_callback(Some(options), callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::transport::TransportResponse;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::mpsc;

    /// Records every request and answers with a canned response.
    struct StubTransport {
        seen: Mutex<Vec<TransportRequest>>,
        reply: Result<TransportResponse, String>,
    }

    impl StubTransport {
        fn replying(status: u16, body: Value) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply: Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply: Err(msg.to_string()),
            }
        }
    }

    impl Transport for Arc<StubTransport> {
        fn send(
            &self,
            request: TransportRequest,
        ) -> impl std::future::Future<Output = Result<TransportResponse, BoxError>> + Send {
            self.seen.lock().unwrap().push(request);
            let reply = self.reply.clone().map_err(BoxError::from);
            async move { reply }
        }
    }

    fn client_with(stub: StubTransport) -> (Client<Arc<StubTransport>>, Arc<StubTransport>) {
        let stub = Arc::new(stub);
        let client =
            Client::with_transport(ClientConfig::new("0123abcd-us6"), Arc::clone(&stub)).unwrap();
        (client, stub)
    }

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn last_request(stub: &StubTransport) -> TransportRequest {
        stub.seen.lock().unwrap().last().cloned().unwrap()
    }

    #[test]
    fn construction_derives_base_url() {
        let client = Client::new("0123abcd-us6").unwrap();
        assert_eq!(client.base_url(), "https://us6.api.mailchimp.com/3.0");
        assert_eq!(client.credential().datacenter(), "us6");
    }

    #[test]
    fn construction_rejects_bad_keys() {
        let err = Client::new("nohyphen").unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));
    }

    #[test]
    fn url_override_is_used_verbatim() {
        let mut cfg = ClientConfig::new("k-us1");
        cfg.url = Some("http://localhost:1234/3.0/".to_string());
        let client = Client::from_config(cfg).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/3.0");
    }

    #[test]
    fn prepare_get_sets_method_and_keeps_body_empty() {
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        let opts = client.prepare("/foo".into(), Method::Get, None);
        let d = RequestDescriptor::from_options(Some(opts)).unwrap();
        assert_eq!(d.method, Method::Get);
        assert_eq!(d.path, "/foo");
        assert!(d.body.is_empty());
    }

    #[test]
    fn explicit_argument_wins_and_warns() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        let client = client.with_diagnostics(move |d| sink.lock().unwrap().push(d.clone()));

        let opts = RequestOptions::new("/foo").query(map(json!({"a": 1})));
        let opts = client.prepare(opts, Method::Get, Some(map(json!({"b": 2}))));

        assert_eq!(opts.query, Some(map(json!({"b": 2}))));
        assert_eq!(
            *warnings.lock().unwrap(),
            vec![Diagnostic::OptionOverwritten { field: "query" }]
        );
    }

    #[test]
    fn no_warning_without_a_conflict() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        let client = client.with_diagnostics(move |d| sink.lock().unwrap().push(d.clone()));

        let opts = RequestOptions::new("/foo").body(map(json!({"a": 1})));
        let opts = client.prepare(opts, Method::Post, None);

        assert_eq!(opts.body, Some(map(json!({"a": 1}))));
        assert!(warnings.lock().unwrap().is_empty());
    }

    #[test]
    fn delete_ignores_data_slots() {
        let (client, _) = client_with(StubTransport::replying(204, json!(null)));
        let opts = RequestOptions::new("/lists/1").body(map(json!({"keep": true})));
        let opts = client.prepare(opts, Method::Delete, None);
        assert_eq!(opts.method, Some(Method::Delete));
        assert_eq!(opts.body, Some(map(json!({"keep": true}))));
    }

    #[test]
    fn build_request_fills_wire_fields() {
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        let d = RequestDescriptor::from_options(Some(
            RequestOptions::new("lists/{id}")
                .path_param("id", 9)
                .query(map(json!({"count": 10}))),
        ))
        .unwrap();
        let req = client.build_request(d);

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url, "https://us6.api.mailchimp.com/3.0/lists/9");
        assert_eq!(req.username, "any");
        assert_eq!(req.password, "0123abcd-us6");
        assert_eq!(req.body, Map::new());
        assert_eq!(req.query, vec![("count".to_string(), "10".to_string())]);
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "User-Agent" && v.starts_with("mailchimp-rs/"))
        );
    }

    #[test]
    fn every_verb_carries_a_json_body() {
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        for method in [Method::Get, Method::Post, Method::Patch, Method::Put, Method::Delete] {
            let d = RequestDescriptor::from_options(Some(RequestOptions::new("/x").method(method)))
                .unwrap();
            assert_eq!(client.build_request(d).body, Map::new(), "{method}");
        }
    }

    #[tokio::test]
    async fn post_resolves_with_status_code() {
        let (client, stub) = client_with(StubTransport::replying(201, json!({"id": 7})));
        let res = client.post("/foo", Some(map(json!({"a": 1})))).await.unwrap();

        assert_eq!(res.into_value(), json!({"id": 7, "statusCode": 201}));
        let sent = last_request(&stub);
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.body, map(json!({"a": 1})));
    }

    #[tokio::test]
    async fn non_2xx_rejects_with_detail() {
        let (client, _) = client_with(StubTransport::replying(404, json!({"detail": "not found"})));
        let err = client.get("/nope", None).await.unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.as_api().map(|e| e.status()), Some(404));
    }

    #[tokio::test]
    async fn transport_failures_are_wrapped() {
        let (client, _) = client_with(StubTransport::failing("connection reset"));
        let err = client.delete("/lists/1").await.unwrap_err();
        match err {
            Error::Transport(cause) => assert_eq!(cause.to_string(), "connection reset"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_without_options_fails() {
        let (client, stub) = client_with(StubTransport::replying(200, json!({})));
        let err = client.request(None).await.unwrap_err();
        assert!(matches!(err, Error::MissingOptions));
        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verbs_send_their_method() {
        let (client, stub) = client_with(StubTransport::replying(200, json!({})));
        client.patch("/a", None).await.unwrap();
        assert_eq!(last_request(&stub).method, Method::Patch);
        client.put("/a", None).await.unwrap();
        assert_eq!(last_request(&stub).method, Method::Put);
        client.delete("/a").await.unwrap();
        assert_eq!(last_request(&stub).method, Method::Delete);
    }

    #[test]
    fn callback_runs_before_return_outside_a_runtime() {
        let (client, stub) = client_with(StubTransport::replying(201, json!({"id": 1})));
        let (tx, rx) = mpsc::channel();
        client.post_with_callback("/foo", None, move |result| {
            tx.send(result).unwrap();
        });

        let result = rx.try_recv().expect("callback should already have run");
        assert_eq!(result.unwrap().status_code, 201);
        assert_eq!(last_request(&stub).body, Map::new());
    }

    #[tokio::test]
    async fn callback_receives_errors_inside_a_runtime() {
        let (client, _) = client_with(StubTransport::replying(400, json!({"detail": "bad"})));
        let (tx, rx) = tokio::sync::oneshot::channel();
        client.get_with_callback("/foo", None, move |result| {
            let _ = tx.send(result);
        });

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "bad");
    }

    #[tokio::test]
    async fn request_with_callback_reports_missing_options() {
        let (client, _) = client_with(StubTransport::replying(200, json!({})));
        let (tx, rx) = tokio::sync::oneshot::channel();
        client.request_with_callback(None, move |result| {
            let _ = tx.send(result);
        });
        assert!(matches!(rx.await.unwrap(), Err(Error::MissingOptions)));
    }
}
