use std::fmt;

use serde_json::{Map, Value};

use crate::error::Error;
use crate::util::resolve_path;

/// HTTP verbs the Mailchimp API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "delete")]
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Loose, caller-facing description of a call. Every field is optional.
///
/// Build one with the chained setters, convert a bare path with `.into()`, or
/// deserialize it from a JSON object such as
/// `{"path": "/lists/{list_id}", "path_params": {"list_id": "abc"}}`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub path: Option<String>,
    pub method: Option<Method>,
    pub body: Option<Map<String, Value>>,
    pub query: Option<Map<String, Value>>,
    /// Deprecated alias for `query`, named after the "query parameters" of the
    /// Mailchimp docs. Only consulted when `query` is absent.
    pub params: Option<Map<String, Value>>,
    pub path_params: Option<Map<String, Value>>,
}

impl RequestOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }

    #[deprecated(note = "use `query`; `params` is only read when `query` is unset")]
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Adds one `{name}` substitution.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path_params
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn path_params(mut self, params: Map<String, Value>) -> Self {
        self.path_params = Some(params);
        self
    }
}

impl From<&str> for RequestOptions {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RequestOptions {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&String> for RequestOptions {
    fn from(path: &String) -> Self {
        Self::new(path.as_str())
    }
}

/// A fully resolved call, ready to be turned into a wire request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Path with a leading slash and placeholders substituted.
    pub path: String,
    pub method: Method,
    pub body: Map<String, Value>,
    pub query: Option<Map<String, Value>>,
    pub path_params: Map<String, Value>,
}

impl RequestDescriptor {
    /// Resolves defaults: path via [`resolve_path`], method GET, empty body,
    /// and `query` falling back to the legacy `params`.
    pub fn from_options(options: Option<RequestOptions>) -> Result<Self, Error> {
        let options = options.ok_or(Error::MissingOptions)?;

        let path = resolve_path(
            options.path.as_deref().unwrap_or_default(),
            options.path_params.as_ref(),
        );
        if path.is_empty() {
            return Err(Error::MissingPath);
        }

        Ok(Self {
            path,
            method: options.method.unwrap_or_default(),
            body: options.body.unwrap_or_default(),
            query: options.query.or(options.params),
            path_params: options.path_params.unwrap_or_default(),
        })
    }
}
