use std::fmt;

use serde_json::{Map, Value};

/// Boxed cause carried by [`Error::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong building or running a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API key does not look like `<key>-<datacenter>`.
    #[error("missing or invalid api key: {key}")]
    InvalidCredential { key: String },

    #[error("no request options given")]
    MissingOptions,

    #[error("no path given")]
    MissingPath,

    /// The transport could not complete the round-trip (DNS, TLS, connection reset, ...).
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// Mailchimp answered with a status outside 200..=299.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A 2xx response whose body is not a JSON object.
    #[error("failed to decode response body (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The upstream error, if this is an API error.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// The problem document Mailchimp returns on failure.
///
/// Mailchimp errors look like
/// `{"type": "...", "title": "Resource Not Found", "status": 404, "detail": "...", "instance": "..."}`,
/// optionally with an `errors` array of per-field problems. Every field is kept
/// in [`ApiError::fields`]; the common ones have accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: u16,
    message: String,
    fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Builds the error from a non-2xx status and the raw response text.
    ///
    /// The message is the body's `detail`, falling back to `title`, then to the
    /// raw text for non-JSON bodies, then to `HTTP <status>`.
    pub(crate) fn from_response(status: u16, text: &str) -> Self {
        let fields = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let str_field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let message = str_field("detail")
            .or_else(|| str_field("title"))
            .or_else(|| {
                let raw = text.trim();
                (fields.is_empty() && !raw.is_empty()).then(|| raw.to_string())
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        Self {
            status,
            message,
            fields,
        }
    }

    /// HTTP status of the response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The `detail` message (or its fallback).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All fields of the error body.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// The problem type URL (`type` in the body).
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    pub fn instance(&self) -> Option<&str> {
        self.fields.get("instance").and_then(Value::as_str)
    }

    /// Per-field validation problems, present on 400 responses.
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.fields
            .get("errors")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}
