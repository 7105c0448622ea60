//! A small Rust client for the Mailchimp Marketing API v3.
//!
//! The client turns a path (optionally a `{placeholder}` template), a verb and
//! an optional query or JSON body into an authenticated request, and hands
//! back the decoded JSON object with its `statusCode`.
//!
//! ## Quick start
//! - Pass your API key (`<key>-<datacenter>`, e.g. `0123abcd-us6`) to
//!   [`Client::new`], or set `MAILCHIMP_API_KEY` and call
//!   [`Client::from_env`].
//! - Call one of the verb methods.
//!
//! ```no_run
//! use mailchimp::{Client, RequestOptions};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), mailchimp::Error> {
//! let client = Client::new("0123456789abcdef-us6")?;
//!
//! let lists = client.get("/lists", None).await?;
//! println!("{} audience(s)", lists.get("total_items").unwrap_or(&json!(0)));
//!
//! let member = RequestOptions::new("/lists/{list_id}/members")
//!     .path_param("list_id", "57afe96172");
//! let body = json!({"email_address": "jane@example.com", "status": "subscribed"});
//! let created = client.post(member, body.as_object().cloned()).await?;
//! assert_eq!(created.status_code, 200);
//! # Ok(())
//! # }
//! ```
//!
//! Each verb also has a `*_with_callback` variant for callers that prefer a
//! completion closure over a future.

#![forbid(unsafe_code)]

mod client;
mod config;
mod credential;
mod diagnostics;
mod error;
mod options;
mod response;
mod transport;
mod util;

pub use client::{Client, ClientConfig};
pub use credential::Credential;
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use error::{ApiError, BoxError, Error, FieldError};
pub use options::{Method, RequestDescriptor, RequestOptions};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use util::resolve_path;
