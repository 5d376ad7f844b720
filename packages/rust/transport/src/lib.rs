//! The catalog transport boundary.
//!
//! Everything above this crate talks to the catalog through
//! [`CatalogTransport`]: one request in, one status + headers + parsed body
//! out. Connection handling, TLS, auth headers, and timeouts belong to the
//! implementation ([`HttpTransport`] for real deployments, scripted fakes in
//! tests).

mod http;

use std::collections::HashMap;
use std::fmt;

use assetlink_shared::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpTransport;

/// Content type used for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method of a catalog request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one request/response cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: HashMap<String, String>,
    /// Parsed body: JSON when the catalog sent JSON, a JSON string otherwise,
    /// `null` when empty.
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Executes a single request against the catalog.
///
/// `path` is either relative to the catalog's API root (`search`,
/// `assets/{id}`) or an absolute continuation URL handed out by the catalog
/// in paging metadata. Implementations must not retry; failures surface as
/// [`assetlink_shared::AssetLinkError::Transport`].
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        content_type: Option<&str>,
    ) -> Result<TransportResponse>;
}
