//! `reqwest`-backed transport.

use std::collections::HashMap;
use std::time::Duration;

use assetlink_shared::{AppConfig, AssetLinkError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::{CatalogTransport, JSON_CONTENT_TYPE, Method, TransportResponse};

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("assetlink/", env!("CARGO_PKG_VERSION"));

/// HTTP transport against a catalog REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    /// Always ends with `/` so relative paths append instead of replacing the last segment.
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            AssetLinkError::config(format!("invalid base URL {base_url:?}: {e}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AssetLinkError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials: None,
        })
    }

    /// Build from the `[connection]` section; `password` comes from
    /// [`assetlink_shared::resolve_password`].
    pub fn from_config(config: &AppConfig, password: Option<String>) -> Result<Self> {
        let conn = &config.connection;
        let transport = Self::new(&conn.base_url, Duration::from_secs(conn.timeout_secs))?;
        Ok(match (&conn.username, password) {
            (Some(user), Some(password)) => transport.with_basic_auth(user, password),
            _ => transport,
        })
    }

    /// Attach HTTP basic auth to every request.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    ///
    /// Client paths (`search`, `assets/{id}`) are relative and land under the
    /// base path. Continuation references the catalog hands back may be
    /// absolute URLs or root-relative (`/ibm/...`); both keep their own path.
    fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            AssetLinkError::validation(format!("invalid request path {path:?}: {e}"))
        })
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        content_type: Option<&str>,
    ) -> Result<TransportResponse> {
        let url = self.resolve(path)?;

        let reqwest_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut req = self.client.request(reqwest_method, url.clone());
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                AssetLinkError::validation(format!("unserializable request body: {e}"))
            })?;
            req = req
                .header(CONTENT_TYPE, content_type.unwrap_or(JSON_CONTENT_TYPE))
                .body(bytes);
        }
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password));
        }

        let response = req
            .send()
            .await
            .map_err(|e| AssetLinkError::Transport(format!("{method} {url}: {e}")))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let text = response.text().await.map_err(|e| {
            AssetLinkError::Transport(format!("{method} {url}: failed to read body: {e}"))
        })?;

        debug!(status, bytes = text.len(), "catalog responded");

        Ok(TransportResponse {
            status,
            headers,
            body: parse_body(&text),
        })
    }
}

/// JSON when possible; plain text is kept as a JSON string, empty as `null`.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
