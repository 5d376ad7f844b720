//! The catalog client handle and its pass-through CRUD operations.
//!
//! [`CatalogClient`] is the explicit connection object every operation runs
//! through. It owns nothing but a transport handle and runtime options, so it
//! is cheap to clone and safe to share across tasks.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

use assetlink_shared::{Asset, AssetLinkError, ClientOptions, Result, SearchQuery};
use assetlink_transport::{CatalogTransport, Method, TransportResponse};

/// Status the catalog returns for reads and updates.
pub const STATUS_OK: u16 = 200;
/// Status the catalog returns when an asset is created.
pub const STATUS_CREATED: u16 = 201;
/// Status the catalog returns for accepted asynchronous operations.
pub const STATUS_ACCEPTED: u16 = 202;

/// Handle to one catalog deployment.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn CatalogTransport>,
    options: ClientOptions,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn CatalogTransport>, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Issue one request and require `expected` as the response status.
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        expected: u16,
    ) -> Result<TransportResponse> {
        let response = self.transport.request(method, path, body, None).await?;

        if response.status != expected {
            return Err(AssetLinkError::UnexpectedStatus {
                status: response.status,
                expected,
                body: body_text(&response.body),
                request_body: body.map(Value::to_string),
            });
        }

        Ok(response)
    }

    /// Fetch a single asset with its default properties.
    #[instrument(skip(self))]
    pub async fn get_asset(&self, id: &str) -> Result<Asset> {
        let response = self
            .execute(Method::Get, &format!("assets/{id}"), None, STATUS_OK)
            .await?;
        decode(response.body, "asset")
    }

    /// Fetch only the named properties of an asset.
    #[instrument(skip(self))]
    pub async fn get_asset_properties(&self, id: &str, properties: &[&str]) -> Result<Value> {
        let path = format!("assets/{id}?properties={}", properties.join(","));
        let response = self.execute(Method::Get, &path, None, STATUS_OK).await?;
        Ok(response.body)
    }

    /// Create an asset and return the RID taken from the `Location` header.
    #[instrument(skip_all)]
    pub async fn create_asset(&self, body: &Value) -> Result<String> {
        let response = self
            .execute(Method::Post, "assets", Some(body), STATUS_CREATED)
            .await?;

        let location = response.header("location").ok_or_else(|| {
            AssetLinkError::parse("create response carried no Location header")
        })?;
        let id = created_id(location).ok_or_else(|| {
            AssetLinkError::parse(format!("no asset id in Location header {location:?}"))
        })?;

        info!(%id, "asset created");
        Ok(id)
    }

    /// Apply a property update to an asset.
    #[instrument(skip(self, body))]
    pub async fn update_asset(&self, id: &str, body: &Value) -> Result<Value> {
        let response = self
            .execute(Method::Put, &format!("assets/{id}"), Some(body), STATUS_OK)
            .await?;
        Ok(response.body)
    }

    #[instrument(skip(self))]
    pub async fn delete_asset(&self, id: &str) -> Result<()> {
        self.execute(Method::Delete, &format!("assets/{id}"), None, STATUS_OK)
            .await?;
        Ok(())
    }

    /// Update the one asset matched by `query`.
    ///
    /// Fails with an invariant violation, without writing anything, unless
    /// the query matches exactly one asset.
    #[instrument(skip_all, fields(types = ?query.types))]
    pub async fn update_unique(&self, query: &SearchQuery, body: &Value) -> Result<Value> {
        let page = self.search(query).await?;
        let matched = page.paging.num_total.unwrap_or(page.items.len() as u64);

        match page.items.as_slice() {
            [only] if matched <= 1 => {
                debug!(id = %only.id, "updating unique match");
                self.update_asset(&only.id, body).await
            }
            _ => Err(AssetLinkError::invariant(format!(
                "expected exactly one asset to update, found {matched} (query: {})",
                query.to_json_string()
            ))),
        }
    }

    /// Ask the catalog to (re)detect lineage for a job. The catalog processes
    /// this asynchronously and answers 202.
    #[instrument(skip(self))]
    pub async fn detect_lineage(&self, job_id: &str) -> Result<Value> {
        let path = format!("flows/detectFlows/dsjob/{job_id}");
        let response = self
            .execute(Method::Post, &path, None, STATUS_ACCEPTED)
            .await?;
        Ok(response.body)
    }
}

/// Deserialize a response body into `T`.
pub(crate) fn decode<T: DeserializeOwned>(body: Value, what: &str) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| AssetLinkError::parse(format!("malformed {what} response: {e}")))
}

/// Body as diagnostic text: strings verbatim, everything else as JSON.
fn body_text(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Last path segment of a created-resource locator.
fn created_id(location: &str) -> Option<String> {
    let without_query = location.split(['?', '#']).next().unwrap_or(location);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
