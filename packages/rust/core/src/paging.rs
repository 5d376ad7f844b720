//! Search and multi-page aggregation.
//!
//! The catalog returns at most one page per request and hands out a
//! continuation reference in `paging.next`. Pages are fetched strictly in
//! sequence because each reference comes from the previous response.

use tracing::{debug, instrument};

use assetlink_shared::{Asset, PagedResultSet, Paging, Result, SearchQuery};
use assetlink_transport::Method;

use crate::client::{CatalogClient, STATUS_OK, decode};

impl CatalogClient {
    /// Run a search and return its first page.
    #[instrument(skip_all, fields(types = ?query.types))]
    pub async fn search(&self, query: &SearchQuery) -> Result<PagedResultSet> {
        let body = serde_json::to_value(query).map_err(|e| {
            assetlink_shared::AssetLinkError::validation(format!("unserializable query: {e}"))
        })?;
        let response = self
            .execute(Method::Post, "search", Some(&body), STATUS_OK)
            .await?;
        decode(response.body, "search")
    }

    /// Run a search and follow continuation references to the end.
    pub async fn search_all(&self, query: &SearchQuery) -> Result<Vec<Asset>> {
        let first = self.search(query).await?;
        self.all_pages(first.items, first.paging).await
    }

    /// Fetch the page `paging` points to.
    ///
    /// A terminal `paging` yields an empty terminal page without touching
    /// the network.
    pub async fn next_page(&self, paging: &Paging) -> Result<PagedResultSet> {
        let Some(next) = paging.next.as_deref() else {
            return Ok(PagedResultSet::terminal());
        };

        let response = self.execute(Method::Get, next, None, STATUS_OK).await?;
        decode(response.body, "page")
    }

    /// Append every remaining page to `items`, in server order.
    ///
    /// Stops at the first page with no items. Any failure discards what was
    /// accumulated so far.
    pub async fn all_pages(&self, mut items: Vec<Asset>, mut paging: Paging) -> Result<Vec<Asset>> {
        loop {
            let page = self.next_page(&paging).await?;
            if page.items.is_empty() {
                debug!(total = items.len(), "pagination complete");
                return Ok(items);
            }
            items.extend(page.items);
            paging = page.paging;
        }
    }
}
