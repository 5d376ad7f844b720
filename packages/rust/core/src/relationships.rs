//! Updates to multi-valued relationships.
//!
//! The catalog can only append to a relationship or replace it wholesale.
//! Removing a selected subset is therefore done client-side: read the whole
//! relationship, find which of its members match the caller's scope, and
//! write back everything else with replace semantics.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use assetlink_shared::{Asset, Condition, PagedResultSet, Result, SearchQuery};
use assetlink_transport::Method;

use crate::client::{CatalogClient, STATUS_OK, decode};

/// How an update payload combines with the existing relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Append,
    Replace,
}

/// Change to apply to a relationship property.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipChange {
    /// Add these RIDs to the existing members.
    Append(Vec<String>),
    /// Make these RIDs the only members.
    ReplaceAll(Vec<String>),
    /// Remove the existing members of `replace_type` that match all
    /// `conditions`; keep everything else. Adds nothing.
    ReplaceSome {
        replace_type: String,
        conditions: Vec<Condition>,
    },
}

/// Bookkeeping of a REPLACE_SOME computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipDelta {
    /// Every current member, in catalog order.
    pub full: Vec<String>,
    /// Members of the replace type.
    pub candidates: Vec<String>,
    /// Candidates that matched the caller's conditions.
    pub dropped: Vec<String>,
    /// `full` minus `dropped`, order preserved.
    pub retained: Vec<String>,
}

impl RelationshipDelta {
    /// Split the current members and note which of them are replace candidates.
    pub fn from_members(members: &[Asset], replace_type: &str) -> Self {
        Self {
            full: members.iter().map(|m| m.id.clone()).collect(),
            candidates: members
                .iter()
                .filter(|m| m.asset_type == replace_type)
                .map(|m| m.id.clone())
                .collect(),
            ..Self::default()
        }
    }

    /// Record the members to drop and compute what remains.
    pub fn drop_matched(mut self, dropped: Vec<String>) -> Self {
        let drop_set: HashSet<&str> = dropped.iter().map(String::as_str).collect();
        self.retained = self
            .full
            .iter()
            .filter(|id| !drop_set.contains(id.as_str()))
            .cloned()
            .collect();
        self.dropped = dropped;
        self
    }
}

/// Outcome of a relationship update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub asset_id: String,
    pub mode: UpdateMode,
    /// RIDs sent in the update payload.
    pub items: Vec<String>,
    /// Catalog response body.
    pub response: Value,
    /// Present for REPLACE_SOME.
    pub delta: Option<RelationshipDelta>,
}

/// `{ <property>: { items, mode } }`
pub fn relationship_payload(property: &str, items: &[String], mode: UpdateMode) -> Value {
    let mut body = Map::new();
    body.insert(property.to_string(), json!({ "items": items, "mode": mode }));
    Value::Object(body)
}

impl CatalogClient {
    /// Every current member of `property` on `asset_id`, across all pages.
    #[instrument(skip(self))]
    pub async fn relationship_members(
        &self,
        asset_id: &str,
        property: &str,
        page_size: u32,
    ) -> Result<Vec<Asset>> {
        let path = format!("assets/{asset_id}/{property}?pageSize={page_size}");
        let response = self.execute(Method::Get, &path, None, STATUS_OK).await?;
        let first: PagedResultSet = decode(response.body, "relationship")?;
        self.all_pages(first.items, first.paging).await
    }

    /// Apply `change` to relationship `property` of asset `from_id`.
    ///
    /// Append and replace-all are one write. Replace-some reads the current
    /// members and the matching scope (paging with `page_size`, or the
    /// configured default) before a single replace write; if any read fails,
    /// nothing is written.
    #[instrument(skip(self, change), fields(from = %from_id, property = %property))]
    pub async fn add_relationship(
        &self,
        from_id: &str,
        property: &str,
        change: RelationshipChange,
        page_size: Option<u32>,
    ) -> Result<UpdateResult> {
        let page_size = page_size.unwrap_or(self.options().page_size);

        let (mode, items, delta) = match change {
            RelationshipChange::Append(ids) => (UpdateMode::Append, ids, None),
            RelationshipChange::ReplaceAll(ids) => (UpdateMode::Replace, ids, None),
            RelationshipChange::ReplaceSome {
                replace_type,
                conditions,
            } => {
                let delta = self
                    .replace_some_delta(from_id, property, &replace_type, conditions, page_size)
                    .await?;
                (UpdateMode::Replace, delta.retained.clone(), Some(delta))
            }
        };

        let payload = relationship_payload(property, &items, mode);
        let response = self.update_asset(from_id, &payload).await?;

        info!(?mode, items = items.len(), "relationship updated");
        Ok(UpdateResult {
            asset_id: from_id.to_string(),
            mode,
            items,
            response,
            delta,
        })
    }

    async fn replace_some_delta(
        &self,
        from_id: &str,
        property: &str,
        replace_type: &str,
        conditions: Vec<Condition>,
        page_size: u32,
    ) -> Result<RelationshipDelta> {
        let members = self
            .relationship_members(from_id, property, page_size)
            .await?;
        let delta = RelationshipDelta::from_members(&members, replace_type);

        // An empty `in` list cannot match anything.
        if delta.candidates.is_empty() {
            return Ok(delta.drop_matched(Vec::new()));
        }

        let mut scope = SearchQuery::for_type(replace_type).with_page_size(page_size);
        for condition in conditions {
            scope.push_condition(condition);
        }
        scope.push_condition(Condition::in_list("_id", delta.candidates.iter().cloned()));

        let dropped = self
            .search_all(&scope)
            .await?
            .into_iter()
            .map(|asset| asset.id)
            .collect();
        Ok(delta.drop_matched(dropped))
    }
}
