//! Catalog wire types and derived identity types.
//!
//! Field names follow the catalog's JSON conventions: system properties are
//! underscore-prefixed (`_id`, `_type`, `_name`, `_context`) and paging
//! metadata is camelCase.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ancestor type → replacement value, applied when resolving assets across
/// environments (e.g. `host → PRODHOST`).
pub type Replacements = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// One ancestor in an asset's containment context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Ancestor RID. Absent in descriptions captured without ids.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ancestor type tag.
    #[serde(rename = "_type")]
    pub asset_type: String,
    /// Ancestor name.
    #[serde(rename = "_name")]
    pub name: String,
}

impl ContextEntry {
    pub fn new(asset_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            asset_type: asset_type.into(),
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A node in the catalog's containment tree, as returned by search and
/// relationship queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// RID, stable within one environment only. Never empty.
    #[serde(rename = "_id", deserialize_with = "non_empty_id")]
    pub id: String,
    /// Type tag (e.g. `database_table`).
    #[serde(rename = "_type")]
    pub asset_type: String,
    /// Display name.
    #[serde(rename = "_name", default)]
    pub name: String,
    /// Ancestors from root to immediate parent.
    #[serde(rename = "_context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextEntry>,
    /// Any other properties the catalog returned for this asset.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Asset {
    pub fn new(
        id: impl Into<String>,
        asset_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            asset_type: asset_type.into(),
            name: name.into(),
            context: Vec::new(),
            properties: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<ContextEntry>) -> Self {
        self.context = context;
        self
    }
}

fn non_empty_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = String::deserialize(deserializer)?;
    if id.is_empty() {
        return Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&id),
            &"a non-empty asset id",
        ));
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// Paging metadata attached to every result set.
///
/// A missing `next` marks the terminal page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    /// Continuation reference for the following page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl Paging {
    /// Whether there is no further page to fetch.
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagedResultSet {
    #[serde(default)]
    pub items: Vec<Asset>,
    #[serde(default)]
    pub paging: Paging,
}

impl PagedResultSet {
    /// An empty page with no continuation.
    pub fn terminal() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Search query
// ---------------------------------------------------------------------------

/// A single filter condition in a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted property path, e.g. `database_schema.database.name`.
    pub property: String,
    /// Comparison operator (`=`, `in`, ...).
    pub operator: String,
    pub value: Value,
}

impl Condition {
    /// `property = value`
    pub fn eq(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator: "=".into(),
            value: Value::String(value.into()),
        }
    }

    /// `property in [values...]`
    pub fn in_list<I, S>(property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property: property.into(),
            operator: "in".into(),
            value: Value::Array(
                values
                    .into_iter()
                    .map(|v| Value::String(v.into()))
                    .collect(),
            ),
        }
    }
}

/// Conjunction (or disjunction) of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub operator: String,
    pub conditions: Vec<Condition>,
}

/// Body of a `POST search` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Properties to return for each item (beyond the system properties).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    /// Asset types to search.
    pub types: Vec<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl SearchQuery {
    /// Search over a single asset type with no conditions.
    pub fn for_type(asset_type: impl Into<String>) -> Self {
        Self {
            types: vec![asset_type.into()],
            ..Self::default()
        }
    }

    /// Add a condition, AND-ed with any existing ones.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.push_condition(condition);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Append a condition to the `and` clause, creating it if needed.
    pub fn push_condition(&mut self, condition: Condition) {
        self.where_clause
            .get_or_insert_with(|| WhereClause {
                operator: "and".into(),
                conditions: Vec::new(),
            })
            .conditions
            .push(condition);
    }

    /// Conditions currently in the where clause.
    pub fn conditions(&self) -> &[Condition] {
        self.where_clause
            .as_ref()
            .map(|w| w.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Compact JSON rendering, used in diagnostics.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Environment-independent description of an asset: ancestor type → name,
/// plus the asset's own `type → name` entry and its RID.
///
/// File-based containers additionally carry a `path` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

impl Identity {
    /// Key under which a file container's directory path is stored.
    pub const PATH_KEY: &'static str = "path";

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the name recorded for `asset_type`.
    pub fn insert(&mut self, asset_type: impl Into<String>, name: impl Into<String>) {
        self.entries.insert(asset_type.into(), name.into());
    }

    pub fn get(&self, asset_type: &str) -> Option<&str> {
        self.entries.get(asset_type).map(String::as_str)
    }

    /// Directory path of a file-based container, if one was looked up.
    pub fn path(&self) -> Option<&str> {
        self.get(Self::PATH_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Container RID → container [`Identity`].
///
/// Owned and kept alive by the caller. Resolvers read entries and add the
/// entries they derive themselves; they never clear or evict. Identities
/// handed out for child assets are always copies, so mutating them leaves the
/// cached container entry untouched.
///
/// Not internally synchronized: share it across concurrent resolutions only
/// behind the caller's own lock.
#[derive(Debug, Clone, Default)]
pub struct ContainerIdentityCache {
    entries: HashMap<String, Identity>,
}

impl ContainerIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, container_id: &str) -> Option<&Identity> {
        self.entries.get(container_id)
    }

    pub fn insert(&mut self, container_id: impl Into<String>, identity: Identity) {
        self.entries.insert(container_id.into(), identity);
    }

    pub fn contains(&self, container_id: &str) -> bool {
        self.entries.contains_key(container_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
