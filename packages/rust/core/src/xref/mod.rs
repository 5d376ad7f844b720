//! Cross-environment reference resolution.
//!
//! RIDs do not survive a move between catalog deployments, but types, names,
//! and containment usually do. Given an asset described in one environment,
//! [`build_rid_query`] rebuilds a search that finds the same asset by its
//! context in another, and [`CatalogClient::resolve_rid`] runs it.

pub mod rules;

use tracing::{debug, instrument, warn};

use assetlink_shared::{
    Asset, AssetLinkError, Condition, ContextEntry, Replacements, Result, SearchQuery,
};

use crate::client::CatalogClient;

pub use rules::{PropertyRule, property_name, rule_for};

/// Page size for resolution queries: two is enough to tell one match from many.
pub const RESOLUTION_PAGE_SIZE: u32 = 2;

const PATH_SEPARATOR: char = '/';

/// Build the search that locates `item` by type, name, and context.
///
/// Ancestors are walked from the nearest one out to the root. Each
/// filterable ancestor adds `<path>.name = <value>`, where `<path>` chains
/// the property names seen so far and `<value>` is taken from
/// `replacements` when its type has an entry there. Folder segments are
/// gathered into a single `<anchor>.path` condition instead; for file-related
/// targets the anchor is the path reached just before the host qualifier.
pub fn build_rid_query(item: &Asset, replacements: &Replacements) -> SearchQuery {
    let file_related = rules::is_file_related(&item.asset_type);

    let mut query = SearchQuery::for_type(&item.asset_type)
        .with_condition(Condition::eq("name", &item.name))
        .with_page_size(RESOLUTION_PAGE_SIZE);

    let mut property_path = String::new();
    let mut folder_path = String::new();
    let mut folder_anchor: Option<String> = None;

    for ancestor in item.context.iter().rev() {
        if ancestor.asset_type == rules::FOLDER_TYPE {
            folder_path = prepend_segment(&ancestor.name, &folder_path);
            continue;
        }

        if file_related
            && folder_anchor.is_none()
            && rules::is_host_qualifier(&ancestor.asset_type)
        {
            folder_anchor = Some(property_path.clone());
        }

        let Some(property) = property_name(&ancestor.asset_type, file_related) else {
            continue;
        };
        let value = replacements
            .get(&ancestor.asset_type)
            .unwrap_or(&ancestor.name);

        if !property_path.is_empty() {
            property_path.push('.');
        }
        property_path.push_str(&property);
        query.push_condition(Condition::eq(format!("{property_path}.name"), value.as_str()));
    }

    if !folder_path.is_empty() {
        let anchor = folder_anchor.unwrap_or(property_path);
        let property = if anchor.is_empty() {
            "path".to_string()
        } else {
            format!("{anchor}.path")
        };
        query.push_condition(Condition::eq(property, trim_folder_path(&folder_path)));
    }

    query
}

/// `/name` + `rest`, with a trailing separator on the first segment.
fn prepend_segment(name: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("{PATH_SEPARATOR}{name}{PATH_SEPARATOR}")
    } else {
        format!("{PATH_SEPARATOR}{name}{rest}")
    }
}

/// Strip exactly one leading and one trailing separator.
fn trim_folder_path(path: &str) -> &str {
    let path = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
    path.strip_suffix(PATH_SEPARATOR).unwrap_or(path)
}

impl CatalogClient {
    /// RID of the asset matching `item` in this catalog.
    ///
    /// Zero matches is [`AssetLinkError::NotFound`] carrying the query. More
    /// than one match logs a warning and returns the first result's RID.
    #[instrument(skip_all, fields(asset_type = %item.asset_type, name = %item.name))]
    pub async fn resolve_rid(&self, item: &Asset, replacements: &Replacements) -> Result<String> {
        let query = build_rid_query(item, replacements);
        let what = format!("RID for {} '{}'", item.asset_type, item.name);
        let found = self.first_match(&query, &what).await?;
        debug!(rid = %found.id, "resolved RID");
        Ok(found.id)
    }

    /// Containment context of the asset with RID `id`.
    #[instrument(skip(self))]
    pub async fn context_for_id(&self, id: &str, asset_type: &str) -> Result<Vec<ContextEntry>> {
        let query = SearchQuery::for_type(asset_type)
            .with_condition(Condition::eq("_id", id))
            .with_page_size(RESOLUTION_PAGE_SIZE);
        let what = format!("context of {asset_type} {id}");
        let found = self.first_match(&query, &what).await?;
        Ok(found.context)
    }

    /// First result of `query`; none is an error, several is a warning.
    async fn first_match(&self, query: &SearchQuery, what: &str) -> Result<Asset> {
        let page = self.search(query).await?;
        let returned = page.items.len();

        let Some(first) = page.items.into_iter().next() else {
            return Err(AssetLinkError::not_found(what, query.to_json_string()));
        };

        if returned > 1 {
            warn!(
                %what,
                matches = page.paging.num_total.unwrap_or(returned as u64),
                chosen = %first.id,
                "ambiguous match, using first result"
            );
        }

        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedTransport, WarningCounter, client_for, item, page};

    fn conditions(query: &SearchQuery) -> Vec<(&str, &str)> {
        query
            .conditions()
            .iter()
            .map(|c| (c.property.as_str(), c.value.as_str().unwrap_or_default()))
            .collect()
    }

    fn column() -> Asset {
        Asset::new("col1", "database_column", "CUSTOMER_ID").with_context(vec![
            ContextEntry::new("host", "DEVHOST"),
            ContextEntry::new("database", "SALES"),
            ContextEntry::new("database_schema", "DBO"),
            ContextEntry::new("database_table", "CUSTOMERS"),
        ])
    }

    fn file_field() -> Asset {
        Asset::new("fld1", "data_file_field", "amount").with_context(vec![
            ContextEntry::new("host_(engine)", "ETLDEV"),
            ContextEntry::new("data_file_folder", "a"),
            ContextEntry::new("data_file_folder", "b"),
            ContextEntry::new("data_file", "orders.csv"),
            ContextEntry::new("data_file_record", "orders"),
        ])
    }

    #[test]
    fn database_column_query_chains_properties() {
        let query = build_rid_query(&column(), &Replacements::new());

        assert_eq!(query.types, ["database_column"]);
        assert_eq!(query.page_size, Some(RESOLUTION_PAGE_SIZE));
        assert_eq!(
            conditions(&query),
            [
                ("name", "CUSTOMER_ID"),
                ("database_table.name", "CUSTOMERS"),
                ("database_table.database_schema.name", "DBO"),
                ("database_table.database_schema.database.name", "SALES"),
                ("database_table.database_schema.database.host.name", "DEVHOST"),
            ]
        );
    }

    #[test]
    fn replacement_changes_value_not_property() {
        let replacements = Replacements::from([("host".to_string(), "PRODHOST".to_string())]);
        let query = build_rid_query(&column(), &replacements);

        let last = query.conditions().last().unwrap();
        assert_eq!(last.property, "database_table.database_schema.database.host.name");
        assert_eq!(last.value, json!("PRODHOST"));
    }

    #[test]
    fn file_field_anchors_folder_path_before_host() {
        let query = build_rid_query(&file_field(), &Replacements::new());

        assert_eq!(
            conditions(&query),
            [
                ("name", "amount"),
                ("data_file_record.name", "orders"),
                ("data_file_record.data_file.name", "orders.csv"),
                ("data_file_record.data_file.host.name", "ETLDEV"),
                ("data_file_record.data_file.path", "a/b"),
            ]
        );
    }

    #[test]
    fn data_file_folder_filter_has_no_prefix() {
        let file = Asset::new("f1", "data_file", "orders.csv").with_context(vec![
            ContextEntry::new("host_(engine)", "ETLDEV"),
            ContextEntry::new("data_file_folder", "landing"),
        ]);
        let query = build_rid_query(&file, &Replacements::new());

        assert_eq!(
            conditions(&query),
            [("name", "orders.csv"), ("host.name", "ETLDEV"), ("path", "landing")]
        );
    }

    #[test]
    fn folder_path_trims_one_separator_each_side() {
        let mut path = String::new();
        path = prepend_segment("b", &path);
        path = prepend_segment("a", &path);
        assert_eq!(path, "/a/b/");
        assert_eq!(trim_folder_path(&path), "a/b");
        assert_eq!(trim_folder_path("//x//"), "/x/");
    }

    #[test]
    fn category_ancestors_use_parent_property() {
        let term = Asset::new("t1", "term", "Customer").with_context(vec![
            ContextEntry::new("category", "Enterprise"),
            ContextEntry::new("category", "Party"),
        ]);
        let query = build_rid_query(&term, &Replacements::new());

        assert_eq!(
            conditions(&query),
            [
                ("name", "Customer"),
                ("parent_category.name", "Party"),
                ("parent_category.parent_category.name", "Enterprise"),
            ]
        );
        assert!(query.conditions().iter().all(|c| c.property != "category.name"));
    }

    #[test]
    fn dropped_ancestors_add_no_condition() {
        let report = Asset::new("r1", "bi_report", "Revenue").with_context(vec![
            ContextEntry::new("bi_server", "cognos01"),
            ContextEntry::new("bi_folder", "Finance"),
            ContextEntry::new("bi_collection", "Monthly"),
        ]);
        let query = build_rid_query(&report, &Replacements::new());

        assert_eq!(
            conditions(&query),
            [("name", "Revenue"), ("bi_collection.name", "Monthly")]
        );
    }

    #[test]
    fn extension_ancestors_strip_namespace() {
        let step = Asset::new("s1", "$Acme-Step", "load").with_context(vec![
            ContextEntry::new("$Acme-Pipeline", "nightly"),
        ]);
        let query = build_rid_query(&step, &Replacements::new());
        assert_eq!(conditions(&query), [("name", "load"), ("Pipeline.name", "nightly")]);
    }

    #[tokio::test]
    async fn resolve_rid_single_match() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            page(vec![item("prod-1", "database_column", "CUSTOMER_ID")], None),
        ));
        let client = client_for(&transport);

        let rid = client.resolve_rid(&column(), &Replacements::new()).await.unwrap();
        assert_eq!(rid, "prod-1");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "search");
        assert_eq!(requests[0].body.as_ref().unwrap()["pageSize"], 2);
    }

    #[tokio::test]
    async fn resolve_rid_ambiguous_takes_first_and_warns() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            page(
                vec![
                    item("first-rid", "database_column", "CUSTOMER_ID"),
                    item("second-rid", "database_column", "CUSTOMER_ID"),
                ],
                Some("search?begin=2"),
            ),
        ));
        let client = client_for(&transport);
        let warnings = WarningCounter::default();
        let _guard = warnings.install();

        let rid = client.resolve_rid(&column(), &Replacements::new()).await.unwrap();
        assert_eq!(rid, "first-rid");
        assert!(warnings.count() >= 1);
        // No further page is fetched to settle the ambiguity.
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn resolve_rid_rejects_match_without_id() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            page(
                vec![json!({ "_type": "database_column", "_name": "CUSTOMER_ID" })],
                None,
            ),
        ));
        let client = client_for(&transport);

        let err = client
            .resolve_rid(&column(), &Replacements::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssetLinkError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn resolve_rid_not_found_reports_query() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, page(vec![], None)));
        let client = client_for(&transport);

        let err = client.resolve_rid(&column(), &Replacements::new()).await.unwrap_err();
        match err {
            AssetLinkError::NotFound { what, query } => {
                assert!(what.contains("CUSTOMER_ID"));
                assert!(query.contains("database_table.database_schema.name"));
                assert!(query.contains("\"pageSize\":2"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn context_for_id_returns_context() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            page(
                vec![json!({
                    "_id": "t1",
                    "_type": "database_table",
                    "_name": "CUSTOMERS",
                    "_context": [
                        { "_id": "h1", "_type": "host", "_name": "DBHOST" },
                        { "_id": "d1", "_type": "database", "_name": "SALES" }
                    ]
                })],
                None,
            ),
        ));
        let client = client_for(&transport);

        let context = client.context_for_id("t1", "database_table").await.unwrap();
        assert_eq!(context.len(), 2);
        assert_eq!(context[1].name, "SALES");

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["types"], json!(["database_table"]));
        assert_eq!(
            body["where"]["conditions"][0],
            json!({ "property": "_id", "operator": "=", "value": "t1" })
        );
    }

    #[tokio::test]
    async fn context_for_id_ambiguous_takes_first() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            page(
                vec![
                    json!({
                        "_id": "x", "_type": "term", "_name": "A",
                        "_context": [{ "_type": "category", "_name": "One" }]
                    }),
                    json!({
                        "_id": "x", "_type": "term", "_name": "A",
                        "_context": [{ "_type": "category", "_name": "Two" }]
                    }),
                ],
                None,
            ),
        ));
        let client = client_for(&transport);
        let warnings = WarningCounter::default();
        let _guard = warnings.install();

        let context = client.context_for_id("x", "term").await.unwrap();
        assert_eq!(context[0].name, "One");
        assert!(warnings.count() >= 1);
    }

    #[tokio::test]
    async fn context_for_id_not_found() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, page(vec![], None)));
        let client = client_for(&transport);

        let err = client.context_for_id("gone", "term").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
