//! Hierarchical identity of assets, derived from their containment context.
//!
//! An [`Identity`] maps each ancestor type to its name, plus the asset's own
//! type and name. Child assets (columns, fields) share everything but their
//! own entry with their container, so container identities are computed once
//! and kept in a caller-owned [`ContainerIdentityCache`].

use serde_json::Value;
use tracing::{debug, instrument};

use assetlink_shared::{
    Asset, AssetLinkError, ContainerIdentityCache, ContextEntry, Identity, Result,
};

use crate::client::CatalogClient;

/// Default separator for [`item_identity_string`].
pub const DEFAULT_IDENTITY_DELIMITER: &str = "::";

/// Container type → child type.
const CONTAINMENT: &[(&str, &str)] = &[
    ("database_schema", "database_table"),
    ("database_table", "database_column"),
    ("data_file", "data_file_record"),
    ("data_file_record", "data_file_field"),
];

/// Types whose directory path lives only on the asset itself, not in any context.
const FILE_ROOT_TYPES: &[&str] = &["data_file"];

/// Container type that directly owns assets of `child_type`.
pub fn container_type_for(child_type: &str) -> Option<&'static str> {
    CONTAINMENT
        .iter()
        .find(|(_, child)| *child == child_type)
        .map(|(container, _)| *container)
}

/// Child type directly owned by `container_type`.
pub fn child_type_for(container_type: &str) -> Option<&'static str> {
    CONTAINMENT
        .iter()
        .find(|(container, _)| *container == container_type)
        .map(|(_, child)| *child)
}

pub fn is_file_root(asset_type: &str) -> bool {
    FILE_ROOT_TYPES.contains(&asset_type)
}

/// Position and RID of the ancestor that contains `asset`.
fn locate_container(asset: &Asset) -> Result<(usize, &str)> {
    let container_type = container_type_for(&asset.asset_type).ok_or_else(|| {
        AssetLinkError::validation(format!(
            "no container type is registered for {}",
            asset.asset_type
        ))
    })?;

    let position = asset
        .context
        .iter()
        .rposition(|entry| entry.asset_type == container_type)
        .ok_or_else(|| {
            AssetLinkError::validation(format!(
                "{} '{}' has no {container_type} in its context",
                asset.asset_type, asset.name
            ))
        })?;

    let id = asset.context[position].id.as_deref().ok_or_else(|| {
        AssetLinkError::validation(format!(
            "{container_type} ancestor of {} '{}' carries no id",
            asset.asset_type, asset.name
        ))
    })?;

    Ok((position, id))
}

/// Identity of `asset`, built from its container's cached identity.
///
/// The cached entry is copied; the returned identity can be changed freely
/// without affecting `cache`. The container's identity must already be
/// cached (see [`CatalogClient::resolve_asset_identity`] to populate it).
pub fn asset_identity(asset: &Asset, cache: &ContainerIdentityCache) -> Result<Identity> {
    let (_, container_id) = locate_container(asset)?;

    let container = cache.get(container_id).ok_or_else(|| {
        AssetLinkError::invariant(format!(
            "identity of container {container_id} for {} '{}' is not cached",
            asset.asset_type, asset.name
        ))
    })?;

    let mut identity = container.clone();
    identity.insert(&asset.asset_type, &asset.name);
    identity.id = Some(asset.id.clone());
    Ok(identity)
}

/// Human-readable path of ancestor names and the item's name, e.g. `D::S::T`.
///
/// Two items with the same name chain produce the same string regardless of
/// their ids.
pub fn item_identity_string(item: &Asset, delimiter: &str) -> String {
    item.context
        .iter()
        .map(|entry| entry.name.as_str())
        .chain(std::iter::once(item.name.as_str()))
        .collect::<Vec<_>>()
        .join(delimiter)
}

impl CatalogClient {
    /// Identity of a container given its context (root → container inclusive).
    ///
    /// When one of the `max_file_lookup_depth` nearest entries is a file root,
    /// the file's `path` is fetched with one extra request and stored under
    /// [`Identity::PATH_KEY`]. Other contexts cost no request at all. More
    /// than one file root in that window is rejected.
    #[instrument(skip(self, context), fields(depth = context.len()))]
    pub async fn container_identity(
        &self,
        context: &[ContextEntry],
        container_id: &str,
        max_file_lookup_depth: usize,
    ) -> Result<Identity> {
        let window_start = context.len().saturating_sub(max_file_lookup_depth);

        let mut identity = Identity::new();
        identity.id = Some(container_id.to_string());
        let mut file_root: Option<&ContextEntry> = None;

        for (index, entry) in context.iter().enumerate() {
            identity.insert(&entry.asset_type, &entry.name);

            if index >= window_start && is_file_root(&entry.asset_type) {
                if let Some(previous) = file_root {
                    return Err(AssetLinkError::validation(format!(
                        "context of {container_id} has more than one file root ('{}' and '{}')",
                        previous.name, entry.name
                    )));
                }
                file_root = Some(entry);
            }
        }

        let Some(file) = file_root else {
            return Ok(identity);
        };

        let file_id = file.id.as_deref().ok_or_else(|| {
            AssetLinkError::validation(format!("{} '{}' carries no id", file.asset_type, file.name))
        })?;

        let properties = self
            .get_asset_properties(file_id, &[Identity::PATH_KEY])
            .await?;
        let path = properties
            .get(Identity::PATH_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AssetLinkError::not_found(
                    format!("path of {} '{}'", file.asset_type, file.name),
                    format!("assets/{file_id}?properties={}", Identity::PATH_KEY),
                )
            })?;

        debug!(%file_id, %path, "merged file path into container identity");
        identity.insert(Identity::PATH_KEY, path);
        Ok(identity)
    }

    /// Identity of `asset`, deriving and caching its container's identity
    /// first when `cache` does not have it yet.
    pub async fn resolve_asset_identity(
        &self,
        asset: &Asset,
        cache: &mut ContainerIdentityCache,
    ) -> Result<Identity> {
        let (position, container_id) = locate_container(asset)?;

        if !cache.contains(container_id) {
            let container = self
                .container_identity(
                    &asset.context[..=position],
                    container_id,
                    self.options().file_lookup_depth,
                )
                .await?;
            cache.insert(container_id, container);
        }

        asset_identity(asset, cache)
    }

    /// [`item_identity_string`] with the configured delimiter.
    pub fn identity_string(&self, item: &Asset) -> String {
        item_identity_string(item, &self.options().identity_delimiter)
    }
}
