//! Catalog client logic for assetlink.
//!
//! This crate holds the parts of talking to the catalog that are more than
//! request plumbing: result-set pagination, hierarchical asset identities,
//! cross-environment RID resolution, and partial replacement of
//! multi-valued relationships. All of it runs through a [`CatalogClient`].

pub mod client;
pub mod identity;
pub mod paging;
pub mod relationships;
pub mod xref;

#[cfg(test)]
pub(crate) mod testing;

pub use client::CatalogClient;
pub use identity::{
    DEFAULT_IDENTITY_DELIMITER, asset_identity, child_type_for, container_type_for,
    item_identity_string,
};
pub use relationships::{RelationshipChange, RelationshipDelta, UpdateMode, UpdateResult};
pub use xref::build_rid_query;
