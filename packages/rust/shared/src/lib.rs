//! Shared types, error model, and configuration for assetlink.
//!
//! This crate is the foundation depended on by all other assetlink crates.
//! It provides:
//! - [`AssetLinkError`]: the unified error type
//! - Catalog wire types ([`Asset`], [`ContextEntry`], [`PagedResultSet`], [`SearchQuery`])
//! - Identity types ([`Identity`], [`ContainerIdentityCache`])
//! - Configuration ([`AppConfig`], [`ClientOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClientOptions, ConnectionConfig, DefaultsConfig, default_config_path, init_config,
    load_config, resolve_password,
};
pub use error::{AssetLinkError, Result};
pub use types::{
    Asset, Condition, ContainerIdentityCache, ContextEntry, Identity, PagedResultSet, Paging,
    Replacements, SearchQuery, WhereClause,
};
