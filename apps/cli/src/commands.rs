//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::{debug, info};

use assetlink_core::{CatalogClient, RelationshipChange, container_type_for};
use assetlink_shared::{
    AppConfig, Asset, ClientOptions, Condition, ContainerIdentityCache, Replacements, SearchQuery,
    init_config, load_config, resolve_password,
};
use assetlink_transport::HttpTransport;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// assetlink: resolve catalog assets across environments.
#[derive(Parser)]
#[command(
    name = "assetlink",
    version,
    about = "Search a metadata catalog and resolve asset ids across environments.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.assetlink/assetlink.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog base URL, overriding the config file.
    #[arg(long, env = "ASSETLINK_BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// How `relate` changes the relationship.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum RelateMode {
    Append,
    ReplaceAll,
    ReplaceSome,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Search assets of one type, optionally by name.
    Search {
        /// Asset type, e.g. database_table.
        #[arg(short = 't', long = "type")]
        asset_type: String,

        /// Exact asset name.
        #[arg(short, long)]
        name: Option<String>,

        /// Follow every page instead of printing only the first.
        #[arg(long)]
        all: bool,
    },

    /// Print the identity of an asset described in a JSON file.
    Identity {
        /// JSON file with `_id`, `_type`, `_name`, `_context`.
        #[arg(long)]
        item: PathBuf,
    },

    /// Find the id of an asset (captured in another environment) in this catalog.
    ResolveRid {
        /// JSON file with `_id`, `_type`, `_name`, `_context` as captured in
        /// the source environment.
        #[arg(long)]
        item: PathBuf,

        /// Ancestor value substitution, TYPE=VALUE (repeatable; overrides config).
        #[arg(long = "replace", value_parser = parse_key_value)]
        replacements: Vec<(String, String)>,
    },

    /// Print the containment context of an asset.
    Context {
        /// Asset id.
        #[arg(long)]
        id: String,

        /// Asset type.
        #[arg(short = 't', long = "type")]
        asset_type: String,
    },

    /// Update a multi-valued relationship of an asset.
    Relate {
        /// Id of the asset that owns the relationship.
        #[arg(long)]
        from: String,

        /// Relationship property, e.g. assigned_to_terms.
        #[arg(long)]
        property: String,

        #[arg(long, value_enum)]
        mode: RelateMode,

        /// Ids to append or replace with (append, replace-all).
        #[arg(long = "to")]
        to: Vec<String>,

        /// Type of the members to remove (replace-some).
        #[arg(long)]
        replace_type: Option<String>,

        /// PROPERTY=VALUE conditions the removed members must match (replace-some).
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,

        /// Page size for reading the current members.
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults (to --config, or the default location).
    Init {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = ["assetlink_cli", "assetlink_core", "assetlink_transport", "assetlink_shared"]
        .map(|target| format!("{target}={level}"))
        .join(",");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init { force },
    } = cli.command
    {
        return cmd_config_init(cli.config.as_deref(), force).await;
    }

    let config = resolve_config(cli.config.as_deref(), cli.base_url.as_deref())?;

    match cli.command {
        Command::Search {
            asset_type,
            name,
            all,
        } => cmd_search(&config, &asset_type, name.as_deref(), all).await,
        Command::Identity { item } => cmd_identity(&config, &item).await,
        Command::ResolveRid { item, replacements } => {
            cmd_resolve_rid(&config, &item, replacements).await
        }
        Command::Context { id, asset_type } => cmd_context(&config, &id, &asset_type).await,
        Command::Relate {
            from,
            property,
            mode,
            to,
            replace_type,
            conditions,
            page_size,
        } => {
            let change = relationship_change(mode, to, replace_type, conditions)?;
            cmd_relate(&config, &from, &property, change, page_size).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(cli.config.as_deref(), force).await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Config file (explicit path or default location) with CLI overrides applied.
fn resolve_config(path: Option<&Path>, base_url: Option<&str>) -> Result<AppConfig> {
    let mut config = load_config(path)?;
    if let Some(base_url) = base_url {
        config.connection.base_url = base_url.to_string();
    }
    Ok(config)
}

fn build_client(config: &AppConfig) -> Result<CatalogClient> {
    let password = resolve_password(config)?;
    let transport = HttpTransport::from_config(config, password)?;
    debug!(base_url = %transport.base_url(), "catalog transport ready");
    Ok(CatalogClient::new(
        Arc::new(transport),
        ClientOptions::from(config),
    ))
}

fn read_item(path: &Path) -> Result<Asset> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("{} is not an asset description", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn relationship_change(
    mode: RelateMode,
    to: Vec<String>,
    replace_type: Option<String>,
    conditions: Vec<(String, String)>,
) -> Result<RelationshipChange> {
    match mode {
        RelateMode::Append => Ok(RelationshipChange::Append(to)),
        RelateMode::ReplaceAll => Ok(RelationshipChange::ReplaceAll(to)),
        RelateMode::ReplaceSome => {
            let replace_type =
                replace_type.ok_or_else(|| eyre!("--replace-type is required for replace-some"))?;
            if !to.is_empty() {
                return Err(eyre!("replace-some only removes members; --to is not accepted"));
            }
            Ok(RelationshipChange::ReplaceSome {
                replace_type,
                conditions: conditions
                    .into_iter()
                    .map(|(property, value)| Condition::eq(property, value))
                    .collect(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_search(
    config: &AppConfig,
    asset_type: &str,
    name: Option<&str>,
    all: bool,
) -> Result<()> {
    let client = build_client(config)?;

    let mut query = SearchQuery::for_type(asset_type).with_page_size(config.defaults.page_size);
    if let Some(name) = name {
        query.push_condition(Condition::eq("name", name));
    }

    let items = if all {
        client.search_all(&query).await?
    } else {
        client.search(&query).await?.items
    };

    info!(asset_type, count = items.len(), "search complete");
    for item in &items {
        println!("{}\t{}\t{}", item.id, item.asset_type, client.identity_string(item));
    }
    Ok(())
}

async fn cmd_identity(config: &AppConfig, item_path: &Path) -> Result<()> {
    let client = build_client(config)?;
    let item = read_item(item_path)?;

    println!("{}", client.identity_string(&item));

    if container_type_for(&item.asset_type).is_some() {
        let mut cache = ContainerIdentityCache::new();
        let identity = client.resolve_asset_identity(&item, &mut cache).await?;
        print_json(&identity)?;
    }
    Ok(())
}

async fn cmd_resolve_rid(
    config: &AppConfig,
    item_path: &Path,
    overrides: Vec<(String, String)>,
) -> Result<()> {
    let client = build_client(config)?;
    let item = read_item(item_path)?;

    let mut replacements: Replacements = config.replacements.clone();
    replacements.extend(overrides);

    let rid = client.resolve_rid(&item, &replacements).await?;
    println!("{rid}");
    Ok(())
}

async fn cmd_context(config: &AppConfig, id: &str, asset_type: &str) -> Result<()> {
    let client = build_client(config)?;
    let context = client.context_for_id(id, asset_type).await?;
    print_json(&context)
}

async fn cmd_relate(
    config: &AppConfig,
    from: &str,
    property: &str,
    change: RelationshipChange,
    page_size: Option<u32>,
) -> Result<()> {
    let client = build_client(config)?;
    let result = client
        .add_relationship(from, property, change, page_size)
        .await?;

    println!();
    println!("  Relationship updated");
    println!("  Asset:    {}", result.asset_id);
    println!("  Property: {property}");
    println!("  Mode:     {:?}", result.mode);
    println!("  Members:  {}", result.items.len());
    if let Some(delta) = &result.delta {
        println!("  Removed:  {}", delta.dropped.len());
    }
    println!();
    Ok(())
}

async fn cmd_config_init(path: Option<&Path>, force: bool) -> Result<()> {
    let path = init_config(path, force)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("host=PRODDB01").unwrap(),
            ("host".to_string(), "PRODDB01".to_string())
        );
        assert_eq!(
            parse_key_value("parent_category.name=A=B").unwrap(),
            ("parent_category.name".to_string(), "A=B".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn replace_some_requires_type() {
        let err = relationship_change(RelateMode::ReplaceSome, vec![], None, vec![]).unwrap_err();
        assert!(err.to_string().contains("--replace-type"));
    }

    #[test]
    fn replace_some_builds_conditions() {
        let change = relationship_change(
            RelateMode::ReplaceSome,
            vec![],
            Some("term".into()),
            vec![("parent_category.name".into(), "Retired".into())],
        )
        .unwrap();
        assert_eq!(
            change,
            RelationshipChange::ReplaceSome {
                replace_type: "term".into(),
                conditions: vec![Condition::eq("parent_category.name", "Retired")],
            }
        );
    }

    #[test]
    fn cli_parses_relate() {
        let cli = Cli::try_parse_from([
            "assetlink",
            "relate",
            "--from",
            "t1",
            "--property",
            "assigned_to_terms",
            "--mode",
            "append",
            "--to",
            "a",
            "--to",
            "b",
        ])
        .unwrap();
        match cli.command {
            Command::Relate { to, mode, .. } => {
                assert_eq!(to, ["a", "b"]);
                assert!(matches!(mode, RelateMode::Append));
            }
            _ => panic!("expected relate"),
        }
    }

    #[test]
    fn config_init_takes_force_and_global_path() {
        let cli = Cli::try_parse_from([
            "assetlink",
            "--config",
            "/tmp/prod.toml",
            "config",
            "init",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/prod.toml")));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
