//! Application configuration for assetlink.
//!
//! User config lives at `~/.assetlink/assetlink.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssetLinkError, Result};
use crate::types::Replacements;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "assetlink.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".assetlink";

// ---------------------------------------------------------------------------
// Config structs (matching assetlink.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog endpoint settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Ancestor type → replacement value for cross-environment resolution.
    #[serde(default)]
    pub replacements: Replacements,
}

/// `[connection]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the catalog REST API; relative request paths resolve against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User for HTTP basic auth. No auth header is sent when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Name of the env var holding the password (never store the password itself).
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password_env: default_password_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://localhost:9443/ibm/iis/igc-rest/v1".into()
}
fn default_password_env() -> String {
    "ASSETLINK_PASSWORD".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Page size for paginated reads.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Separator used by identity strings.
    #[serde(default = "default_identity_delimiter")]
    pub identity_delimiter: String,

    /// How many ancestors, nearest first, are scanned for a file root.
    #[serde(default = "default_file_lookup_depth")]
    pub file_lookup_depth: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            identity_delimiter: default_identity_delimiter(),
            file_lookup_depth: default_file_lookup_depth(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}
fn default_identity_delimiter() -> String {
    "::".into()
}
fn default_file_lookup_depth() -> usize {
    3
}

// ---------------------------------------------------------------------------
// Client options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime options for a catalog client, taken from the config file.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Page size for paginated relationship reads and scope queries.
    pub page_size: u32,
    /// Separator for identity strings.
    pub identity_delimiter: String,
    /// Ancestors scanned for a file root when deriving container identities.
    pub file_lookup_depth: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ClientOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_size: config.defaults.page_size,
            identity_delimiter: config.defaults.identity_delimiter.clone(),
            file_lookup_depth: config.defaults.file_lookup_depth,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// `~/.assetlink/assetlink.toml`, used when no `--config` path is given.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AssetLinkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the config from `path`, or from the default location.
///
/// A missing file at the default location yields defaults; a missing file
/// at an explicit `path` is an error. The base URL must parse either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => {
            let path = default_config_path()?;
            if path.exists() {
                read_config(&path)?
            } else {
                tracing::debug!(?path, "config file not found, using defaults");
                AppConfig::default()
            }
        }
    };

    url::Url::parse(&config.connection.base_url).map_err(|e| {
        AssetLinkError::config(format!(
            "invalid base_url {:?}: {e}",
            config.connection.base_url
        ))
    })?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AssetLinkError::io(path, e))?;
    toml::from_str(&content)
        .map_err(|e| AssetLinkError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config to `path` (or the default location) and return
/// where it went. An existing file is only replaced when `force` is set.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    if path.exists() && !force {
        return Err(AssetLinkError::config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| AssetLinkError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| AssetLinkError::config(e.to_string()))?;
    std::fs::write(&path, content).map_err(|e| AssetLinkError::io(&path, e))?;
    tracing::info!(?path, "wrote default config");

    Ok(path)
}

/// Read the catalog password from the configured env var.
///
/// Returns `None` when no username is configured (anonymous access). A
/// configured username with a missing or empty password is an error.
pub fn resolve_password(config: &AppConfig) -> Result<Option<String>> {
    if config.connection.username.is_none() {
        return Ok(None);
    }

    let var_name = &config.connection.password_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(AssetLinkError::config(format!(
            "catalog password not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("assetlink-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn init_writes_defaults_that_load_back() {
        let path = scratch_path("init/assetlink.toml");
        let _ = std::fs::remove_file(&path);

        let written = init_config(Some(&path), false).expect("init");
        assert_eq!(written, path);

        let config = load_config(Some(&path)).expect("load");
        assert_eq!(config.defaults.page_size, 100);
        assert_eq!(config.defaults.identity_delimiter, "::");
        assert_eq!(config.connection.password_env, "ASSETLINK_PASSWORD");
        assert!(config.replacements.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn init_keeps_existing_file_unless_forced() {
        let path = scratch_path("existing.toml");
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, "[defaults]\npage_size = 7\n").expect("write");

        let err = init_config(Some(&path), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(load_config(Some(&path)).unwrap().defaults.page_size, 7);

        init_config(Some(&path), true).expect("forced init");
        assert_eq!(load_config(Some(&path)).unwrap().defaults.page_size, 100);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config(Some(&scratch_path("does-not-exist.toml"))).unwrap_err();
        assert!(matches!(err, AssetLinkError::Io { .. }));
    }

    #[test]
    fn config_with_replacements() {
        let toml_str = r#"
[connection]
base_url = "https://catalog.prod.example.com/ibm/iis/igc-rest/v1"
username = "isadmin"

[replacements]
host = "PRODDB01"
"host_(engine)" = "PRODENGINE"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.replacements.len(), 2);
        assert_eq!(config.replacements["host"], "PRODDB01");
        assert_eq!(config.connection.username.as_deref(), Some("isadmin"));
        assert_eq!(config.connection.timeout_secs, 30);
    }

    #[test]
    fn client_options_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.page_size = 25;
        let options = ClientOptions::from(&app);
        assert_eq!(options.page_size, 25);
        assert_eq!(options.file_lookup_depth, 3);
    }

    #[test]
    fn load_rejects_invalid_base_url() {
        let path = scratch_path("invalid-base-url.toml");
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, "[connection]\nbase_url = \"not a url\"\n").expect("write");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("invalid base_url"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn anonymous_config_needs_no_password() {
        let config = AppConfig::default();
        assert_eq!(resolve_password(&config).expect("resolve"), None);
    }

    #[test]
    fn missing_password_is_reported() {
        let mut config = AppConfig::default();
        config.connection.username = Some("isadmin".into());
        // Use a unique env var name to avoid interfering with other tests
        config.connection.password_env = "AL_TEST_NONEXISTENT_PASSWORD_12345".into();
        let err = resolve_password(&config).unwrap_err();
        assert!(err.to_string().contains("password not found"));
    }
}
