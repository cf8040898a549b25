//! Configuration: optional TOML file plus the command-line run settings.
//!
//! Every section of the file is optional; missing keys fall back to the
//! defaults below, so running without `--config` is the common case.
//!
//! ```toml
//! [store]
//! api_version = "2025-02-19"
//! api_host = "api.sanity.io"
//! timeout_secs = 60
//!
//! [registry]
//! api_version = "2025-02-19"
//! production_host = "api.sanity.io"
//! staging_host = "api.sanity.work"
//!
//! [migration]
//! legacy_asset_type = "mux.videoAsset"
//! field = "asset"
//! sibling_field = "media"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_production_host")]
    pub api_host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            api_host: default_production_host(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_production_host")]
    pub production_host: String,
    #[serde(default = "default_staging_host")]
    pub staging_host: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            production_host: default_production_host(),
            staging_host: default_staging_host(),
        }
    }
}

impl RegistryConfig {
    pub fn host(&self, environment: RegistryEnvironment) -> &str {
        match environment {
            RegistryEnvironment::Production => &self.production_host,
            RegistryEnvironment::Staging => &self.staging_host,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    #[serde(default = "default_legacy_asset_type")]
    pub legacy_asset_type: String,
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default = "default_sibling_field")]
    pub sibling_field: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            legacy_asset_type: default_legacy_asset_type(),
            field: default_field(),
            sibling_field: default_sibling_field(),
        }
    }
}

fn default_api_version() -> String {
    "2025-02-19".to_string()
}
fn default_production_host() -> String {
    "api.sanity.io".to_string()
}
fn default_staging_host() -> String {
    "api.sanity.work".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_legacy_asset_type() -> String {
    "mux.videoAsset".to_string()
}
fn default_field() -> String {
    media_relink_core::plan::ASSET_FIELD.to_string()
}
fn default_sibling_field() -> String {
    media_relink_core::plan::MEDIA_FIELD.to_string()
}

/// Which media-library deployment the registry client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEnvironment {
    Production,
    Staging,
}

/// Settings taken from the command line for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub project_id: String,
    pub token: String,
    pub dataset: String,
    pub dry_run: bool,
    pub environment: RegistryEnvironment,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` when given, otherwise use the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let required = [
        ("store.api_version", &config.store.api_version),
        ("store.api_host", &config.store.api_host),
        ("registry.api_version", &config.registry.api_version),
        ("registry.production_host", &config.registry.production_host),
        ("registry.staging_host", &config.registry.staging_host),
        ("migration.legacy_asset_type", &config.migration.legacy_asset_type),
        ("migration.field", &config.migration.field),
        ("migration.sibling_field", &config.migration.sibling_field),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            anyhow::bail!("{} must not be empty", key);
        }
    }

    if config.store.timeout_secs == 0 {
        anyhow::bail!("store.timeout_secs must be > 0");
    }

    if config.migration.field == config.migration.sibling_field {
        anyhow::bail!(
            "migration.field and migration.sibling_field must differ (both '{}')",
            config.migration.field
        );
    }

    Ok(())
}
