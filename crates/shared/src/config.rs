//! Application configuration management.
//!
//! Sources are layered: `config/default`, then `config/{RUN_MODE}`, then
//! `COMPTA__SECTION__KEY` environment variables.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Attachment storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Bookkeeping behaviour switches.
    #[serde(default)]
    pub accounting: AccountingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Attachment storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend name: `fs`, `s3` or `azblob`.
    #[serde(default = "default_storage_provider")]
    pub provider: String,
    /// Root path (fs) or key prefix (object stores).
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Bucket or container name for object stores.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Custom endpoint for S3-compatible or Azure storage.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region for S3.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key id or account name.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Secret key or account key.
    #[serde(default)]
    pub secret_key: Option<String>,
}

fn default_storage_provider() -> String {
    "fs".to_string()
}

fn default_storage_root() -> String {
    "./data/files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_storage_provider(),
            root: default_storage_root(),
            bucket: None,
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
        }
    }
}

/// Bookkeeping behaviour switches.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AccountingConfig {
    /// Copy the analytic project of the first line onto every line of a
    /// simple form, transfers included.
    #[serde(default)]
    pub analytical_set_all: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COMPTA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
