use crate::application_impl::HasherConfig;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub store: Store,
    pub token: Token,
    #[serde(default)]
    pub hasher: Hasher,
    #[serde(default)]
    pub sweeper: Sweeper,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    // Both set: serve TLS. Both unset: plain HTTP.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "mysql"
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub auto_migrate: bool,
}

// The URL may carry credentials.
impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("database_url", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("op_timeout_secs", &self.op_timeout_secs)
            .field("max_connections", &self.max_connections)
            .field("auto_migrate", &self.auto_migrate)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Token {
    pub signing_key: String,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Hasher {
    #[serde(default = "HasherConfig::for_refresh_tokens")]
    pub refresh: HasherConfig,
    #[serde(default = "HasherConfig::for_passwords")]
    pub password: HasherConfig,
}

#[derive(Debug, Deserialize)]
pub struct Sweeper {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher {
            refresh: HasherConfig::for_refresh_tokens(),
            password: HasherConfig::for_passwords(),
        }
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Sweeper {
            enabled: false,
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_op_timeout_secs() -> u64 {
    5
}

fn default_max_connections() -> u32 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    15 * 60
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `SESSIONGATE__TOKEN__SIGNING_KEY`.
pub const ENV_PREFIX: &str = "SESSIONGATE";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
