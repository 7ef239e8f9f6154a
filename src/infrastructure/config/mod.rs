//! Application configuration.
//!
//! Layers, lowest precedence first: built-in defaults, `sqlchat.toml`, the
//! legacy `DB_*` / `OPENAI_*` variables, then `SQLCHAT_*` variables with `__`
//! as the nesting separator (`SQLCHAT_DATABASE__URL`). A `.env` file is loaded
//! into the environment before extraction.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::security::keyring::KeyringManager;
use crate::infrastructure::security::{resolve_secret, KEYRING_SERVICE};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "sqlchat.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Password or secret reference (`env:`, `keychain:`, `plain:`)
    pub password: Option<String>,
    pub name: Option<String>,
}

impl DatabaseConfig {
    pub const FALLBACK_URL: &'static str = "sqlite://data/sqlchat.db?mode=rwc";

    /// Connection URL: `url` if set, else a MySQL URL built from host/user/name.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().to_string());
        }

        let Some(host) = self.host.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Ok(Self::FALLBACK_URL.to_string());
        };

        let mut url = url::Url::parse(&format!("mysql://{}", host.trim()))
            .map_err(|e| AppError::ConfigError(format!("Invalid database host: {}", e)))?;
        if let Some(port) = self.port {
            url.set_port(Some(port))
                .map_err(|_| AppError::ConfigError("Invalid database port".to_string()))?;
        }
        if let Some(user) = &self.user {
            url.set_username(user)
                .map_err(|_| AppError::ConfigError("Invalid database user".to_string()))?;
        }
        if let Some(password) = &self.password {
            let password = resolve_secret(password)?;
            url.set_password(Some(&password))
                .map_err(|_| AppError::ConfigError("Invalid database password".to_string()))?;
        }
        if let Some(name) = &self.name {
            url.set_path(name);
        }
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub ddl_dir: PathBuf,
    /// Schema text included in every text-to-SQL prompt
    pub schema_file: PathBuf,
    pub examples_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("data/uploads"),
            ddl_dir: PathBuf::from("data/ddl"),
            schema_file: PathBuf::from("data/ddl/schema.sql"),
            examples_file: PathBuf::from("data/queries/examples.sql"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    #[validate(range(min = 1, max = 65535))]
    pub varchar_length: u32,
    /// Fail uploads whose rows do not match the header width
    pub reject_ragged_rows: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            varchar_length: 255,
            reject_ragged_rows: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatConfig {
    /// Only run generated statements that read data
    pub read_only: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { read_only: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub llm: LLMConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub ingest: IngestConfig,
    #[validate(nested)]
    pub chat: ChatConfig,
}

/// Map a variable used by earlier deployments onto its config key.
pub fn legacy_env_key(name: &str) -> Option<&'static str> {
    match name.to_ascii_uppercase().as_str() {
        "DB_HOST" => Some("database.host"),
        "DB_PORT" => Some("database.port"),
        "DB_USER" => Some("database.user"),
        "DB_PASSWORD" => Some("database.password"),
        "DB_NAME" => Some("database.name"),
        "DATABASE_URL" => Some("database.url"),
        "OPENAI_API_KEY" => Some("llm.api_key"),
        "OPENAI_MODEL" => Some("llm.model"),
        _ => None,
    }
}

const LEGACY_ENV_VARS: &[&str] = &[
    "DB_HOST",
    "DB_PORT",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "DATABASE_URL",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
];

impl AppConfig {
    /// Default layering with an optional explicit config file.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let config_file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(
                Env::raw()
                    .only(LEGACY_ENV_VARS)
                    .map(|key| legacy_env_key(key.as_str()).unwrap_or("unknown").into()),
            )
            .merge(Env::prefixed("SQLCHAT_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        if let Some(api_key) = config.llm.api_key.take() {
            config.llm.api_key = Some(resolve_secret(&api_key)?);
        }
        Ok(config)
    }

    /// Load `.env`, then extract and validate the layered configuration.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AppError::ConfigError(format!("Invalid .env file: {}", e))),
        }

        let config = Self::from_figment(Self::figment(config_file))?;
        info!(
            provider = ?config.llm.provider,
            model = %config.llm.model,
            upload_dir = %config.storage.upload_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Stores secrets in the OS keychain for `keychain:` references.
pub struct ConfigService {
    keyring: KeyringManager,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn save_secret(&self, name: &str, secret: &str) -> Result<()> {
        self.keyring.set_secret(name, secret)
    }

    pub fn delete_secret(&self, name: &str) -> Result<()> {
        self.keyring.delete_secret(name)
    }
}
