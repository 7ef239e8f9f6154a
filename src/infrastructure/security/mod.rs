pub mod keyring;

use crate::domain::error::{AppError, Result};
use self::keyring::KeyringManager;

pub const KEYRING_SERVICE: &str = "sqlchat";

/// Resolve a secret reference.
///
/// - `env:NAME` reads the environment variable `NAME`
/// - `keychain:NAME` reads entry `NAME` from the OS keychain
/// - `plain:value` returns `value` (development only)
/// - anything else is returned as-is
pub fn resolve_secret(secret_ref: &str) -> Result<String> {
    if let Some(env_key) = secret_ref.strip_prefix("env:") {
        std::env::var(env_key).map_err(|_| {
            AppError::ConfigError(format!(
                "Environment variable '{}' not found for secret",
                env_key
            ))
        })
    } else if let Some(key_name) = secret_ref.strip_prefix("keychain:") {
        KeyringManager::new(KEYRING_SERVICE).get_secret(key_name)
    } else if let Some(plain) = secret_ref.strip_prefix("plain:") {
        Ok(plain.to_string())
    } else {
        Ok(secret_ref.to_string())
    }
}
