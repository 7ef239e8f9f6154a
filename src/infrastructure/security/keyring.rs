use crate::domain::error::{AppError, Result};
use keyring::Entry;
use tracing::info;

/// Named secrets for one keychain service.
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, name: &str) -> Result<Entry> {
        Entry::new(&self.service, name).map_err(|e| {
            AppError::SecurityError(format!("Failed to open keychain entry '{}': {}", name, e))
        })
    }

    pub fn set_secret(&self, name: &str, secret: &str) -> Result<()> {
        self.entry(name)?.set_password(secret).map_err(|e| {
            AppError::SecurityError(format!("Failed to store secret '{}': {}", name, e))
        })?;
        info!(service = %self.service, name, "Stored secret in keychain");
        Ok(())
    }

    pub fn get_secret(&self, name: &str) -> Result<String> {
        self.entry(name)?.get_password().map_err(|e| {
            AppError::SecurityError(format!("Failed to read secret '{}': {}", name, e))
        })
    }

    /// Deleting a secret that was never stored is not an error.
    pub fn delete_secret(&self, name: &str) -> Result<()> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::SecurityError(format!(
                "Failed to delete secret '{}': {}",
                name, e
            ))),
        }
    }
}
