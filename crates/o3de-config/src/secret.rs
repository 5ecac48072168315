//! Secret vault access.
//!
//! Password settings are never written to a config file. The file holds a
//! `keyring:<account>` reference and the cleartext lives in the OS vault.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ConfigError;

/// Keyring service name shared by all tools.
pub const SERVICE: &str = "o3de";

/// Prefix of a stored vault reference.
pub const REFERENCE_PREFIX: &str = "keyring:";

/// Storage for password values, addressed by account name (`<tool>.<key>`).
pub trait SecretStore: Send + Sync {
    /// # Errors
    /// Returns an error if the vault cannot be queried.
    fn get(&self, account: &str) -> Result<Option<String>, ConfigError>;

    /// # Errors
    /// Returns an error if the vault rejects the write.
    fn set(&self, account: &str, secret: &str) -> Result<(), ConfigError>;

    /// Remove a secret. Removing a missing secret is not an error.
    ///
    /// # Errors
    /// Returns an error if the vault rejects the delete.
    fn delete(&self, account: &str) -> Result<(), ConfigError>;
}

/// The host OS credential store.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

fn vault_error(account: &str, err: &keyring::Error) -> ConfigError {
    ConfigError::SecretVault {
        key: account.to_owned(),
        message: err.to_string(),
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, account: &str) -> Result<Option<String>, ConfigError> {
        let entry = keyring::Entry::new(SERVICE, account).map_err(|e| vault_error(account, &e))?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(vault_error(account, &e)),
        }
    }

    fn set(&self, account: &str, secret: &str) -> Result<(), ConfigError> {
        let entry = keyring::Entry::new(SERVICE, account).map_err(|e| vault_error(account, &e))?;
        entry
            .set_password(secret)
            .map_err(|e| vault_error(account, &e))
    }

    fn delete(&self, account: &str) -> Result<(), ConfigError> {
        let entry = keyring::Entry::new(SERVICE, account).map_err(|e| vault_error(account, &e))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(vault_error(account, &e)),
        }
    }
}

/// Process-local vault for tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still usable; the writer never leaves it half-updated.
        self.secrets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, account: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.lock().get(account).cloned())
    }

    fn set(&self, account: &str, secret: &str) -> Result<(), ConfigError> {
        self.lock().insert(account.to_owned(), secret.to_owned());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<(), ConfigError> {
        self.lock().remove(account);
        Ok(())
    }
}

/// Account name for a tool's settings key.
pub fn account_name(tool: &str, key: &str) -> String {
    format!("{tool}.{key}")
}

/// The reference string written to the config file in place of a secret.
pub fn reference(tool: &str, key: &str) -> String {
    format!("{REFERENCE_PREFIX}{}", account_name(tool, key))
}
