//! Layered settings for the O3DE command-line tools.
//!
//! Each tool owns a static catalogue of [`SettingsDescription`]s and reads
//! them through a [`ConfigStore`]. Password settings live in the OS secret
//! vault; config files only hold a reference to them.

pub mod error;
pub mod file;
pub mod prompt;
pub mod secret;
pub mod settings;
pub mod store;

pub use error::ConfigError;
pub use prompt::{PasswordPrompt, ScriptedPrompt, TerminalPrompt};
pub use secret::{KeyringStore, MemorySecretStore, SecretStore};
pub use settings::{parse_bool, SettingsDescription, Validator};
pub use store::{ConfigStore, Layer, SettingValue, Severity, ValidationIssue};
