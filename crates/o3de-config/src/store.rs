//! Layered settings store.
//!
//! A value is looked up, in order, in the command-line overrides, the
//! project file, the global file, the key's environment fallbacks, and
//! finally the built-in default. Writes go to the project file when a
//! project is attached and to the global file otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::file::SettingsFile;
use crate::prompt::PasswordPrompt;
use crate::secret::{self, KeyringStore, SecretStore};
use crate::settings::{parse_bool, SettingsDescription};

/// Where an effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Override,
    Project,
    Global,
    Environment(&'static str),
    Default,
    Unset,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("command line"),
            Self::Project => f.write_str("project"),
            Self::Global => f.write_str("global"),
            Self::Environment(var) => write!(f, "env {var}"),
            Self::Default => f.write_str("default"),
            Self::Unset => f.write_str("unset"),
        }
    }
}

/// One row of [`ConfigStore::get_all_values`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingValue {
    pub key: &'static str,
    pub description: &'static str,
    /// The effective value. Password values are masked.
    pub value: Option<String>,
    pub layer: Layer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found by [`ConfigStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub key: &'static str,
    pub severity: Severity,
    pub message: String,
}

const MASK: &str = "********";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Settings for one tool (`android`, `export_project`, `tiaf`, ...).
pub struct ConfigStore {
    tool: String,
    catalogue: &'static [SettingsDescription],
    global_path: PathBuf,
    project_path: Option<PathBuf>,
    global: SettingsFile,
    project: SettingsFile,
    overrides: BTreeMap<String, String>,
    secrets: Box<dyn SecretStore>,
    env: EnvLookup,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("tool", &self.tool)
            .field("global_path", &self.global_path)
            .field("project_path", &self.project_path)
            .finish_non_exhaustive()
    }
}

/// Path of a tool's settings file under a `.o3de` directory.
pub fn config_file(o3de_dir: &Path, tool: &str) -> PathBuf {
    o3de_dir.join(format!("{tool}.config"))
}

impl ConfigStore {
    /// Open the store for `tool`.
    ///
    /// `o3de_home` is the user's `.o3de` directory. When `project_root` is
    /// given its `.o3de/<tool>.config` becomes the project layer and the
    /// target of writes.
    ///
    /// # Errors
    /// Returns an error if an existing settings file cannot be read or parsed.
    pub fn open(
        tool: &str,
        catalogue: &'static [SettingsDescription],
        o3de_home: &Path,
        project_root: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let global_path = config_file(o3de_home, tool);
        let project_path = project_root.map(|root| config_file(&root.join(".o3de"), tool));
        let global = SettingsFile::from_path(&global_path)?;
        let project = match &project_path {
            Some(path) => SettingsFile::from_path(path)?,
            None => SettingsFile::default(),
        };
        Ok(Self {
            tool: tool.to_owned(),
            catalogue,
            global_path,
            project_path,
            global,
            project,
            overrides: BTreeMap::new(),
            secrets: Box::new(KeyringStore),
            env: Box::new(|var| std::env::var(var).ok()),
        })
    }

    /// Replace the secret vault.
    #[must_use]
    pub fn with_secret_store(mut self, secrets: Box<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Replace the environment lookup used for fallback variables.
    #[must_use]
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn catalogue(&self) -> &'static [SettingsDescription] {
        self.catalogue
    }

    /// The file writes go to.
    pub fn write_path(&self) -> &Path {
        self.project_path.as_deref().unwrap_or(&self.global_path)
    }

    fn write_layer(&self) -> Layer {
        if self.project_path.is_some() {
            Layer::Project
        } else {
            Layer::Global
        }
    }

    fn description(&self, key: &str) -> Result<&'static SettingsDescription, ConfigError> {
        self.catalogue
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| ConfigError::UnknownKey {
                tool: self.tool.clone(),
                key: key.to_owned(),
            })
    }

    /// Raw lookup without validation. Password keys yield their stored reference.
    fn lookup(&self, desc: &SettingsDescription) -> (Option<String>, Layer) {
        if let Some(v) = self.overrides.get(desc.key) {
            return (Some(v.clone()), Layer::Override);
        }
        if let Some(v) = self.project.settings.get(desc.key) {
            return (Some(v.clone()), Layer::Project);
        }
        if let Some(v) = self.global.settings.get(desc.key) {
            return (Some(v.clone()), Layer::Global);
        }
        for var in desc.env_fallbacks {
            if let Some(v) = (self.env)(var).filter(|v| !v.is_empty()) {
                return (Some(v), Layer::Environment(*var));
            }
        }
        match desc.default {
            Some(v) => (Some(v.to_owned()), Layer::Default),
            None => (None, Layer::Unset),
        }
    }

    /// The effective value of `key`.
    ///
    /// Password keys resolve their vault reference and yield the secret.
    ///
    /// # Errors
    /// Returns `UnknownKey` for keys outside the catalogue and
    /// `InvalidConfigValue` when a stored value no longer passes its validator.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let desc = self.description(key)?;
        let (value, _) = self.lookup(desc);
        let Some(value) = value else {
            return Ok(None);
        };
        if desc.is_password {
            return self.resolve_secret(desc, &value);
        }
        desc.validate(&value)
            .map_err(|reason| ConfigError::InvalidConfigValue {
                key: key.to_owned(),
                value: value.clone(),
                reason,
            })?;
        Ok(Some(value))
    }

    /// As [`get_value`](Self::get_value) with a fallback for unset keys.
    ///
    /// # Errors
    /// Same as [`get_value`](Self::get_value).
    pub fn get_value_or(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self.get_value(key)?.unwrap_or_else(|| default.to_owned()))
    }

    /// The effective boolean value of `key`; unset keys are `false`.
    ///
    /// # Errors
    /// Same as [`get_value`](Self::get_value).
    pub fn get_boolean_value(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get_value(key)? {
            None => Ok(false),
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidConfigValue {
                key: key.to_owned(),
                value,
                reason: "expected true/false, yes/no, or 1/0".to_owned(),
            }),
        }
    }

    /// A `;`-separated list value with empty items dropped.
    ///
    /// # Errors
    /// Same as [`get_value`](Self::get_value).
    pub fn get_list_value(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .get_value(key)?
            .map(|v| {
                v.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn resolve_secret(
        &self,
        desc: &SettingsDescription,
        stored: &str,
    ) -> Result<Option<String>, ConfigError> {
        match stored.strip_prefix(secret::REFERENCE_PREFIX) {
            Some(account) => self.secrets.get(account),
            None => {
                // Values from overrides or the environment are used as-is.
                tracing::debug!(key = desc.key, "password supplied without vault reference");
                Ok(Some(stored.to_owned()))
            }
        }
    }

    /// Write `value` for `key` to the effective layer.
    ///
    /// # Errors
    /// Returns `UnknownKey`, `PasswordKey` for password keys, or
    /// `InvalidConfigValue` when `validate` is set and the value is rejected.
    pub fn set_config_value(
        &mut self,
        key: &str,
        value: &str,
        validate: bool,
    ) -> Result<(), ConfigError> {
        let desc = self.description(key)?;
        if desc.is_password {
            return Err(ConfigError::PasswordKey {
                key: key.to_owned(),
            });
        }
        if validate {
            desc.validate(value)
                .map_err(|reason| ConfigError::InvalidConfigValue {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    reason,
                })?;
        }
        let stored = if desc.is_boolean {
            parse_bool(value).map_or_else(|| value.to_owned(), |b| b.to_string())
        } else {
            value.to_owned()
        };
        self.write_entry(desc.key, Some(stored))?;
        tracing::info!(tool = %self.tool, key, layer = %self.write_layer(), "setting updated");
        Ok(())
    }

    /// Parse `key=value` and store it.
    ///
    /// # Errors
    /// Returns `InvalidExpression` for malformed input, then as
    /// [`set_config_value`](Self::set_config_value).
    pub fn set_config_value_from_expression(&mut self, expression: &str) -> Result<(), ConfigError> {
        let (key, value) = parse_expression(expression)?;
        self.set_config_value(&key, &value, true)
    }

    /// Remove `key` from the effective layer, deleting any vault secret it references.
    ///
    /// # Errors
    /// Returns `UnknownKey`, or an error if the file or vault cannot be updated.
    pub fn clear_value(&mut self, key: &str) -> Result<(), ConfigError> {
        let desc = self.description(key)?;
        if desc.is_password {
            self.secrets
                .delete(&secret::account_name(&self.tool, desc.key))?;
        }
        self.write_entry(desc.key, None)
    }

    /// Prompt twice for a password and store it in the vault.
    ///
    /// # Errors
    /// Returns `EmptyPassword` or `PasswordMismatch`; nothing is stored in either case.
    pub fn set_password(
        &mut self,
        key: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<(), ConfigError> {
        let desc = self.description(key)?;
        if !desc.is_password {
            return Err(ConfigError::InvalidConfigValue {
                key: key.to_owned(),
                value: String::new(),
                reason: "not a password setting; use --set-value".to_owned(),
            });
        }
        let first = prompt.read_password(&format!("Enter {key}"))?;
        if first.is_empty() {
            return Err(ConfigError::EmptyPassword {
                key: key.to_owned(),
            });
        }
        let second = prompt.read_password(&format!("Confirm {key}"))?;
        if first != second {
            return Err(ConfigError::PasswordMismatch {
                key: key.to_owned(),
            });
        }
        let account = secret::account_name(&self.tool, desc.key);
        self.secrets.set(&account, &first)?;
        self.write_entry(desc.key, Some(secret::reference(&self.tool, desc.key)))?;
        tracing::info!(tool = %self.tool, key, "password stored in secret vault");
        Ok(())
    }

    fn write_entry(&mut self, key: &str, value: Option<String>) -> Result<(), ConfigError> {
        let path = self.write_path().to_path_buf();
        let file = if self.project_path.is_some() {
            &mut self.project
        } else {
            &mut self.global
        };
        match value {
            Some(v) => {
                file.settings.insert(key.to_owned(), v);
            }
            None => {
                file.settings.remove(key);
            }
        }
        file.write_to(&path)
    }

    /// Apply in-memory `key=value` overrides. They are never persisted.
    ///
    /// # Errors
    /// Returns an error for malformed expressions, unknown keys, or invalid values.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, expressions: &[S]) -> Result<(), ConfigError> {
        for expression in expressions {
            let (key, value) = parse_expression(expression.as_ref())?;
            let desc = self.description(&key)?;
            desc.validate(&value)
                .map_err(|reason| ConfigError::InvalidConfigValue {
                    key: key.clone(),
                    value: value.clone(),
                    reason,
                })?;
            self.overrides.insert(key, value);
        }
        Ok(())
    }

    /// Every catalogue key with its effective value and provenance.
    pub fn get_all_values(&self) -> Vec<SettingValue> {
        self.catalogue
            .iter()
            .map(|desc| {
                let (value, layer) = self.lookup(desc);
                let value = if desc.is_password {
                    value.map(|_| MASK.to_owned())
                } else {
                    value
                };
                SettingValue {
                    key: desc.key,
                    description: desc.description,
                    value,
                    layer,
                }
            })
            .collect()
    }

    /// Check every stored value against its validator and report missing passwords.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for desc in self.catalogue {
            let (value, layer) = self.lookup(desc);
            if desc.is_password {
                let resolved = match &value {
                    Some(stored) => self.resolve_secret(desc, stored),
                    None => Ok(None),
                };
                match resolved {
                    Ok(Some(_)) => {}
                    Ok(None) => issues.push(ValidationIssue {
                        key: desc.key,
                        severity: Severity::Warning,
                        message: format!("password not set; run --set-password {}", desc.key),
                    }),
                    Err(e) => issues.push(ValidationIssue {
                        key: desc.key,
                        severity: Severity::Warning,
                        message: e.to_string(),
                    }),
                }
                continue;
            }
            if let Some(value) = value {
                if let Err(reason) = desc.validate(&value) {
                    issues.push(ValidationIssue {
                        key: desc.key,
                        severity: Severity::Error,
                        message: format!("invalid value \"{value}\" from {layer}: {reason}"),
                    });
                }
            }
        }
        issues
    }
}

fn expression_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*([A-Za-z0-9_.\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|(.*?))\s*$"#).ok()
    })
    .as_ref()
}

/// Split `key=value`, stripping one level of single or double quotes.
///
/// # Errors
/// Returns `InvalidExpression` when there is no `=` or the key is empty.
pub fn parse_expression(expression: &str) -> Result<(String, String), ConfigError> {
    let invalid = || ConfigError::InvalidExpression {
        expression: expression.to_owned(),
    };
    let caps = expression_regex()
        .and_then(|re| re.captures(expression))
        .ok_or_else(invalid)?;
    let key = caps.get(1).ok_or_else(invalid)?.as_str().to_owned();
    let value = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str())
        .to_owned();
    Ok((key, value))
}
