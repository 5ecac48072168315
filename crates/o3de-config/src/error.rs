//! Error types for o3de-config.

/// Errors produced by the layered settings store.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The key is not part of the tool's settings catalogue.
    #[error("unknown setting `{key}` for {tool}; run with --list to see the available keys")]
    UnknownKey { tool: String, key: String },

    /// A stored or supplied value does not satisfy the key's validator.
    #[error("invalid value \"{value}\" for `{key}`: {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A `key=value` expression could not be parsed.
    #[error("invalid setting expression \"{expression}\"; expected key=value")]
    InvalidExpression { expression: String },

    /// The two password entries differed.
    #[error("passwords for `{key}` do not match")]
    PasswordMismatch { key: String },

    /// An empty password was entered.
    #[error("password for `{key}` must not be empty")]
    EmptyPassword { key: String },

    /// A password key was written through the plain value path.
    #[error("`{key}` is a password; use --set-password {key}")]
    PasswordKey { key: String },

    /// The OS secret vault rejected an operation.
    #[error("secret vault error for `{key}`: {message}")]
    SecretVault { key: String, message: String },

    /// The terminal prompt failed.
    #[error("cannot read password: {message}")]
    Prompt { message: String },

    /// A settings file is not valid TOML.
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// A settings file could not be serialized.
    #[error("cannot serialize settings: {source}")]
    Serialize { source: toml::ser::Error },

    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// An error propagated from o3de-util.
    #[error("{0}")]
    Util(#[from] o3de_util::error::UtilError),
}
