//! Error types for o3de-manifest.

/// Errors produced while loading, validating, or registering manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The file is not syntactically valid JSON.
    #[error("invalid JSON in {path}: {message}")]
    Decode { path: String, message: String },

    /// A required field is missing or has the wrong type.
    #[error("{path} does not match the {kind} schema: {message}")]
    Schema {
        path: String,
        kind: String,
        message: String,
    },

    /// A manifest refers to something that is not registered.
    #[error("{path}: {message}")]
    CrossReference { path: String, message: String },

    /// A name could not be resolved to a registered object.
    #[error("{kind} `{name}` is not registered; register it with `o3de register --{kind}-path <path>`")]
    UnknownRegistered { kind: String, name: String },

    /// The given path does not contain the expected manifest file.
    #[error("{path} does not contain a {file}")]
    MissingManifest { path: String, file: String },

    /// A version string could not be parsed.
    #[error("invalid version \"{input}\": {message}")]
    InvalidVersion { input: String, message: String },

    /// A specifier or requirement string could not be parsed.
    #[error("invalid requirement \"{input}\": {message}")]
    InvalidSpecifier { input: String, message: String },

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
