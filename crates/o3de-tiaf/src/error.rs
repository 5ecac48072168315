//! Error types for o3de-tiaf.

/// Errors produced by the test impact analysis driver and its storage.
#[derive(Debug, thiserror::Error)]
pub enum TiafError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] o3de_util::error::UtilError),

    /// A settings lookup failed.
    #[error("{0}")]
    Config(#[from] o3de_config::ConfigError),

    /// A JSON document could not be read.
    #[error("invalid JSON in {path}: {message}")]
    Json { path: String, message: String },

    /// A git command failed.
    #[error("git {arguments} failed: {output}")]
    Git { arguments: String, output: String },

    /// The source commit is not an ancestor of the destination commit.
    #[error("source commit {src} is not an ancestor of destination commit {dst}; the coverage history for this branch cannot be trusted")]
    BranchNotDescendant { src: String, dst: String },

    /// Persistent storage could not be initialised.
    #[error("persistent storage is unavailable: {message}")]
    StorageUnavailable { message: String },

    /// A persistent storage read or write failed after initialisation.
    #[error("persistent storage request {url} failed: {message}")]
    Storage { url: String, message: String },
}

impl TiafError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, err: &serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
