//! Error types for o3de-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A command failed to execute.
    #[error("cannot execute `{program}`: {source}")]
    CommandExec {
        program: String,
        source: std::io::Error,
    },

    /// A running command was interrupted by the user.
    #[error("`{program}` was interrupted")]
    Interrupted { program: String },

    /// A download failed.
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// A file's hash does not match the expected value.
    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// A JSON document could not be serialized.
    #[error("cannot serialize {path}: {message}")]
    Serialize { path: String, message: String },

    /// An archive could not be written.
    #[error("cannot write archive {path}: {message}")]
    Archive { path: String, message: String },

    /// An archive entry attempted to escape the extraction directory.
    #[error("archive contains path traversal entry \"{entry_path}\" that escapes {dest}")]
    PathTraversal { entry_path: String, dest: String },

    /// An archive format name was not recognised.
    #[error("unknown archive format `{name}`; expected one of none, zip, gzip, bz2, xz")]
    UnknownArchiveFormat { name: String },

    /// Cannot determine the user's home directory.
    #[error("cannot determine home directory; set the HOME environment variable")]
    NoHomeDir,
}
