//! Error types for o3de-engine.

use crate::resolve::ResolveError;

/// Errors produced by gem activation, template instantiation, and export.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] o3de_util::error::UtilError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] o3de_manifest::ManifestError),

    /// A platform or build configuration name was not recognised.
    #[error("{0}")]
    Target(#[from] o3de_targets::TargetError),

    /// A settings lookup failed.
    #[error("{0}")]
    Config(#[from] o3de_config::ConfigError),

    /// The dependency resolver rejected the requirement set.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// An Android host check or build step failed.
    #[error("{0}")]
    Android(#[from] o3de_android::AndroidError),

    /// The gem cannot be disabled because enabled gems depend on it.
    #[error("gem `{gem}` is required by {dependents}; pass --force to disable it anyway")]
    GemRequired { gem: String, dependents: String },

    /// The gem is neither registered nor reachable from the project.
    #[error("gem `{gem}` was not found in the project, its engine, or the user manifest")]
    GemNotFound { gem: String },

    /// A template would be instantiated over existing content.
    #[error("{path} already exists and is not empty; pass --force to instantiate over it")]
    DestinationNotEmpty { path: String },

    /// A new object name is unusable.
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// An export stage failed or one of its preconditions was not met.
    ///
    /// `code` carries the exit code of the tool that failed, if any.
    #[error("{message}")]
    ExportProject { message: String, code: Option<i32> },
}

impl EngineError {
    pub(crate) fn export(message: impl Into<String>) -> Self {
        Self::ExportProject {
            message: message.into(),
            code: None,
        }
    }

    pub(crate) fn stage_failed(message: impl Into<String>, code: Option<i32>) -> Self {
        Self::ExportProject {
            message: message.into(),
            code,
        }
    }

    /// Process exit code for this failure.
    ///
    /// Resolver rejections exit with 2. A failed child tool's own exit code
    /// is passed through. Everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Resolve(_) => 2,
            Self::ExportProject {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::Android(e) => e.exit_code(),
            _ => 1,
        }
    }
}
