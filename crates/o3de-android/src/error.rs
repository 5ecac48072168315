//! Error types for o3de-android.

use std::path::PathBuf;

/// Errors produced by host tool detection, SDK management, and Android project generation.
#[derive(Debug, thiserror::Error)]
pub enum AndroidError {
    /// A required host tool could not be located or run.
    #[error("{tool} not found: {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// A host tool was found but its version does not satisfy the build requirements.
    #[error("{tool} {found} is not supported: {reason}")]
    ToolVersionIncompatible {
        tool: String,
        found: String,
        reason: String,
    },

    /// A tool ran but its version banner could not be parsed.
    #[error("cannot determine {tool} version from output: {output}")]
    VersionParse { tool: String, output: String },

    /// The requested Android Gradle Plugin version is not in the compatibility table.
    #[error("Unrecognized Android Gradle Plugin version {version}; supported versions are {supported}")]
    UnknownGradlePlugin { version: String, supported: String },

    /// The command line tools are missing, misplaced, or not under an SDK root.
    #[error("{message}; set sdk.cmdline.tools.root with `o3de android configure --set-value sdk.cmdline.tools.root=<path>`")]
    SdkConfiguration { message: String },

    /// An `sdkmanager` invocation failed.
    #[error("sdkmanager {arguments} failed: {output}")]
    SdkManager { arguments: String, output: String },

    /// Some SDK licenses have not been accepted yet.
    #[error("{summary}; run `{sdkmanager} --licenses` and follow the instructions")]
    LicensesNotAccepted { summary: String, sdkmanager: PathBuf },

    /// The license query produced output that matches neither known state.
    #[error("cannot determine the Android SDK license state; run `{sdkmanager} --licenses` to troubleshoot")]
    LicenseStateUnknown { sdkmanager: PathBuf },

    /// A package path matched nothing installable.
    #[error("invalid Android SDK package {description}: bad package path {path}")]
    BadPackagePath { description: String, path: String },

    /// `sdkmanager --install` returned but the package is still not listed as installed.
    #[error("unable to verify package at {path}")]
    PackageNotVerified { path: String },

    /// A setting the pipeline needs is unset.
    #[error("android setting `{key}` is not set; use `o3de android configure --set-value {key}=<value>`")]
    MissingSetting { key: String },

    /// The project's Android settings are missing or malformed.
    #[error("invalid android settings for project at {path}: {message}")]
    ProjectSettings { path: PathBuf, message: String },

    /// Gradle failed to produce a wrapper, an APK, or a deployment.
    #[error("{message}")]
    Gradle { message: String, code: Option<i32> },

    #[error("{0}")]
    Config(#[from] o3de_config::ConfigError),

    #[error("{0}")]
    Util(#[from] o3de_util::error::UtilError),

    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl AndroidError {
    /// Exit code a caller should surface for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Gradle {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}
