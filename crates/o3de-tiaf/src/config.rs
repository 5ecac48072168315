//! The runtime configuration file written by the build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TiafError;

/// Which test runtime drives the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Native,
    Python,
}

impl RuntimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "python" => Ok(Self::Python),
            other => Err(format!("unknown runtime type `{other}`; expected native or python")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Root {
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workspace {
    pub active: Root,
    pub historic: Root,
    pub temp: Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Common {
    pub workspace: Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeSection {
    pub runtime_bin: PathBuf,
}

/// Parsed runtime configuration.
///
/// Relative paths are taken relative to the file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    pub common: Common,
    #[serde(default)]
    pub native: Option<RuntimeSection>,
    #[serde(default)]
    pub python: Option<RuntimeSection>,
}

impl RuntimeConfig {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    /// Returns `Io` when the file cannot be read and `Json` when it does not
    /// match the expected shape.
    pub fn load(path: &Path) -> Result<Self, TiafError> {
        let text = std::fs::read_to_string(path).map_err(|e| TiafError::io(path, e))?;
        let mut config: Self = serde_json::from_str(&text).map_err(|e| TiafError::json(path, &e))?;
        let base = path.parent().unwrap_or(Path::new("."));
        let ws = &mut config.common.workspace;
        for root in [&mut ws.active.root, &mut ws.historic.root, &mut ws.temp.root] {
            *root = o3de_util::fs::resolve_against(base, root);
        }
        for section in [&mut config.native, &mut config.python].into_iter().flatten() {
            section.runtime_bin = o3de_util::fs::resolve_against(base, &section.runtime_bin);
        }
        Ok(config)
    }

    /// The runtime binary for `runtime`, if configured.
    pub fn runtime_bin(&self, runtime: RuntimeType) -> Option<&Path> {
        let section = match runtime {
            RuntimeType::Native => self.native.as_ref(),
            RuntimeType::Python => self.python.as_ref(),
        };
        section.map(|s| s.runtime_bin.as_path())
    }
}
