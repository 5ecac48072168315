//! `engine.json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{check_version, list, Document, ObjectKind};
use crate::project::GemEntry;
use crate::version::Version;

/// An engine manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineManifest {
    pub engine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_versions: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subdirectories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gem_names: Option<Vec<GemEntry>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EngineManifest {
    pub fn external_subdirectories(&self) -> &[String] {
        list(&self.external_subdirectories)
    }

    pub fn projects(&self) -> &[String] {
        list(&self.projects)
    }

    pub fn templates(&self) -> &[String] {
        list(&self.templates)
    }

    /// Parsed engine version, `0.0.0` when absent.
    pub fn parsed_version(&self) -> Version {
        self.version
            .as_deref()
            .and_then(|v| Version::parse(v).ok())
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }

    /// Parsed API versions; unparsable entries are skipped.
    pub fn parsed_api_versions(&self) -> BTreeMap<String, Version> {
        self.api_versions
            .iter()
            .flatten()
            .filter_map(|(name, v)| Version::parse(v).ok().map(|v| (name.clone(), v)))
            .collect()
    }
}

impl Document for EngineManifest {
    const KIND: ObjectKind = ObjectKind::Engine;

    fn name(&self) -> &str {
        &self.engine_name
    }

    fn check(&self) -> Result<(), String> {
        check_version(self.version.as_deref())?;
        for (api, version) in self.api_versions.iter().flatten() {
            Version::parse(version).map_err(|e| format!("api_versions.{api}: {e}"))?;
        }
        Ok(())
    }
}
