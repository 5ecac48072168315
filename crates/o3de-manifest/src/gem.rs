//! `gem.json`.

use serde::{Deserialize, Serialize};

use crate::document::{check_requirements, check_version, list, Document, ObjectKind};
use crate::version::{Requirement, Version};

/// A gem manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemManifest {
    pub gem_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_engines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_api_dependencies: Option<Vec<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub gem_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subdirectories: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GemManifest {
    /// Parsed version, `0.0.0` when absent.
    pub fn parsed_version(&self) -> Version {
        self.version
            .as_deref()
            .and_then(|v| Version::parse(v).ok())
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }

    pub fn dependencies(&self) -> Vec<Requirement> {
        parse_all(list(&self.dependencies))
    }

    /// Engine requirements. `None` means the gem does not restrict engines.
    pub fn compatible_engines(&self) -> Option<Vec<Requirement>> {
        self.compatible_engines.as_deref().map(parse_all)
    }

    /// API requirements. `None` means the gem does not restrict APIs.
    pub fn engine_api_dependencies(&self) -> Option<Vec<Requirement>> {
        self.engine_api_dependencies.as_deref().map(parse_all)
    }

    pub fn external_subdirectories(&self) -> &[String] {
        list(&self.external_subdirectories)
    }
}

fn parse_all(entries: &[String]) -> Vec<Requirement> {
    entries.iter().filter_map(|e| e.parse().ok()).collect()
}

impl Document for GemManifest {
    const KIND: ObjectKind = ObjectKind::Gem;

    fn name(&self) -> &str {
        &self.gem_name
    }

    fn check(&self) -> Result<(), String> {
        check_version(self.version.as_deref())?;
        check_requirements("dependencies", list(&self.dependencies))?;
        check_requirements("compatible_engines", list(&self.compatible_engines))?;
        check_requirements("engine_api_dependencies", list(&self.engine_api_dependencies))?;
        Ok(())
    }
}
