//! `project.json` and the `gem_names` entry forms.

use serde::{Deserialize, Serialize};

use crate::document::{check_version, list, Document, ObjectKind};
use crate::version::{Requirement, Specifier};

/// One entry of `gem_names`: a bare requirement string or `{name, optional}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GemEntry {
    Name(String),
    Detailed(GemEntryDetail),
}

/// The object form of a `gem_names` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemEntryDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GemEntry {
    /// Build an entry, using the object form only when `optional` is set.
    pub fn new(requirement: &str, optional: bool) -> Self {
        if optional {
            Self::Detailed(GemEntryDetail {
                name: requirement.to_owned(),
                optional: Some(true),
                extra: serde_json::Map::new(),
            })
        } else {
            Self::Name(requirement.to_owned())
        }
    }

    /// The raw requirement text (`"GemA"` or `"GemA>=1.0"`).
    pub fn requirement_text(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed(detail) => &detail.name,
        }
    }

    /// Parsed requirement. Unparsable text is treated as a bare name.
    pub fn requirement(&self) -> Requirement {
        let text = self.requirement_text();
        text.parse().unwrap_or_else(|_| Requirement {
            name: text.trim().to_owned(),
            specifier: Specifier::any(),
        })
    }

    /// Gem name without any version specifier.
    pub fn gem_name(&self) -> String {
        self.requirement().name
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Self::Name(_) => false,
            Self::Detailed(detail) => detail.optional.unwrap_or(false),
        }
    }
}

/// A string or list of strings (`restricted` appears in both forms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// A project manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subdirectories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gem_names: Option<Vec<GemEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted: Option<OneOrMany>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectManifest {
    pub fn external_subdirectories(&self) -> &[String] {
        list(&self.external_subdirectories)
    }

    pub fn gem_names(&self) -> &[GemEntry] {
        list(&self.gem_names)
    }

    /// Position of the entry naming `gem_name`, whichever form it uses.
    pub fn find_gem(&self, gem_name: &str) -> Option<usize> {
        self.gem_names().iter().position(|e| e.gem_name() == gem_name)
    }

    /// Parsed `engine_version` specifier, if present.
    pub fn engine_specifier(&self) -> Option<Specifier> {
        self.engine_version.as_deref().and_then(|s| s.parse().ok())
    }
}

impl Document for ProjectManifest {
    const KIND: ObjectKind = ObjectKind::Project;

    fn name(&self) -> &str {
        &self.project_name
    }

    fn check(&self) -> Result<(), String> {
        check_version(self.version.as_deref())?;
        if let Some(spec) = &self.engine_version {
            spec.parse::<Specifier>()
                .map_err(|e| format!("`engine_version`: {e}"))?;
        }
        let mut seen = std::collections::BTreeSet::new();
        for entry in self.gem_names() {
            let name = entry.gem_name();
            if !seen.insert(name.clone()) {
                return Err(format!("`gem_names` lists `{name}` more than once"));
            }
        }
        Ok(())
    }
}
