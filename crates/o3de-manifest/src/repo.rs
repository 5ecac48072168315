//! `repo.json`: a remote catalogue of downloadable objects.

use serde::{Deserialize, Serialize};

use crate::document::{list, Document, ObjectKind};

/// One downloadable object in a repo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepoObject {
    /// The object's name from whichever `*_name` field it carries.
    pub fn name(&self) -> Option<&str> {
        ["gem_name", "project_name", "template_name"]
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(serde_json::Value::as_str))
    }
}

/// A repo manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoManifest {
    pub repo_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems_data: Option<Vec<RepoObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_data: Option<Vec<RepoObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_data: Option<Vec<RepoObject>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepoManifest {
    pub fn gems(&self) -> &[RepoObject] {
        list(&self.gems_data)
    }

    pub fn projects(&self) -> &[RepoObject] {
        list(&self.projects_data)
    }

    pub fn templates(&self) -> &[RepoObject] {
        list(&self.templates_data)
    }
}

impl Document for RepoManifest {
    const KIND: ObjectKind = ObjectKind::Repo;

    fn name(&self) -> &str {
        &self.repo_name
    }

    fn check(&self) -> Result<(), String> {
        for object in self.gems().iter().chain(self.projects()).chain(self.templates()) {
            if object.name().is_none() {
                return Err("every downloadable object needs a gem_name, project_name or template_name".to_owned());
            }
            if let Some(sha) = &object.sha256 {
                if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("`sha256` \"{sha}\" is not a SHA-256 hex digest"));
                }
            }
        }
        Ok(())
    }
}
