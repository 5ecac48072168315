//! The user manifest, `~/.o3de/o3de_manifest.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::ObjectKind;

/// File name of the user manifest inside the O3DE home directory.
pub const USER_MANIFEST_FILE: &str = "o3de_manifest.json";

/// Registered objects and default destination folders for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserManifest {
    pub o3de_manifest_name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub default_engines_folder: String,
    #[serde(default)]
    pub default_projects_folder: String,
    #[serde(default)]
    pub default_gems_folder: String,
    #[serde(default)]
    pub default_templates_folder: String,
    #[serde(default)]
    pub default_restricted_folder: String,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub gems: Vec<String>,
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default)]
    pub restricted: Vec<String>,
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub engines: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserManifest {
    /// A fresh manifest for a user whose home directory is `home`.
    pub fn new_for_home(home: &Path) -> Self {
        let folder = |name: &str| home.join("O3DE").join(name).display().to_string();
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "o3de".to_owned());
        Self {
            o3de_manifest_name: user,
            origin: home.display().to_string(),
            default_engines_folder: folder("Engines"),
            default_projects_folder: folder("Projects"),
            default_gems_folder: folder("Gems"),
            default_templates_folder: folder("Templates"),
            default_restricted_folder: folder("Restricted"),
            projects: Vec::new(),
            gems: Vec::new(),
            templates: Vec::new(),
            restricted: Vec::new(),
            repos: Vec::new(),
            engines: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Registered entries of a kind.
    pub fn entries(&self, kind: ObjectKind) -> &[String] {
        match kind {
            ObjectKind::Engine => &self.engines,
            ObjectKind::Project => &self.projects,
            ObjectKind::Gem => &self.gems,
            ObjectKind::Template => &self.templates,
            ObjectKind::Repo => &self.repos,
        }
    }

    pub fn entries_mut(&mut self, kind: ObjectKind) -> &mut Vec<String> {
        match kind {
            ObjectKind::Engine => &mut self.engines,
            ObjectKind::Project => &mut self.projects,
            ObjectKind::Gem => &mut self.gems,
            ObjectKind::Template => &mut self.templates,
            ObjectKind::Repo => &mut self.repos,
        }
    }

    /// Default destination folder for newly created objects of `kind`.
    pub fn default_folder(&self, kind: ObjectKind) -> Option<&str> {
        let folder = match kind {
            ObjectKind::Engine => &self.default_engines_folder,
            ObjectKind::Project => &self.default_projects_folder,
            ObjectKind::Gem => &self.default_gems_folder,
            ObjectKind::Template => &self.default_templates_folder,
            ObjectKind::Repo => return None,
        };
        (!folder.is_empty()).then_some(folder.as_str())
    }
}
