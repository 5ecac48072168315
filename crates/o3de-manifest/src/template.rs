//! `template.json`.

use serde::{Deserialize, Serialize};

use crate::document::{list, Document, ObjectKind};

/// A file the template copies into the new object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyFile {
    pub file: String,
    #[serde(rename = "isTemplated", default)]
    pub is_templated: bool,
    #[serde(rename = "isOptional", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A directory the template creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDirectory {
    pub dir: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A template manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_platform_relative_path: Option<String>,
    #[serde(rename = "copyFiles", default, skip_serializing_if = "Option::is_none")]
    pub copy_files: Option<Vec<CopyFile>>,
    #[serde(rename = "createDirectories", default, skip_serializing_if = "Option::is_none")]
    pub create_directories: Option<Vec<CreateDirectory>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TemplateManifest {
    pub fn copy_files(&self) -> &[CopyFile] {
        list(&self.copy_files)
    }

    pub fn create_directories(&self) -> &[CreateDirectory] {
        list(&self.create_directories)
    }
}

impl Document for TemplateManifest {
    const KIND: ObjectKind = ObjectKind::Template;

    fn name(&self) -> &str {
        &self.template_name
    }

    fn check(&self) -> Result<(), String> {
        for entry in self.copy_files() {
            if std::path::Path::new(&entry.file).is_absolute() || entry.file.contains("..") {
                return Err(format!("copyFiles entry `{}` must be a relative path inside the template", entry.file));
            }
        }
        Ok(())
    }
}
