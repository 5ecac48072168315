//! Generic load/validate/save for the JSON manifest documents.
//!
//! Loading runs in three phases: JSON decode, schema validation (serde plus
//! per-document checks), and, for documents that reference other objects, a
//! cross-reference check performed by [`crate::registry::Registry`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ManifestError;

/// The five registrable object classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Engine,
    Project,
    Gem,
    Template,
    Repo,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Engine,
        ObjectKind::Project,
        ObjectKind::Gem,
        ObjectKind::Template,
        ObjectKind::Repo,
    ];

    /// File name of the manifest inside an object's root directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Engine => "engine.json",
            Self::Project => "project.json",
            Self::Gem => "gem.json",
            Self::Template => "template.json",
            Self::Repo => "repo.json",
        }
    }

    /// Field holding the object's name (`gem_name`, ...).
    pub fn name_field(self) -> &'static str {
        match self {
            Self::Engine => "engine_name",
            Self::Project => "project_name",
            Self::Gem => "gem_name",
            Self::Template => "template_name",
            Self::Repo => "repo_name",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Project => "project",
            Self::Gem => "gem",
            Self::Template => "template",
            Self::Repo => "repo",
        }
    }

    /// Plural form used for the user manifest lists.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Engine => "engines",
            Self::Project => "projects",
            Self::Gem => "gems",
            Self::Template => "templates",
            Self::Repo => "repos",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manifest document type.
pub trait Document: Serialize + DeserializeOwned {
    const KIND: ObjectKind;

    /// The object's name.
    fn name(&self) -> &str;

    /// Semantic checks that serde cannot express (parsable versions, unique
    /// entries). Returns a human-readable reason on failure.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A document together with where it was loaded from.
#[derive(Debug, Clone)]
pub struct Manifest<T> {
    path: PathBuf,
    pub data: T,
    /// Top-level keys in file order, flagged when their value was `null`.
    layout: Vec<(String, bool)>,
}

impl<T: Document> Manifest<T> {
    /// Wrap a document that will be stored at `path`.
    pub fn new(path: PathBuf, data: T) -> Self {
        Self {
            path,
            data,
            layout: Vec::new(),
        }
    }

    /// Load a manifest from its file or from the directory containing it.
    ///
    /// # Errors
    /// Returns `Decode` for malformed JSON, `Schema` for missing or mistyped
    /// fields, or an I/O error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = manifest_file::<T>(path);
        if !file.is_file() {
            return Err(ManifestError::MissingManifest {
                path: path.display().to_string(),
                file: T::KIND.file_name().to_owned(),
            });
        }
        let text = std::fs::read_to_string(&file).map_err(|source| ManifestError::Io {
            path: file.display().to_string(),
            source,
        })?;
        let (data, layout) = parse_with_layout::<T>(&file, &text)?;
        Ok(Self {
            path: file,
            data,
            layout,
        })
    }

    /// Atomically write the manifest back to where it was loaded from.
    ///
    /// Fields that were loaded as an explicit `null` and are still unset are
    /// written back as `null`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), ManifestError> {
        let value = serde_json::to_value(&self.data).map_err(|e| o3de_util::error::UtilError::Serialize {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        let value = match value {
            Value::Object(fields) => Value::Object(restore_nulls(fields, &self.layout)),
            other => other,
        };
        o3de_util::json::write_pretty(&self.path, &value)?;
        Ok(())
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest file.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Resolve a path stored in the manifest against its owning directory.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        o3de_util::fs::resolve_against(self.root(), Path::new(stored))
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }
}

/// Resolve `path` to the manifest file of kind `T` (accepting either the file or its directory).
pub fn manifest_file<T: Document>(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(T::KIND.file_name())
    } else {
        path.to_path_buf()
    }
}

/// Decode and schema-check a document.
///
/// # Errors
/// Returns `Decode` or `Schema` errors attributed to `path`.
pub fn parse_document<T: Document>(path: &Path, text: &str) -> Result<T, ManifestError> {
    parse_with_layout(path, text).map(|(data, _)| data)
}

fn parse_with_layout<T: Document>(path: &Path, text: &str) -> Result<(T, Vec<(String, bool)>), ManifestError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ManifestError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    let schema_err = |message: String| ManifestError::Schema {
        path: path.display().to_string(),
        kind: T::KIND.to_string(),
        message,
    };
    let Value::Object(fields) = &value else {
        return Err(schema_err("top level must be an object".to_owned()));
    };
    let layout = fields.iter().map(|(k, v)| (k.clone(), v.is_null())).collect();
    let data: T = serde_json::from_value(value).map_err(|e| schema_err(e.to_string()))?;
    if data.name().trim().is_empty() {
        return Err(schema_err(format!("`{}` must not be empty", T::KIND.name_field())));
    }
    data.check().map_err(schema_err)?;
    Ok((data, layout))
}

/// Put back keys that were `null` on disk and dropped by serialization,
/// keeping the loaded key order.
fn restore_nulls(mut fields: Map<String, Value>, layout: &[(String, bool)]) -> Map<String, Value> {
    if !layout.iter().any(|(_, was_null)| *was_null) {
        return fields;
    }
    let mut ordered = Map::new();
    for (key, was_null) in layout {
        match fields.shift_remove(key) {
            Some(value) => {
                ordered.insert(key.clone(), value);
            }
            None if *was_null => {
                ordered.insert(key.clone(), Value::Null);
            }
            None => {}
        }
    }
    ordered.extend(fields);
    ordered
}

/// Borrow an optional list as a slice.
pub(crate) fn list<T>(items: &Option<Vec<T>>) -> &[T] {
    items.as_deref().unwrap_or_default()
}

/// Check that every entry parses as a requirement.
pub(crate) fn check_requirements(field: &str, entries: &[String]) -> Result<(), String> {
    for entry in entries {
        entry
            .parse::<crate::version::Requirement>()
            .map_err(|e| format!("`{field}` entry \"{entry}\": {e}"))?;
    }
    Ok(())
}

/// Check that an optional version field parses.
pub(crate) fn check_version(version: Option<&str>) -> Result<(), String> {
    if let Some(v) = version {
        crate::version::Version::parse(v).map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::engine::EngineManifest;
    use crate::gem::GemManifest;
    use crate::project::{GemEntry, ProjectManifest};
    use crate::template::TemplateManifest;

    fn round_trip<T: Document>(text: &str) -> (serde_json::Value, serde_json::Value) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(T::KIND.file_name());
        std::fs::write(&path, text).unwrap();
        let manifest = Manifest::<T>::load(tmp.path()).unwrap();
        manifest.save().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        (
            serde_json::from_str(text).unwrap(),
            serde_json::from_str(&written).unwrap(),
        )
    }

    #[test]
    fn project_round_trip_keeps_unknown_fields() {
        let text = r#"{
            "project_name": "Game",
            "project_id": "{1234}",
            "engine": "o3de",
            "gem_names": ["Atom", {"name": "Multiplayer", "optional": true, "note": "x"}],
            "icon_path": "preview.png",
            "user_tags": ["Game", "Sample"]
        }"#;
        let (before, after) = round_trip::<ProjectManifest>(text);
        assert_eq!(before, after);
    }

    #[test]
    fn round_trip_keeps_explicit_nulls() {
        let text = r#"{"project_name": "P", "engine_version": null, "restricted": null, "engine": "o3de"}"#;
        let (before, after) = round_trip::<ProjectManifest>(text);
        assert_eq!(before, after);

        let (before, after) = round_trip::<GemManifest>(r#"{"gem_name": "A", "version": null, "compatible_engines": null}"#);
        assert_eq!(before, after);
    }

    #[test]
    fn explicit_null_keeps_its_position_and_yields_to_new_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project.json");
        std::fs::write(&path, r#"{"engine_version": null, "project_name": "P", "restricted": null}"#).unwrap();
        let mut project = Manifest::<ProjectManifest>::load(tmp.path()).unwrap();
        project.data.engine_version = Some("1.0.0".to_owned());
        project.save().unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let keys: Vec<&str> = written.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["engine_version", "project_name", "restricted"]);
        assert_eq!(written.get("engine_version").unwrap(), "1.0.0");
        assert!(written.get("restricted").unwrap().is_null());
    }

    #[test]
    fn gem_round_trip_preserves_array_order() {
        let text = r#"{"gem_name": "GemA", "version": "1.0.0", "dependencies": ["Zeta", "Alpha", "Mid>=1.0"], "type": "Code"}"#;
        let (before, after) = round_trip::<GemManifest>(text);
        assert_eq!(before, after);
        let first = after.get("dependencies").and_then(|d| d.get(0)).unwrap();
        assert_eq!(first, "Zeta");
    }

    #[test]
    fn template_round_trip_keeps_camel_case_keys() {
        let text = r#"{"template_name": "DefaultGem", "copyFiles": [{"file": "CMakeLists.txt", "isTemplated": true}], "createDirectories": [{"dir": "Code"}]}"#;
        let (before, after) = round_trip::<TemplateManifest>(text);
        assert_eq!(before, after);
    }

    #[test]
    fn writes_four_space_indent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("engine.json"), r#"{"engine_name":"o3de"}"#).unwrap();
        Manifest::<EngineManifest>::load(tmp.path()).unwrap().save().unwrap();
        let written = std::fs::read_to_string(tmp.path().join("engine.json")).unwrap();
        assert_eq!(written, "{\n    \"engine_name\": \"o3de\"\n}\n");
    }

    #[test]
    fn syntax_error_is_decode_error() {
        let err = parse_document::<GemManifest>(Path::new("gem.json"), "{\"gem_name\": ").unwrap_err();
        assert!(matches!(err, ManifestError::Decode { .. }));
    }

    #[test]
    fn missing_name_is_schema_error() {
        let err = parse_document::<GemManifest>(Path::new("gem.json"), r#"{"version": "1.0.0"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Schema { .. }));
        assert!(err.to_string().contains("gem_name"));
    }

    #[test]
    fn mistyped_field_is_schema_error() {
        let err = parse_document::<GemManifest>(Path::new("gem.json"), r#"{"gem_name": "A", "dependencies": "B"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Schema { .. }));
    }

    #[test]
    fn bad_dependency_is_schema_error() {
        let err = parse_document::<GemManifest>(Path::new("gem.json"), r#"{"gem_name": "A", "dependencies": ["B=>1"]}"#).unwrap_err();
        assert!(err.to_string().contains("dependencies"));
    }

    #[test]
    fn duplicate_gem_names_are_rejected_in_either_form() {
        let text = r#"{"project_name": "P", "gem_names": ["GemA", {"name": "GemA>=1.0", "optional": true}]}"#;
        let err = parse_document::<ProjectManifest>(Path::new("project.json"), text).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn gem_entry_forms_share_a_name() {
        let bare = GemEntry::new("GemA", false);
        let detailed = GemEntry::new("GemA==1.0.0", true);
        assert_eq!(bare.gem_name(), detailed.gem_name());
        assert!(!bare.is_optional());
        assert!(detailed.is_optional());
    }

    #[test]
    fn load_directory_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Manifest::<GemManifest>::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::MissingManifest { .. }));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("project.json"), r#"{"project_name": "P"}"#).unwrap();
        let project = Manifest::<ProjectManifest>::load(tmp.path()).unwrap();
        assert_eq!(project.resolve("Gems/A"), tmp.path().join("Gems/A"));
        let abs = tmp.path().join("elsewhere");
        assert_eq!(project.resolve(&abs.display().to_string()), abs);
    }

    fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_]{0,12}"
    }

    proptest! {
        #[test]
        fn project_save_load_is_identity(
            name in arb_name(),
            gems in proptest::collection::vec((arb_name(), any::<bool>()), 0..6),
            extra_key in "x_[a-z]{1,8}",
            extra_val in any::<i64>(),
        ) {
            let mut seen = std::collections::BTreeSet::new();
            let entries: Vec<serde_json::Value> = gems
                .into_iter()
                .filter(|(g, _)| seen.insert(g.clone()))
                .map(|(g, optional)| if optional {
                    serde_json::json!({"name": g, "optional": true})
                } else {
                    serde_json::json!(g)
                })
                .collect();
            let doc = serde_json::json!({
                "project_name": name,
                "gem_names": entries,
                extra_key: extra_val,
            });
            let (before, after) = round_trip::<ProjectManifest>(&doc.to_string());
            prop_assert_eq!(before, after);
        }
    }
}
