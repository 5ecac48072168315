//! Creating engines, projects, and gems from templates.
//!
//! A template directory holds `template.json` and a `Template/` payload.
//! Templated files have `${Name}`, `${NameLower}`, `${NameUpper}`, and
//! `${Random_Uuid}` substituted, and `{BEGIN_LICENSE}`..`{END_LICENSE}`
//! line blocks removed.

use std::path::{Path, PathBuf};

use o3de_manifest::template::{CopyFile, CreateDirectory};
use o3de_manifest::{Manifest, ObjectKind, Registry, TemplateManifest};

use crate::error::EngineError;

/// Input to [`instantiate`].
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    pub kind: ObjectKind,
    pub name: String,
    pub destination: PathBuf,
    /// A template directory; the built-in template for `kind` when `None`.
    pub template: Option<PathBuf>,
    /// Extra `(from, to)` substitutions applied before the standard ones.
    pub replacements: Vec<(String, String)>,
    pub force: bool,
    pub register: bool,
}

impl TemplateRequest {
    pub fn new(kind: ObjectKind, name: &str, destination: &Path) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            destination: destination.to_path_buf(),
            template: None,
            replacements: Vec::new(),
            force: false,
            register: true,
        }
    }
}

struct BuiltinFile {
    path: &'static str,
    contents: &'static str,
}

const PROJECT_FILES: &[BuiltinFile] = &[
    BuiltinFile {
        path: "project.json",
        contents: r#"{
    "project_name": "${Name}",
    "version": "1.0.0",
    "origin": "",
    "summary": "${Name} project",
    "gem_names": [],
    "external_subdirectories": []
}
"#,
    },
    BuiltinFile {
        path: "CMakeLists.txt",
        contents: "# {BEGIN_LICENSE}\n# Generated project build script.\n# {END_LICENSE}\n\nif(NOT PROJECT_NAME)\n    cmake_minimum_required(VERSION 3.22)\n    project(${Name} LANGUAGES C CXX VERSION 1.0.0.0)\n    include(EngineFinder.cmake OPTIONAL)\n    find_package(o3de REQUIRED)\n    o3de_initialize()\nendif()\n",
    },
    BuiltinFile {
        path: "Registry/assets_scan_folders.setreg",
        contents: "{\n    \"Amazon\": {\n        \"${Name}\": {\n            \"SourcePaths\": [\"Assets\"]\n        }\n    }\n}\n",
    },
];

const GEM_FILES: &[BuiltinFile] = &[
    BuiltinFile {
        path: "gem.json",
        contents: r#"{
    "gem_name": "${Name}",
    "version": "1.0.0",
    "display_name": "${Name}",
    "summary": "${Name} gem",
    "type": "Code",
    "dependencies": [],
    "compatible_engines": []
}
"#,
    },
    BuiltinFile {
        path: "CMakeLists.txt",
        contents: "# {BEGIN_LICENSE}\n# Generated gem build script.\n# {END_LICENSE}\n\no3de_gem_setup(\"${Name}\")\nadd_subdirectory(Code)\n",
    },
    BuiltinFile {
        path: "Code/Source/${Name}ModuleInterface.h",
        contents: "#pragma once\n\nnamespace ${Name}\n{\n    // ${NameUpper} module id ${Random_Uuid}\n}\n",
    },
];

const ENGINE_FILES: &[BuiltinFile] = &[
    BuiltinFile {
        path: "engine.json",
        contents: r#"{
    "engine_name": "${Name}",
    "version": "1.0.0",
    "api_versions": {},
    "external_subdirectories": [],
    "projects": [],
    "templates": []
}
"#,
    },
    BuiltinFile {
        path: "CMakeLists.txt",
        contents: "cmake_minimum_required(VERSION 3.22)\nproject(${NameLower} LANGUAGES C CXX)\n",
    },
];

fn builtin_files(kind: ObjectKind) -> &'static [BuiltinFile] {
    match kind {
        ObjectKind::Project => PROJECT_FILES,
        ObjectKind::Gem => GEM_FILES,
        ObjectKind::Engine => ENGINE_FILES,
        ObjectKind::Template | ObjectKind::Repo => &[],
    }
}

fn check_name(kind: ObjectKind, name: &str) -> Result<(), EngineError> {
    let invalid = |reason: &str| EngineError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };
    if !matches!(kind, ObjectKind::Engine | ObjectKind::Project | ObjectKind::Gem) {
        return Err(invalid("only engines, projects, and gems can be created from templates"));
    }
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name must not be empty")),
        Some(c) if !c.is_ascii_alphabetic() => return Err(invalid("name must start with a letter")),
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(invalid("use only letters, digits, `_`, and `-`"));
    }
    Ok(())
}

/// Apply substitutions, expand `${Random_Uuid}`, and drop license blocks.
pub fn transform(text: &str, replacements: &[(String, String)]) -> String {
    let mut out = text.to_owned();
    for (from, to) in replacements {
        out = out.replace(from.as_str(), to);
    }
    while let Some(pos) = out.find("${Random_Uuid}") {
        let id = uuid::Uuid::new_v4().to_string();
        out.replace_range(pos..pos.saturating_add("${Random_Uuid}".len()), &id);
    }
    strip_license_blocks(&out)
}

/// Remove every line from one containing `{BEGIN_LICENSE}` through the next
/// line containing `{END_LICENSE}`.
fn strip_license_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_block = false;
    for line in text.split_inclusive('\n') {
        if !in_block && line.contains("{BEGIN_LICENSE}") {
            in_block = !line.contains("{END_LICENSE}");
            continue;
        }
        if in_block {
            if line.contains("{END_LICENSE}") {
                in_block = false;
            }
            continue;
        }
        out.push_str(line);
    }
    out
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        o3de_util::fs::ensure_dir(parent)?;
    }
    std::fs::write(path, contents).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn copy_templated(src: &Path, dest: &Path, replacements: &[(String, String)]) -> Result<(), EngineError> {
    let bytes = std::fs::read(src).map_err(|source| EngineError::Io {
        path: src.display().to_string(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => write_file(dest, transform(&text, replacements).as_bytes()),
        // Binary payloads are copied untouched.
        Err(e) => write_file(dest, e.as_bytes()),
    }
}

fn run_template(
    template: &Manifest<TemplateManifest>,
    destination: &Path,
    replacements: &[(String, String)],
) -> Result<usize, EngineError> {
    let payload = template.root().join("Template");
    for CreateDirectory { dir, .. } in template.data.create_directories() {
        o3de_util::fs::ensure_dir(&destination.join(transform(dir, replacements)))?;
    }
    let mut copied = 0usize;
    for CopyFile {
        file,
        is_templated,
        is_optional,
        ..
    } in template.data.copy_files()
    {
        let src = payload.join(file);
        if !src.is_file() {
            if *is_optional {
                tracing::debug!(file = %file, "optional template file missing; skipping");
                continue;
            }
            return Err(EngineError::Io {
                path: src.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "template file is missing"),
            });
        }
        let dest = destination.join(transform(file, replacements));
        if *is_templated {
            copy_templated(&src, &dest, replacements)?;
        } else {
            o3de_util::fs::copy_file(&src, &dest)?;
        }
        copied = copied.saturating_add(1);
    }
    Ok(copied)
}

/// Set the `<kind>_name` field of the instantiated manifest.
fn stamp_name(kind: ObjectKind, destination: &Path, name: &str) -> Result<(), EngineError> {
    let path = destination.join(kind.file_name());
    let mut value = if path.is_file() {
        let text = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            o3de_manifest::ManifestError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?
    } else {
        serde_json::Value::Object(serde_json::Map::new())
    };
    if let Some(map) = value.as_object_mut() {
        map.insert(kind.name_field().to_owned(), serde_json::Value::String(name.to_owned()));
    }
    o3de_util::json::write_pretty(&path, &value)?;
    Ok(())
}

/// Instantiate a template and, unless disabled, register the result.
///
/// Returns the normalized destination path.
///
/// # Errors
/// Returns `InvalidName`, `DestinationNotEmpty` (without `force`), a
/// template load error, or a filesystem error.
pub fn instantiate(registry: &mut Registry, request: &TemplateRequest) -> Result<PathBuf, EngineError> {
    check_name(request.kind, &request.name)?;
    let destination = &request.destination;
    if destination.exists() && !o3de_util::fs::is_empty_dir(destination) && !request.force {
        return Err(EngineError::DestinationNotEmpty {
            path: destination.display().to_string(),
        });
    }
    o3de_util::fs::ensure_dir(destination)?;

    let name = request.name.as_str();
    let mut replacements = request.replacements.clone();
    replacements.push(("${NameLower}".to_owned(), name.to_lowercase()));
    replacements.push(("${NameUpper}".to_owned(), name.to_uppercase()));
    replacements.push(("${Name}".to_owned(), name.to_owned()));

    let copied = match &request.template {
        Some(path) => {
            let template = Manifest::<TemplateManifest>::load(path)?;
            tracing::info!(template = template.name(), kind = %request.kind, "instantiating template");
            run_template(&template, destination, &replacements)?
        }
        None => {
            let files = builtin_files(request.kind);
            for file in files {
                let dest = destination.join(transform(file.path, &replacements));
                write_file(&dest, transform(file.contents, &replacements).as_bytes())?;
            }
            files.len()
        }
    };
    stamp_name(request.kind, destination, name)?;
    tracing::info!(name, files = copied, path = %destination.display(), "created {}", request.kind);

    let destination = o3de_util::fs::normalize(destination);
    if request.register {
        registry.register_path(request.kind, &destination, false)?;
    }
    Ok(destination)
}
