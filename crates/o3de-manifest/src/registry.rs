//! The manifest repository: the user manifest plus lookups across the user,
//! engine, and project storage tiers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::document::{Document, Manifest, ObjectKind};
use crate::engine::EngineManifest;
use crate::error::ManifestError;
use crate::gem::GemManifest;
use crate::project::ProjectManifest;
use crate::repo::RepoManifest;
use crate::template::TemplateManifest;
use crate::user::{UserManifest, USER_MANIFEST_FILE};
use crate::version::Version;

/// Maximum nesting of `external_subdirectories` followed when enumerating gems.
const MAX_GEM_DEPTH: usize = 16;

/// Which storage tier an object was found through. Closer scopes sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Project,
    Engine,
    User,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Engine => "engine",
            Self::User => "user",
        }
    }
}

/// A gem discovered while walking the registered storage tiers.
#[derive(Debug, Clone)]
pub struct GemCandidate {
    pub name: String,
    pub version: Version,
    /// Root directory of the gem (containing `gem.json`).
    pub path: PathBuf,
    pub scope: Scope,
    pub manifest: GemManifest,
}

/// Handle on the user manifest stored in an O3DE home directory.
#[derive(Debug, Clone)]
pub struct Registry {
    o3de_dir: PathBuf,
    user: UserManifest,
}

impl Registry {
    /// Open the registry in `o3de_dir`, creating an in-memory default when
    /// the user manifest does not exist yet.
    ///
    /// # Errors
    /// Returns a decode or schema error if the existing user manifest is malformed.
    pub fn open(o3de_dir: &Path) -> Result<Self, ManifestError> {
        let path = o3de_dir.join(USER_MANIFEST_FILE);
        let user = if path.is_file() {
            let text = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| ManifestError::Decode {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            serde_json::from_value(value).map_err(|e| ManifestError::Schema {
                path: path.display().to_string(),
                kind: "user manifest".to_owned(),
                message: e.to_string(),
            })?
        } else {
            let home = o3de_dir.parent().unwrap_or(o3de_dir);
            UserManifest::new_for_home(home)
        };
        Ok(Self {
            o3de_dir: o3de_dir.to_path_buf(),
            user,
        })
    }

    /// Open the registry in the default O3DE home (`O3DE_HOME` or `~/.o3de`).
    ///
    /// # Errors
    /// Returns an error if the home directory is unknown or the manifest is malformed.
    pub fn open_default() -> Result<Self, ManifestError> {
        Self::open(&o3de_util::fs::o3de_home()?)
    }

    pub fn o3de_dir(&self) -> &Path {
        &self.o3de_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.o3de_dir.join(USER_MANIFEST_FILE)
    }

    pub fn user(&self) -> &UserManifest {
        &self.user
    }

    /// Atomically persist the user manifest.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), ManifestError> {
        o3de_util::json::write_pretty(&self.manifest_path(), &self.user)?;
        Ok(())
    }

    /// Register (or with `remove`, unregister) the object at `path`.
    ///
    /// Registration validates the manifest first, drops any entry for the same
    /// path, and inserts the path at the front of the list. The user manifest
    /// is saved on success. Returns the normalized path that was recorded.
    ///
    /// # Errors
    /// Returns an error if the manifest at `path` fails to load, or the user
    /// manifest cannot be written.
    pub fn register_path(
        &mut self,
        kind: ObjectKind,
        path: &Path,
        remove: bool,
    ) -> Result<PathBuf, ManifestError> {
        let normalized = o3de_util::fs::normalize(path);
        if kind == ObjectKind::Repo {
            self.register_repo(&normalized.display().to_string(), remove)?;
            return Ok(normalized);
        }
        if !remove {
            validate_manifest(kind, &normalized)?;
        }

        let entries = self.user.entries_mut(kind);
        let before = entries.len();
        entries.retain(|entry| o3de_util::fs::normalize(Path::new(entry)) != normalized);
        if remove {
            if entries.len() == before {
                tracing::warn!(path = %normalized.display(), "{kind} was not registered");
            }
        } else {
            entries.insert(0, normalized.display().to_string());
        }
        self.save()?;
        tracing::info!(kind = %kind, path = %normalized.display(), remove, "updated registration");
        Ok(normalized)
    }

    /// Cache file holding the downloaded `repo.json` for `uri`.
    pub fn repo_cache_path(&self, uri: &str) -> PathBuf {
        let key = o3de_util::hash::sha256_bytes(uri.as_bytes());
        self.o3de_dir.join("cache").join(format!("{key}.json"))
    }

    /// Register (or unregister) a remote repo by URI.
    ///
    /// Registration downloads the repo's `repo.json` into the cache and
    /// validates it before the URI is recorded.
    ///
    /// # Errors
    /// Returns an error if the repo cannot be fetched or fails validation.
    pub fn register_repo(&mut self, uri: &str, remove: bool) -> Result<(), ManifestError> {
        let cache = self.repo_cache_path(uri);
        if remove {
            if cache.exists() {
                std::fs::remove_file(&cache).map_err(|source| ManifestError::Io {
                    path: cache.display().to_string(),
                    source,
                })?;
            }
        } else {
            let manifest_uri = if uri.ends_with(".json") {
                uri.to_owned()
            } else {
                format!("{}/repo.json", uri.trim_end_matches('/'))
            };
            o3de_util::download::fetch_to(&manifest_uri, &cache)?;
            Manifest::<RepoManifest>::load(&cache)?;
        }

        self.user.repos.retain(|r| r != uri);
        if !remove {
            self.user.repos.insert(0, uri.to_owned());
        }
        self.save()
    }

    /// Registered paths of `kind` in the user manifest, each flagged with
    /// whether its manifest file still exists.
    pub fn registrations(&self, kind: ObjectKind) -> Vec<(String, bool)> {
        self.user
            .entries(kind)
            .iter()
            .map(|entry| {
                let exists = match kind {
                    ObjectKind::Repo => self.repo_cache_path(entry).is_file(),
                    _ => Path::new(entry).join(kind.file_name()).is_file(),
                };
                (entry.clone(), exists)
            })
            .collect()
    }

    /// Find the first registered object of `kind` named `name`.
    ///
    /// Searches the user manifest, then the engine at `engine_path`, then the
    /// project at `project_path`. Gems are also found transitively through
    /// `external_subdirectories`.
    ///
    /// # Errors
    /// Returns an error only if the supplied engine or project manifest cannot be loaded.
    pub fn get_registered(
        &self,
        name: &str,
        kind: ObjectKind,
        engine_path: Option<&Path>,
        project_path: Option<&Path>,
    ) -> Result<Option<PathBuf>, ManifestError> {
        let engine = engine_path
            .map(Manifest::<EngineManifest>::load)
            .transpose()?;
        let project = project_path
            .map(Manifest::<ProjectManifest>::load)
            .transpose()?;

        if kind == ObjectKind::Gem {
            let gems = self.walk_gems(project.as_ref(), engine.as_ref(), &[Scope::User, Scope::Engine, Scope::Project]);
            return Ok(gems.into_iter().find(|g| g.name == name).map(|g| g.path));
        }
        if kind == ObjectKind::Repo {
            return Ok(self
                .user
                .repos
                .iter()
                .find(|uri| {
                    Manifest::<RepoManifest>::load(&self.repo_cache_path(uri))
                        .is_ok_and(|m| m.name() == name)
                })
                .map(PathBuf::from));
        }

        let mut tiers: Vec<PathBuf> = self.user.entries(kind).iter().map(PathBuf::from).collect();
        if let Some(engine) = &engine {
            let stored = match kind {
                ObjectKind::Project => engine.data.projects(),
                ObjectKind::Template => engine.data.templates(),
                _ => &[],
            };
            tiers.extend(stored.iter().map(|s| engine.resolve(s)));
        }
        if let Some(project) = &project {
            if kind == ObjectKind::Template {
                let stored = crate::document::list(&project.data.templates);
                tiers.extend(stored.iter().map(|s| project.resolve(s)));
            }
        }

        Ok(tiers.into_iter().find(|path| match kind {
            ObjectKind::Engine => name_matches::<EngineManifest>(path, name),
            ObjectKind::Project => name_matches::<ProjectManifest>(path, name),
            ObjectKind::Template => name_matches::<TemplateManifest>(path, name),
            ObjectKind::Gem | ObjectKind::Repo => false,
        }))
    }

    fn resolve_name_or_path(
        &self,
        kind: ObjectKind,
        name_or_path: &str,
        project_path: Option<&Path>,
    ) -> Result<PathBuf, ManifestError> {
        let as_path = Path::new(name_or_path);
        if as_path.exists() {
            return Ok(as_path.to_path_buf());
        }
        if kind == ObjectKind::Repo {
            let cache = self.repo_cache_path(name_or_path);
            if cache.is_file() {
                return Ok(cache);
            }
        }
        let found = self.get_registered(name_or_path, kind, None, project_path)?;
        let found = match (found, kind) {
            (Some(uri), ObjectKind::Repo) => Some(self.repo_cache_path(&uri.display().to_string())),
            (other, _) => other,
        };
        found.ok_or_else(|| ManifestError::UnknownRegistered {
            kind: kind.to_string(),
            name: name_or_path.to_owned(),
        })
    }

    /// Load an engine manifest by registered name or path.
    ///
    /// # Errors
    /// Returns `UnknownRegistered` for an unknown name, or any load error.
    pub fn get_engine_json_data(&self, name_or_path: &str) -> Result<Manifest<EngineManifest>, ManifestError> {
        Manifest::load(&self.resolve_name_or_path(ObjectKind::Engine, name_or_path, None)?)
    }

    /// Load a project manifest by registered name or path, including the
    /// cross-reference check of its `engine` field.
    ///
    /// # Errors
    /// Returns `UnknownRegistered`, a load error, or `CrossReference`.
    pub fn get_project_json_data(&self, name_or_path: &str) -> Result<Manifest<ProjectManifest>, ManifestError> {
        let project = Manifest::load(&self.resolve_name_or_path(ObjectKind::Project, name_or_path, None)?)?;
        self.check_project_references(&project)?;
        Ok(project)
    }

    /// Load a gem manifest by name (searching through `project_path` too) or path.
    ///
    /// # Errors
    /// Returns `UnknownRegistered` for an unknown name, or any load error.
    pub fn get_gem_json_data(
        &self,
        name_or_path: &str,
        project_path: Option<&Path>,
    ) -> Result<Manifest<GemManifest>, ManifestError> {
        Manifest::load(&self.resolve_name_or_path(ObjectKind::Gem, name_or_path, project_path)?)
    }

    /// Load a template manifest by registered name or path.
    ///
    /// # Errors
    /// Returns `UnknownRegistered` for an unknown name, or any load error.
    pub fn get_template_json_data(&self, name_or_path: &str) -> Result<Manifest<TemplateManifest>, ManifestError> {
        Manifest::load(&self.resolve_name_or_path(ObjectKind::Template, name_or_path, None)?)
    }

    /// Load a cached repo manifest by repo name or URI.
    ///
    /// # Errors
    /// Returns `UnknownRegistered` for an unknown repo, or any load error.
    pub fn get_repo_json_data(&self, name_or_uri: &str) -> Result<Manifest<RepoManifest>, ManifestError> {
        Manifest::load(&self.resolve_name_or_path(ObjectKind::Repo, name_or_uri, None)?)
    }

    /// Verify that a project's `engine` names a known engine.
    ///
    /// An `engine_version` that the engine does not satisfy is logged as a
    /// warning rather than rejected.
    ///
    /// # Errors
    /// Returns `CrossReference` if the named engine cannot be found.
    pub fn check_project_references(&self, project: &Manifest<ProjectManifest>) -> Result<(), ManifestError> {
        if project.data.engine.is_none() {
            return Ok(());
        }
        let engine = self.engine_for_project(project).map_err(|_| ManifestError::CrossReference {
            path: project.path().display().to_string(),
            message: format!(
                "engine `{}` is not registered",
                project.data.engine.as_deref().unwrap_or_default()
            ),
        })?;
        if let Some(spec) = project.data.engine_specifier() {
            let version = engine.data.parsed_version();
            if !spec.matches(&version) {
                tracing::warn!(
                    project = project.name(),
                    engine = engine.name(),
                    %version,
                    required = %spec,
                    "engine version does not satisfy the project's engine_version"
                );
            }
        }
        Ok(())
    }

    /// Locate the engine a project builds against.
    ///
    /// Uses the project's `engine` name when set; otherwise the first
    /// registered engine listing the project, then the nearest ancestor
    /// directory holding an `engine.json`.
    ///
    /// # Errors
    /// Returns `UnknownRegistered` if no engine can be found.
    pub fn engine_for_project(&self, project: &Manifest<ProjectManifest>) -> Result<Manifest<EngineManifest>, ManifestError> {
        let project_root = o3de_util::fs::normalize(project.root());

        if let Some(name) = &project.data.engine {
            if let Some(path) = self.get_registered(name, ObjectKind::Engine, None, None)? {
                return Manifest::load(&path);
            }
            if let Some(engine) = ancestor_engine(&project_root).filter(|e| e.name() == name) {
                return Ok(engine);
            }
            return Err(ManifestError::UnknownRegistered {
                kind: ObjectKind::Engine.to_string(),
                name: name.clone(),
            });
        }

        for entry in self.user.entries(ObjectKind::Engine) {
            let Ok(engine) = Manifest::<EngineManifest>::load(Path::new(entry)) else {
                continue;
            };
            let lists_project = engine
                .data
                .projects()
                .iter()
                .any(|p| o3de_util::fs::normalize(&engine.resolve(p)) == project_root);
            if lists_project {
                return Ok(engine);
            }
        }

        ancestor_engine(&project_root).ok_or_else(|| ManifestError::UnknownRegistered {
            kind: ObjectKind::Engine.to_string(),
            name: format!("<engine of project {}>", project.name()),
        })
    }

    /// Every gem reachable from a project: the project's
    /// `external_subdirectories`, then the engine's, then the user's, each
    /// followed transitively. A gem directory reachable through several
    /// tiers is reported once, under the closest scope.
    pub fn gem_catalogue(
        &self,
        project: &Manifest<ProjectManifest>,
        engine: Option<&Manifest<EngineManifest>>,
    ) -> Vec<GemCandidate> {
        self.walk_gems(Some(project), engine, &[Scope::Project, Scope::Engine, Scope::User])
    }

    fn walk_gems(
        &self,
        project: Option<&Manifest<ProjectManifest>>,
        engine: Option<&Manifest<EngineManifest>>,
        order: &[Scope],
    ) -> Vec<GemCandidate> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for scope in order {
            let roots: Vec<PathBuf> = match scope {
                Scope::Project => project
                    .map(|p| p.data.external_subdirectories().iter().map(|s| p.resolve(s)).collect())
                    .unwrap_or_default(),
                Scope::Engine => engine
                    .map(|e| e.data.external_subdirectories().iter().map(|s| e.resolve(s)).collect())
                    .unwrap_or_default(),
                Scope::User => self.user.gems.iter().map(PathBuf::from).collect(),
            };
            for root in roots {
                collect_gems(&root, *scope, 0, &mut seen, &mut out);
            }
        }
        out
    }
}

fn collect_gems(
    dir: &Path,
    scope: Scope,
    depth: usize,
    seen: &mut BTreeSet<PathBuf>,
    out: &mut Vec<GemCandidate>,
) {
    if depth > MAX_GEM_DEPTH {
        tracing::warn!(path = %dir.display(), "external_subdirectories nested too deeply; stopping");
        return;
    }
    let canonical = o3de_util::fs::normalize(dir);
    if !seen.insert(canonical.clone()) {
        return;
    }
    if !canonical.join(ObjectKind::Gem.file_name()).is_file() {
        tracing::debug!(path = %canonical.display(), "no gem.json; skipping");
        return;
    }
    let gem = match Manifest::<GemManifest>::load(&canonical) {
        Ok(gem) => gem,
        Err(e) => {
            tracing::warn!("skipping invalid gem: {e}");
            return;
        }
    };
    let children: Vec<PathBuf> = gem
        .data
        .external_subdirectories()
        .iter()
        .map(|s| gem.resolve(s))
        .collect();
    out.push(GemCandidate {
        name: gem.data.gem_name.clone(),
        version: gem.data.parsed_version(),
        path: canonical,
        scope,
        manifest: gem.data,
    });
    for child in children {
        collect_gems(&child, scope, depth.saturating_add(1), seen, out);
    }
}

fn validate_manifest(kind: ObjectKind, path: &Path) -> Result<(), ManifestError> {
    match kind {
        ObjectKind::Engine => Manifest::<EngineManifest>::load(path).map(|_| ()),
        ObjectKind::Project => Manifest::<ProjectManifest>::load(path).map(|_| ()),
        ObjectKind::Gem => Manifest::<GemManifest>::load(path).map(|_| ()),
        ObjectKind::Template => Manifest::<TemplateManifest>::load(path).map(|_| ()),
        ObjectKind::Repo => Manifest::<RepoManifest>::load(path).map(|_| ()),
    }
}

fn name_matches<T: Document>(path: &Path, name: &str) -> bool {
    Manifest::<T>::load(path).is_ok_and(|m| m.name() == name)
}

fn ancestor_engine(start: &Path) -> Option<Manifest<EngineManifest>> {
    start
        .ancestors()
        .find(|dir| dir.join(ObjectKind::Engine.file_name()).is_file())
        .and_then(|dir| Manifest::load(dir).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn write(path: &Path, json: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        registry: Registry,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let registry = Registry::open(&root.join(".o3de")).unwrap();
        Fixture {
            _tmp: tmp,
            root,
            registry,
        }
    }

    fn make_engine(root: &Path, name: &str, version: &str) -> PathBuf {
        let dir = root.join(name);
        write(
            &dir.join("engine.json"),
            &format!(r#"{{"engine_name": "{name}", "version": "{version}", "external_subdirectories": ["Gems/EngineGem"]}}"#),
        );
        write(
            &dir.join("Gems/EngineGem/gem.json"),
            r#"{"gem_name": "EngineGem", "version": "1.0.0"}"#,
        );
        dir
    }

    fn make_project(root: &Path, engine: Option<&str>) -> PathBuf {
        let dir = root.join("Proj");
        let engine_field = engine.map(|e| format!(r#", "engine": "{e}""#)).unwrap_or_default();
        write(
            &dir.join("project.json"),
            &format!(r#"{{"project_name": "Proj", "external_subdirectories": ["Gems/Local"]{engine_field}}}"#),
        );
        write(
            &dir.join("Gems/Local/gem.json"),
            r#"{"gem_name": "LocalGem", "version": "2.0.0", "external_subdirectories": ["Nested"]}"#,
        );
        write(
            &dir.join("Gems/Local/Nested/gem.json"),
            r#"{"gem_name": "NestedGem", "version": "0.1.0"}"#,
        );
        dir
    }

    #[test]
    fn open_without_manifest_uses_defaults() {
        let fx = fixture();
        assert!(fx.registry.user().engines.is_empty());
        assert!(fx.registry.user().default_gems_folder.ends_with("Gems"));
        assert!(!fx.registry.manifest_path().exists());
    }

    #[test]
    fn register_inserts_at_front_and_dedupes() {
        let mut fx = fixture();
        let a = make_engine(&fx.root, "engine-a", "1.0.0");
        let b = make_engine(&fx.root, "engine-b", "2.0.0");

        fx.registry.register_path(ObjectKind::Engine, &a, false).unwrap();
        fx.registry.register_path(ObjectKind::Engine, &b, false).unwrap();
        fx.registry.register_path(ObjectKind::Engine, &a, false).unwrap();

        let engines = &fx.registry.user().engines;
        assert_eq!(engines.len(), 2);
        assert_eq!(engines.first().unwrap(), &a.display().to_string());

        let reopened = Registry::open(fx.registry.o3de_dir()).unwrap();
        assert_eq!(reopened.user().engines, *engines);
    }

    #[test]
    fn register_rejects_invalid_manifest() {
        let mut fx = fixture();
        let dir = fx.root.join("broken");
        write(&dir.join("gem.json"), "{ not json");
        let err = fx.registry.register_path(ObjectKind::Gem, &dir, false).unwrap_err();
        assert!(matches!(err, ManifestError::Decode { .. }));
        assert!(fx.registry.user().gems.is_empty());
    }

    #[test]
    fn unregister_removes_entry() {
        let mut fx = fixture();
        let a = make_engine(&fx.root, "engine-a", "1.0.0");
        fx.registry.register_path(ObjectKind::Engine, &a, false).unwrap();
        fx.registry.register_path(ObjectKind::Engine, &a, true).unwrap();
        assert!(fx.registry.user().engines.is_empty());
    }

    #[test]
    fn get_registered_finds_engine_by_name() {
        let mut fx = fixture();
        let a = make_engine(&fx.root, "engine-a", "1.0.0");
        fx.registry.register_path(ObjectKind::Engine, &a, false).unwrap();

        let found = fx.registry.get_registered("engine-a", ObjectKind::Engine, None, None).unwrap();
        assert_eq!(found, Some(a));
        let missing = fx.registry.get_registered("nope", ObjectKind::Engine, None, None).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn get_registered_searches_project_gems_transitively() {
        let fx = fixture();
        let project = make_project(&fx.root, None);
        let found = fx
            .registry
            .get_registered("NestedGem", ObjectKind::Gem, None, Some(&project))
            .unwrap();
        assert_eq!(found, Some(project.join("Gems/Local/Nested")));
    }

    #[test]
    fn unknown_name_is_reported() {
        let fx = fixture();
        let err = fx.registry.get_engine_json_data("ghost").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownRegistered { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn project_with_unknown_engine_fails_cross_reference() {
        let fx = fixture();
        let project = make_project(&fx.root, Some("missing-engine"));
        let err = fx
            .registry
            .get_project_json_data(&project.display().to_string())
            .unwrap_err();
        assert!(matches!(err, ManifestError::CrossReference { .. }));
    }

    #[test]
    fn project_with_registered_engine_loads() {
        let mut fx = fixture();
        let engine = make_engine(&fx.root, "o3de-test", "1.0.0");
        fx.registry.register_path(ObjectKind::Engine, &engine, false).unwrap();
        let project = make_project(&fx.root, Some("o3de-test"));

        let loaded = fx.registry.get_project_json_data(&project.display().to_string()).unwrap();
        let found = fx.registry.engine_for_project(&loaded).unwrap();
        assert_eq!(found.name(), "o3de-test");
    }

    #[test]
    fn engine_found_through_ancestor_directory() {
        let fx = fixture();
        let engine = make_engine(&fx.root, "outer", "1.0.0");
        let project_dir = engine.join("AutomatedTesting");
        write(&project_dir.join("project.json"), r#"{"project_name": "AutomatedTesting"}"#);
        let project = Manifest::<ProjectManifest>::load(&project_dir).unwrap();
        assert_eq!(fx.registry.engine_for_project(&project).unwrap().name(), "outer");
    }

    #[test]
    fn catalogue_orders_scopes_and_dedupes() {
        let mut fx = fixture();
        let engine_dir = make_engine(&fx.root, "o3de-test", "1.0.0");
        let project_dir = make_project(&fx.root, Some("o3de-test"));
        // The same gem registered at user level must still count as project scope.
        fx.registry
            .register_path(ObjectKind::Gem, &project_dir.join("Gems/Local"), false)
            .unwrap();

        let project = Manifest::<ProjectManifest>::load(&project_dir).unwrap();
        let engine = Manifest::<EngineManifest>::load(&engine_dir).unwrap();
        let gems = fx.registry.gem_catalogue(&project, Some(&engine));

        let summary: Vec<(&str, Scope)> = gems.iter().map(|g| (g.name.as_str(), g.scope)).collect();
        assert_eq!(
            summary,
            vec![
                ("LocalGem", Scope::Project),
                ("NestedGem", Scope::Project),
                ("EngineGem", Scope::Engine),
            ]
        );
    }

    #[test]
    fn repo_registration_caches_manifest() {
        let mut fx = fixture();
        let repo_dir = fx.root.join("remote");
        write(
            &repo_dir.join("repo.json"),
            r#"{"repo_name": "community", "origin": "o3de", "gems_data": [{"gem_name": "Far", "version": "1.0.0"}]}"#,
        );
        let uri = repo_dir.display().to_string();
        fx.registry.register_repo(&uri, false).unwrap();
        assert_eq!(fx.registry.user().repos, vec![uri.clone()]);

        let repo = fx.registry.get_repo_json_data("community").unwrap();
        assert_eq!(repo.data.gems().len(), 1);

        fx.registry.register_repo(&uri, true).unwrap();
        assert!(fx.registry.user().repos.is_empty());
        assert!(!fx.registry.repo_cache_path(&uri).exists());
    }

    #[test]
    fn registrations_flag_missing_paths() {
        let mut fx = fixture();
        let a = make_engine(&fx.root, "engine-a", "1.0.0");
        fx.registry.register_path(ObjectKind::Engine, &a, false).unwrap();
        fs::remove_file(a.join("engine.json")).unwrap();
        let listed = fx.registry.registrations(ObjectKind::Engine);
        assert_eq!(listed, vec![(a.display().to_string(), false)]);
    }
}
