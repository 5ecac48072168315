//! Launcher layout directories: binaries, bundles, and project files staged
//! for shipping.

use std::path::{Path, PathBuf};

use o3de_targets::{BuildConfig, Platform};
use o3de_util::archive::{create_archive, ArchiveFormat};
use o3de_util::fs::{copy_dir_filtered, copy_file, ensure_dir, remove_dir_all_if_exists};

use crate::error::EngineError;

/// Registry patch that stops a profile launcher from starting the asset processor.
pub const IGNORE_AP_SETREGPATCH: &str = "IgnoreAssetProcessor.profile.setregpatch";

/// The launcher flavours an export can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LauncherKind {
    Game,
    Server,
    Unified,
    HeadlessServer,
}

impl LauncherKind {
    /// Build and layout order.
    pub const ALL: [LauncherKind; 4] = [
        LauncherKind::Game,
        LauncherKind::Server,
        LauncherKind::Unified,
        LauncherKind::HeadlessServer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Game => "Game",
            Self::Server => "Server",
            Self::Unified => "Unified",
            Self::HeadlessServer => "HeadlessServer",
        }
    }

    /// CMake target, e.g. `MyGame.GameLauncher`.
    pub fn target(self, project_name: &str) -> String {
        format!("{project_name}.{}Launcher", self.label())
    }

    /// Layout folder under the export output, e.g. `MyGameGamePackage`.
    pub fn package_dir(self, output: &Path, project_name: &str) -> PathBuf {
        output.join(format!("{project_name}{}Package", self.label()))
    }

    fn is_server(self) -> bool {
        matches!(self, Self::Server | Self::HeadlessServer)
    }
}

/// What goes into one layout directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub output_path: PathBuf,
    /// Globs relative to the project root, copied to the layout root.
    pub project_file_patterns: Vec<String>,
    /// File names never copied from the launcher build.
    pub ignore_file_patterns: Vec<String>,
}

impl ExportLayout {
    /// Layout for `kind`: other launchers' executables are left out, and the
    /// game or server file patterns are added to the shared project patterns.
    pub fn for_launcher(
        kind: LauncherKind,
        output: &Path,
        project_name: &str,
        game_patterns: &[String],
        server_patterns: &[String],
        project_patterns: &[String],
    ) -> Self {
        let ignore_file_patterns = LauncherKind::ALL
            .iter()
            .filter(|other| **other != kind)
            .map(|other| format!("{}*", other.target(project_name)))
            .collect();

        let mut project_file_patterns: Vec<String> = project_patterns.to_vec();
        match kind {
            LauncherKind::Game => project_file_patterns.extend_from_slice(game_patterns),
            k if k.is_server() => project_file_patterns.extend_from_slice(server_patterns),
            _ => {
                project_file_patterns.extend_from_slice(game_patterns);
                project_file_patterns.extend_from_slice(server_patterns);
            }
        }

        Self {
            output_path: kind.package_dir(output, project_name),
            project_file_patterns,
            ignore_file_patterns,
        }
    }
}

/// Inputs shared by every layout of one export.
#[derive(Debug, Clone, Copy)]
pub struct LayoutSources<'a> {
    pub project_path: &'a Path,
    pub project_name: &'a str,
    pub engine_path: &'a Path,
    pub platform: Platform,
    pub launcher_build_path: &'a Path,
    pub build_config: BuildConfig,
    pub bundles: &'a [PathBuf],
}

fn compile_patterns(patterns: impl IntoIterator<Item = String>) -> Result<Vec<glob::Pattern>, EngineError> {
    patterns
        .into_iter()
        .map(|p| {
            glob::Pattern::new(&p).map_err(|e| {
                EngineError::Util(o3de_util::error::UtilError::GlobPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
        })
        .collect()
}

/// Assemble a layout directory and optionally archive it.
///
/// 1. Recreate the layout with `Cache/<asset_platform>`
/// 2. Copy the bundles into the cache folder
/// 3. Copy `<launcher_build>/bin/<config>/*` minus ignored names
/// 4. Copy matching project files
/// 5. Write `project.json`
/// 6. For profile builds, add the asset processor registry patch
/// 7. Archive when a format is selected
///
/// Returns the archive path, if one was written.
///
/// # Errors
/// Returns an error when any copy or write fails.
pub fn setup_launcher_layout(
    sources: &LayoutSources<'_>,
    layout: &ExportLayout,
    archive: ArchiveFormat,
) -> Result<Option<PathBuf>, EngineError> {
    let out = &layout.output_path;
    tracing::info!(layout = %out.display(), "assembling launcher layout");

    // 1.
    remove_dir_all_if_exists(out)?;
    let cache = out.join("Cache").join(sources.platform.asset_platform());
    ensure_dir(&cache)?;

    // 2.
    for bundle in sources.bundles {
        if let Some(name) = bundle.file_name() {
            copy_file(bundle, &cache.join(name))?;
        }
    }

    // 3.
    let binaries = sources.launcher_build_path.join("bin").join(sources.build_config.as_str());
    if binaries.is_dir() {
        let ignore = compile_patterns(
            layout
                .ignore_file_patterns
                .iter()
                .cloned()
                .chain(sources.platform.layout_ignore_patterns().iter().map(|p| (*p).to_owned())),
        )?;
        let copied = copy_dir_filtered(&binaries, out, &ignore)?;
        tracing::debug!(copied, from = %binaries.display(), "copied launcher binaries");
    } else {
        tracing::warn!(path = %binaries.display(), "launcher build output not found");
    }

    // 4.
    for pattern in &layout.project_file_patterns {
        let full = sources.project_path.join(pattern);
        let matches = glob::glob(&full.to_string_lossy()).map_err(|e| {
            EngineError::Util(o3de_util::error::UtilError::GlobPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })?;
        for file in matches.flatten().filter(|p| p.is_file()) {
            if let Some(name) = file.file_name() {
                copy_file(&file, &out.join(name))?;
            }
        }
    }

    // 5.
    o3de_util::json::write_pretty(
        &out.join("project.json"),
        &serde_json::json!({ "project_name": sources.project_name }),
    )?;

    // 6.
    if sources.build_config == BuildConfig::Profile {
        let patch = sources
            .engine_path
            .join("scripts")
            .join("o3de")
            .join("ExportScripts")
            .join(IGNORE_AP_SETREGPATCH);
        if patch.is_file() {
            copy_file(&patch, &out.join("Registry").join(IGNORE_AP_SETREGPATCH))?;
        } else {
            tracing::debug!(patch = %patch.display(), "no asset processor registry patch in engine");
        }
    }

    // 7.
    if archive == ArchiveFormat::None {
        return Ok(None);
    }
    tracing::info!(format = archive.as_str(), "archiving {} (this may take a while)", out.display());
    Ok(create_archive(out, out, archive)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn touch(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn launcher_names() {
        assert_eq!(LauncherKind::HeadlessServer.target("MyGame"), "MyGame.HeadlessServerLauncher");
        assert_eq!(
            LauncherKind::Game.package_dir(Path::new("/out"), "MyGame"),
            PathBuf::from("/out/MyGameGamePackage")
        );
    }

    #[test]
    fn layouts_skip_other_launchers() {
        let game = vec!["game.cfg".to_owned()];
        let server = vec!["server.cfg".to_owned()];
        let shared = vec!["shared.cfg".to_owned()];

        let layout = ExportLayout::for_launcher(LauncherKind::Game, Path::new("/out"), "P", &game, &server, &shared);
        assert_eq!(layout.project_file_patterns, ["shared.cfg", "game.cfg"]);
        assert!(layout.ignore_file_patterns.contains(&"P.ServerLauncher*".to_owned()));
        assert!(!layout.ignore_file_patterns.contains(&"P.GameLauncher*".to_owned()));

        let headless =
            ExportLayout::for_launcher(LauncherKind::HeadlessServer, Path::new("/out"), "P", &game, &server, &shared);
        assert_eq!(headless.project_file_patterns, ["shared.cfg", "server.cfg"]);

        let unified = ExportLayout::for_launcher(LauncherKind::Unified, Path::new("/out"), "P", &game, &server, &shared);
        assert_eq!(unified.project_file_patterns, ["shared.cfg", "game.cfg", "server.cfg"]);
        assert_eq!(unified.ignore_file_patterns.len(), 3);
    }

    #[test]
    fn assembles_profile_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let project = root.join("MyGame");
        let engine = root.join("engine");
        let launcher = root.join("launcher");
        touch(&launcher.join("bin/profile/MyGame.GameLauncher"), "game");
        touch(&launcher.join("bin/profile/MyGame.ServerLauncher"), "server");
        touch(&launcher.join("bin/profile/libFoo.so"), "lib");
        touch(&launcher.join("bin/profile/libFoo.so.dbg"), "symbols");
        touch(&launcher.join("bin/profile/Registry/game.setreg"), "{}");
        touch(&project.join("launch_client.cfg"), "cfg");
        touch(&engine.join("scripts/o3de/ExportScripts").join(IGNORE_AP_SETREGPATCH), "patch");
        let bundle = root.join("bundles/game_linux.pak");
        touch(&bundle, "pak");

        let out = root.join("export");
        // Stale output is cleared.
        touch(&LauncherKind::Game.package_dir(&out, "MyGame").join("stale.txt"), "old");

        let layout = ExportLayout::for_launcher(
            LauncherKind::Game,
            &out,
            "MyGame",
            &["launch_client.cfg".to_owned()],
            &[],
            &[],
        );
        let bundles = [bundle];
        let sources = LayoutSources {
            project_path: &project,
            project_name: "MyGame",
            engine_path: &engine,
            platform: Platform::Linux,
            launcher_build_path: &launcher,
            build_config: BuildConfig::Profile,
            bundles: &bundles,
        };
        let archive = setup_launcher_layout(&sources, &layout, ArchiveFormat::None).unwrap();
        assert!(archive.is_none());

        let dir = &layout.output_path;
        assert!(!dir.join("stale.txt").exists());
        assert!(dir.join("Cache/linux/game_linux.pak").is_file());
        assert!(dir.join("MyGame.GameLauncher").is_file());
        assert!(!dir.join("MyGame.ServerLauncher").exists());
        assert!(dir.join("libFoo.so").is_file());
        assert!(!dir.join("libFoo.so.dbg").exists());
        assert!(dir.join("Registry/game.setreg").is_file());
        assert!(dir.join("Registry").join(IGNORE_AP_SETREGPATCH).is_file());
        assert!(dir.join("launch_client.cfg").is_file());

        let project_json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("project.json")).unwrap()).unwrap();
        assert_eq!(project_json, serde_json::json!({"project_name": "MyGame"}));
    }

    #[test]
    fn release_layout_is_archived_without_patch() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let launcher = root.join("launcher");
        touch(&launcher.join("bin/release/MyGame.GameLauncher"), "game");
        touch(
            &root.join("engine/scripts/o3de/ExportScripts").join(IGNORE_AP_SETREGPATCH),
            "patch",
        );

        let layout = ExportLayout::for_launcher(LauncherKind::Game, &root.join("out"), "MyGame", &[], &[], &[]);
        let sources = LayoutSources {
            project_path: &root.join("MyGame"),
            project_name: "MyGame",
            engine_path: &root.join("engine"),
            platform: Platform::Linux,
            launcher_build_path: &launcher,
            build_config: BuildConfig::Release,
            bundles: &[],
        };
        let archive = setup_launcher_layout(&sources, &layout, ArchiveFormat::Zip).unwrap().unwrap();
        assert_eq!(archive, root.join("out/MyGameGamePackage.zip"));
        assert!(archive.is_file());
        assert!(!layout.output_path.join("Registry").exists());
    }
}
