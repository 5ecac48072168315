//! The external-tool stages of an export: CMake builds and the asset tools.

use std::path::{Path, PathBuf};
use std::process::Command;

use o3de_targets::{BuildConfig, Generator, Platform};
use o3de_util::process::{run_streamed, CancelToken};

use super::layout::LauncherKind;
use super::paths::{ASSET_BUNDLER_BATCH, ASSET_PROCESSOR_BATCH};
use crate::error::EngineError;

/// Everything the stages share for one export run.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub project_name: String,
    pub project_path: PathBuf,
    pub engine_path: PathBuf,
    pub engine_centric: bool,
    pub generator: Generator,
    pub cmake: PathBuf,
    /// Extra arguments appended to every CMake configure call.
    pub configure_args: Vec<String>,
    /// Extra arguments appended to every CMake build call.
    pub build_args: Vec<String>,
    pub token: CancelToken,
}

impl ExportContext {
    /// Working directory for the asset tools.
    fn o3de_base(&self) -> &Path {
        if self.engine_centric {
            &self.engine_path
        } else {
            &self.project_path
        }
    }

    fn run(&self, cmd: &mut Command, failure: &str) -> Result<(), EngineError> {
        match run_streamed(cmd, &self.token)? {
            Some(0) => Ok(()),
            code => Err(EngineError::stage_failed(failure, code.or(Some(1)))),
        }
    }

    fn configure_command(&self, build_dir: &Path, source_dir: &Path, config: BuildConfig) -> Command {
        let mut cmd = Command::new(&self.cmake);
        cmd.arg("-B").arg(build_dir).arg("-S").arg(source_dir);
        if let Some(name) = self.generator.name {
            cmd.arg("-G").arg(name);
        }
        cmd.args(self.generator.options);
        if !self.generator.multi_config {
            cmd.arg(format!("-DCMAKE_BUILD_TYPE={}", config.as_str()));
        }
        cmd
    }

    fn build_command(&self, build_dir: &Path, config: BuildConfig) -> Command {
        let mut cmd = Command::new(&self.cmake);
        cmd.arg("--build").arg(build_dir);
        if self.generator.multi_config {
            cmd.arg("--config").arg(config.as_str());
        }
        cmd
    }
}

/// Configure and build the asset tools from a source engine.
///
/// The source tree is the engine when engine-centric, else the project.
///
/// # Errors
/// Returns `ExportProject` with the tool's exit code when either CMake call fails.
pub fn build_export_toolchain(
    ctx: &ExportContext,
    tools_build_path: &Path,
    tool_config: BuildConfig,
) -> Result<(), EngineError> {
    tracing::info!(path = %tools_build_path.display(), config = %tool_config, "building asset tools");

    let source = if ctx.engine_centric {
        &ctx.engine_path
    } else {
        &ctx.project_path
    };
    let mut configure = ctx.configure_command(tools_build_path, source, tool_config);
    if ctx.engine_centric {
        configure.arg(format!("-DLY_PROJECTS={}", ctx.project_path.display()));
    }
    configure.args(&ctx.configure_args);
    ctx.run(&mut configure, "Error generating the project for the pre-requisite tools.")?;

    let mut build = ctx.build_command(tools_build_path, tool_config);
    build
        .arg("--target")
        .arg(ASSET_PROCESSOR_BATCH)
        .arg(ASSET_BUNDLER_BATCH)
        .args(&ctx.build_args);
    ctx.run(&mut build, "Error building the project for the pre-requisite tools.")
}

/// Process the project's assets for `platforms`.
///
/// A failing asset processor aborts only when `fail_on_errors` is set;
/// otherwise it is logged and the export continues.
///
/// # Errors
/// Returns `ExportProject` when the processor fails and `fail_on_errors` is set.
pub fn build_assets(
    ctx: &ExportContext,
    asset_processor: &Path,
    platforms: &[Platform],
    fail_on_errors: bool,
) -> Result<(), EngineError> {
    tracing::info!(project = %ctx.project_name, "processing assets");
    let mut cmd = Command::new(asset_processor);
    cmd.arg("--project-path").arg(&ctx.project_path);
    if !platforms.is_empty() {
        let joined: Vec<&str> = platforms.iter().map(|p| p.asset_platform()).collect();
        cmd.arg(format!("--platforms={}", joined.join(",")));
    }
    cmd.current_dir(ctx.o3de_base());

    match ctx.run(&mut cmd, &format!("Error building assets for project {}.", ctx.project_name)) {
        Err(EngineError::ExportProject { message, code }) if !fail_on_errors => {
            tracing::warn!(code = ?code, "{message} Continuing with the export.");
            Ok(())
        }
        other => other,
    }
}

/// Inputs to [`bundle_assets`].
#[derive(Debug, Clone)]
pub struct BundleRequest<'a> {
    pub asset_bundler: &'a Path,
    pub bundling_path: &'a Path,
    pub platforms: &'a [Platform],
    /// Absolute seed list files.
    pub seedlist_paths: &'a [PathBuf],
    /// Seed assets, relative to the asset cache or absolute.
    pub seedfile_paths: &'a [PathBuf],
    /// Levels whose spawnables are seeded from each platform's cache.
    pub level_names: &'a [String],
    pub max_size_mb: u32,
}

/// Build asset lists and size-capped bundles for each platform.
///
/// Per platform a game list is built from the seeds and an engine list from
/// the default seed lists; each becomes a `.pak` under `<bundling>/Bundles`.
/// Returns the bundle files written.
///
/// # Errors
/// Returns `ExportProject` when any bundler call fails.
pub fn bundle_assets(ctx: &ExportContext, request: &BundleRequest<'_>) -> Result<Vec<PathBuf>, EngineError> {
    let lists_dir = request.bundling_path.join("AssetLists");
    let bundles_dir = request.bundling_path.join("Bundles");
    o3de_util::fs::ensure_dir(&lists_dir)?;
    o3de_util::fs::ensure_dir(&bundles_dir)?;

    let mut bundles = Vec::new();
    for platform in request.platforms {
        let p = platform.asset_platform();
        tracing::info!(platform = p, "bundling assets");

        let game_list = lists_dir.join(format!("game_{p}.assetlist"));
        let mut game = asset_list_command(ctx, request.asset_bundler, &game_list, p);
        for seed_list in request.seedlist_paths {
            game.arg("--seedListFile").arg(seed_list);
        }
        for seed in request.seedfile_paths {
            game.arg("--addSeed").arg(seed);
        }
        for level in request.level_names {
            game.arg("--addSeed").arg(level_spawnable(&ctx.project_path, p, level));
        }
        ctx.run(&mut game, &format!("Unable to create the game asset list for platform {p}."))?;

        let engine_list = lists_dir.join(format!("engine_{p}.assetlist"));
        let mut engine = asset_list_command(ctx, request.asset_bundler, &engine_list, p);
        engine.arg("--addDefaultSeedListFiles");
        ctx.run(&mut engine, &format!("Unable to create the engine asset list for platform {p}."))?;

        for (kind, list) in [("game", &game_list), ("engine", &engine_list)] {
            let bundle = bundles_dir.join(format!("{kind}_{p}.pak"));
            let mut cmd = Command::new(request.asset_bundler);
            cmd.arg("bundles")
                .arg("--maxSize")
                .arg(request.max_size_mb.to_string())
                .arg("--platform")
                .arg(p)
                .arg("--project-path")
                .arg(&ctx.project_path)
                .arg("--allowOverwrites")
                .arg("--outputBundlePath")
                .arg(&bundle)
                .arg("--assetListFile")
                .arg(list)
                .current_dir(ctx.o3de_base());
            ctx.run(&mut cmd, &format!("Unable to create the {kind} bundle for platform {p}."))?;
            bundles.push(bundle);
        }
    }
    Ok(bundles)
}

/// `<project>/Cache/<platform>/levels/<level>/<level>.spawnable`, lowercased.
pub fn level_spawnable(project_path: &Path, asset_platform: &str, level: &str) -> PathBuf {
    let level = level.to_lowercase();
    project_path
        .join("Cache")
        .join(asset_platform)
        .join("levels")
        .join(&level)
        .join(format!("{level}.spawnable"))
}

fn asset_list_command(ctx: &ExportContext, bundler: &Path, list: &Path, platform: &str) -> Command {
    let mut cmd = Command::new(bundler);
    cmd.arg("assetLists")
        .arg("--assetListFile")
        .arg(list)
        .arg("--platform")
        .arg(platform)
        .arg("--project-path")
        .arg(&ctx.project_path)
        .arg("--allowOverwrites")
        .current_dir(ctx.o3de_base());
    cmd
}

/// Options for [`build_game_targets`].
#[derive(Debug, Clone)]
pub struct GameBuild<'a> {
    pub launcher_build_path: &'a Path,
    pub config: BuildConfig,
    pub monolithic: bool,
    pub allow_registry_overrides: bool,
    pub launchers: &'a [LauncherKind],
}

/// Configure the project and build the selected launchers.
///
/// # Errors
/// Returns `ExportProject` with the tool's exit code when either CMake call fails.
pub fn build_game_targets(ctx: &ExportContext, build: &GameBuild<'_>) -> Result<(), EngineError> {
    if build.launchers.is_empty() {
        tracing::info!("no launchers selected, skipping the game build");
        return Ok(());
    }
    tracing::info!(
        path = %build.launcher_build_path.display(),
        config = %build.config,
        monolithic = build.monolithic,
        "building launchers"
    );

    let mut configure = ctx.configure_command(build.launcher_build_path, &ctx.project_path, build.config);
    configure
        .arg(format!("-DLY_MONOLITHIC_GAME={}", u8::from(build.monolithic)))
        .arg(format!(
            "-DALLOW_SETTINGS_REGISTRY_DEVELOPMENT_OVERRIDES={}",
            u8::from(build.allow_registry_overrides)
        ))
        .args(&ctx.configure_args);
    ctx.run(
        &mut configure,
        &format!("Error generating projects for project {}.", ctx.project_name),
    )?;

    let mut compile = ctx.build_command(build.launcher_build_path, build.config);
    compile.arg("--target");
    for kind in LauncherKind::ALL.iter().filter(|k| build.launchers.contains(k)) {
        compile.arg(kind.target(&ctx.project_name));
    }
    compile.args(&ctx.build_args);
    ctx.run(&mut compile, "Error building the monolithic launcher(s).")
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    /// Write an executable shell script that appends its arguments to `log`.
    pub(crate) fn logging_tool(dir: &Path, name: &str, log: &Path, exit: i32) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(
            &path,
            format!("#!/bin/sh\necho \"{name} $*\" >> '{}'\nexit {exit}\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub(crate) fn context(root: &Path, cmake: PathBuf, multi_config: bool) -> ExportContext {
        ExportContext {
            project_name: "MyGame".to_owned(),
            project_path: root.join("MyGame"),
            engine_path: root.join("engine"),
            engine_centric: false,
            generator: Generator {
                name: Some(if multi_config { "Ninja Multi-Config" } else { "Unix Makefiles" }),
                multi_config,
                options: &["-DLY_DISABLE_TEST_MODULES=ON"],
            },
            cmake,
            configure_args: Vec::new(),
            build_args: Vec::new(),
            token: CancelToken::new(),
        }
    }

    fn log_lines(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn toolchain_multi_config() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let cmake = logging_tool(&tmp.path().join("bin"), "cmake", &log, 0);
        let mut ctx = context(tmp.path(), cmake, true);
        ctx.engine_centric = true;
        ctx.build_args = vec!["-j".to_owned(), "4".to_owned()];

        let tools = tmp.path().join("tools");
        build_export_toolchain(&ctx, &tools, BuildConfig::Profile).unwrap();

        let lines = log_lines(&log);
        let configure = lines.first().unwrap();
        assert!(configure.contains(&format!("-S {}", ctx.engine_path.display())));
        assert!(configure.contains("-G Ninja Multi-Config"));
        assert!(configure.contains(&format!("-DLY_PROJECTS={}", ctx.project_path.display())));
        assert!(!configure.contains("CMAKE_BUILD_TYPE"));
        let build = lines.get(1).unwrap();
        assert!(build.ends_with("--config profile --target AssetProcessorBatch AssetBundlerBatch -j 4"));
    }

    #[test]
    fn toolchain_single_config_failure_carries_code() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let cmake = logging_tool(&tmp.path().join("bin"), "cmake", &log, 4);
        let ctx = context(tmp.path(), cmake, false);

        let err = build_export_toolchain(&ctx, &tmp.path().join("tools"), BuildConfig::Release).unwrap_err();
        assert_eq!(err.to_string(), "Error generating the project for the pre-requisite tools.");
        assert_eq!(err.exit_code(), 4);
        let lines = log_lines(&log);
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().contains("-DCMAKE_BUILD_TYPE=release"));
    }

    #[test]
    fn asset_errors_respect_fail_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let ap = logging_tool(&tmp.path().join("bin"), ASSET_PROCESSOR_BATCH, &log, 2);
        let ctx = context(tmp.path(), PathBuf::from("cmake"), true);
        std::fs::create_dir_all(&ctx.project_path).unwrap();

        build_assets(&ctx, &ap, &[Platform::Windows, Platform::Linux], false).unwrap();
        let line = log_lines(&log).into_iter().next().unwrap();
        assert!(line.ends_with("--platforms=pc,linux"));

        let err = build_assets(&ctx, &ap, &[Platform::Linux], true).unwrap_err();
        assert_eq!(err.to_string(), "Error building assets for project MyGame.");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bundles_game_and_engine_lists() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let ab = logging_tool(&tmp.path().join("bin"), ASSET_BUNDLER_BATCH, &log, 0);
        let ctx = context(tmp.path(), PathBuf::from("cmake"), true);
        std::fs::create_dir_all(&ctx.project_path).unwrap();
        let bundling = tmp.path().join("bundling");

        let seed_list = ctx.project_path.join("game.seed");
        let request = BundleRequest {
            asset_bundler: &ab,
            bundling_path: &bundling,
            platforms: &[Platform::Linux],
            seedlist_paths: std::slice::from_ref(&seed_list),
            seedfile_paths: &[PathBuf::from("levels/main/main.spawnable")],
            level_names: &["Arena".to_owned()],
            max_size_mb: 512,
        };
        let bundles = bundle_assets(&ctx, &request).unwrap();
        assert_eq!(
            bundles,
            vec![bundling.join("Bundles/game_linux.pak"), bundling.join("Bundles/engine_linux.pak")]
        );

        let lines = log_lines(&log);
        assert_eq!(lines.len(), 4);
        let game = lines.first().unwrap();
        assert!(game.starts_with("AssetBundlerBatch assetLists"));
        assert!(game.contains(&format!("--seedListFile {}", seed_list.display())));
        assert!(game.contains("--addSeed levels/main/main.spawnable"));
        assert!(game.ends_with(&format!(
            "--addSeed {}",
            ctx.project_path.join("Cache/linux/levels/arena/arena.spawnable").display()
        )));
        assert!(lines.get(1).unwrap().ends_with("--addDefaultSeedListFiles"));
        assert!(lines.get(2).unwrap().contains("bundles --maxSize 512 --platform linux"));
    }

    #[test]
    fn game_targets_in_fixed_order() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let cmake = logging_tool(&tmp.path().join("bin"), "cmake", &log, 0);
        let ctx = context(tmp.path(), cmake, true);
        let launcher = tmp.path().join("launcher");

        build_game_targets(
            &ctx,
            &GameBuild {
                launcher_build_path: &launcher,
                config: BuildConfig::Release,
                monolithic: true,
                allow_registry_overrides: false,
                launchers: &[LauncherKind::HeadlessServer, LauncherKind::Game],
            },
        )
        .unwrap();

        let lines = log_lines(&log);
        let configure = lines.first().unwrap();
        assert!(configure.contains("-DLY_MONOLITHIC_GAME=1"));
        assert!(configure.contains("-DALLOW_SETTINGS_REGISTRY_DEVELOPMENT_OVERRIDES=0"));
        assert!(lines
            .get(1)
            .unwrap()
            .ends_with("--config release --target MyGame.GameLauncher MyGame.HeadlessServerLauncher"));
    }

    #[test]
    fn no_launchers_skips_cmake() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), tmp.path().join("missing-cmake"), true);
        build_game_targets(
            &ctx,
            &GameBuild {
                launcher_build_path: &tmp.path().join("launcher"),
                config: BuildConfig::Profile,
                monolithic: false,
                allow_registry_overrides: true,
                launchers: &[],
            },
        )
        .unwrap();
    }

    #[test]
    fn cancelled_stage_is_interrupted() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let cmake = logging_tool(&tmp.path().join("bin"), "cmake", &log, 0);
        let ctx = context(tmp.path(), cmake, true);
        ctx.token.cancel();
        let err = build_export_toolchain(&ctx, &tmp.path().join("tools"), BuildConfig::Profile).unwrap_err();
        assert!(matches!(err, EngineError::Util(o3de_util::error::UtilError::Interrupted { .. })));
        assert!(!log.exists());
    }
}
