//! Project export: build tools, process and bundle assets, build launchers,
//! and stage them into shippable layouts.

pub mod layout;
pub mod paths;
pub mod settings;
pub mod stages;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use o3de_config::ConfigStore;
use o3de_targets::{host_generator, host_platform, BuildConfig, Generator, Platform};
use o3de_util::archive::ArchiveFormat;
use o3de_util::process::{run_command, which, CancelToken};

use crate::error::EngineError;
use layout::{setup_launcher_layout, ExportLayout, LauncherKind, LayoutSources};
use paths::{
    has_monolithic_artifacts, is_sdk_engine, require_tool, resolve_build_path, sdk_tools_path,
    validate_artifact_paths, ASSET_BUNDLER_BATCH, ASSET_PROCESSOR_BATCH,
};
use stages::{build_assets, build_export_toolchain, build_game_targets, bundle_assets, BundleRequest, ExportContext, GameBuild};

/// Export options, normally read from the `export_project` settings and then
/// adjusted from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub project_config: BuildConfig,
    pub tool_config: BuildConfig,
    pub archive_format: ArchiveFormat,
    pub build_assets: bool,
    pub fail_on_asset_errors: bool,
    pub build_tools: bool,
    pub seedlist_paths: Vec<PathBuf>,
    pub seedfile_paths: Vec<PathBuf>,
    pub level_names: Vec<String>,
    pub game_file_patterns: Vec<String>,
    pub server_file_patterns: Vec<String>,
    pub project_file_patterns: Vec<String>,
    pub tools_build_path: Option<PathBuf>,
    pub launcher_build_path: Option<PathBuf>,
    pub asset_bundling_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub android_build_path: Option<PathBuf>,
    pub max_size_mb: u32,
    pub launchers: Vec<LauncherKind>,
    pub engine_centric: bool,
    pub monolithic: bool,
    pub allow_registry_overrides: bool,
    pub android_deploy: bool,
    pub configure_args: Vec<String>,
    pub build_args: Vec<String>,
    /// Empty every output folder before building.
    pub clean: bool,
}

impl ExportOptions {
    /// Read every export setting from `config`.
    ///
    /// # Errors
    /// Returns an error when a stored value fails validation or cannot be parsed.
    pub fn from_config(config: &ConfigStore) -> Result<Self, EngineError> {
        use settings as s;

        let path = |key: &str| -> Result<Option<PathBuf>, EngineError> {
            Ok(config.get_value(key)?.filter(|v| !v.is_empty()).map(PathBuf::from))
        };
        let paths = |key: &str| -> Result<Vec<PathBuf>, EngineError> {
            Ok(config.get_list_value(key)?.into_iter().map(PathBuf::from).collect())
        };

        let max_size = config.get_value_or(s::MAX_SIZE, "2048")?;
        let max_size_mb = max_size.parse().map_err(|_| {
            EngineError::export(format!("Invalid value for {}: '{max_size}' is not a size in megabytes.", s::MAX_SIZE))
        })?;

        let launcher_flags = [
            (LauncherKind::Game, s::OPTION_BUILD_GAME_LAUNCHER),
            (LauncherKind::Server, s::OPTION_BUILD_SERVER_LAUNCHER),
            (LauncherKind::Unified, s::OPTION_BUILD_UNIFIED_LAUNCHER),
            (LauncherKind::HeadlessServer, s::OPTION_BUILD_HEADLESS_SERVER_LAUNCHER),
        ];
        let mut launchers = Vec::new();
        for (kind, key) in launcher_flags {
            if config.get_boolean_value(key)? {
                launchers.push(kind);
            }
        }

        Ok(Self {
            project_config: config.get_value_or(s::PROJECT_BUILD_CONFIG, "profile")?.parse()?,
            tool_config: config.get_value_or(s::TOOL_BUILD_CONFIG, "profile")?.parse()?,
            archive_format: config.get_value_or(s::ARCHIVE_OUTPUT_FORMAT, "none")?.parse()?,
            build_assets: config.get_boolean_value(s::OPTION_BUILD_ASSETS)?,
            fail_on_asset_errors: config.get_boolean_value(s::OPTION_FAIL_ON_ASSET_ERRORS)?,
            build_tools: config.get_boolean_value(s::OPTION_BUILD_TOOLS)?,
            seedlist_paths: paths(s::SEEDLIST_PATHS)?,
            seedfile_paths: paths(s::SEEDFILE_PATHS)?,
            level_names: config.get_list_value(s::DEFAULT_LEVEL_NAMES)?,
            game_file_patterns: config.get_list_value(s::GAME_FILE_PATTERNS)?,
            server_file_patterns: config.get_list_value(s::SERVER_FILE_PATTERNS)?,
            project_file_patterns: config.get_list_value(s::PROJECT_FILE_PATTERNS)?,
            tools_build_path: path(s::DEFAULT_BUILD_TOOLS_PATH)?,
            launcher_build_path: path(s::DEFAULT_LAUNCHER_BUILD_PATH)?,
            asset_bundling_path: path(s::ASSET_BUNDLING_PATH)?,
            output_path: path(s::DEFAULT_OUTPUT_PATH)?,
            android_build_path: path(s::DEFAULT_ANDROID_BUILD_PATH)?,
            max_size_mb,
            launchers,
            engine_centric: config.get_boolean_value(s::OPTION_ENGINE_CENTRIC)?,
            monolithic: config.get_boolean_value(s::OPTION_BUILD_MONOLITHIC)?,
            allow_registry_overrides: config.get_boolean_value(s::OPTION_ALLOW_REGISTRY_OVERRIDES)?,
            android_deploy: config.get_boolean_value(s::OPTION_ANDROID_DEPLOY)?,
            configure_args: Vec::new(),
            build_args: Vec::new(),
            clean: false,
        })
    }
}

/// The host build tooling an export drives.
#[derive(Debug, Clone)]
pub struct HostToolchain {
    pub host: Platform,
    pub generator: Generator,
    pub cmake: PathBuf,
}

impl HostToolchain {
    /// Find CMake on `PATH` and pick the host generator.
    ///
    /// # Errors
    /// Returns an error on an unsupported host or when CMake is not installed.
    pub fn detect() -> Result<Self, EngineError> {
        let host = host_platform()?;
        let cmake = which("cmake").ok_or_else(|| {
            EngineError::export("CMake could not be found on PATH. Install CMake 3.24 or newer to export projects.")
        })?;
        let probe = |tool: &str, arg: &str| {
            which(tool)
                .and_then(|path| run_command(Command::new(path).arg(arg)).ok())
                .is_some_and(|out| out.success)
        };
        let ninja = probe("ninja", "--version");
        let xcode = host == Platform::Mac && probe("xcodebuild", "-version");
        let generator = host_generator(host, ninja, xcode);
        tracing::debug!(host = %host, generator = ?generator.name, cmake = %cmake.display(), "detected host toolchain");
        Ok(Self { host, generator, cmake })
    }
}

/// One export invocation.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub project_name: String,
    pub project_path: PathBuf,
    pub engine_path: PathBuf,
    pub platform: Platform,
    pub options: ExportOptions,
}

/// What an export produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Layout directories, one per launcher.
    pub layouts: Vec<PathBuf>,
    pub archives: Vec<PathBuf>,
    pub bundles: Vec<PathBuf>,
    /// Folder holding the APKs of an Android export.
    pub apk_dir: Option<PathBuf>,
    pub duration: std::time::Duration,
}

/// Folders an export reads and writes, after path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportPaths {
    tools: PathBuf,
    launcher_build: PathBuf,
    bundling: PathBuf,
    output: PathBuf,
    android_build: PathBuf,
}

/// Run the export pipeline.
///
/// Steps:
/// 1. Check the target platform and classify the engine (SDK or source)
/// 2. Resolve build folders and decide monolithic vs. modular launchers
/// 3. Validate seed lists and seed files
/// 4. Empty the output folders when `--clean` was given
/// 5. Build the asset tools (source engines only)
/// 6. Process assets
/// 7. Bundle assets
/// 8. Android: generate and build the Gradle project with the bundles
///    packaged into the APK
/// 9. Desktop: build the launchers, then assemble and archive one layout
///    per launcher
///
/// `android` carries the `android` tool settings and is required only when
/// exporting for Android.
///
/// # Errors
/// Returns `ExportProject` for a failed stage or precondition, carrying the
/// child tool's exit code when one failed.
pub fn export_project(
    request: &ExportRequest,
    toolchain: &HostToolchain,
    android: Option<&ConfigStore>,
    token: &CancelToken,
) -> Result<ExportOutcome, EngineError> {
    let start = Instant::now();
    let opts = &request.options;
    let host = toolchain.host;

    // 1. Platform and engine kind.
    if request.platform != host && request.platform != Platform::Android {
        return Err(EngineError::export(format!(
            "Exporting for {} is not supported on a {} host.",
            request.platform, host
        )));
    }
    let sdk = is_sdk_engine(&request.engine_path, host);
    tracing::info!(
        project = %request.project_name,
        platform = %request.platform,
        engine = %request.engine_path.display(),
        sdk,
        "exporting project"
    );

    // 2. Paths and launcher linkage.
    let paths = resolve_paths(request, host, sdk);
    let monolithic = if sdk {
        opts.project_config == BuildConfig::Release
    } else {
        opts.monolithic
    };
    if sdk && monolithic && !has_monolithic_artifacts(&request.engine_path, host) {
        return Err(EngineError::export(format!(
            "The engine at '{}' was installed without monolithic artifacts, which a {} export requires. \
             Install the monolithic components of the engine or export a profile build.",
            request.engine_path.display(),
            opts.project_config
        )));
    }

    // 3. Seeds.
    let seedlists = validate_artifact_paths(&request.project_path, &opts.seedlist_paths, "seed list file")?;
    let seedfiles = validate_artifact_paths(&request.project_path, &opts.seedfile_paths, "seed file")?;

    // 4. Clean.
    if opts.clean {
        let mut dirs = vec![&paths.launcher_build, &paths.bundling, &paths.output];
        if !sdk {
            dirs.push(&paths.tools);
        }
        if request.platform == Platform::Android {
            dirs.push(&paths.android_build);
        }
        for dir in dirs {
            tracing::info!(dir = %dir.display(), "cleaning");
            o3de_util::fs::clean_dir(dir)?;
        }
    }

    let ctx = ExportContext {
        project_name: request.project_name.clone(),
        project_path: request.project_path.clone(),
        engine_path: request.engine_path.clone(),
        engine_centric: opts.engine_centric,
        generator: toolchain.generator.clone(),
        cmake: toolchain.cmake.clone(),
        configure_args: opts.configure_args.clone(),
        build_args: opts.build_args.clone(),
        token: token.clone(),
    };

    // 5. Tools.
    if sdk {
        tracing::debug!(tools = %paths.tools.display(), "using the engine's prebuilt tools");
    } else if opts.build_tools {
        build_export_toolchain(&ctx, &paths.tools, opts.tool_config)?;
    }
    let tool_config = opts.tool_config.as_str();

    // 6. Assets.
    let platforms = [request.platform];
    if opts.build_assets {
        let processor = require_tool(&paths.tools, ASSET_PROCESSOR_BATCH, sdk, tool_config, host)?;
        build_assets(&ctx, &processor, &platforms, opts.fail_on_asset_errors)?;
    }

    // 7. Bundles.
    let bundler = require_tool(&paths.tools, ASSET_BUNDLER_BATCH, sdk, tool_config, host)?;
    let bundles = bundle_assets(
        &ctx,
        &BundleRequest {
            asset_bundler: &bundler,
            bundling_path: &paths.bundling,
            platforms: &platforms,
            seedlist_paths: &seedlists,
            seedfile_paths: &seedfiles,
            level_names: &opts.level_names,
            max_size_mb: opts.max_size_mb,
        },
    )?;

    let mut outcome = ExportOutcome {
        bundles,
        ..ExportOutcome::default()
    };

    // 8. Android.
    if request.platform == Platform::Android {
        let config = android.ok_or_else(|| {
            EngineError::export("Android settings are required to export for Android. Run `o3de android configure` first.")
        })?;
        outcome.apk_dir = Some(export_android(request, &paths, monolithic, config, &outcome.bundles, token)?);
        outcome.duration = start.elapsed();
        return Ok(outcome);
    }

    // 9. Desktop launchers and layouts.
    build_game_targets(
        &ctx,
        &GameBuild {
            launcher_build_path: &paths.launcher_build,
            config: opts.project_config,
            monolithic,
            allow_registry_overrides: opts.allow_registry_overrides,
            launchers: &opts.launchers,
        },
    )?;

    let sources = LayoutSources {
        project_path: &request.project_path,
        project_name: &request.project_name,
        engine_path: &request.engine_path,
        platform: request.platform,
        launcher_build_path: &paths.launcher_build,
        build_config: opts.project_config,
        bundles: &outcome.bundles,
    };
    let mut layouts = Vec::new();
    let mut archives = Vec::new();
    for kind in LauncherKind::ALL.iter().filter(|k| opts.launchers.contains(k)) {
        let layout = ExportLayout::for_launcher(
            *kind,
            &paths.output,
            &request.project_name,
            &opts.game_file_patterns,
            &opts.server_file_patterns,
            &opts.project_file_patterns,
        );
        if let Some(archive) = setup_launcher_layout(&sources, &layout, opts.archive_format)? {
            archives.push(archive);
        }
        layouts.push(layout.output_path);
    }
    outcome.layouts = layouts;
    outcome.archives = archives;
    outcome.duration = start.elapsed();

    tracing::info!(
        layouts = outcome.layouts.len(),
        elapsed = ?outcome.duration,
        "export of {} complete",
        request.project_name
    );
    Ok(outcome)
}

fn resolve_paths(request: &ExportRequest, host: Platform, sdk: bool) -> ExportPaths {
    let opts = &request.options;
    let project = request.project_path.as_path();
    let base: &Path = if opts.engine_centric {
        &request.engine_path
    } else {
        project
    };

    let tools = if sdk {
        sdk_tools_path(&request.engine_path, host, opts.tool_config.as_str())
    } else {
        resolve_build_path(base, opts.tools_build_path.as_deref(), "build/tools")
    };
    ExportPaths {
        tools,
        launcher_build: resolve_build_path(project, opts.launcher_build_path.as_deref(), "build/launcher"),
        bundling: resolve_build_path(base, opts.asset_bundling_path.as_deref(), "build/asset_bundling"),
        output: resolve_build_path(project, opts.output_path.as_deref(), "build/export"),
        android_build: resolve_build_path(project, opts.android_build_path.as_deref(), "build/android"),
    }
}

/// Copy the bundles into the Gradle app's assets and build the APK.
fn export_android(
    request: &ExportRequest,
    paths: &ExportPaths,
    monolithic: bool,
    config: &ConfigStore,
    bundles: &[PathBuf],
    token: &CancelToken,
) -> Result<PathBuf, EngineError> {
    let assets = paths.android_build.join("app").join("src").join("main").join("assets");
    o3de_util::fs::ensure_dir(&assets)?;
    for bundle in bundles {
        if let Some(name) = bundle.file_name() {
            o3de_util::fs::copy_file(bundle, &assets.join(name))?;
        }
    }

    let output = o3de_android::build_android_project(
        config,
        &o3de_android::AndroidBuildRequest {
            engine_root: request.engine_path.clone(),
            project_root: request.project_path.clone(),
            build_dir: paths.android_build.clone(),
            config: request.options.project_config,
            monolithic,
            deploy: request.options.android_deploy,
            include_assets_in_apk: true,
        },
        token,
    )?;
    Ok(output.apk_dir)
}
