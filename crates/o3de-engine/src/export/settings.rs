//! Settings catalogue for the `export_project` tool.

use o3de_config::SettingsDescription;

pub const TOOL: &str = "export_project";

pub const PROJECT_BUILD_CONFIG: &str = "project.build.config";
pub const TOOL_BUILD_CONFIG: &str = "tool.build.config";
pub const ARCHIVE_OUTPUT_FORMAT: &str = "archive.output.format";
pub const OPTION_BUILD_ASSETS: &str = "option.build.assets";
pub const OPTION_FAIL_ON_ASSET_ERRORS: &str = "option.fail.on.asset.errors";
pub const SEEDLIST_PATHS: &str = "seedlist.paths";
pub const SEEDFILE_PATHS: &str = "seedfile.paths";
pub const DEFAULT_LEVEL_NAMES: &str = "default.level.names";
pub const GAME_FILE_PATTERNS: &str = "additional.game.project.file.pattern.to.copy";
pub const SERVER_FILE_PATTERNS: &str = "additional.server.project.file.pattern.to.copy";
pub const PROJECT_FILE_PATTERNS: &str = "additional.project.file.pattern.to.copy";
pub const OPTION_BUILD_TOOLS: &str = "option.build.tools";
pub const DEFAULT_BUILD_TOOLS_PATH: &str = "default.build.tools.path";
pub const DEFAULT_LAUNCHER_BUILD_PATH: &str = "default.launcher.build.path";
pub const ASSET_BUNDLING_PATH: &str = "asset.bundling.path";
pub const MAX_SIZE: &str = "max.size";
pub const OPTION_BUILD_GAME_LAUNCHER: &str = "option.build.game.launcher";
pub const OPTION_BUILD_SERVER_LAUNCHER: &str = "option.build.server.launcher";
pub const OPTION_BUILD_HEADLESS_SERVER_LAUNCHER: &str = "option.build.headless.server.launcher";
pub const OPTION_BUILD_UNIFIED_LAUNCHER: &str = "option.build.unified.launcher";
pub const OPTION_ENGINE_CENTRIC: &str = "option.engine.centric";
pub const OPTION_BUILD_MONOLITHIC: &str = "option.build.monolithic";
pub const OPTION_ALLOW_REGISTRY_OVERRIDES: &str = "option.allow.registry.overrides";
pub const DEFAULT_OUTPUT_PATH: &str = "default.output.path";
pub const DEFAULT_ANDROID_BUILD_PATH: &str = "default.android.build.path";
pub const OPTION_ANDROID_DEPLOY: &str = "option.android.deploy";

pub static EXPORT_SETTINGS: &[SettingsDescription] = &[
    SettingsDescription::new(PROJECT_BUILD_CONFIG, "The build configuration for the exported launchers.")
        .default_value("profile")
        .pattern("(profile|release)"),
    SettingsDescription::new(TOOL_BUILD_CONFIG, "The build configuration for the engine tools.")
        .default_value("profile")
        .pattern("(debug|profile|release)"),
    SettingsDescription::new(ARCHIVE_OUTPUT_FORMAT, "Archive format for each exported layout.")
        .default_value("none")
        .one_of(&["none", "zip", "gzip", "bz2", "xz"]),
    SettingsDescription::new(OPTION_BUILD_ASSETS, "Process the project assets before bundling.").boolean(false),
    SettingsDescription::new(
        OPTION_FAIL_ON_ASSET_ERRORS,
        "Abort the export when the asset processor reports errors.",
    )
    .boolean(false),
    SettingsDescription::new(SEEDLIST_PATHS, "Seed list files for bundling, separated by semi-colon (;)."),
    SettingsDescription::new(SEEDFILE_PATHS, "Individual seed assets for bundling, separated by semi-colon (;)."),
    SettingsDescription::new(
        DEFAULT_LEVEL_NAMES,
        "Level names whose spawnables are added as seeds, separated by semi-colon (;).",
    ),
    SettingsDescription::new(GAME_FILE_PATTERNS, "Extra project file patterns copied into game layouts."),
    SettingsDescription::new(SERVER_FILE_PATTERNS, "Extra project file patterns copied into server layouts."),
    SettingsDescription::new(PROJECT_FILE_PATTERNS, "Extra project file patterns copied into every layout."),
    SettingsDescription::new(OPTION_BUILD_TOOLS, "Build the asset tools for source engines.").boolean(true),
    SettingsDescription::new(DEFAULT_BUILD_TOOLS_PATH, "Build folder for the asset tools.")
        .default_value("build/tools"),
    SettingsDescription::new(DEFAULT_LAUNCHER_BUILD_PATH, "Build folder for the launchers.")
        .default_value("build/launcher"),
    SettingsDescription::new(ASSET_BUNDLING_PATH, "Working folder for asset lists and bundles.")
        .default_value("build/asset_bundling"),
    SettingsDescription::new(MAX_SIZE, "Maximum bundle size in megabytes.")
        .default_value("2048")
        .pattern("[0-9]+"),
    SettingsDescription::new(OPTION_BUILD_GAME_LAUNCHER, "Build and lay out the game launcher.").boolean(true),
    SettingsDescription::new(OPTION_BUILD_SERVER_LAUNCHER, "Build and lay out the server launcher.").boolean(true),
    SettingsDescription::new(
        OPTION_BUILD_HEADLESS_SERVER_LAUNCHER,
        "Build and lay out the headless server launcher.",
    )
    .boolean(false),
    SettingsDescription::new(OPTION_BUILD_UNIFIED_LAUNCHER, "Build and lay out the unified launcher.").boolean(true),
    SettingsDescription::new(
        OPTION_ENGINE_CENTRIC,
        "Place tool and bundling builds under the engine instead of the project.",
    )
    .boolean(false),
    SettingsDescription::new(OPTION_BUILD_MONOLITHIC, "Build monolithic launchers.").boolean(true),
    SettingsDescription::new(
        OPTION_ALLOW_REGISTRY_OVERRIDES,
        "Allow settings registry development overrides in the launchers.",
    )
    .boolean(false),
    SettingsDescription::new(DEFAULT_OUTPUT_PATH, "Folder the exported layouts are written to.")
        .default_value("build/export"),
    SettingsDescription::new(DEFAULT_ANDROID_BUILD_PATH, "Folder the Android Gradle project is generated in.")
        .default_value("build/android"),
    SettingsDescription::new(OPTION_ANDROID_DEPLOY, "Install the APK on a connected device after building.")
        .boolean(false),
];
