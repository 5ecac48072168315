//! Settings catalogue for the `android` tool.

use o3de_config::SettingsDescription;

/// Tool name; settings live in `.o3de/android.config`.
pub const TOOL: &str = "android";

pub const SDK_ROOT: &str = "sdk.root";
pub const SDK_CMDLINE_TOOLS_ROOT: &str = "sdk.cmdline.tools.root";
pub const GRADLE_HOME: &str = "gradle.home";
pub const CMAKE_HOME: &str = "cmake.home";
pub const NINJA_HOME: &str = "ninja.home";
pub const JAVA_HOME: &str = "java.home";
pub const NDK_VERSION: &str = "ndk.version";
pub const PLATFORM_SDK_API_LEVEL: &str = "platform.sdk.api.level";
pub const ANDROID_GRADLE_PLUGIN: &str = "android.gradle.plugin";
pub const EXTRA_CMAKE_ARGS: &str = "extra.cmake.args";
pub const ASSET_MODE: &str = "asset.mode";
pub const STRIP_DEBUG: &str = "strip.debug";
pub const OCULUS_PROJECT: &str = "oculus.project";
pub const NATIVE_BUILD_PATH: &str = "native.build.path";
pub const SIGNCONFIG_STORE_FILE: &str = "signconfig.store.file";
pub const SIGNCONFIG_KEY_ALIAS: &str = "signconfig.key.alias";
pub const SIGNCONFIG_STORE_PASSWORD: &str = "signconfig.store.password";
pub const SIGNCONFIG_KEY_PASSWORD: &str = "signconfig.key.password";

pub const ASSET_MODE_LOOSE: &str = "LOOSE";
pub const ASSET_MODE_PAK: &str = "PAK";

/// Every key the `android` tool understands.
pub static ANDROID_SETTINGS: &[SettingsDescription] = &[
    SettingsDescription::new(SDK_ROOT, "The root of the Android SDK installation.")
        .env(&["ANDROID_SDK_ROOT", "ANDROID_HOME"]),
    SettingsDescription::new(
        SDK_CMDLINE_TOOLS_ROOT,
        "The Android SDK command line tools folder that contains bin/sdkmanager.",
    ),
    SettingsDescription::new(GRADLE_HOME, "The Gradle installation to use when it is not on PATH.")
        .env(&["GRADLE_HOME"]),
    SettingsDescription::new(CMAKE_HOME, "The CMake installation to use when it is not on PATH."),
    SettingsDescription::new(NINJA_HOME, "The folder containing ninja when it is not on PATH."),
    SettingsDescription::new(JAVA_HOME, "The Java Development Kit used by Gradle and sdkmanager.")
        .env(&["JAVA_HOME"]),
    SettingsDescription::new(NDK_VERSION, "The NDK package version to use. Wildcards pick the newest match.")
        .default_value("25.*"),
    SettingsDescription::new(PLATFORM_SDK_API_LEVEL, "The Android platform API level to compile against.")
        .default_value("33")
        .pattern("[0-9]+"),
    SettingsDescription::new(ANDROID_GRADLE_PLUGIN, "The Android Gradle Plugin version for generated projects.")
        .default_value("8.1.0"),
    SettingsDescription::new(
        EXTRA_CMAKE_ARGS,
        "Additional CMake configure arguments for the native build. Multiple arguments are separated by semi-colon (;).",
    ),
    SettingsDescription::new(ASSET_MODE, "How assets are stored in the APK.")
        .default_value(ASSET_MODE_PAK)
        .one_of(&[ASSET_MODE_LOOSE, ASSET_MODE_PAK]),
    SettingsDescription::new(STRIP_DEBUG, "Strip debug symbols from native libraries.").boolean(true),
    SettingsDescription::new(OCULUS_PROJECT, "Build for Oculus OpenXR devices.").boolean(false),
    SettingsDescription::new(NATIVE_BUILD_PATH, "The native build staging folder, relative to the app project.")
        .default_value("o3de"),
    SettingsDescription::new(SIGNCONFIG_STORE_FILE, "The keystore file used to sign the APK."),
    SettingsDescription::new(SIGNCONFIG_KEY_ALIAS, "The key alias inside the keystore."),
    SettingsDescription::new(SIGNCONFIG_STORE_PASSWORD, "The keystore password.").password(),
    SettingsDescription::new(SIGNCONFIG_KEY_PASSWORD, "The key password.").password(),
];
