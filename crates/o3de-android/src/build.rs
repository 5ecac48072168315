//! End-to-end Android build: host validation, SDK packages, project
//! generation, and the Gradle assemble/install steps.

use std::path::{Path, PathBuf};
use std::process::Command;

use o3de_config::ConfigStore;
use o3de_targets::BuildConfig;
use o3de_util::process::{find_executable_in, run_streamed, CancelToken};

use crate::detect::{
    gradle_plugin_requirements, validate_cmake, validate_gradle, validate_java_environment, validate_ninja,
    GradlePluginRequirements, ToolInfo,
};
use crate::error::AndroidError;
use crate::generate::{read_android_settings, AndroidProjectGenerator, SigningConfig, APP_NAME};
use crate::sdk::AndroidSdkManager;
use crate::settings;

/// Validated host tools for one build.
#[derive(Debug, Clone)]
pub struct HostTools {
    pub java: ToolInfo,
    pub gradle: ToolInfo,
    pub cmake: ToolInfo,
    pub ninja: ToolInfo,
    pub requirements: GradlePluginRequirements,
}

/// Locate every host tool and check it against the configured plugin version.
///
/// # Errors
/// Returns the first tool or compatibility failure.
pub fn validate_host_tools(config: &ConfigStore) -> Result<HostTools, AndroidError> {
    let plugin = config.get_value_or(settings::ANDROID_GRADLE_PLUGIN, "8.1.0")?;
    let requirements = gradle_plugin_requirements(&plugin)?;

    let java = validate_java_environment(config)?;
    requirements.validate_java_version(&java.version)?;
    let gradle = validate_gradle(config)?;
    requirements.validate_gradle_version(&gradle.version)?;
    let cmake = validate_cmake(config)?;
    let ninja = validate_ninja(config)?;

    Ok(HostTools {
        java,
        gradle,
        cmake,
        ninja,
        requirements,
    })
}

/// What to build.
#[derive(Debug, Clone)]
pub struct AndroidBuildRequest {
    pub engine_root: PathBuf,
    pub project_root: PathBuf,
    pub build_dir: PathBuf,
    pub config: BuildConfig,
    pub monolithic: bool,
    /// Install the APK on a connected device after assembling it.
    pub deploy: bool,
    pub include_assets_in_apk: bool,
}

/// Where the build put its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidBuildOutput {
    pub build_dir: PathBuf,
    pub apk_dir: PathBuf,
}

/// Build an APK for the project in `request`.
///
/// 1. Validate the host tools
/// 2. Install the platform, build tools, and NDK packages
/// 3. Generate the Gradle project
/// 4. `gradlew assemble<Config>`
/// 5. `gradlew install<Config>` when deploying
///
/// # Errors
/// Any tool, SDK, settings, or Gradle failure. Gradle failures carry the
/// child's exit code.
pub fn build_android_project(
    config: &ConfigStore,
    request: &AndroidBuildRequest,
    token: &CancelToken,
) -> Result<AndroidBuildOutput, AndroidError> {
    // 1. Host tools
    let tools = validate_host_tools(config)?;

    // 2. SDK packages
    let api_level = config.get_value_or(settings::PLATFORM_SDK_API_LEVEL, "33")?;
    let ndk_version = config.get_value_or(settings::NDK_VERSION, "25.*")?;
    let mut sdk = AndroidSdkManager::new(config, &tools.java.version)?;
    sdk.install_package(&format!("platforms;android-{api_level}"), "Android SDK Platform")?;
    let build_tools = sdk.install_package(
        &format!("build-tools;{}", tools.requirements.sdk_build_tools),
        "Android SDK Build Tools",
    )?;
    let ndk = sdk.install_package(&format!("ndk;{ndk_version}"), "Android NDK")?;

    // 3. Gradle project
    let project = read_android_settings(&request.project_root)?;
    let asset_mode = config.get_value_or(settings::ASSET_MODE, settings::ASSET_MODE_PAK)?;
    let generator = AndroidProjectGenerator {
        engine_root: request.engine_root.clone(),
        build_dir: request.build_dir.clone(),
        sdk_root: sdk.sdk_root().to_path_buf(),
        build_tools_version: build_tools.version,
        platform_api_level: api_level,
        ndk,
        project_path: request.project_root.clone(),
        project,
        cmake_path: tools.cmake.path.clone(),
        cmake_version: tools.cmake.version.clone(),
        gradle_path: tools.gradle.path.clone(),
        gradle_plugin_version: tools.requirements.plugin_version.clone(),
        ninja_path: Some(tools.ninja.path.clone()),
        include_assets_in_apk: request.include_assets_in_apk,
        asset_mode,
        asset_type: "android".to_owned(),
        signing: SigningConfig::from_config(config)?,
        native_build_path: config.get_value_or(settings::NATIVE_BUILD_PATH, "o3de")?,
        extra_cmake_args: config.get_list_value(settings::EXTRA_CMAKE_ARGS)?,
        monolithic: request.monolithic,
        oculus: config.get_boolean_value(settings::OCULUS_PROJECT)?,
        strip_debug: config.get_boolean_value(settings::STRIP_DEBUG)?,
    };
    generator.execute()?;

    // 4. Assemble
    let variant = request.config.variant();
    run_gradlew(&request.build_dir, &tools.java, &format!("assemble{variant}"), token)?;

    // 5. Deploy
    if request.deploy {
        run_gradlew(&request.build_dir, &tools.java, &format!("install{variant}"), token)?;
    }

    let apk_dir = request
        .build_dir
        .join(APP_NAME)
        .join("build")
        .join("outputs")
        .join("apk")
        .join(request.config.as_str());
    tracing::info!(apk_dir = %apk_dir.display(), "android build complete");
    Ok(AndroidBuildOutput {
        build_dir: request.build_dir.clone(),
        apk_dir,
    })
}

fn run_gradlew(build_dir: &Path, java: &ToolInfo, task: &str, token: &CancelToken) -> Result<(), AndroidError> {
    let gradlew = find_executable_in(build_dir, "gradlew").ok_or_else(|| AndroidError::Gradle {
        message: format!("no gradle wrapper in {}", build_dir.display()),
        code: None,
    })?;

    let mut cmd = Command::new(&gradlew);
    cmd.arg(task).current_dir(build_dir);
    // gradlew picks the JDK from JAVA_HOME; point it at the validated one.
    if let Some(java_home) = java.path.parent().and_then(Path::parent) {
        cmd.env("JAVA_HOME", java_home);
    }

    tracing::info!(task, "running gradle");
    match run_streamed(&mut cmd, token)? {
        Some(0) => Ok(()),
        code => Err(AndroidError::Gradle {
            message: format!("gradle task {task} failed"),
            code,
        }),
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::tests::{fake_tool, store};
    use crate::generate::tests::android_project;

    const LISTING: &str = "\
Installed packages:
  Path | Version | Description | Location
  ------- | ------- | ------- | -------
  platforms;android-33 | 2 | Android SDK Platform 33 | platforms/android-33
  build-tools;33.0.1 | 33.0.1 | Android SDK Build-Tools 33.0.1 | build-tools/33.0.1
  ndk;25.2.9519653 | 25.2.9519653 | NDK (Side by side) 25.2.9519653 | ndk/25.2.9519653
";

    /// Fake JDK, Gradle, CMake, Ninja, and SDK under `root`; returns the overrides
    /// pointing the android settings at them.
    fn fake_host(root: &Path, gradlew_exit: i32) -> Vec<String> {
        fake_tool(
            &root.join("jdk").join("bin"),
            "java",
            "echo 'openjdk version \"17.0.8\" 2023-07-18' >&2",
        );
        let gradlew = format!(
            "#!/bin/sh\necho $1 >> gradle.log\nmkdir -p app/build/outputs/apk/profile\nexit {gradlew_exit}\n"
        );
        fake_tool(
            &root.join("gradle").join("bin"),
            "gradle",
            &format!(
                r#"case "$1" in
  --version) echo 'Gradle 8.2.1' ;;
  wrapper) printf '{gradlew}' > "$3/gradlew"; chmod +x "$3/gradlew" ;;
esac"#
            ),
        );
        fake_tool(&root.join("cmake").join("bin"), "cmake", "echo 'cmake version 3.24.2'");
        fake_tool(&root.join("ninja"), "ninja", "echo '1.11.1'");

        let listing = root.join("listing.txt");
        std::fs::write(&listing, LISTING).unwrap();
        let tools = root.join("sdk").join("cmdline-tools");
        fake_tool(
            &tools.join("latest").join("bin"),
            "sdkmanager",
            &format!(
                r#"for arg in "$@"; do
  case "$arg" in
    --version) echo 12.0; exit 0 ;;
    --list) cat "{}"; exit 0 ;;
  esac
done
exit 1"#,
                listing.display()
            ),
        );

        vec![
            format!("java.home={}", root.join("jdk").display()),
            format!("gradle.home={}", root.join("gradle").display()),
            format!("cmake.home={}", root.join("cmake").display()),
            format!("ninja.home={}", root.join("ninja").display()),
            format!("sdk.cmdline.tools.root={}", tools.display()),
        ]
    }

    fn request(root: &Path, project: &Path, deploy: bool) -> AndroidBuildRequest {
        AndroidBuildRequest {
            engine_root: root.join("engine"),
            project_root: project.to_path_buf(),
            build_dir: root.join("build").join("android"),
            config: BuildConfig::Profile,
            monolithic: false,
            deploy,
            include_assets_in_apk: true,
        }
    }

    #[test]
    fn host_tools_are_validated_together() {
        let tmp = tempfile::tempdir().unwrap();
        let overrides = fake_host(tmp.path(), 0);
        let config = store(&tmp.path().join(".o3de"), &overrides);
        let tools = validate_host_tools(&config).unwrap();
        assert_eq!(tools.java.version, "17.0.8");
        assert_eq!(tools.gradle.version, "8.2.1");
        assert_eq!(tools.cmake.version, "3.24.2");
        assert_eq!(tools.requirements.sdk_build_tools, "33.0.1");
    }

    #[test]
    fn old_plugin_line_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut overrides = fake_host(tmp.path(), 0);
        overrides.push("android.gradle.plugin=7.4.2".to_owned());
        let config = store(&tmp.path().join(".o3de"), &overrides);
        let err = validate_host_tools(&config).unwrap_err();
        assert!(matches!(err, AndroidError::UnknownGradlePlugin { .. }));
    }

    #[test]
    fn builds_and_deploys_profile_apk() {
        let tmp = tempfile::tempdir().unwrap();
        let overrides = fake_host(tmp.path(), 0);
        let config = store(&tmp.path().join(".o3de"), &overrides);
        let project = android_project(tmp.path(), "MyGame");

        let output = build_android_project(&config, &request(tmp.path(), &project, true), &CancelToken::new()).unwrap();
        assert_eq!(
            output.apk_dir,
            tmp.path().join("build/android/app/build/outputs/apk/profile")
        );
        assert!(output.apk_dir.is_dir());

        let log = std::fs::read_to_string(output.build_dir.join("gradle.log")).unwrap();
        let tasks: Vec<_> = log.lines().collect();
        assert_eq!(tasks, ["assembleProfile", "installProfile"]);

        let app = std::fs::read_to_string(output.build_dir.join("app").join("build.gradle")).unwrap();
        assert!(!app.contains("LY_MONOLITHIC_GAME"));
        assert!(app.contains("-DCMAKE_MAKE_PROGRAM="));
    }

    #[test]
    fn gradle_failure_propagates_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let overrides = fake_host(tmp.path(), 3);
        let config = store(&tmp.path().join(".o3de"), &overrides);
        let project = android_project(tmp.path(), "MyGame");

        let err = build_android_project(&config, &request(tmp.path(), &project, false), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, AndroidError::Gradle { code: Some(3), .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn cancelled_build_stops_before_gradle() {
        let tmp = tempfile::tempdir().unwrap();
        let overrides = fake_host(tmp.path(), 0);
        let config = store(&tmp.path().join(".o3de"), &overrides);
        let project = android_project(tmp.path(), "MyGame");
        let token = CancelToken::new();
        token.cancel();

        let err = build_android_project(&config, &request(tmp.path(), &project, false), &token).unwrap_err();
        assert!(matches!(
            err,
            AndroidError::Util(o3de_util::error::UtilError::Interrupted { .. })
        ));
        assert!(!tmp.path().join("build/android/gradle.log").exists());
    }
}
