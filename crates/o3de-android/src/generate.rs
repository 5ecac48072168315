//! Gradle project generation for an O3DE project.

use std::path::{Path, PathBuf};
use std::process::Command;

use o3de_config::ConfigStore;
use o3de_targets::BuildConfig;
use o3de_util::fs::write_atomic;
use o3de_util::process::run_command;
use serde::Deserialize;

use crate::error::AndroidError;
use crate::sdk::SdkPackage;
use crate::settings;

/// ABI every generated project targets.
pub const ANDROID_ARCH: &str = "arm64-v8a";

/// Name of the gradle module that produces the APK.
pub const APP_NAME: &str = "app";

/// File the deployment scripts read the generation parameters from.
pub const PLATFORM_SETTINGS_FILE: &str = "platform_settings.ini";

/// Keystore parameters for the `signingConfigs` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    pub store_file: PathBuf,
    pub store_password: String,
    pub key_alias: String,
    pub key_password: String,
}

impl SigningConfig {
    /// Read the signing settings.
    ///
    /// A missing or incomplete keystore/alias pair yields `None` with a
    /// warning. Missing passwords are warned about and left empty.
    ///
    /// # Errors
    /// Returns a config error when a stored value cannot be read.
    pub fn from_config(config: &ConfigStore) -> Result<Option<Self>, AndroidError> {
        let store_file = config.get_value(settings::SIGNCONFIG_STORE_FILE)?;
        let key_alias = config.get_value(settings::SIGNCONFIG_KEY_ALIAS)?;

        let (store_file, key_alias) = match (store_file, key_alias) {
            (Some(store_file), Some(key_alias)) => (store_file, key_alias),
            (None, None) => {
                tracing::warn!("no signing configuration is set; the APK will not be signed with a release key");
                return Ok(None);
            }
            (store_file, _) => {
                let missing = if store_file.is_none() {
                    settings::SIGNCONFIG_STORE_FILE
                } else {
                    settings::SIGNCONFIG_KEY_ALIAS
                };
                tracing::warn!(missing, "signing configuration is incomplete and will be ignored");
                return Ok(None);
            }
        };

        let password = |key: &str| -> Result<String, AndroidError> {
            match config.get_value(key)? {
                Some(value) => Ok(value),
                None => {
                    tracing::warn!(key, "signing password is not set");
                    Ok(String::new())
                }
            }
        };
        let store_password = password(settings::SIGNCONFIG_STORE_PASSWORD)?;
        let key_password = password(settings::SIGNCONFIG_KEY_PASSWORD)?;

        Ok(Some(Self {
            store_file: PathBuf::from(store_file),
            store_password,
            key_alias,
            key_password,
        }))
    }

    fn gradle_fields(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        format!(
            "{pad}storeFile file('{}')\n{pad}storePassword '{}'\n{pad}keyPassword '{}'\n{pad}keyAlias '{}'\n",
            posix(&self.store_file),
            self.store_password,
            self.key_password,
            self.key_alias,
        )
    }
}

fn default_version_number() -> u32 {
    1
}

fn default_version_name() -> String {
    "1.0.0".to_owned()
}

fn default_orientation() -> String {
    "landscape".to_owned()
}

/// The `android_settings` object of a project.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AndroidSettings {
    pub package_name: String,
    #[serde(default = "default_version_number")]
    pub version_number: u32,
    #[serde(default = "default_version_name")]
    pub version_name: String,
    #[serde(default = "default_orientation")]
    pub orientation: String,
    #[serde(default)]
    pub enable_keep_screen_on: bool,
    #[serde(default)]
    pub disable_immersive_mode: bool,
}

/// Project identity plus its Android settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAndroidSettings {
    pub project_name: String,
    /// User-facing application name; falls back to the project name.
    pub product_name: String,
    pub android: AndroidSettings,
}

#[derive(Deserialize)]
struct ProjectJson {
    project_name: Option<String>,
    product_name: Option<String>,
    android_settings: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct AndroidProjectJson {
    android_settings: Option<serde_json::Value>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AndroidError> {
    let text = std::fs::read_to_string(path).map_err(|source| AndroidError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| AndroidError::ProjectSettings {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read the Android settings for the project at `project_path`.
///
/// `Platform/Android/android_project.json` is preferred; projects without it
/// may carry `android_settings` directly in `project.json`.
///
/// # Errors
/// Returns `ProjectSettings` when `project.json` lacks a name or no settings
/// object can be found, or when `package_name` is missing.
pub fn read_android_settings(project_path: &Path) -> Result<ProjectAndroidSettings, AndroidError> {
    let project_json_path = project_path.join("project.json");
    if !project_json_path.is_file() {
        return Err(AndroidError::ProjectSettings {
            path: project_path.to_path_buf(),
            message: "path does not contain 'project.json'".to_owned(),
        });
    }
    let project: ProjectJson = read_json(&project_json_path)?;
    let project_name = project.project_name.ok_or_else(|| AndroidError::ProjectSettings {
        path: project_path.to_path_buf(),
        message: "missing required 'project_name' key".to_owned(),
    })?;

    let android_json_path = project_path.join("Platform").join("Android").join("android_project.json");
    let raw = if android_json_path.is_file() {
        let android: AndroidProjectJson = read_json(&android_json_path)?;
        android.android_settings.ok_or_else(|| AndroidError::ProjectSettings {
            path: project_path.to_path_buf(),
            message: format!("missing 'android_settings' in {}", android_json_path.display()),
        })?
    } else {
        let legacy = project.android_settings.ok_or_else(|| AndroidError::ProjectSettings {
            path: project_path.to_path_buf(),
            message: format!(
                "{} does not exist and project.json has no 'android_settings'",
                android_json_path.display()
            ),
        })?;
        tracing::warn!(
            project = %project_name,
            expected = %android_json_path.display(),
            "no android_project.json; using the android settings in project.json"
        );
        legacy
    };

    let android: AndroidSettings = serde_json::from_value(raw).map_err(|e| AndroidError::ProjectSettings {
        path: project_path.to_path_buf(),
        message: e.to_string(),
    })?;
    if android.package_name.is_empty() {
        return Err(AndroidError::ProjectSettings {
            path: project_path.to_path_buf(),
            message: "'package_name' must not be empty".to_owned(),
        });
    }

    Ok(ProjectAndroidSettings {
        product_name: project.product_name.unwrap_or_else(|| project_name.clone()),
        project_name,
        android,
    })
}

/// Everything needed to lay out a Gradle project.
///
/// Tool paths and versions are expected to be validated already.
#[derive(Debug, Clone)]
pub struct AndroidProjectGenerator {
    pub engine_root: PathBuf,
    pub build_dir: PathBuf,
    pub sdk_root: PathBuf,
    pub build_tools_version: String,
    pub platform_api_level: String,
    pub ndk: SdkPackage,
    pub project_path: PathBuf,
    pub project: ProjectAndroidSettings,
    pub cmake_path: PathBuf,
    pub cmake_version: String,
    pub gradle_path: PathBuf,
    pub gradle_plugin_version: String,
    pub ninja_path: Option<PathBuf>,
    pub include_assets_in_apk: bool,
    pub asset_mode: String,
    pub asset_type: String,
    pub signing: Option<SigningConfig>,
    pub native_build_path: String,
    pub extra_cmake_args: Vec<String>,
    pub monolithic: bool,
    pub oculus: bool,
    /// Keep native symbols in the APK when `false`.
    pub strip_debug: bool,
}

impl AndroidProjectGenerator {
    /// Write the Gradle project and its wrapper into `build_dir`.
    ///
    /// 1. Platform settings and `local.properties`
    /// 2. The `app` module: `build.gradle` and `AndroidManifest.xml`
    /// 3. Root `build.gradle`, `settings.gradle`, `gradle.properties`
    /// 4. `gradle wrapper`
    ///
    /// # Errors
    /// Returns an I/O error when a file cannot be written, or `Gradle` when
    /// the wrapper could not be generated.
    pub fn execute(&self) -> Result<(), AndroidError> {
        tracing::info!(build_dir = %self.build_dir.display(), "generating android project");

        // 1.
        self.write(PLATFORM_SETTINGS_FILE, &self.platform_settings())?;
        self.write("local.properties", &self.local_properties())?;

        // 2.
        let app = Path::new(APP_NAME);
        self.write(app.join("build.gradle"), &self.app_build_gradle())?;
        self.write(
            app.join("src").join("main").join("AndroidManifest.xml"),
            &self.android_manifest(),
        )?;

        // 3.
        self.write("build.gradle", &self.root_build_gradle())?;
        self.write("settings.gradle", &format!("include ':{APP_NAME}'\n"))?;
        self.write("gradle.properties", GRADLE_PROPERTIES)?;

        // 4.
        self.prepare_gradle_wrapper()
    }

    fn write(&self, relative: impl AsRef<Path>, contents: &str) -> Result<(), AndroidError> {
        let path = self.build_dir.join(relative);
        write_atomic(&path, contents.as_bytes())?;
        tracing::debug!(file = %path.display(), "generated");
        Ok(())
    }

    /// Run `gradle wrapper` so the build can proceed with `gradlew`.
    ///
    /// # Errors
    /// Returns `Gradle` with the exit code when gradle fails.
    pub fn prepare_gradle_wrapper(&self) -> Result<(), AndroidError> {
        tracing::info!("preparing gradle wrapper");
        let output = run_command(
            Command::new(&self.gradle_path)
                .arg("wrapper")
                .arg("-p")
                .arg(&self.build_dir),
        )?;
        if !output.success {
            return Err(AndroidError::Gradle {
                message: format!(
                    "Gradle was unable to generate a gradle wrapper for this project (code {}): {}",
                    output.exit_code.map_or_else(|| "signal".to_owned(), |c| c.to_string()),
                    output.text().trim()
                ),
                code: output.exit_code,
            });
        }
        Ok(())
    }

    fn platform_settings(&self) -> String {
        format!(
            "[settings]\nplatform=android\ngame_projects={}\nasset_deploy_mode={}\nasset_deploy_type={}\n\n\
             [android]\nandroid_sdk_path={}\nembed_assets_in_apk={}\nis_unit_test=false\nandroid_gradle_plugin={}\n",
            posix(&self.project_path),
            self.asset_mode,
            self.asset_type,
            posix(&self.sdk_root),
            self.include_assets_in_apk,
            self.gradle_plugin_version,
        )
    }

    fn local_properties(&self) -> String {
        let mut out = format!("sdk.dir={}\n", posix(&self.sdk_root));
        // cmake.dir names the install root, two levels above the executable.
        if let Some(cmake_dir) = self.cmake_path.parent().and_then(Path::parent) {
            out.push_str(&format!("cmake.dir={}\n", posix(cmake_dir)));
        }
        out
    }

    fn root_build_gradle(&self) -> String {
        format!(
            r#"buildscript {{
    repositories {{
        google()
        mavenCentral()
    }}
    dependencies {{
        classpath 'com.android.tools.build:gradle:{plugin}'
    }}
}}

allprojects {{
    repositories {{
        google()
        mavenCentral()
    }}
}}

ext {{
    compileSdkVer = {api}
    minSdkVer = {api}
    targetSdkVer = {api}
    ndkPlatformVer = {api}
    ndkVersion = "{ndk}"
    buildToolsVer = "{tools}"
    engineRoot = "{engine}"
}}
"#,
            plugin = self.gradle_plugin_version,
            api = self.platform_api_level,
            ndk = self.ndk.version,
            tools = self.build_tools_version,
            engine = posix(&self.engine_root),
        )
    }

    /// CMake arguments for one native build configuration, already quoted for Gradle.
    pub fn cmake_arguments(&self, config: BuildConfig) -> Vec<String> {
        let ndk_dir = match &self.ndk.location {
            Some(location) => self.sdk_root.join(location),
            None => self.sdk_root.join("ndk").join(&self.ndk.version),
        };
        let mut args = vec![
            "-GNinja".to_owned(),
            format!("-S{}", posix(&self.project_path)),
            format!("-DCMAKE_BUILD_TYPE={}", config.as_str()),
            format!(
                "-DCMAKE_TOOLCHAIN_FILE={}/cmake/Platform/Android/Toolchain_android.cmake",
                posix(&self.engine_root)
            ),
            "-DLY_DISABLE_TEST_MODULES=ON".to_owned(),
            format!("-DANDROID_NATIVE_API_LEVEL={}", self.platform_api_level),
            format!("-DLY_NDK_DIR={}", posix(&ndk_dir)),
            "-DANDROID_STL=c++_shared".to_owned(),
            "-Wno-deprecated".to_owned(),
        ];
        if self.monolithic {
            args.push("-DLY_MONOLITHIC_GAME=ON".to_owned());
        }
        if let Some(ninja) = &self.ninja_path {
            args.push(format!("-DCMAKE_MAKE_PROGRAM={}", posix(ninja)));
        }
        if self.oculus {
            args.push("-DANDROID_USE_OCULUS_OPENXR=ON".to_owned());
        }
        args.extend(self.extra_cmake_args.iter().cloned());
        args.into_iter().map(|a| quote(&a)).collect()
    }

    fn app_build_gradle(&self) -> String {
        let mut build_types = String::new();
        for config in [BuildConfig::Debug, BuildConfig::Profile, BuildConfig::Release] {
            let name = config.as_str();
            build_types.push_str(&format!("        {name} {{\n"));
            if config == BuildConfig::Profile {
                build_types.push_str("            initWith debug\n");
            }
            if self.signing.is_some() {
                build_types.push_str(&format!("            signingConfig signingConfigs.{name}\n"));
            }
            build_types.push_str(&format!(
                "            externalNativeBuild {{\n                cmake {{\n                    targets \"{}.GameLauncher\"\n                    arguments {}\n                }}\n            }}\n        }}\n",
                self.project.project_name,
                self.cmake_arguments(config).join(","),
            ));
        }

        let signing = match &self.signing {
            Some(signing) => {
                let fields = signing.gradle_fields(12);
                format!(
                    "    signingConfigs {{\n        debug {{\n{fields}        }}\n        profile {{\n{fields}        }}\n        release {{\n{fields}        }}\n    }}\n\n"
                )
            }
            None => String::new(),
        };

        format!(
            r#"apply plugin: 'com.android.application'

android {{
    namespace '{namespace}'
    compileSdkVersion rootProject.ext.compileSdkVer
    buildToolsVersion rootProject.ext.buildToolsVer
    ndkVersion rootProject.ext.ndkVersion

{signing}    defaultConfig {{
        minSdkVersion rootProject.ext.minSdkVer
        targetSdkVersion rootProject.ext.targetSdkVer
        versionCode {version_code}
        versionName "{version_name}"
        ndk {{
            abiFilters '{abi}'
        }}
    }}

    externalNativeBuild {{
        cmake {{
            buildStagingDirectory "{staging}"
            version "{cmake_version}"
            path "{cmakelists}"
        }}
    }}

    buildTypes {{
{build_types}    }}

    packagingOptions {{
        jniLibs {{
            useLegacyPackaging true{keep_symbols}
        }}
    }}
}}

dependencies {{
    api 'androidx.core:core:1.1.0'
}}
"#,
            namespace = self.project.android.package_name,
            version_code = self.project.android.version_number,
            version_name = self.project.android.version_name,
            abi = ANDROID_ARCH,
            staging = self.native_build_path,
            cmake_version = self.cmake_version,
            cmakelists = posix(&self.engine_root.join("CMakeLists.txt")),
            keep_symbols = if self.strip_debug {
                ""
            } else {
                "\n            keepDebugSymbols += '**/*.so'"
            },
        )
    }

    fn android_manifest(&self) -> String {
        let android = &self.project.android;
        let oculus = if self.oculus {
            "\n                <category android:name=\"com.oculus.intent.category.VR\" />"
        } else {
            ""
        };
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    android:versionCode="{version_code}"
    android:versionName="{version_name}">

    <uses-feature android:glEsVersion="0x00030000" android:required="true" />

    <application
        android:label="{label}"
        android:hasCode="true"
        android:extractNativeLibs="true">

        <meta-data android:name="android.app.lib_name" android:value="{project}.GameLauncher" />
        <meta-data android:name="keep_screen_on" android:value="{keep_screen_on}" />
        <meta-data android:name="disable_immersive_mode" android:value="{disable_immersive}" />

        <activity
            android:name="{project}Activity"
            android:exported="true"
            android:screenOrientation="{orientation}"
            android:configChanges="{config_changes}">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />{oculus}
            </intent-filter>
        </activity>
    </application>
</manifest>
"#,
            version_code = android.version_number,
            version_name = android.version_name,
            label = xml_escape(&self.project.product_name),
            project = self.project.project_name,
            keep_screen_on = android.enable_keep_screen_on,
            disable_immersive = android.disable_immersive_mode,
            orientation = android.orientation,
            config_changes = CONFIG_CHANGES.join("|"),
        )
    }
}

const CONFIG_CHANGES: &[&str] = &[
    "keyboard",
    "keyboardHidden",
    "orientation",
    "screenSize",
    "smallestScreenSize",
    "screenLayout",
    "uiMode",
];

const GRADLE_PROPERTIES: &str = "\
org.gradle.jvmargs=-Xmx4096m -Dfile.encoding=UTF-8
android.useAndroidX=true
android.nonTransitiveRClass=true
";

fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn quote(arg: &str) -> String {
    serde_json::Value::String(arg.to_owned()).to_string()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::detect::tests::store;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// A project with `Platform/Android/android_project.json`.
    pub(crate) fn android_project(root: &Path, name: &str) -> PathBuf {
        let project = root.join(name);
        write(
            &project.join("project.json"),
            &format!(r#"{{"project_name": "{name}", "product_name": "My <Game>"}}"#),
        );
        write(
            &project.join("Platform").join("Android").join("android_project.json"),
            r#"{"android_settings": {"package_name": "org.o3de.mygame", "version_number": 3, "orientation": "portrait"}}"#,
        );
        project
    }

    pub(crate) fn generator(root: &Path, project_path: &Path, gradle: PathBuf) -> AndroidProjectGenerator {
        AndroidProjectGenerator {
            engine_root: root.join("engine"),
            build_dir: root.join("build").join("android"),
            sdk_root: root.join("sdk"),
            build_tools_version: "33.0.1".to_owned(),
            platform_api_level: "33".to_owned(),
            ndk: SdkPackage {
                path: "ndk;25.2.9519653".to_owned(),
                version: "25.2.9519653".to_owned(),
                description: "NDK".to_owned(),
                location: Some("ndk/25.2.9519653".to_owned()),
            },
            project_path: project_path.to_path_buf(),
            project: read_android_settings(project_path).unwrap(),
            cmake_path: PathBuf::from("/opt/cmake/bin/cmake"),
            cmake_version: "3.24.0".to_owned(),
            gradle_path: gradle,
            gradle_plugin_version: "8.1.0".to_owned(),
            ninja_path: None,
            include_assets_in_apk: true,
            asset_mode: "PAK".to_owned(),
            asset_type: "android".to_owned(),
            signing: None,
            native_build_path: "o3de".to_owned(),
            extra_cmake_args: Vec::new(),
            monolithic: true,
            oculus: false,
            strip_debug: true,
        }
    }

    #[test]
    fn reads_android_project_json() {
        let tmp = tempfile::tempdir().unwrap();
        let project = android_project(tmp.path(), "MyGame");
        let settings = read_android_settings(&project).unwrap();
        assert_eq!(settings.project_name, "MyGame");
        assert_eq!(settings.product_name, "My <Game>");
        assert_eq!(settings.android.package_name, "org.o3de.mygame");
        assert_eq!(settings.android.version_number, 3);
        assert_eq!(settings.android.version_name, "1.0.0");
        assert_eq!(settings.android.orientation, "portrait");
    }

    #[test]
    fn falls_back_to_project_json() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("Legacy");
        write(
            &project.join("project.json"),
            r#"{"project_name": "Legacy", "android_settings": {"package_name": "org.legacy"}}"#,
        );
        let settings = read_android_settings(&project).unwrap();
        assert_eq!(settings.product_name, "Legacy");
        assert_eq!(settings.android.package_name, "org.legacy");
    }

    #[test]
    fn missing_android_settings_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("Bare");
        write(&project.join("project.json"), r#"{"project_name": "Bare"}"#);
        let err = read_android_settings(&project).unwrap_err();
        assert!(matches!(err, AndroidError::ProjectSettings { .. }));

        write(
            &project.join("Platform").join("Android").join("android_project.json"),
            r#"{"android_settings": {"version_number": 1}}"#,
        );
        assert!(read_android_settings(&project).is_err());
    }

    #[test]
    fn signing_config_states() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join(".o3de");

        assert_eq!(SigningConfig::from_config(&store(&home, &[])).unwrap(), None);

        let partial = store(&home, &["signconfig.store.file=/keys/release.jks".to_owned()]);
        assert_eq!(SigningConfig::from_config(&partial).unwrap(), None);

        let no_passwords = store(
            &home,
            &[
                "signconfig.store.file=/keys/release.jks".to_owned(),
                "signconfig.key.alias=release".to_owned(),
            ],
        );
        let signing = SigningConfig::from_config(&no_passwords).unwrap().unwrap();
        assert_eq!(signing.key_alias, "release");
        assert!(signing.store_password.is_empty());

        let full = store(
            &home,
            &[
                "signconfig.store.file=/keys/release.jks".to_owned(),
                "signconfig.key.alias=release".to_owned(),
                "signconfig.store.password=s3cret".to_owned(),
                "signconfig.key.password=k3y".to_owned(),
            ],
        );
        let signing = SigningConfig::from_config(&full).unwrap().unwrap();
        assert_eq!(signing.store_password, "s3cret");
        assert_eq!(signing.key_password, "k3y");
    }

    #[test]
    fn cmake_arguments_follow_options() {
        let tmp = tempfile::tempdir().unwrap();
        let project = android_project(tmp.path(), "MyGame");
        let mut generator = generator(tmp.path(), &project, PathBuf::from("gradle"));
        generator.ninja_path = Some(PathBuf::from("/usr/bin/ninja"));
        generator.oculus = true;
        generator.extra_cmake_args = vec!["-DFOO=1".to_owned()];

        let args = generator.cmake_arguments(BuildConfig::Release);
        assert_eq!(args.first().map(String::as_str), Some("\"-GNinja\""));
        assert!(args.contains(&"\"-DCMAKE_BUILD_TYPE=release\"".to_owned()));
        assert!(args.contains(&"\"-DLY_MONOLITHIC_GAME=ON\"".to_owned()));
        assert!(args.contains(&"\"-DCMAKE_MAKE_PROGRAM=/usr/bin/ninja\"".to_owned()));
        assert!(args.contains(&"\"-DANDROID_USE_OCULUS_OPENXR=ON\"".to_owned()));
        assert_eq!(args.last().map(String::as_str), Some("\"-DFOO=1\""));
        let ndk = format!("\"-DLY_NDK_DIR={}/sdk/ndk/25.2.9519653\"", posix(tmp.path()));
        assert!(args.contains(&ndk));

        generator.monolithic = false;
        let args = generator.cmake_arguments(BuildConfig::Debug);
        assert!(!args.iter().any(|a| a.contains("LY_MONOLITHIC_GAME")));
    }

    #[cfg(unix)]
    #[test]
    fn execute_writes_gradle_project() {
        let tmp = tempfile::tempdir().unwrap();
        let project = android_project(tmp.path(), "MyGame");
        let gradle = crate::detect::tests::fake_tool(
            &tmp.path().join("gradle").join("bin"),
            "gradle",
            r#"[ "$1" = wrapper ] && touch "$3/gradlew" && exit 0; exit 1"#,
        );
        let mut generator = generator(tmp.path(), &project, gradle);
        generator.signing = Some(SigningConfig {
            store_file: PathBuf::from("/keys/release.jks"),
            store_password: "s3cret".to_owned(),
            key_alias: "release".to_owned(),
            key_password: "k3y".to_owned(),
        });
        generator.execute().unwrap();

        let build = &generator.build_dir;
        assert!(build.join("gradlew").is_file());
        assert_eq!(std::fs::read_to_string(build.join("settings.gradle")).unwrap(), "include ':app'\n");

        let root = std::fs::read_to_string(build.join("build.gradle")).unwrap();
        assert!(root.contains("com.android.tools.build:gradle:8.1.0"));
        assert!(root.contains("ndkVersion = \"25.2.9519653\""));

        let local = std::fs::read_to_string(build.join("local.properties")).unwrap();
        assert!(local.contains("cmake.dir=/opt/cmake"));

        let app = std::fs::read_to_string(build.join("app").join("build.gradle")).unwrap();
        assert!(app.contains("namespace 'org.o3de.mygame'"));
        assert!(app.contains("targets \"MyGame.GameLauncher\""));
        assert!(app.contains("signingConfig signingConfigs.release"));
        assert!(app.contains("storeFile file('/keys/release.jks')"));
        assert!(app.contains("abiFilters 'arm64-v8a'"));
        assert!(!app.contains("keepDebugSymbols"));

        let manifest =
            std::fs::read_to_string(build.join("app").join("src").join("main").join("AndroidManifest.xml")).unwrap();
        assert!(manifest.contains("android:label=\"My &lt;Game&gt;\""));
        assert!(manifest.contains("android:name=\"MyGameActivity\""));
        assert!(manifest.contains("android:screenOrientation=\"portrait\""));

        let ini = std::fs::read_to_string(build.join(PLATFORM_SETTINGS_FILE)).unwrap();
        assert!(ini.contains("[android]"));
        assert!(ini.contains("asset_deploy_mode=PAK"));
        assert!(ini.contains("android_gradle_plugin=8.1.0"));
    }

    #[cfg(unix)]
    #[test]
    fn wrapper_failure_keeps_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let project = android_project(tmp.path(), "MyGame");
        let gradle = crate::detect::tests::fake_tool(
            &tmp.path().join("gradle").join("bin"),
            "gradle",
            "echo 'no network' >&2; exit 5",
        );
        let err = generator(tmp.path(), &project, gradle).execute().unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("no network"));
    }
}
