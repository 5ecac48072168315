//! Host tool detection and version checks.
//!
//! Each tool is looked up through its `*.home` setting first (which for Java
//! and Gradle also covers `JAVA_HOME` / `GRADLE_HOME`), then on `PATH`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Command;

use o3de_config::ConfigStore;
use o3de_util::process::{find_executable_in, run_command, which};
use regex::Regex;

use crate::error::AndroidError;
use crate::settings;

pub const JAVA_VERSION_PATTERN: &str = r#"(?:java|openjdk) version\s*"?([\d_.]+)"#;
pub const GRADLE_VERSION_PATTERN: &str = r#"Gradle\s*"?([\d_.]+)"#;
pub const CMAKE_VERSION_PATTERN: &str = r#"cmake version\s*"?([\d_.]+)"#;
pub const NINJA_VERSION_PATTERN: &str = r"([\d_.]+)";

/// Oldest Gradle release the generated projects build with.
pub const MINIMUM_GRADLE_VERSION: &str = "8.0.0";

/// A located host tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    /// Absolute path to the executable.
    pub path: PathBuf,
    /// Version scraped from the tool's banner.
    pub version: String,
    /// The setting or variable the tool was found through, if not `PATH`.
    pub source: Option<String>,
}

/// A dotted version compared numerically, component by component.
///
/// Missing trailing components count as zero, so `8.0` equals `8.0.0`.
/// Non-numeric separators (`_`, `-`, spaces) split components like dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion(Vec<u64>);

impl ToolVersion {
    pub fn parse(text: &str) -> Self {
        Self(
            text.split(|c: char| !c.is_ascii_digit())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse().unwrap_or(u64::MAX))
                .collect(),
        )
    }

    /// Leading component, e.g. the Java feature release.
    pub fn major(&self) -> u64 {
        self.0.first().copied().unwrap_or(0)
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for idx in 0..len {
            let a = self.0.get(idx).copied().unwrap_or(0);
            let b = other.0.get(idx).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extract the first capture group of `pattern` from a tool's version banner.
pub fn parse_tool_version(pattern: &str, output: &str) -> Option<String> {
    let re = Regex::new(&format!("(?m){pattern}")).ok()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_owned())
        .filter(|v| !v.is_empty())
}

/// Java release named by a class-file major version (`61` is Java SE 17).
pub fn java_release_for_class_version(class_version: u32) -> Option<String> {
    match class_version {
        46..=48 => Some(format!("JDK 1.{}", class_version.saturating_sub(44))),
        49..=65 => Some(format!("Java SE {}", class_version.saturating_sub(44))),
        _ => None,
    }
}

/// Requirements an Android Gradle Plugin release places on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradlePluginRequirements {
    pub plugin_version: String,
    pub min_gradle: &'static str,
    pub sdk_build_tools: &'static str,
    pub min_jdk: &'static str,
    pub release_notes: &'static str,
}

struct PluginRow {
    line: &'static str,
    min_gradle: &'static str,
    sdk_build_tools: &'static str,
    min_jdk: &'static str,
    release_notes: &'static str,
}

const PLUGIN_TABLE: &[PluginRow] = &[
    PluginRow {
        line: "8.1",
        min_gradle: "8.0",
        sdk_build_tools: "33.0.1",
        min_jdk: "17",
        release_notes: "https://developer.android.com/build/releases/gradle-plugin",
    },
    PluginRow {
        line: "8.0",
        min_gradle: "8.0",
        sdk_build_tools: "30.0.3",
        min_jdk: "17",
        release_notes: "https://developer.android.com/build/releases/past-releases/agp-8-0-0-release-notes",
    },
];

/// Look up the host requirements for an Android Gradle Plugin version.
///
/// Rows are keyed by `major.minor`; any patch release of a known line matches.
///
/// # Errors
/// Returns `UnknownGradlePlugin` for versions outside the table.
pub fn gradle_plugin_requirements(version: &str) -> Result<GradlePluginRequirements, AndroidError> {
    let requested = ToolVersion::parse(version);
    let row = PLUGIN_TABLE.iter().find(|row| {
        let line = ToolVersion::parse(row.line);
        requested.0.get(..2) == line.0.get(..2)
    });
    match row {
        Some(row) => Ok(GradlePluginRequirements {
            plugin_version: version.to_owned(),
            min_gradle: row.min_gradle,
            sdk_build_tools: row.sdk_build_tools,
            min_jdk: row.min_jdk,
            release_notes: row.release_notes,
        }),
        None => Err(AndroidError::UnknownGradlePlugin {
            version: version.to_owned(),
            supported: PLUGIN_TABLE
                .iter()
                .map(|row| format!("{}.x", row.line))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

impl GradlePluginRequirements {
    /// # Errors
    /// Returns `ToolVersionIncompatible` when `java_version` is older than the plugin needs.
    pub fn validate_java_version(&self, java_version: &str) -> Result<(), AndroidError> {
        if ToolVersion::parse(java_version) < ToolVersion::parse(self.min_jdk) {
            return Err(AndroidError::ToolVersionIncompatible {
                tool: "java".to_owned(),
                found: java_version.to_owned(),
                reason: format!(
                    "Android Gradle Plugin {} requires at least Java {}",
                    self.plugin_version, self.min_jdk
                ),
            });
        }
        Ok(())
    }

    /// # Errors
    /// Returns `ToolVersionIncompatible` when `gradle_version` is older than the
    /// plugin or the generator supports.
    pub fn validate_gradle_version(&self, gradle_version: &str) -> Result<(), AndroidError> {
        let found = ToolVersion::parse(gradle_version);
        if found < ToolVersion::parse(MINIMUM_GRADLE_VERSION) {
            return Err(AndroidError::ToolVersionIncompatible {
                tool: "gradle".to_owned(),
                found: gradle_version.to_owned(),
                reason: format!("the minimum supported Gradle version is {MINIMUM_GRADLE_VERSION}"),
            });
        }
        if found < ToolVersion::parse(self.min_gradle) {
            return Err(AndroidError::ToolVersionIncompatible {
                tool: "gradle".to_owned(),
                found: gradle_version.to_owned(),
                reason: format!(
                    "Android Gradle Plugin {} requires at least Gradle {} (see {})",
                    self.plugin_version, self.min_gradle, self.release_notes
                ),
            });
        }
        Ok(())
    }
}

/// How to find and version-check one host tool.
struct ToolSpec {
    name: &'static str,
    command: &'static str,
    home_key: &'static str,
    subdir: &'static str,
    version_arg: &'static str,
    pattern: &'static str,
}

const GRADLE: ToolSpec = ToolSpec {
    name: "gradle",
    command: "gradle",
    home_key: settings::GRADLE_HOME,
    subdir: "bin",
    version_arg: "--version",
    pattern: GRADLE_VERSION_PATTERN,
};

const CMAKE: ToolSpec = ToolSpec {
    name: "cmake",
    command: "cmake",
    home_key: settings::CMAKE_HOME,
    subdir: "bin",
    version_arg: "--version",
    pattern: CMAKE_VERSION_PATTERN,
};

const NINJA: ToolSpec = ToolSpec {
    name: "ninja",
    command: "ninja",
    home_key: settings::NINJA_HOME,
    subdir: "",
    version_arg: "--version",
    pattern: NINJA_VERSION_PATTERN,
};

/// Locate a JDK through `java.home` (or `JAVA_HOME`), then `PATH`, and
/// report its version.
///
/// # Errors
/// Returns `ToolNotFound` when no usable `java` exists and `VersionParse`
/// when its banner is unrecognised.
pub fn validate_java_environment(config: &ConfigStore) -> Result<ToolInfo, AndroidError> {
    let home = config.get_value(settings::JAVA_HOME)?;
    let path = match &home {
        Some(home) => find_executable_in(&Path::new(home).join("bin"), "java").ok_or_else(|| {
            AndroidError::ToolNotFound {
                tool: "java".to_owned(),
                hint: format!("JAVA_HOME is set to {home} but there is no java executable in its bin folder"),
            }
        })?,
        None => which("java").ok_or_else(|| AndroidError::ToolNotFound {
            tool: "java".to_owned(),
            hint: "set JAVA_HOME or add java to PATH".to_owned(),
        })?,
    };

    let output = run_command(Command::new(&path).arg("-version"))?;
    if !output.success {
        return Err(AndroidError::ToolNotFound {
            tool: "java".to_owned(),
            hint: format!("{} -version failed: {}", path.display(), output.text().trim()),
        });
    }
    let version = parse_tool_version(JAVA_VERSION_PATTERN, output.text()).ok_or_else(|| {
        AndroidError::VersionParse {
            tool: "java".to_owned(),
            output: output.text().trim().to_owned(),
        }
    })?;
    tracing::info!(version = %version, path = %path.display(), "detected java");
    Ok(ToolInfo {
        path,
        version,
        source: home.map(|_| settings::JAVA_HOME.to_owned()),
    })
}

/// # Errors
/// See [`validate_java_environment`].
pub fn validate_gradle(config: &ConfigStore) -> Result<ToolInfo, AndroidError> {
    validate_build_tool(&GRADLE, config)
}

/// # Errors
/// See [`validate_java_environment`].
pub fn validate_cmake(config: &ConfigStore) -> Result<ToolInfo, AndroidError> {
    validate_build_tool(&CMAKE, config)
}

/// # Errors
/// See [`validate_java_environment`].
pub fn validate_ninja(config: &ConfigStore) -> Result<ToolInfo, AndroidError> {
    validate_build_tool(&NINJA, config)
}

fn validate_build_tool(spec: &ToolSpec, config: &ConfigStore) -> Result<ToolInfo, AndroidError> {
    let home = config.get_value(spec.home_key)?;
    let path = match &home {
        Some(home) => {
            let dir = Path::new(home).join(spec.subdir);
            find_executable_in(&dir, spec.command).ok_or_else(|| AndroidError::ToolNotFound {
                tool: spec.name.to_owned(),
                hint: format!("{} is set to {home} but {} has no {}", spec.home_key, dir.display(), spec.command),
            })?
        }
        None => which(spec.command).ok_or_else(|| AndroidError::ToolNotFound {
            tool: spec.name.to_owned(),
            hint: format!(
                "install it and add it to PATH, or set its home with `o3de android configure --set-value {}=<path>`",
                spec.home_key
            ),
        })?,
    };
    check_executable(spec.name, &path)?;

    let output = run_command(Command::new(&path).arg(spec.version_arg))?;
    if !output.success {
        return Err(AndroidError::ToolNotFound {
            tool: spec.name.to_owned(),
            hint: format!("{} {} failed: {}", path.display(), spec.version_arg, output.text().trim()),
        });
    }
    let version = parse_tool_version(spec.pattern, output.text()).ok_or_else(|| AndroidError::VersionParse {
        tool: spec.name.to_owned(),
        output: output.text().trim().to_owned(),
    })?;
    tracing::info!(tool = spec.name, version = %version, path = %path.display(), "detected build tool");
    Ok(ToolInfo {
        path,
        version,
        source: home.map(|_| spec.home_key.to_owned()),
    })
}

fn check_executable(tool: &str, path: &Path) -> Result<(), AndroidError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(|source| AndroidError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(AndroidError::ToolNotFound {
                tool: tool.to_owned(),
                hint: format!("{} is not executable; check file permissions", path.display()),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = (tool, path);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use o3de_config::MemorySecretStore;
    use proptest::prelude::*;

    use super::*;
    use crate::settings::ANDROID_SETTINGS;

    /// Write an executable `sh` script named `name` into `dir`.
    #[cfg(unix)]
    pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A store with no environment fallbacks and an in-memory vault.
    pub(crate) fn store(home: &Path, overrides: &[String]) -> ConfigStore {
        let mut store = ConfigStore::open(settings::TOOL, ANDROID_SETTINGS, home, None)
            .unwrap()
            .with_env(|_| None)
            .with_secret_store(Box::new(MemorySecretStore::default()));
        store.apply_overrides(overrides).unwrap();
        store
    }

    #[test]
    fn parses_openjdk_banner() {
        let banner = "openjdk version \"17.0.8\" 2023-07-18\nOpenJDK Runtime Environment";
        assert_eq!(parse_tool_version(JAVA_VERSION_PATTERN, banner).as_deref(), Some("17.0.8"));
    }

    #[test]
    fn parses_legacy_java_banner() {
        let banner = "java version \"1.8.0_292\"";
        assert_eq!(parse_tool_version(JAVA_VERSION_PATTERN, banner).as_deref(), Some("1.8.0_292"));
    }

    #[test]
    fn parses_gradle_cmake_and_ninja_banners() {
        let gradle = "\n------------------------------------------------------------\nGradle 8.4\n";
        assert_eq!(parse_tool_version(GRADLE_VERSION_PATTERN, gradle).as_deref(), Some("8.4"));
        let cmake = "cmake version 3.27.4\n\nCMake suite maintained and supported by Kitware";
        assert_eq!(parse_tool_version(CMAKE_VERSION_PATTERN, cmake).as_deref(), Some("3.27.4"));
        assert_eq!(parse_tool_version(NINJA_VERSION_PATTERN, "1.11.1\n").as_deref(), Some("1.11.1"));
    }

    #[test]
    fn unparseable_banner_is_none() {
        assert_eq!(parse_tool_version(GRADLE_VERSION_PATTERN, "welcome"), None);
    }

    #[test]
    fn tool_versions_pad_with_zeros() {
        assert_eq!(ToolVersion::parse("8.0"), ToolVersion::parse("8.0.0"));
        assert!(ToolVersion::parse("8.4") > ToolVersion::parse("8.0.0"));
        assert!(ToolVersion::parse("1.8.0_292") < ToolVersion::parse("17"));
        assert_eq!(ToolVersion::parse("17.0.8").major(), 17);
    }

    #[test]
    fn class_versions_name_java_releases() {
        assert_eq!(java_release_for_class_version(61).as_deref(), Some("Java SE 17"));
        assert_eq!(java_release_for_class_version(52).as_deref(), Some("Java SE 8"));
        assert_eq!(java_release_for_class_version(65).as_deref(), Some("Java SE 21"));
        assert_eq!(java_release_for_class_version(70), None);
    }

    #[test]
    fn plugin_table_matches_patch_releases() {
        let req = gradle_plugin_requirements("8.1.0").unwrap();
        assert_eq!(req.sdk_build_tools, "33.0.1");
        let older = gradle_plugin_requirements("8.0.1").unwrap();
        assert_eq!(older.sdk_build_tools, "30.0.3");
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let err = gradle_plugin_requirements("7.4.2").unwrap_err();
        assert!(err.to_string().contains("Unrecognized Android Gradle Plugin version"));
    }

    #[test]
    fn plugin_checks_java_and_gradle() {
        let req = gradle_plugin_requirements("8.1.0").unwrap();
        assert!(req.validate_java_version("17.0.8").is_ok());
        assert!(matches!(
            req.validate_java_version("11.0.2"),
            Err(AndroidError::ToolVersionIncompatible { .. })
        ));
        assert!(req.validate_gradle_version("8.4").is_ok());
        assert!(req.validate_gradle_version("7.6").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn java_home_is_preferred() {
        let tmp = tempfile::tempdir().unwrap();
        let jdk = tmp.path().join("jdk");
        fake_tool(&jdk.join("bin"), "java", "echo 'openjdk version \"17.0.2\" 2022-01-18' >&2");
        let home = jdk.display().to_string();
        let config = store(&tmp.path().join(".o3de"), &[format!("java.home={home}")]);

        let info = validate_java_environment(&config).unwrap();
        assert_eq!(info.version, "17.0.2");
        assert_eq!(info.source.as_deref(), Some(settings::JAVA_HOME));
        assert!(info.path.starts_with(&jdk));
    }

    #[cfg(unix)]
    #[test]
    fn java_home_without_java_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("empty").display().to_string();
        let config = store(&tmp.path().join(".o3de"), &[format!("java.home={home}")]);

        let err = validate_java_environment(&config).unwrap_err();
        assert!(matches!(err, AndroidError::ToolNotFound { ref tool, .. } if tool == "java"));
    }

    #[cfg(unix)]
    #[test]
    fn gradle_home_bin_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let gradle_home = tmp.path().join("gradle-8.4");
        fake_tool(&gradle_home.join("bin"), "gradle", "echo; echo 'Gradle 8.4'");
        let config = store(
            &tmp.path().join(".o3de"),
            &[format!("gradle.home={}", gradle_home.display())],
        );

        let info = validate_gradle(&config).unwrap();
        assert_eq!(info.version, "8.4");
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_reported_as_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let ninja_home = tmp.path().join("ninja");
        fake_tool(&ninja_home, "ninja", "echo broken >&2; exit 3");
        let config = store(
            &tmp.path().join(".o3de"),
            &[format!("ninja.home={}", ninja_home.display())],
        );

        let err = validate_ninja(&config).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_tool_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let cmake_home = tmp.path().join("cmake");
        std::fs::create_dir_all(cmake_home.join("bin")).unwrap();
        std::fs::write(cmake_home.join("bin").join("cmake"), "#!/bin/sh\n").unwrap();
        let config = store(
            &tmp.path().join(".o3de"),
            &[format!("cmake.home={}", cmake_home.display())],
        );

        let err = validate_cmake(&config).unwrap_err();
        assert!(err.to_string().contains("not executable"));
    }

    proptest! {
        #[test]
        fn version_order_is_total(a in proptest::collection::vec(0u64..50, 1..4),
                                  b in proptest::collection::vec(0u64..50, 1..4)) {
            let text = |v: &[u64]| v.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            let va = ToolVersion::parse(&text(&a));
            let vb = ToolVersion::parse(&text(&b));
            prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
        }
    }
}
