//! Host readiness report for `android configure --validate`.

use std::fmt;

use o3de_config::ConfigStore;

use crate::detect::{gradle_plugin_requirements, validate_cmake, validate_gradle, validate_java_environment, validate_ninja};
use crate::sdk::AndroidSdkManager;
use crate::settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Failed,
    Skipped,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl HostCheck {
    fn ok(name: &'static str, detail: String) -> Self {
        Self {
            name,
            status: CheckStatus::Ok,
            detail,
        }
    }

    fn failed(name: &'static str, detail: String) -> Self {
        Self {
            name,
            status: CheckStatus::Failed,
            detail,
        }
    }

    fn skipped(name: &'static str, detail: &str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            detail: detail.to_owned(),
        }
    }
}

impl fmt::Display for HostCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.status {
            CheckStatus::Ok => "[ok]",
            CheckStatus::Failed => "[!!]",
            CheckStatus::Skipped => "[--]",
        };
        write!(f, "  {tag} {}: {}", self.name, self.detail)
    }
}

/// Check every host tool and the SDK. Never fails; failures are report lines.
pub fn check_host(config: &ConfigStore) -> Vec<HostCheck> {
    let mut checks = Vec::new();

    let plugin = config
        .get_value_or(settings::ANDROID_GRADLE_PLUGIN, "8.1.0")
        .map_err(|e| e.to_string())
        .and_then(|v| gradle_plugin_requirements(&v).map_err(|e| e.to_string()));
    let requirements = match plugin {
        Ok(req) => {
            checks.push(HostCheck::ok(
                "android gradle plugin",
                format!("{} (gradle >= {}, jdk >= {})", req.plugin_version, req.min_gradle, req.min_jdk),
            ));
            Some(req)
        }
        Err(e) => {
            checks.push(HostCheck::failed("android gradle plugin", e));
            None
        }
    };

    let java = match validate_java_environment(config) {
        Ok(java) => {
            let compatible = requirements.as_ref().map(|r| r.validate_java_version(&java.version));
            match compatible {
                Some(Err(e)) => checks.push(HostCheck::failed("java", e.to_string())),
                _ => checks.push(HostCheck::ok("java", format!("{} ({})", java.version, java.path.display()))),
            }
            Some(java)
        }
        Err(e) => {
            checks.push(HostCheck::failed("java", e.to_string()));
            None
        }
    };

    match validate_gradle(config) {
        Ok(gradle) => {
            let compatible = requirements.as_ref().map(|r| r.validate_gradle_version(&gradle.version));
            match compatible {
                Some(Err(e)) => checks.push(HostCheck::failed("gradle", e.to_string())),
                _ => checks.push(HostCheck::ok("gradle", format!("{} ({})", gradle.version, gradle.path.display()))),
            }
        }
        Err(e) => checks.push(HostCheck::failed("gradle", e.to_string())),
    }

    for (name, result) in [("cmake", validate_cmake(config)), ("ninja", validate_ninja(config))] {
        checks.push(match result {
            Ok(tool) => HostCheck::ok(name, format!("{} ({})", tool.version, tool.path.display())),
            Err(e) => HostCheck::failed(name, e.to_string()),
        });
    }

    match java {
        None => {
            checks.push(HostCheck::skipped("android sdk", "requires java"));
            checks.push(HostCheck::skipped("sdk licenses", "requires java"));
        }
        Some(java) => match AndroidSdkManager::new(config, &java.version) {
            Ok(mut sdk) => {
                checks.push(HostCheck::ok("android sdk", sdk.sdk_root().display().to_string()));
                checks.push(match sdk.check_licenses() {
                    Ok(()) => HostCheck::ok("sdk licenses", "all accepted".to_owned()),
                    Err(e) => HostCheck::failed("sdk licenses", e.to_string()),
                });
            }
            Err(e) => {
                checks.push(HostCheck::failed("android sdk", e.to_string()));
                checks.push(HostCheck::skipped("sdk licenses", "requires the android sdk"));
            }
        },
    }

    checks
}

/// `true` when no check failed.
pub fn all_passed(checks: &[HostCheck]) -> bool {
    checks.iter().all(|c| c.status != CheckStatus::Failed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::tests::store;

    fn status(checks: &[HostCheck], name: &str) -> CheckStatus {
        checks.iter().find(|c| c.name == name).unwrap().status
    }

    #[test]
    fn report_lines_use_doctor_tags() {
        let line = HostCheck::ok("java", "17.0.8".to_owned()).to_string();
        assert_eq!(line, "  [ok] java: 17.0.8");
        assert!(HostCheck::failed("ninja", "missing".to_owned()).to_string().starts_with("  [!!]"));
        assert!(HostCheck::skipped("sdk", "requires java").to_string().starts_with("  [--]"));
    }

    #[test]
    fn missing_java_skips_sdk_checks() {
        let tmp = tempfile::tempdir().unwrap();
        let config = store(
            &tmp.path().join(".o3de"),
            &[format!("java.home={}", tmp.path().join("no-jdk").display())],
        );
        let checks = check_host(&config);
        assert_eq!(status(&checks, "java"), CheckStatus::Failed);
        assert_eq!(status(&checks, "android sdk"), CheckStatus::Skipped);
        assert_eq!(status(&checks, "sdk licenses"), CheckStatus::Skipped);
        assert!(!all_passed(&checks));
    }

    #[cfg(unix)]
    #[test]
    fn old_java_fails_plugin_requirement() {
        let tmp = tempfile::tempdir().unwrap();
        crate::detect::tests::fake_tool(
            &tmp.path().join("jdk").join("bin"),
            "java",
            "echo 'java version \"1.8.0_292\"' >&2",
        );
        let config = store(
            &tmp.path().join(".o3de"),
            &[format!("java.home={}", tmp.path().join("jdk").display())],
        );
        let checks = check_host(&config);
        assert_eq!(status(&checks, "android gradle plugin"), CheckStatus::Ok);
        let java = checks.iter().find(|c| c.name == "java").unwrap();
        assert_eq!(java.status, CheckStatus::Failed);
        assert!(java.detail.contains("requires at least Java 17"));
    }
}
