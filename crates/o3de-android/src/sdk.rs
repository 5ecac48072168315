//! Wrapper around the Android SDK command line `sdkmanager`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use o3de_config::ConfigStore;
use o3de_util::process::{find_executable_in, run_command, CommandOutput};
use regex::Regex;

use crate::detect::{java_release_for_class_version, ToolVersion};
use crate::error::AndroidError;
use crate::settings;

/// One row of `sdkmanager --list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkPackage {
    /// Package path, e.g. `ndk;25.2.9519653`.
    pub path: String,
    pub version: String,
    pub description: String,
    /// Install location, only reported for installed packages.
    pub location: Option<String>,
}

impl SdkPackage {
    pub fn parsed_version(&self) -> ToolVersion {
        ToolVersion::parse(&self.version)
    }
}

/// Which section of the listing to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageList {
    Installed,
    Available,
    Updatable,
}

/// Parsed `sdkmanager --list` output, keyed by package path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkPackages {
    pub installed: BTreeMap<String, SdkPackage>,
    pub available: BTreeMap<String, SdkPackage>,
    pub updates: BTreeMap<String, SdkPackage>,
}

impl SdkPackages {
    fn section(&self, list: PackageList) -> &BTreeMap<String, SdkPackage> {
        match list {
            PackageList::Installed => &self.installed,
            PackageList::Available => &self.available,
            PackageList::Updatable => &self.updates,
        }
    }

    /// Packages in `list` whose path matches the glob `filter`, newest first.
    pub fn find(&self, filter: &str, list: PackageList) -> Vec<SdkPackage> {
        let pattern = glob::Pattern::new(filter).ok();
        let mut found: Vec<SdkPackage> = self
            .section(list)
            .values()
            .filter(|p| match &pattern {
                Some(pattern) => pattern.matches(&p.path),
                None => p.path == filter,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.parsed_version().cmp(&a.parsed_version()));
        found
    }
}

/// Parse the tabular output of `sdkmanager --list`.
///
/// Rows outside a recognised section, header rows, and separator rows are skipped.
pub fn parse_package_list(text: &str) -> SdkPackages {
    let mut packages = SdkPackages::default();
    let mut current: Option<PackageList> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.contains('|') {
            current = match line.to_ascii_uppercase().as_str() {
                "INSTALLED PACKAGES:" => Some(PackageList::Installed),
                "AVAILABLE PACKAGES:" => Some(PackageList::Available),
                "AVAILABLE UPDATES:" => Some(PackageList::Updatable),
                _ => None,
            };
            continue;
        }
        let Some(list) = current else {
            continue;
        };
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let (Some(path), Some(version), Some(description)) = (parts.first(), parts.get(1), parts.get(2)) else {
            continue;
        };
        let upper = version.to_ascii_uppercase();
        if upper == "VERSION" || upper == "INSTALLED" || version.starts_with("---") {
            continue;
        }
        let package = SdkPackage {
            path: (*path).to_owned(),
            version: version.replace(' ', "."),
            description: (*description).to_owned(),
            location: match list {
                PackageList::Installed => parts.get(3).map(|s| (*s).to_owned()),
                _ => None,
            },
        };
        let section = match list {
            PackageList::Installed => &mut packages.installed,
            PackageList::Available => &mut packages.available,
            PackageList::Updatable => &mut packages.updates,
        };
        section.insert(package.path.clone(), package);
    }
    packages
}

/// Result of `sdkmanager --licenses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseState {
    Accepted,
    /// Carries the summary line, e.g. `2 of 7 SDK package licenses not accepted.`
    NotAccepted(String),
    Unknown,
}

pub fn parse_license_state(text: &str) -> LicenseState {
    let not_accepted = Regex::new(r"(?m)^\d+ of \d+ SDK package licenses? not accepted.*$").ok();
    if let Some(m) = not_accepted.as_ref().and_then(|re| re.find(text)) {
        return LicenseState::NotAccepted(m.as_str().trim().to_owned());
    }
    if text.lines().any(|l| l.trim() == "All SDK package licenses accepted.") {
        return LicenseState::Accepted;
    }
    LicenseState::Unknown
}

/// Progress of a single package installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    Installing,
    Installed(SdkPackage),
    Failed(String),
}

/// A validated `sdkmanager` and the package state it reports.
#[derive(Debug)]
pub struct AndroidSdkManager {
    sdkmanager: PathBuf,
    sdk_root: PathBuf,
    java_home: Option<String>,
    packages: SdkPackages,
    licenses_accepted: bool,
    states: BTreeMap<String, InstallState>,
}

impl AndroidSdkManager {
    /// Locate `sdkmanager` under `sdk.cmdline.tools.root`, check that it runs
    /// with the current Java, and read the package listing.
    ///
    /// # Errors
    /// Returns `SdkConfiguration` when the tool is missing or not under an SDK
    /// root, `ToolVersionIncompatible` when it needs a newer Java, and
    /// `SdkManager` when listing fails.
    pub fn new(config: &ConfigStore, java_version: &str) -> Result<Self, AndroidError> {
        let root = config
            .get_value(settings::SDK_CMDLINE_TOOLS_ROOT)?
            .ok_or_else(|| AndroidError::SdkConfiguration {
                message: "the android sdk command line tools path was not set".to_owned(),
            })?;
        let sdkmanager = locate_sdkmanager(Path::new(&root))?;
        let java_home = config.get_value(settings::JAVA_HOME)?;

        let mut manager = Self {
            sdk_root: PathBuf::new(),
            sdkmanager,
            java_home,
            packages: SdkPackages::default(),
            licenses_accepted: false,
            states: BTreeMap::new(),
        };
        manager.check_version(java_version)?;
        manager.sdk_root = match config.get_value(settings::SDK_ROOT)? {
            Some(root) => PathBuf::from(root),
            None => sdk_root_of(&manager.sdkmanager).ok_or_else(|| AndroidError::SdkConfiguration {
                message: format!(
                    "{} is not located under an Android SDK root such as <android_sdk>/cmdline-tools/latest/bin",
                    manager.sdkmanager.display()
                ),
            })?,
        };
        tracing::info!(sdk = %manager.sdk_root.display(), "using android sdk");
        manager.refresh()?;
        Ok(manager)
    }

    pub fn sdkmanager_path(&self) -> &Path {
        &self.sdkmanager
    }

    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    pub fn packages(&self) -> &SdkPackages {
        &self.packages
    }

    pub fn install_state(&self, package_path: &str) -> InstallState {
        self.states
            .get(package_path)
            .cloned()
            .unwrap_or(InstallState::NotInstalled)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.sdkmanager);
        if let Some(parent) = self.sdkmanager.parent() {
            cmd.current_dir(parent);
        }
        if let Some(java_home) = &self.java_home {
            cmd.env("JAVA_HOME", java_home);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    fn call(&self, args: &[&str]) -> Result<CommandOutput, AndroidError> {
        let mut cmd = self.command();
        if !self.sdk_root.as_os_str().is_empty() {
            cmd.arg(format!("--sdk_root={}", self.sdk_root.display()));
        }
        cmd.args(args);
        Ok(run_command(&mut cmd)?)
    }

    fn check_version(&self, java_version: &str) -> Result<(), AndroidError> {
        let output = run_command(self.command().arg("--version"))?;
        if output.success {
            tracing::info!(version = %output.stdout.trim(), "verified sdkmanager");
            return Ok(());
        }
        let text = output.text();
        let class_version = Regex::new(r"class file version\s+([\d.]+)")
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned());
        if let Some(class_version) = class_version {
            let major = class_version.split('.').next().and_then(|m| m.parse::<u32>().ok());
            let required = major
                .and_then(java_release_for_class_version)
                .unwrap_or_else(|| format!("Java supporting class file version {class_version}"));
            return Err(AndroidError::ToolVersionIncompatible {
                tool: "java".to_owned(),
                found: java_version.to_owned(),
                reason: format!("the android sdk command line tool requires {required}"),
            });
        }
        if text.contains("Could not determine SDK root") {
            return Err(AndroidError::SdkConfiguration {
                message: format!(
                    "{} is not located under a valid Android SDK root; it must live at <android_sdk>/cmdline-tools/latest/bin",
                    self.sdkmanager.display()
                ),
            });
        }
        Err(AndroidError::SdkManager {
            arguments: "--version".to_owned(),
            output: text.trim().to_owned(),
        })
    }

    /// Re-read the installed, available, and updatable package lists.
    ///
    /// # Errors
    /// Returns `SdkManager` when `--list` fails.
    pub fn refresh(&mut self) -> Result<(), AndroidError> {
        let output = self.call(&["--list"])?;
        if !output.success {
            return Err(AndroidError::SdkManager {
                arguments: "--list".to_owned(),
                output: output.text().trim().to_owned(),
            });
        }
        self.packages = parse_package_list(&output.stdout);
        tracing::debug!(
            installed = self.packages.installed.len(),
            available = self.packages.available.len(),
            updates = self.packages.updates.len(),
            "refreshed sdk packages"
        );
        Ok(())
    }

    /// Packages in `list` matching `filter` (glob wildcards allowed), newest first.
    pub fn get_package_list(&self, filter: &str, list: PackageList) -> Vec<SdkPackage> {
        self.packages.find(filter, list)
    }

    /// Make sure every SDK license has been accepted.
    ///
    /// # Errors
    /// Returns `LicensesNotAccepted` or `LicenseStateUnknown`.
    pub fn check_licenses(&mut self) -> Result<(), AndroidError> {
        tracing::info!("checking android sdk package licenses");
        let output = self.call(&["--licenses"])?;
        match parse_license_state(output.text()) {
            LicenseState::Accepted => {
                self.licenses_accepted = true;
                Ok(())
            }
            LicenseState::NotAccepted(summary) => Err(AndroidError::LicensesNotAccepted {
                summary,
                sdkmanager: self.sdkmanager.clone(),
            }),
            LicenseState::Unknown => Err(AndroidError::LicenseStateUnknown {
                sdkmanager: self.sdkmanager.clone(),
            }),
        }
    }

    /// Install the newest package matching `package_path` unless one is
    /// already installed, and return the installed package.
    ///
    /// Licenses are checked first if that has not happened yet.
    ///
    /// # Errors
    /// Returns `BadPackagePath` when nothing matches, `PackageNotVerified`
    /// when the install did not take, or a license error.
    pub fn install_package(&mut self, package_path: &str, description: &str) -> Result<SdkPackage, AndroidError> {
        if let Some(installed) = self.packages.find(package_path, PackageList::Installed).into_iter().next() {
            tracing::info!(package = %installed.path, version = %installed.version, "{description} detected");
            self.states
                .insert(package_path.to_owned(), InstallState::Installed(installed.clone()));
            return Ok(installed);
        }
        if !self.licenses_accepted {
            self.check_licenses()?;
        }
        let Some(candidate) = self.packages.find(package_path, PackageList::Available).into_iter().next() else {
            return Err(AndroidError::BadPackagePath {
                description: description.to_owned(),
                path: package_path.to_owned(),
            });
        };

        tracing::info!(package = %candidate.path, "installing {description}");
        self.states.insert(package_path.to_owned(), InstallState::Installing);
        let result = self.install_candidate(package_path, &candidate);
        let state = match &result {
            Ok(installed) => InstallState::Installed(installed.clone()),
            Err(e) => InstallState::Failed(e.to_string()),
        };
        self.states.insert(package_path.to_owned(), state);
        result
    }

    fn install_candidate(&mut self, package_path: &str, candidate: &SdkPackage) -> Result<SdkPackage, AndroidError> {
        let output = self.call(&["--install", &candidate.path])?;
        if !output.success {
            return Err(AndroidError::SdkManager {
                arguments: format!("--install {}", candidate.path),
                output: output.text().trim().to_owned(),
            });
        }
        self.refresh()?;
        self.packages
            .find(package_path, PackageList::Installed)
            .into_iter()
            .next()
            .ok_or_else(|| AndroidError::PackageNotVerified {
                path: candidate.path.clone(),
            })
    }
}

fn locate_sdkmanager(root: &Path) -> Result<PathBuf, AndroidError> {
    ["bin", "latest/bin"]
        .iter()
        .find_map(|sub| find_executable_in(&root.join(sub), "sdkmanager"))
        .ok_or_else(|| AndroidError::SdkConfiguration {
            message: format!(
                "{} is not a command line tools folder; expected bin/sdkmanager or latest/bin/sdkmanager under it",
                root.display()
            ),
        })
}

/// The SDK root is the parent of the `cmdline-tools` folder holding `sdkmanager`.
fn sdk_root_of(sdkmanager: &Path) -> Option<PathBuf> {
    sdkmanager
        .ancestors()
        .find(|dir| dir.file_name().is_some_and(|name| name == "cmdline-tools"))
        .and_then(Path::parent)
        .map(Path::to_path_buf)
}
