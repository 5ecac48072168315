//! Host and export platform mapping.
//!
//! Every export platform has three names that show up in different places: the
//! user-facing name (`linux`), the asset platform used by the asset pipeline
//! (`pc` for Windows), and the installer folder under `cmake/Platform/`.

use std::fmt;
use std::str::FromStr;

/// A platform the export pipeline can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    Mac,
    Android,
    Ios,
}

impl Platform {
    /// All platforms, in declaration order.
    pub const ALL: [Platform; 5] = [
        Platform::Windows,
        Platform::Linux,
        Platform::Mac,
        Platform::Android,
        Platform::Ios,
    ];

    /// Name used on the command line and in configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Asset platform identifier consumed by the asset processor and bundler.
    pub fn asset_platform(self) -> &'static str {
        match self {
            Self::Windows => "pc",
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Folder name under `cmake/Platform/` in an engine install.
    pub fn installer_folder(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::Mac => "Mac",
            Self::Android => "Android",
            Self::Ios => "iOS",
        }
    }

    /// Suffix appended to native executables built for this platform.
    pub fn exe_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    /// File patterns that are never copied into a launcher layout.
    pub fn layout_ignore_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &["*.pdb", "*.lock"],
            _ => &["*.dbg", "*.lock"],
        }
    }

    /// Whether this platform can host the engine tools (asset processor, bundler).
    pub fn is_desktop(self) -> bool {
        matches!(self, Self::Windows | Self::Linux | Self::Mac)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "pc" | "win" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "mac" | "macos" | "darwin" => Ok(Self::Mac),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(TargetError::UnknownPlatform {
                name: other.to_owned(),
            }),
        }
    }
}

/// Detect the host platform from the compile-time OS.
///
/// # Errors
/// Returns an error if the current OS cannot host the engine tools.
pub fn host_platform() -> Result<Platform, TargetError> {
    match std::env::consts::OS {
        "windows" => Ok(Platform::Windows),
        "linux" => Ok(Platform::Linux),
        "macos" => Ok(Platform::Mac),
        os => Err(TargetError::UnsupportedHost {
            os: os.to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
        }),
    }
}

/// Native build-system generator chosen for a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    /// Value passed to `-G`, or `None` to use the build system's default.
    pub name: Option<&'static str>,
    /// Whether the configuration is chosen at build time (`--config`) rather
    /// than configure time (`CMAKE_BUILD_TYPE`).
    pub multi_config: bool,
    /// Extra configure options always passed on this host.
    pub options: &'static [&'static str],
}

/// Pick the generator for `host`.
///
/// `ninja_available` / `xcode_available` report whether the respective tool
/// responded to a version probe.
pub fn host_generator(host: Platform, ninja_available: bool, xcode_available: bool) -> Generator {
    match host {
        Platform::Windows => Generator {
            name: None,
            multi_config: true,
            options: &["-DLY_DISABLE_TEST_MODULES=ON"],
        },
        Platform::Mac if xcode_available => Generator {
            name: Some("Xcode"),
            multi_config: true,
            options: &["-DLY_DISABLE_TEST_MODULES=ON"],
        },
        Platform::Mac => Generator {
            name: Some("Unix Makefiles"),
            multi_config: false,
            options: &["-DLY_DISABLE_TEST_MODULES=ON"],
        },
        _ if ninja_available => Generator {
            name: Some("Ninja Multi-Config"),
            multi_config: true,
            options: &["-DLY_DISABLE_TEST_MODULES=ON", "-DLY_STRIP_DEBUG_SYMBOLS=ON"],
        },
        _ => Generator {
            name: Some("Unix Makefiles"),
            multi_config: false,
            options: &["-DLY_DISABLE_TEST_MODULES=ON", "-DLY_STRIP_DEBUG_SYMBOLS=ON"],
        },
    }
}

/// CMake build configuration for launchers and tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildConfig {
    Debug,
    #[default]
    Profile,
    Release,
}

impl BuildConfig {
    /// Lowercase name, as passed to `--config` and `CMAKE_BUILD_TYPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Profile => "profile",
            Self::Release => "release",
        }
    }

    /// Capitalised variant name used by Gradle tasks (`assembleProfile`).
    pub fn variant(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Profile => "Profile",
            Self::Release => "Release",
        }
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildConfig {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "profile" => Ok(Self::Profile),
            "release" => Ok(Self::Release),
            other => Err(TargetError::UnknownBuildConfig {
                name: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("unsupported host: {os}/{arch}; the engine tools run on Windows, Linux and macOS only")]
    UnsupportedHost { os: String, arch: String },

    #[error("unknown platform `{name}`; expected one of windows, linux, mac, android, ios")]
    UnknownPlatform { name: String },

    #[error("unknown build configuration `{name}`; expected debug, profile, or release")]
    UnknownBuildConfig { name: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn windows_maps_to_pc_assets() {
        assert_eq!(Platform::Windows.asset_platform(), "pc");
        assert_eq!(Platform::Windows.installer_folder(), "Windows");
        assert_eq!(Platform::Windows.exe_suffix(), ".exe");
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::Mac);
        assert_eq!("PC".parse::<Platform>().unwrap(), Platform::Windows);
        assert!("amiga".parse::<Platform>().is_err());
    }

    #[test]
    fn host_platform_is_desktop() {
        if let Ok(host) = host_platform() {
            assert!(host.is_desktop());
        }
    }

    #[test]
    fn linux_prefers_ninja_multi_config() {
        let g = host_generator(Platform::Linux, true, false);
        assert_eq!(g.name, Some("Ninja Multi-Config"));
        assert!(g.multi_config);

        let fallback = host_generator(Platform::Linux, false, false);
        assert_eq!(fallback.name, Some("Unix Makefiles"));
        assert!(!fallback.multi_config);
    }

    #[test]
    fn windows_uses_default_generator() {
        let g = host_generator(Platform::Windows, true, false);
        assert!(g.name.is_none());
        assert!(g.multi_config);
    }

    #[test]
    fn ignore_patterns_per_platform() {
        assert!(Platform::Windows.layout_ignore_patterns().contains(&"*.pdb"));
        assert!(Platform::Linux.layout_ignore_patterns().contains(&"*.dbg"));
    }

    #[test]
    fn build_config_names() {
        assert_eq!("Release".parse::<BuildConfig>().unwrap(), BuildConfig::Release);
        assert_eq!(BuildConfig::Profile.variant(), "Profile");
        assert_eq!(BuildConfig::default(), BuildConfig::Profile);
        assert!("shipping".parse::<BuildConfig>().is_err());
    }

    proptest! {
        #[test]
        fn name_round_trips(idx in 0usize..5) {
            let platform = Platform::ALL.get(idx).copied().unwrap();
            prop_assert_eq!(platform.name().parse::<Platform>().unwrap(), platform);
        }
    }
}
