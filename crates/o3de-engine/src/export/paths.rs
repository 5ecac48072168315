//! Path resolution, engine classification, and argument preprocessing for export.

use std::path::{Path, PathBuf};

use o3de_targets::Platform;

use crate::error::EngineError;

pub const ASSET_PROCESSOR_BATCH: &str = "AssetProcessorBatch";
pub const ASSET_BUNDLER_BATCH: &str = "AssetBundlerBatch";

/// Resolve a user-supplied build path.
///
/// Unset or empty values become `<base>/<default_sub>`; absolute values are
/// kept; relative values are joined onto `base`.
pub fn resolve_build_path(base: &Path, value: Option<&Path>, default_sub: &str) -> PathBuf {
    match value {
        Some(path) if !path.as_os_str().is_empty() => o3de_util::fs::resolve_against(base, path),
        _ => base.join(default_sub),
    }
}

/// Whether `engine_path` is a prebuilt SDK install rather than a source tree.
///
/// SDK installs ship no top-level `CMakeLists.txt`, or carry the installer
/// markers `cmake/Platform/<Installer>/Monolithic` or `bin/<Installer>`.
pub fn is_sdk_engine(engine_path: &Path, host: Platform) -> bool {
    if !engine_path.join("CMakeLists.txt").is_file() {
        return true;
    }
    let installer = host.installer_folder();
    engine_path.join("cmake").join("Platform").join(installer).join("Monolithic").is_dir()
        || engine_path.join("bin").join(installer).is_dir()
}

/// Whether an SDK engine ships monolithic launcher artefacts for `host`.
pub fn has_monolithic_artifacts(engine_path: &Path, host: Platform) -> bool {
    let pattern = engine_path
        .join("cmake")
        .join("Platform")
        .join(host.installer_folder())
        .join("Monolithic")
        .join("ConfigurationTypes_*.cmake");
    glob::glob(&pattern.to_string_lossy())
        .map(|mut paths| paths.any(|p| p.is_ok()))
        .unwrap_or(false)
}

/// Folder holding prebuilt tool binaries in an SDK install.
pub fn sdk_tools_path(engine_path: &Path, host: Platform, tool_config: &str) -> PathBuf {
    engine_path
        .join("bin")
        .join(host.installer_folder())
        .join(tool_config)
        .join("Default")
}

/// Expected location of an asset tool binary.
///
/// SDK tool folders contain the executable directly; source tool builds place
/// it under `bin/<config>/`.
pub fn tool_binary_path(tools_path: &Path, tool: &str, sdk: bool, tool_config: &str, host: Platform) -> PathBuf {
    let file = format!("{tool}{}", host.exe_suffix());
    if sdk {
        tools_path.join(file)
    } else {
        tools_path.join("bin").join(tool_config).join(file)
    }
}

/// As [`tool_binary_path`], failing when the binary is absent.
///
/// # Errors
/// Returns `ExportProject` naming the expected location.
pub fn require_tool(tools_path: &Path, tool: &str, sdk: bool, tool_config: &str, host: Platform) -> Result<PathBuf, EngineError> {
    let path = tool_binary_path(tools_path, tool, sdk, tool_config, host);
    if path.is_file() {
        Ok(path)
    } else {
        Err(EngineError::export(format!(
            "Missing the '{tool}' tool, expected at '{}'",
            path.display()
        )))
    }
}

/// Expand `*` wildcards in seed paths.
///
/// Relative patterns are matched under `project_path`. Wildcard matches are
/// deduplicated; plain paths pass through untouched.
pub fn preprocess_seed_paths(project_path: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for input in paths {
        let text = input.to_string_lossy();
        if !text.contains('*') {
            out.push(input.clone());
            continue;
        }
        let pattern = o3de_util::fs::resolve_against(project_path, input);
        let Ok(matches) = glob::glob(&pattern.to_string_lossy()) else {
            tracing::warn!(pattern = %text, "ignoring malformed seed pattern");
            continue;
        };
        for found in matches.flatten() {
            if !out.contains(&found) {
                out.push(found);
            }
        }
    }
    out
}

/// Expand and check seed paths, returning absolute paths that exist.
///
/// # Errors
/// Returns `ExportProject` with "Invalid {description} provided: ..." for the
/// first path that does not name a file.
pub fn validate_artifact_paths(
    project_path: &Path,
    paths: &[PathBuf],
    description: &str,
) -> Result<Vec<PathBuf>, EngineError> {
    preprocess_seed_paths(project_path, paths)
        .into_iter()
        .map(|input| {
            if input.is_file() {
                return Ok(input);
            }
            if !input.is_absolute() {
                let joined = project_path.join(&input);
                if joined.is_file() {
                    return Ok(joined);
                }
            }
            Err(EngineError::export(format!(
                "Invalid {description} provided: '{}' does not exist.",
                input.display()
            )))
        })
        .collect()
}

/// Arguments split into export arguments and pass-through CMake arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomCmakeArgs {
    pub remaining: Vec<String>,
    pub configure: Vec<String>,
    pub build: Vec<String>,
}

const CONFIGURE_SWITCHES: [&str; 2] = ["-cca", "--cmake-configure-arg"];
const BUILD_SWITCHES: [&str; 2] = ["-cba", "--cmake-build-arg"];
const TERMINATOR: &str = "/";

/// Pull custom CMake arguments out of an argument list.
///
/// `-cca`/`--cmake-configure-arg` starts collecting configure arguments and
/// `-cba`/`--cmake-build-arg` build arguments; each switch also ends the
/// other mode. A lone `/` ends collection.
///
/// # Errors
/// Returns `ExportProject` for a `/` that does not close a collection.
pub fn extract_cmake_custom_args<S: AsRef<str>>(args: &[S]) -> Result<CustomCmakeArgs, EngineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Export,
        Configure,
        Build,
    }

    let mut out = CustomCmakeArgs::default();
    let mut mode = Mode::Export;
    for arg in args {
        let arg = arg.as_ref();
        if CONFIGURE_SWITCHES.contains(&arg) {
            mode = Mode::Configure;
            continue;
        }
        if BUILD_SWITCHES.contains(&arg) {
            mode = Mode::Build;
            continue;
        }
        match (mode, arg == TERMINATOR) {
            (Mode::Export, true) => {
                return Err(EngineError::export(
                    "Invalid argument '/'. This argument marks terminator for the '-cca' or '-cba' argument, but is not part of that argument",
                ));
            }
            (_, true) => mode = Mode::Export,
            (Mode::Export, false) => out.remaining.push(arg.to_owned()),
            (Mode::Configure, false) => out.configure.push(arg.to_owned()),
            (Mode::Build, false) => out.build.push(arg.to_owned()),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn build_path_resolution() {
        let base = Path::new("/work/MyProject");
        assert_eq!(
            resolve_build_path(base, None, "build/tools"),
            PathBuf::from("/work/MyProject/build/tools")
        );
        assert_eq!(
            resolve_build_path(base, Some(Path::new("")), "build/tools"),
            PathBuf::from("/work/MyProject/build/tools")
        );
        assert_eq!(
            resolve_build_path(base, Some(Path::new("out/tools")), "build/tools"),
            PathBuf::from("/work/MyProject/out/tools")
        );
        assert_eq!(
            resolve_build_path(base, Some(Path::new("/abs/tools")), "build/tools"),
            PathBuf::from("/abs/tools")
        );
    }

    #[test]
    fn engine_classification() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = tmp.path();
        assert!(is_sdk_engine(engine, Platform::Linux));

        touch(&engine.join("CMakeLists.txt"));
        assert!(!is_sdk_engine(engine, Platform::Linux));
        assert!(!has_monolithic_artifacts(engine, Platform::Linux));

        touch(&engine.join("cmake/Platform/Linux/Monolithic/ConfigurationTypes_release.cmake"));
        assert!(is_sdk_engine(engine, Platform::Linux));
        assert!(has_monolithic_artifacts(engine, Platform::Linux));
        assert!(!has_monolithic_artifacts(engine, Platform::Windows));
    }

    #[test]
    fn tool_paths_by_engine_kind() {
        let tools = Path::new("/tools");
        assert_eq!(
            tool_binary_path(tools, ASSET_PROCESSOR_BATCH, true, "profile", Platform::Windows),
            PathBuf::from("/tools/AssetProcessorBatch.exe")
        );
        assert_eq!(
            tool_binary_path(tools, ASSET_BUNDLER_BATCH, false, "profile", Platform::Linux),
            PathBuf::from("/tools/bin/profile/AssetBundlerBatch")
        );
        let err = require_tool(tools, ASSET_BUNDLER_BATCH, false, "profile", Platform::Linux).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing the 'AssetBundlerBatch' tool, expected at '/tools/bin/profile/AssetBundlerBatch'"
        );
    }

    #[test]
    fn seed_wildcards_expand_under_project() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path();
        touch(&project.join("seeds/a.seed"));
        touch(&project.join("seeds/b.seed"));
        touch(&project.join("seeds/readme.txt"));

        let mut expanded = preprocess_seed_paths(
            project,
            &[PathBuf::from("seeds/*.seed"), PathBuf::from("seeds/*.seed"), PathBuf::from("plain.seed")],
        );
        expanded.sort();
        assert_eq!(
            expanded,
            vec![project.join("seeds/a.seed"), project.join("seeds/b.seed"), PathBuf::from("plain.seed")]
        );
    }

    #[test]
    fn artifact_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path();
        touch(&project.join("game.seed"));

        let ok = validate_artifact_paths(project, &[PathBuf::from("game.seed")], "seed file").unwrap();
        assert_eq!(ok, vec![project.join("game.seed")]);

        let err = validate_artifact_paths(project, &[PathBuf::from("missing.seed")], "seed file").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid seed file provided: 'missing.seed' does not exist."
        );
    }

    #[test]
    fn cmake_custom_args_switch_modes() {
        let args = [
            "--platform", "linux", "-cca", "-DFOO=1", "-DBAR=2", "-cba", "-j", "8", "/", "--quiet",
        ];
        let out = extract_cmake_custom_args(&args).unwrap();
        assert_eq!(out.remaining, ["--platform", "linux", "--quiet"]);
        assert_eq!(out.configure, ["-DFOO=1", "-DBAR=2"]);
        assert_eq!(out.build, ["-j", "8"]);
    }

    #[test]
    fn stray_terminator_is_rejected() {
        let err = extract_cmake_custom_args(&["--quiet", "/"]).unwrap_err();
        assert!(err.to_string().starts_with("Invalid argument '/'"));
    }

    #[test]
    fn args_without_switches_pass_through() {
        let out = extract_cmake_custom_args(&["-a", "b"]).unwrap();
        assert_eq!(out.remaining, ["-a", "b"]);
        assert!(out.configure.is_empty() && out.build.is_empty());
    }
}
