//! Android host validation, SDK management, Gradle project generation, and APK builds.

pub mod build;
pub mod check;
pub mod detect;
pub mod error;
pub mod generate;
pub mod sdk;
pub mod settings;

pub use build::{build_android_project, validate_host_tools, AndroidBuildOutput, AndroidBuildRequest, HostTools};
pub use check::{all_passed, check_host, CheckStatus, HostCheck};
pub use detect::{validate_cmake, validate_gradle, validate_java_environment, validate_ninja, ToolInfo};
pub use error::AndroidError;
pub use generate::{read_android_settings, AndroidProjectGenerator, ProjectAndroidSettings, SigningConfig};
pub use sdk::{AndroidSdkManager, InstallState, PackageList, SdkPackage};
pub use settings::ANDROID_SETTINGS;
