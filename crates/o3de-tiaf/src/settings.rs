//! Settings catalogue for the `tiaf` tool.

use o3de_config::SettingsDescription;

/// Tool name; settings live in `.o3de/tiaf.config`.
pub const TOOL: &str = "tiaf";

pub const ENABLED: &str = "enabled";
pub const TEST_TIMEOUT: &str = "test.timeout";
pub const GLOBAL_TIMEOUT: &str = "global.timeout";
pub const FAILURE_POLICY: &str = "failure.policy";
pub const INTEGRATION_POLICY: &str = "integration.policy";
pub const TEST_RUNNER: &str = "test.runner";
pub const SAFE_MODE: &str = "safe.mode";
pub const TARGET_OUTPUT: &str = "target.output";
pub const S3_BUCKET: &str = "s3.bucket";
pub const S3_TOP_LEVEL_DIR: &str = "s3.top.level.dir";
pub const S3_ENDPOINT: &str = "s3.endpoint";
pub const S3_TOKEN: &str = "s3.token";

const POLICIES: &[&str] = &["abort", "continue", "ignore"];

pub static TIAF_SETTINGS: &[SettingsDescription] = &[
    SettingsDescription::new(ENABLED, "Select tests by impact analysis. When off every run is a regular run.")
        .boolean(true),
    SettingsDescription::new(TEST_TIMEOUT, "Per-test timeout in seconds.").pattern("[0-9]+"),
    SettingsDescription::new(GLOBAL_TIMEOUT, "Timeout for the whole sequence in seconds.").pattern("[0-9]+"),
    SettingsDescription::new(FAILURE_POLICY, "What the runtime does when a test fails.")
        .default_value("continue")
        .one_of(POLICIES),
    SettingsDescription::new(INTEGRATION_POLICY, "What the runtime does when coverage integrity is in doubt.")
        .default_value("continue")
        .one_of(POLICIES),
    SettingsDescription::new(TEST_RUNNER, "Run tests live or with the null runner.")
        .default_value("live")
        .one_of(&["live", "null"]),
    SettingsDescription::new(SAFE_MODE, "Also run the tests impact analysis discarded.").boolean(false),
    SettingsDescription::new(TARGET_OUTPUT, "Where test target output is captured.")
        .default_value("stdout")
        .one_of(&["stdout", "file"]),
    SettingsDescription::new(S3_BUCKET, "Bucket holding coverage history. Local storage is used when unset."),
    SettingsDescription::new(S3_TOP_LEVEL_DIR, "Top-level folder inside the bucket.").default_value("tiaf"),
    SettingsDescription::new(S3_ENDPOINT, "Base URL of the object store.").env(&["TIAF_S3_ENDPOINT"]),
    SettingsDescription::new(S3_TOKEN, "Bearer token for the object store.")
        .password()
        .env(&["TIAF_S3_TOKEN"]),
];
