//! Sequence selection and the runtime's command line.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use o3de_config::ConfigStore;

use crate::error::TiafError;
use crate::settings;

/// The kind of test run the runtime performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    /// Every test, no coverage.
    Regular,
    /// Every test, instrumented, to build the first coverage map.
    Seed,
    /// The impacted subset, instrumented, updating coverage.
    Tia,
    /// The impacted subset without writing coverage back.
    #[serde(rename = "tianowrite")]
    TiaNoWrite,
}

impl SequenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Seed => "seed",
            Self::Tia => "tia",
            Self::TiaNoWrite => "tianowrite",
        }
    }

    /// Whether the report carries drafted and discarded subreports.
    pub fn is_impact_analysis(self) -> bool {
        matches!(self, Self::Tia | Self::TiaNoWrite)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the sequence for a run.
pub fn select_sequence(enabled: bool, has_change_list: bool, source_of_truth: bool) -> SequenceType {
    match (enabled, has_change_list, source_of_truth) {
        (false, _, _) => SequenceType::Regular,
        (true, true, true) => SequenceType::Tia,
        (true, true, false) => SequenceType::TiaNoWrite,
        (true, false, true) => SequenceType::Seed,
        (true, false, false) => SequenceType::Regular,
    }
}

/// Runtime knobs read from the `tiaf` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub test_timeout: Option<String>,
    pub global_timeout: Option<String>,
    pub failure_policy: String,
    pub integration_policy: String,
    pub test_runner: String,
    pub safe_mode: bool,
    pub target_output: String,
}

impl RuntimeSettings {
    /// # Errors
    /// Returns an error when a stored value fails validation.
    pub fn from_config(config: &ConfigStore) -> Result<Self, TiafError> {
        Ok(Self {
            test_timeout: config.get_value(settings::TEST_TIMEOUT)?,
            global_timeout: config.get_value(settings::GLOBAL_TIMEOUT)?,
            failure_policy: config.get_value_or(settings::FAILURE_POLICY, "continue")?,
            integration_policy: config.get_value_or(settings::INTEGRATION_POLICY, "continue")?,
            test_runner: config.get_value_or(settings::TEST_RUNNER, "live")?,
            safe_mode: config.get_boolean_value(settings::SAFE_MODE)?,
            target_output: config.get_value_or(settings::TARGET_OUTPUT, "stdout")?,
        })
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            test_timeout: None,
            global_timeout: None,
            failure_policy: "continue".to_owned(),
            integration_policy: "continue".to_owned(),
            test_runner: "live".to_owned(),
            safe_mode: false,
            target_output: "stdout".to_owned(),
        }
    }
}

/// Per-run inputs to [`runtime_args`].
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub sequence: SequenceType,
    pub suites: &'a [String],
    pub label_excludes: &'a [String],
    pub excluded_tests: Option<&'a Path>,
    pub change_list: Option<&'a Path>,
    pub report: &'a Path,
}

/// Build the runtime's arguments.
///
/// `seed` runs keep going past failing tests, `regular` and `tianowrite`
/// runs past integrity failures, and `tia` runs use the configured policies.
pub fn runtime_args(settings: &RuntimeSettings, run: &Invocation<'_>) -> Vec<String> {
    let mut args = vec![
        format!("--sequence={}", run.sequence),
        format!("--suite={}", run.suites.join(",")),
    ];
    if let Some(excluded) = run.excluded_tests {
        args.push(format!("--excluded={}", excluded.display()));
    }
    if !run.label_excludes.is_empty() {
        args.push(format!("--labelexcludes={}", run.label_excludes.join(",")));
    }
    if let Some(t) = &settings.test_timeout {
        args.push(format!("--ttimeout={t}"));
    }
    if let Some(t) = &settings.global_timeout {
        args.push(format!("--gtimeout={t}"));
    }
    match run.sequence {
        SequenceType::Seed => args.push("--fpolicy=continue".to_owned()),
        SequenceType::Regular | SequenceType::TiaNoWrite => args.push("--ipolicy=continue".to_owned()),
        SequenceType::Tia => {
            args.push(format!("--fpolicy={}", settings.failure_policy));
            args.push(format!("--ipolicy={}", settings.integration_policy));
        }
    }
    if let Some(change_list) = run.change_list {
        args.push(format!("--changelist={}", change_list.display()));
    }
    args.push(format!("--report={}", run.report.display()));
    args.push(format!("--testrunner={}", settings.test_runner));
    if run.sequence.is_impact_analysis() {
        args.push(format!("--safemode={}", if settings.safe_mode { "on" } else { "off" }));
    }
    args.push(format!("--targetout={}", settings.target_output));
    args
}
