//! The runtime's JSON report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TiafError;

/// How a single test run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    Passed,
    Failed,
    ExecutionFailure,
    TimedOut,
}

impl TestResult {
    /// Pass and fail are the only outcomes comparable across runs.
    pub fn is_verdict(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunEntry {
    pub name: String,
    /// Milliseconds.
    #[serde(default)]
    pub duration: u64,
}

/// One section of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubReport {
    #[serde(default)]
    pub passing_test_runs: Vec<TestRunEntry>,
    #[serde(default)]
    pub failing_test_runs: Vec<TestRunEntry>,
    #[serde(default)]
    pub execution_failure_test_runs: Vec<TestRunEntry>,
    #[serde(default)]
    pub timed_out_test_runs: Vec<TestRunEntry>,
    #[serde(default)]
    pub unexecuted_test_runs: Vec<TestRunEntry>,
}

fn tagged(runs: &[TestRunEntry], result: TestResult) -> impl Iterator<Item = (&TestRunEntry, TestResult)> + '_ {
    runs.iter().map(move |r| (r, result))
}

impl SubReport {
    fn executed(&self) -> impl Iterator<Item = (&TestRunEntry, TestResult)> + '_ {
        tagged(&self.passing_test_runs, TestResult::Passed)
            .chain(tagged(&self.failing_test_runs, TestResult::Failed))
            .chain(tagged(&self.execution_failure_test_runs, TestResult::ExecutionFailure))
            .chain(tagged(&self.timed_out_test_runs, TestResult::TimedOut))
    }
}

/// A completed test run, as stored in the coverage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub name: String,
    pub result: TestResult,
    pub duration_ms: u64,
}

/// The whole report. Impact analysis sequences add drafted and (in safe
/// mode) discarded sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeReport {
    #[serde(default)]
    pub selected_test_run_report: SubReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drafted_test_run_report: Option<SubReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded_test_run_report: Option<SubReport>,
}

impl RuntimeReport {
    /// # Errors
    /// Returns `Io` or `Json` when the report is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, TiafError> {
        let text = std::fs::read_to_string(path).map_err(|e| TiafError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| TiafError::json(path, &e))
    }

    /// Every executed test run across all sections. Unexecuted runs are left out.
    pub fn test_runs(&self) -> Vec<TestRun> {
        [
            Some(&self.selected_test_run_report),
            self.drafted_test_run_report.as_ref(),
            self.discarded_test_run_report.as_ref(),
        ]
        .into_iter()
        .flatten()
        .flat_map(SubReport::executed)
        .map(|(entry, result)| TestRun {
            name: entry.name.clone(),
            result,
            duration_ms: entry.duration,
        })
        .collect()
    }
}
