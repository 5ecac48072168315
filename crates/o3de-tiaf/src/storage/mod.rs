//! Persistent coverage history, kept per runtime, suite, and branch.

pub mod local;
pub mod object;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::RuntimeType;
use crate::error::TiafError;
use crate::report::{TestResult, TestRun};

pub use local::LocalStorage;
pub use object::{ObjectStorage, ObjectStoreConfig};

pub const HISTORIC_DATA_FILE: &str = "historic_data.json";
pub const PREVIOUS_TEST_RUN_FILE: &str = "previous_test_run.json";

/// The most recent outcome of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunRecord {
    pub result: TestResult,
    pub duration_ms: u64,
}

/// Contents of `historic_data.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricData {
    pub last_commit_hash: String,
    /// The commit stored before `last_commit_hash`, used when a run repeats
    /// against the same destination commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_commit_hash: Option<String>,
    #[serde(default)]
    pub test_runs: BTreeMap<String, TestRunRecord>,
}

impl HistoricData {
    /// History after a run at `dst_commit`.
    ///
    /// A rerun at the stored commit keeps the recorded previous commit; any
    /// other commit pushes the stored one into `prev_commit_hash`. New test
    /// results replace older ones by name.
    pub fn advanced(previous: Option<&HistoricData>, dst_commit: &str, runs: &[TestRun]) -> Self {
        let mut next = previous.cloned().unwrap_or_default();
        if next.last_commit_hash != dst_commit {
            if !next.last_commit_hash.is_empty() {
                next.prev_commit_hash = Some(std::mem::take(&mut next.last_commit_hash));
            }
            next.last_commit_hash = dst_commit.to_owned();
        }
        for run in runs {
            next.test_runs.insert(
                run.name.clone(),
                TestRunRecord {
                    result: run.result,
                    duration_ms: run.duration_ms,
                },
            );
        }
        next
    }

    /// Tests whose pass/fail verdict differs from the stored one.
    pub fn mismatched_tests(&self, runs: &[TestRun]) -> Vec<String> {
        runs.iter()
            .filter(|run| run.result.is_verdict())
            .filter(|run| {
                self.test_runs
                    .get(&run.name)
                    .is_some_and(|stored| stored.result.is_verdict() && stored.result != run.result)
            })
            .map(|run| run.name.clone())
            .collect()
    }
}

/// Where a suite's history lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    pub runtime: RuntimeType,
    pub suite: String,
    pub branch: String,
}

impl StorageKey {
    /// `suites` are joined with `-`; `/` in branch names becomes `_`.
    pub fn new(runtime: RuntimeType, suites: &[String], branch: &str) -> Self {
        Self {
            runtime,
            suite: suites.join("-"),
            branch: branch.replace('/', "_"),
        }
    }

    /// `<runtime>/<suite>/<branch>`.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(self.runtime.as_str()).join(&self.suite).join(&self.branch)
    }

    /// `<runtime>/<suite>/<branch>` with forward slashes, for URLs.
    pub fn url_path(&self) -> String {
        format!("{}/{}/{}", self.runtime, self.suite, self.branch)
    }
}

/// A coverage history backend.
pub trait PersistentStorage {
    /// The stored history, if any was found at initialisation.
    fn historic_data(&self) -> Option<&HistoricData>;

    fn has_historic_data(&self) -> bool {
        self.historic_data().is_some()
    }

    /// Record a completed run at `dst_commit`.
    ///
    /// # Errors
    /// Returns an error when the history cannot be written.
    fn update_and_store_historic_data(&mut self, dst_commit: &str, runs: &[TestRun]) -> Result<(), TiafError>;

    /// Save the run and coverage folders.
    ///
    /// # Errors
    /// Returns an error when either folder cannot be stored.
    fn store_artifacts(&mut self, run_dir: &Path, coverage_dir: &Path) -> Result<(), TiafError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
