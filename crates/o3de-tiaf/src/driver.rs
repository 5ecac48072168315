//! One test impact analysis run, from change list to stored history.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use o3de_config::ConfigStore;
use o3de_util::process::{run_streamed, CancelToken};

use crate::changelist::{build_change_list, ChangeList, Git};
use crate::config::{RuntimeConfig, RuntimeType};
use crate::error::TiafError;
use crate::report::RuntimeReport;
use crate::sequence::{runtime_args, select_sequence, Invocation, RuntimeSettings, SequenceType};
use crate::settings;
use crate::storage::{LocalStorage, ObjectStorage, ObjectStoreConfig, PersistentStorage, StorageKey};

/// Runtime exit code for a completed sequence with failing tests.
pub const TESTS_FAILED_EXIT_CODE: i32 = 7;

/// Which persistent storage backend holds the coverage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    ObjectStore,
}

/// Inputs for [`run_tiaf`].
#[derive(Debug, Clone)]
pub struct TiaRequest {
    /// The runtime configuration file written by the build.
    pub config_path: PathBuf,
    /// Checkout the diffs are taken in.
    pub repo: PathBuf,
    pub src_branch: String,
    /// Empty for runs on the branch itself.
    pub dst_branch: String,
    pub dst_commit: String,
    pub runtime_type: RuntimeType,
    pub suites: Vec<String>,
    pub label_excludes: Vec<String>,
    pub excluded_tests: Option<PathBuf>,
    pub sequence_override: Option<SequenceType>,
    /// `None` picks the object store when `s3.bucket` is set.
    pub storage: Option<StorageBackend>,
}

impl TiaRequest {
    /// Runs on the branch itself own its history; pull-request runs only read
    /// the destination branch's.
    pub fn is_source_of_truth(&self) -> bool {
        self.dst_branch.is_empty() || self.dst_branch == self.src_branch
    }

    pub fn source_of_truth_branch(&self) -> &str {
        if self.is_source_of_truth() {
            &self.src_branch
        } else {
            &self.dst_branch
        }
    }
}

/// What a run did, written out as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TiaResult {
    pub src_commit: Option<String>,
    pub dst_commit: String,
    pub commit_distance: Option<u64>,
    pub src_branch: String,
    pub dst_branch: String,
    pub suites: Vec<String>,
    pub label_excludes: Vec<String>,
    pub use_test_impact_analysis: bool,
    pub source_of_truth_branch: String,
    pub is_source_of_truth_branch: bool,
    pub has_change_list: bool,
    pub has_historic_data: bool,
    pub s3_bucket: Option<String>,
    pub sequence: SequenceType,
    pub runtime_args: Vec<String>,
    pub runtime_return_code: Option<i32>,
    pub report: Option<RuntimeReport>,
    pub change_list: Option<ChangeList>,
    pub runtime_type: RuntimeType,
    pub mismatched_tests: Vec<String>,
    pub mismatched_tests_count: usize,
}

impl TiaResult {
    /// Serialize to `path`, or return the JSON text when `path` is `None`.
    ///
    /// # Errors
    /// Returns an error when serialization or the write fails.
    pub fn write(&self, path: Option<&Path>) -> Result<Option<String>, TiafError> {
        match path {
            Some(path) => {
                o3de_util::json::write_pretty(path, self)?;
                Ok(None)
            }
            None => o3de_util::json::to_pretty_string(self)
                .map(Some)
                .map_err(|e| TiafError::Json {
                    path: "<stdout>".to_owned(),
                    message: e.to_string(),
                }),
        }
    }
}

fn open_storage(
    request: &TiaRequest,
    config: &ConfigStore,
    runtime: &RuntimeConfig,
) -> Result<Box<dyn PersistentStorage>, TiafError> {
    let key = StorageKey::new(request.runtime_type, &request.suites, request.source_of_truth_branch());
    let active_root = &runtime.common.workspace.active.root;
    let bucket = config.get_value(settings::S3_BUCKET)?;
    let backend = request.storage.unwrap_or(if bucket.is_some() {
        StorageBackend::ObjectStore
    } else {
        StorageBackend::Local
    });
    match backend {
        StorageBackend::Local => Ok(Box::new(LocalStorage::open(
            &runtime.common.workspace.historic.root,
            &key,
            active_root,
        )?)),
        StorageBackend::ObjectStore => {
            let Some(bucket) = bucket else {
                return Err(TiafError::StorageUnavailable {
                    message: format!("`{}` is not set", settings::S3_BUCKET),
                });
            };
            let store = ObjectStoreConfig {
                endpoint: config.get_value(settings::S3_ENDPOINT)?.unwrap_or_default(),
                bucket,
                top_level_dir: config.get_value_or(settings::S3_TOP_LEVEL_DIR, "tiaf")?,
                token: config.get_value(settings::S3_TOKEN)?,
            };
            Ok(Box::new(ObjectStorage::open(&store, &key, active_root)?))
        }
    }
}

/// Run the test runtime once and keep the coverage history current.
///
/// A missing runtime configuration or unavailable storage turns impact
/// analysis off for the run instead of failing it. History is written only
/// on the source-of-truth branch and only when the runtime completed (exit
/// code 0 or 7).
///
/// # Errors
/// Returns `BranchNotDescendant` when the stored commit is not in the
/// history of `dst_commit` on the source-of-truth branch, `Git` when a diff
/// fails, and I/O, report, or storage errors after the runtime has run.
pub fn run_tiaf(request: &TiaRequest, config: &ConfigStore, token: &CancelToken) -> Result<TiaResult, TiafError> {
    let source_of_truth = request.is_source_of_truth();
    let enabled = config.get_boolean_value(settings::ENABLED)?;
    let runtime_settings = RuntimeSettings::from_config(config)?;

    let runtime = match RuntimeConfig::load(&request.config_path) {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            tracing::warn!(error = %e, "cannot load the runtime configuration; impact analysis is off");
            None
        }
    };

    let mut storage = match (&runtime, enabled) {
        (Some(runtime), true) => match open_storage(request, config, runtime) {
            Ok(storage) => {
                tracing::info!(location = %storage.location(), "opened persistent storage");
                Some(storage)
            }
            Err(e) => {
                tracing::warn!(error = %e, "persistent storage unavailable; running a regular sequence");
                None
            }
        },
        _ => None,
    };
    let use_tia = storage.is_some();
    let has_historic_data = storage.as_ref().is_some_and(|s| s.has_historic_data());

    let git = Git::new(&request.repo);
    let mut src_commit = None;
    let mut change_list = None;
    let mut same_commit_rerun = false;
    if let Some(history) = storage.as_ref().and_then(|s| s.historic_data()) {
        let last = history.last_commit_hash.clone();
        let src = if last == request.dst_commit {
            history.prev_commit_hash.clone()
        } else {
            Some(last)
        };
        match src {
            Some(src) => {
                change_list = Some(build_change_list(&git, &src, &request.dst_commit, source_of_truth)?);
                src_commit = Some(src);
            }
            None => {
                tracing::info!(commit = %request.dst_commit, "history already covers this commit");
                src_commit = Some(request.dst_commit.clone());
                same_commit_rerun = true;
            }
        }
    }

    let sequence = request.sequence_override.unwrap_or_else(|| {
        if same_commit_rerun {
            SequenceType::Regular
        } else {
            select_sequence(use_tia, change_list.is_some(), source_of_truth)
        }
    });
    tracing::info!(%sequence, source_of_truth, "selected test sequence");

    let commit_distance = src_commit
        .as_deref()
        .and_then(|src| git.commit_distance(src, &request.dst_commit).ok());

    let mut result = TiaResult {
        src_commit,
        dst_commit: request.dst_commit.clone(),
        commit_distance,
        src_branch: request.src_branch.clone(),
        dst_branch: request.dst_branch.clone(),
        suites: request.suites.clone(),
        label_excludes: request.label_excludes.clone(),
        use_test_impact_analysis: use_tia,
        source_of_truth_branch: request.source_of_truth_branch().to_owned(),
        is_source_of_truth_branch: source_of_truth,
        has_change_list: change_list.is_some(),
        has_historic_data,
        s3_bucket: config.get_value(settings::S3_BUCKET)?,
        sequence,
        runtime_args: Vec::new(),
        runtime_return_code: None,
        report: None,
        change_list: None,
        runtime_type: request.runtime_type,
        mismatched_tests: Vec::new(),
        mismatched_tests_count: 0,
    };

    let Some(runtime) = runtime else {
        result.change_list = change_list;
        return Ok(result);
    };
    let Some(runtime_bin) = runtime.runtime_bin(request.runtime_type) else {
        tracing::warn!(runtime = %request.runtime_type, "no runtime binary is configured; nothing was run");
        result.change_list = change_list;
        return Ok(result);
    };

    let run_dir = &runtime.common.workspace.temp.root;
    o3de_util::fs::clean_dir(run_dir)?;
    let change_list_path = change_list.as_ref().map(|list| list.write_unique(run_dir)).transpose()?;
    let report_path = run_dir.join(format!("report.{}.json", uuid::Uuid::new_v4().simple()));
    let args = runtime_args(
        &runtime_settings,
        &Invocation {
            sequence,
            suites: &request.suites,
            label_excludes: &request.label_excludes,
            excluded_tests: request.excluded_tests.as_deref(),
            change_list: change_list_path.as_deref(),
            report: &report_path,
        },
    );

    let mut runtime_cmd = Command::new(runtime_bin);
    runtime_cmd.args(&args).current_dir(&request.repo);
    let code = run_streamed(&mut runtime_cmd, token)?;
    result.runtime_args = args;
    result.runtime_return_code = code;
    result.change_list = change_list;

    if !matches!(code, Some(0 | TESTS_FAILED_EXIT_CODE)) {
        tracing::warn!(code = ?code, "test runtime did not complete; historic data is unchanged");
        return Ok(result);
    }

    let report = RuntimeReport::load(&report_path)?;
    let runs = report.test_runs();
    if let Some(history) = storage.as_ref().and_then(|s| s.historic_data()) {
        result.mismatched_tests = history.mismatched_tests(&runs);
        result.mismatched_tests_count = result.mismatched_tests.len();
    }
    match storage.as_mut() {
        Some(storage) if source_of_truth => {
            storage.update_and_store_historic_data(&request.dst_commit, &runs)?;
            storage.store_artifacts(run_dir, &runtime.common.workspace.active.root)?;
        }
        Some(_) => tracing::info!("not the source-of-truth branch; historic data is unchanged"),
        None => {}
    }
    result.report = Some(report);
    Ok(result)
}
