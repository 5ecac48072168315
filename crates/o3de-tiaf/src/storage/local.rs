//! History kept on the local filesystem.

use std::path::{Path, PathBuf};

use o3de_util::fs::{clean_dir, copy_dir_filtered, ensure_dir};
use o3de_util::json::write_pretty;

use super::{HistoricData, PersistentStorage, StorageKey, HISTORIC_DATA_FILE, PREVIOUS_TEST_RUN_FILE};
use crate::error::TiafError;
use crate::report::TestRun;

const ACTIVE_DIR: &str = "active";
const PREVIOUS_RUN_DIR: &str = "previous_run";
const TMP_DIR: &str = "tmp";

/// Storage rooted at `<historic root>/<runtime>/<suite>/<branch>`.
#[derive(Debug)]
pub struct LocalStorage {
    dir: PathBuf,
    historic: Option<HistoricData>,
}

impl LocalStorage {
    /// Open the storage for `key` and restore any stored coverage into
    /// `active_root` so the runtime picks it up.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` when the directory cannot be prepared or
    /// the stored history is unreadable.
    pub fn open(historic_root: &Path, key: &StorageKey, active_root: &Path) -> Result<Self, TiafError> {
        let dir = historic_root.join(key.relative_path());
        let unavailable = |e: &dyn std::fmt::Display| TiafError::StorageUnavailable {
            message: format!("{}: {e}", dir.display()),
        };
        ensure_dir(&dir.join(TMP_DIR)).map_err(|e| unavailable(&e))?;

        let historic_file = dir.join(HISTORIC_DATA_FILE);
        let historic = if historic_file.is_file() {
            let text = std::fs::read_to_string(&historic_file).map_err(|e| unavailable(&e))?;
            Some(serde_json::from_str::<HistoricData>(&text).map_err(|e| unavailable(&e))?)
        } else {
            None
        };

        let active = dir.join(ACTIVE_DIR);
        if historic.is_some() && active.is_dir() {
            let restored = copy_dir_filtered(&active, active_root, &[]).map_err(|e| unavailable(&e))?;
            tracing::debug!(restored, from = %active.display(), "restored coverage");
        }

        Ok(Self { dir, historic })
    }

    /// The storage directory for this key.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn replace_dir(&self, src: &Path, name: &str) -> Result<usize, TiafError> {
        let dest = self.dir.join(name);
        clean_dir(&dest)?;
        if !src.is_dir() {
            return Ok(0);
        }
        Ok(copy_dir_filtered(src, &dest, &[])?)
    }
}

impl PersistentStorage for LocalStorage {
    fn historic_data(&self) -> Option<&HistoricData> {
        self.historic.as_ref()
    }

    fn update_and_store_historic_data(&mut self, dst_commit: &str, runs: &[TestRun]) -> Result<(), TiafError> {
        let next = HistoricData::advanced(self.historic.as_ref(), dst_commit, runs);
        write_pretty(&self.dir.join(PREVIOUS_TEST_RUN_FILE), &runs)?;
        write_pretty(&self.dir.join(HISTORIC_DATA_FILE), &next)?;
        tracing::info!(commit = dst_commit, dir = %self.dir.display(), "stored historic data");
        self.historic = Some(next);
        Ok(())
    }

    fn store_artifacts(&mut self, run_dir: &Path, coverage_dir: &Path) -> Result<(), TiafError> {
        let runs = self.replace_dir(run_dir, PREVIOUS_RUN_DIR)?;
        let coverage = self.replace_dir(coverage_dir, ACTIVE_DIR)?;
        tracing::debug!(runs, coverage, "stored run artifacts");
        Ok(())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
