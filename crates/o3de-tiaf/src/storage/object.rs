//! History kept in an HTTP object store bucket.

use std::path::Path;
use std::time::Duration;

use o3de_util::archive::{extract_tar_gz, tar_gz_bytes};

use super::{HistoricData, PersistentStorage, StorageKey, HISTORIC_DATA_FILE, PREVIOUS_TEST_RUN_FILE};
use crate::error::TiafError;
use crate::report::TestRun;

const COVERAGE_ARCHIVE: &str = "active.tar.gz";
const RUN_ARCHIVE: &str = "previous_run.tar.gz";
const MAX_DOWNLOAD: u64 = 1 << 30;

/// Where the bucket lives and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub top_level_dir: String,
    pub token: Option<String>,
}

/// Storage at `<endpoint>/<bucket>/<top-level>/<runtime>/<suite>/<branch>/`.
#[derive(Debug)]
pub struct ObjectStorage {
    agent: ureq::Agent,
    token: Option<String>,
    base_url: String,
    historic: Option<HistoricData>,
}

enum Fetched {
    Found(Vec<u8>),
    Missing,
}

impl ObjectStorage {
    /// Probe the bucket, then load any stored history and coverage.
    ///
    /// Coverage found in the bucket is unpacked into `active_root`.
    ///
    /// # Errors
    /// Every failure here is `StorageUnavailable`: an unreachable endpoint, a
    /// bucket probe that does not succeed, or unreadable stored data.
    pub fn open(config: &ObjectStoreConfig, key: &StorageKey, active_root: &Path) -> Result<Self, TiafError> {
        let endpoint = config.endpoint.trim_end_matches('/');
        if endpoint.is_empty() || config.bucket.is_empty() {
            return Err(TiafError::StorageUnavailable {
                message: "object store endpoint and bucket must both be set".to_owned(),
            });
        }
        let mut storage = Self {
            agent: o3de_util::download::agent(Duration::from_secs(300)),
            token: config.token.clone(),
            base_url: format!(
                "{endpoint}/{}/{}/{}",
                config.bucket,
                config.top_level_dir.trim_matches('/'),
                key.url_path()
            ),
            historic: None,
        };
        let unavailable = |e: TiafError| TiafError::StorageUnavailable { message: e.to_string() };

        let probe = format!("{endpoint}/{}/", config.bucket);
        if let Fetched::Missing = storage.get(&probe).map_err(unavailable)? {
            return Err(TiafError::StorageUnavailable {
                message: format!("bucket {} not found at {endpoint}", config.bucket),
            });
        }

        if let Fetched::Found(bytes) = storage.get(&storage.url(HISTORIC_DATA_FILE)).map_err(unavailable)? {
            let data: HistoricData = serde_json::from_slice(&bytes).map_err(|e| TiafError::StorageUnavailable {
                message: format!("{}: {e}", storage.url(HISTORIC_DATA_FILE)),
            })?;
            storage.historic = Some(data);
        }

        if storage.historic.is_some() {
            if let Fetched::Found(bytes) = storage.get(&storage.url(COVERAGE_ARCHIVE)).map_err(unavailable)? {
                extract_tar_gz(bytes.as_slice(), active_root).map_err(|e| unavailable(e.into()))?;
                tracing::debug!(to = %active_root.display(), "restored coverage from object store");
            }
        }
        Ok(storage)
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }

    fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    /// GET `url`; 404 is `Missing`, any other non-success status is an error.
    fn get(&self, url: &str) -> Result<Fetched, TiafError> {
        let storage_err = |message: String| TiafError::Storage {
            url: url.to_owned(),
            message,
        };
        let mut request = self.agent.get(url);
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }
        let response = request.call().map_err(|e| storage_err(e.to_string()))?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(Fetched::Missing);
        }
        if !status.is_success() {
            return Err(storage_err(format!("server returned {status}")));
        }
        let bytes = response
            .into_body()
            .with_config()
            .limit(MAX_DOWNLOAD)
            .read_to_vec()
            .map_err(|e| storage_err(e.to_string()))?;
        Ok(Fetched::Found(bytes))
    }

    fn put(&self, name: &str, body: &[u8]) -> Result<(), TiafError> {
        let url = self.url(name);
        let mut request = self.agent.put(&url);
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }
        let response = request.send(body).map_err(|e| TiafError::Storage {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TiafError::Storage {
                url,
                message: format!("server returned {status}"),
            });
        }
        tracing::debug!(url = %url, bytes = body.len(), "uploaded");
        Ok(())
    }

    fn put_json<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<(), TiafError> {
        let text = o3de_util::json::to_pretty_string(value).map_err(|e| TiafError::Json {
            path: self.url(name),
            message: e.to_string(),
        })?;
        self.put(name, text.as_bytes())
    }

    fn put_dir(&self, name: &str, dir: &Path) -> Result<(), TiafError> {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "nothing to upload");
            return Ok(());
        }
        self.put(name, &tar_gz_bytes(dir)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PersistentStorage for ObjectStorage {
    fn historic_data(&self) -> Option<&HistoricData> {
        self.historic.as_ref()
    }

    fn update_and_store_historic_data(&mut self, dst_commit: &str, runs: &[TestRun]) -> Result<(), TiafError> {
        let next = HistoricData::advanced(self.historic.as_ref(), dst_commit, runs);
        self.put_json(PREVIOUS_TEST_RUN_FILE, &runs)?;
        self.put_json(HISTORIC_DATA_FILE, &next)?;
        tracing::info!(commit = dst_commit, url = %self.base_url, "stored historic data");
        self.historic = Some(next);
        Ok(())
    }

    fn store_artifacts(&mut self, run_dir: &Path, coverage_dir: &Path) -> Result<(), TiafError> {
        self.put_dir(RUN_ARCHIVE, run_dir)?;
        self.put_dir(COVERAGE_ARCHIVE, coverage_dir)
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}
