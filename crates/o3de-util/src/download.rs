//! HTTP download helpers built on a shared `ureq` agent configuration.

use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Build an HTTP agent with connect and overall timeouts.
///
/// Non-2xx statuses are returned as responses rather than errors so callers
/// can distinguish "not found" from transport failures.
pub fn agent(global_timeout: Duration) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::config::Config::builder()
            .timeout_connect(Some(Duration::from_secs(30)))
            .timeout_global(Some(global_timeout))
            .http_status_as_error(false)
            .build(),
    )
}

/// Download `url` into `dest`, returning the SHA-256 of the content.
///
/// The body is streamed to a sibling temp file which is renamed into place
/// only after the transfer completes.
///
/// # Errors
/// Returns an error if the request fails, the server answers with a non-success
/// status, or the file cannot be written.
pub fn download_to(url: &str, dest: &Path) -> Result<String, UtilError> {
    let response = agent(Duration::from_secs(600))
        .get(url)
        .call()
        .map_err(|e| UtilError::Download {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(UtilError::Download {
            url: url.to_owned(),
            message: format!("server returned {status}"),
        });
    }

    if let Some(parent) = dest.parent() {
        crate::fs::ensure_dir(parent)?;
    }
    let mut tmp_name = dest.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".part");
    let tmp = dest.with_file_name(tmp_name);

    let mut body = response.into_body();
    let mut reader = body.as_reader();
    let mut file = std::fs::File::create(&tmp).map_err(|source| UtilError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = std::io::Read::read(&mut reader, &mut buf).map_err(|e| UtilError::Download {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        let Some(chunk) = buf.get(..n) else {
            break;
        };
        std::io::Write::write_all(&mut file, chunk).map_err(|source| UtilError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        hasher.update(chunk);
    }
    drop(file);

    std::fs::rename(&tmp, dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fetch a document from an `http(s)://`, `file://`, or plain filesystem location.
///
/// # Errors
/// Returns an error if the location cannot be read.
pub fn fetch_to(uri: &str, dest: &Path) -> Result<(), UtilError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        download_to(uri, dest)?;
        return Ok(());
    }
    let local = uri.strip_prefix("file://").unwrap_or(uri);
    crate::fs::copy_file(Path::new(local), dest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fetch_local_path() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("repo.json");
        std::fs::write(&src, b"{\"repo_name\": \"r\"}").unwrap();
        let dest = tmp.path().join("cache").join("x.json");

        fetch_to(&format!("file://{}", src.display()), &dest).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn fetch_missing_local_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = fetch_to("/definitely/not/here.json", &tmp.path().join("x.json"));
        assert!(err.is_err());
    }
}
