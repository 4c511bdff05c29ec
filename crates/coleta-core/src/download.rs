//! Atomic asset downloads: stream to a partial file, rename on success.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;

use crate::fetch::{http_client, FetchError, SHARED_RUNTIME};

/// Why a download produced no file.
#[derive(Debug)]
pub enum DownloadError {
    /// Request failed or returned a non-success status
    Http(FetchError),
    /// Local write failed or the body stalled mid-transfer
    Io(io::Error),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<io::Error> for DownloadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Stream one verified asset URL to its destination path.
pub trait Download: Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

/// Suffix for in-flight transfers; only a clean rename removes it.
const PARTIAL_SUFFIX: &str = "part";

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// HTTP downloader with per-read stall detection.
///
/// The budget bounds each wait (response headers, then every body
/// read), never the whole transfer, so a large asset may take
/// arbitrarily long as long as bytes keep arriving. The final path is
/// only ever observed fully written: bytes stream into `<name>.part`,
/// which is renamed over the destination after the body ends cleanly
/// and removed on any failure. Reruns that overwrite an existing
/// asset go through the same rename.
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    /// Budget per read; a stall past this aborts the transfer.
    timeout: Duration,
}

impl AssetDownloader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn stalled(&self, what: &str) -> DownloadError {
        DownloadError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{what} stalled for {:?}", self.timeout),
        ))
    }

    fn transfer(&self, url: &str, tmp: &Path) -> Result<u64, DownloadError> {
        SHARED_RUNTIME.handle().block_on(async {
            let resp = tokio::time::timeout(self.timeout, http_client().get(url).send())
                .await
                .map_err(|_| self.stalled("response"))?
                .and_then(|r| r.error_for_status())
                .map_err(|e| DownloadError::Http(FetchError::from_reqwest(&e)))?;

            let mut file = File::create(tmp)?;
            let mut stream = resp.bytes_stream();
            let mut written = 0u64;
            loop {
                let chunk = match tokio::time::timeout(self.timeout, stream.next()).await {
                    Err(_) => return Err(self.stalled("body")),
                    Ok(None) => break,
                    Ok(Some(chunk)) => {
                        chunk.map_err(|e| DownloadError::Http(FetchError::from_reqwest(&e)))?
                    }
                };
                file.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            file.flush()?;
            Ok(written)
        })
    }
}

impl Download for AssetDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = partial_path(dest);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }

        match self.transfer(url, &tmp) {
            Ok(written) => {
                fs::rename(&tmp, dest)?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }
}

/// Remove stale `.part` files left behind by a killed process.
pub fn cleanup_partial_files(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            cleanup_partial_files(&path)?;
        } else if path.extension().is_some_and(|ext| ext == PARTIAL_SUFFIX) {
            log::warn!("removing stale partial file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/out/pdf/Book - Author.pdf")),
            PathBuf::from("/out/pdf/Book - Author.pdf.part")
        );
    }

    #[test]
    fn cleanup_removes_only_partials() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("epub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.pdf.part"), b"stale").unwrap();
        fs::write(sub.join("b.epub.part"), b"stale").unwrap();
        fs::write(dir.path().join("keep.pdf"), b"done").unwrap();

        cleanup_partial_files(dir.path()).unwrap();

        assert!(!dir.path().join("a.pdf.part").exists());
        assert!(!sub.join("b.epub.part").exists());
        assert!(dir.path().join("keep.pdf").exists());
    }

    #[test]
    fn cleanup_missing_dir_is_noop() {
        assert!(cleanup_partial_files(Path::new("/no/such/dir")).is_ok());
    }
}
