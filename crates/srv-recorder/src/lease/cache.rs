//! Local durable record of the last-known lease.

use recorder_common::constants::SESSION_FILE;
use recorder_common::{Lease, RecorderError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Lease cache file inside the data directory
#[derive(Debug, Clone)]
pub struct LeaseCache {
    path: PathBuf,
}

impl LeaseCache {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached lease.
    ///
    /// A missing, unreadable or undecodable file is a cache miss, never an
    /// error. Presence says nothing about validity.
    pub async fn load(&self) -> Option<Lease> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unable to read lease cache");
                return None;
            }
        };

        match serde_json::from_slice::<Lease>(&data) {
            Ok(lease) if lease.has_id() => Some(lease),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "lease cache has no lease id");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unable to decode lease cache");
                None
            }
        }
    }

    /// Persist `lease`, replacing any previous record.
    ///
    /// Written to a sibling temp file and renamed into place.
    pub async fn store(&self, lease: &Lease) -> Result<()> {
        let mut data = serde_json::to_vec(lease)?;
        data.push(b'\n');

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.cache_err("unable to create data directory", e))?;
        }

        let tmp = self.path.with_extension("json.tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&tmp)
            .await
            .map_err(|e| self.cache_err("unable to open lease cache", e))?;
        file.write_all(&data)
            .await
            .map_err(|e| self.cache_err("unable to write lease cache", e))?;
        file.sync_all()
            .await
            .map_err(|e| self.cache_err("unable to sync lease cache", e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.cache_err("unable to replace lease cache", e))?;

        tracing::debug!(path = %self.path.display(), lease_id = %lease.id, "Lease cached");
        Ok(())
    }

    /// Remove the cache file. Failures are logged only.
    pub async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Lease cache removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                // not fatal, a stale file fails validation on the next run
                tracing::warn!(path = %self.path.display(), error = %e, "unable to remove lease cache");
            }
        }
    }

    fn cache_err(&self, what: &str, e: std::io::Error) -> RecorderError {
        RecorderError::Cache(format!("{} {}: {}", what, self.path.display(), e))
    }
}
