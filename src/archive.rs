//! # Archive Module
//!
//! Offsite archival of superseded log files.
//!
//! The remote store is an abstract collaborator behind
//! [`ArchiveUploader`]; the concrete protocol is a deployment concern.
//! Archival is best-effort and fire-and-forget with respect to the
//! sampling loop: rotation proceeds whether or not the upload succeeds,
//! and no retry loop runs inline with ticks.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PowerlogError, Result};
use crate::logfile::SupersededFile;

/// Durably copies a finalized log file to remote storage.
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    /// Whether an object with this remote name already exists.
    async fn exists(&self, remote_path: &str) -> Result<bool>;

    /// Copies the local file to the remote name.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()>;
}

/// Derives the remote directory for a site/logger pair:
/// `<base_path>/<site>/<logger>/`.
#[must_use]
pub fn remote_dir(base_path: &str, site: &str, logger: &str) -> String {
    format!("{}/{}/{}/", base_path.trim_end_matches('/'), site, logger)
}

/// Uploads one superseded file, disambiguating name collisions.
///
/// If the derived remote name is already taken, the supersession time
/// (`%H:%M:%S`) is appended and the upload is retried exactly once; a
/// second collision is a reported failure, never a crash.
///
/// # Errors
///
/// Returns error on a persistent collision or if the uploader fails.
pub async fn archive_file(
    uploader: &dyn ArchiveUploader,
    file: &SupersededFile,
    remote_dir: &str,
    superseded_at: DateTime<Tz>,
) -> Result<String> {
    let mut remote = format!("{}{}", remote_dir, file.name);

    if uploader.exists(&remote).await? {
        debug!("Remote name taken, disambiguating: {}", remote);
        remote.push_str(&superseded_at.format("%H:%M:%S").to_string());

        if uploader.exists(&remote).await? {
            return Err(PowerlogError::Archive(format!(
                "remote name still taken after disambiguation: {}",
                remote
            )));
        }
    }

    uploader.upload(&file.path, &remote).await?;
    Ok(remote)
}

/// Spawns the archival of a superseded file as a background task.
///
/// The handle is returned for tests; the sampling loop drops it and
/// never waits on it. Failures are logged, not propagated.
pub fn spawn_upload(
    uploader: Arc<dyn ArchiveUploader>,
    file: SupersededFile,
    remote_dir: String,
    superseded_at: DateTime<Tz>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match archive_file(uploader.as_ref(), &file, &remote_dir, superseded_at).await {
            Ok(remote) => info!("Archived {} to {}", file.name, remote),
            Err(e) => warn!("Failed to archive {}: {}", file.name, e),
        }
    })
}

/// Uploader that mirrors files into a local directory tree.
///
/// Stands in for the remote store in deployments without one; the
/// remote path maps onto a subtree under `root`.
#[derive(Debug, Clone)]
pub struct LocalMirrorUploader {
    root: PathBuf,
}

impl LocalMirrorUploader {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, remote_path: &str) -> PathBuf {
        self.root.join(remote_path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArchiveUploader for LocalMirrorUploader {
    async fn exists(&self, remote_path: &str) -> Result<bool> {
        Ok(self.target(remote_path).exists())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let target = self.target(remote_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &target).await?;
        Ok(())
    }
}

/// Uploader that discards everything, for deployments with archival
/// disabled.
#[derive(Debug, Clone, Default)]
pub struct NullUploader;

#[async_trait]
impl ArchiveUploader for NullUploader {
    async fn exists(&self, _remote_path: &str) -> Result<bool> {
        Ok(false)
    }

    async fn upload(&self, _local_path: &Path, remote_path: &str) -> Result<()> {
        debug!("Archival disabled, skipping upload of {}", remote_path);
        Ok(())
    }
}
