//! Fetch-and-commit: turn one (poster URL, directory) pair into at most one
//! new poster file.
//!
//! Sequence, all but the first step under the directory lock:
//! 1. create the directory if needed
//! 2. take the lock, or report [`SyncOutcome::LockUnavailable`]
//! 3. stream the remote poster into a partial file while hashing it, fsync
//! 4. drop it if a stored poster has the same digest, otherwise rename it
//!    into the next free slot
//!
//! The partial file and the lock are removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::digest::ContentDigest;
use crate::error::Result;
use crate::lock::{DirectoryLock, LockOptions};
use crate::source::{ByteStream, PosterFetch, PosterSource};
use crate::store::{PendingDownload, PosterStore};

/// Permissions applied to published posters.
#[cfg(unix)]
const POSTER_MODE: u32 = 0o644;

/// What a single sync did to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new poster file was written.
    Saved {
        /// Newly published poster file.
        path: PathBuf,
        /// Digest of its content.
        digest: ContentDigest,
    },
    /// The remote poster matches `existing`; nothing written.
    Duplicate {
        /// File name of the stored poster with the same content.
        existing: String,
        /// Digest shared by both.
        digest: ContentDigest,
    },
    /// Another writer held the directory for the whole lock timeout.
    LockUnavailable,
    /// The server had no poster for this item.
    Unavailable {
        /// Status the server answered with.
        status: StatusCode,
    },
}

impl SyncOutcome {
    /// Whether a new poster file now exists.
    pub fn wrote_file(&self) -> bool {
        matches!(self, SyncOutcome::Saved { .. })
    }
}

/// Runs the fetch-and-commit sequence for one directory at a time.
#[derive(Clone)]
pub struct PosterPipeline {
    source: Arc<dyn PosterSource>,
    lock: LockOptions,
}

impl std::fmt::Debug for PosterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosterPipeline")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl PosterPipeline {
    /// Pipeline fetching from `source` and locking with `lock`.
    pub fn new(source: Arc<dyn PosterSource>, lock: LockOptions) -> Self {
        Self { source, lock }
    }

    #[instrument(
        name = "poster_pipeline.sync",
        skip(self, url),
        fields(directory = %directory.display(), poster = url.path()),
        err
    )]
    /// Fetch the poster at `url` and store it in `directory` unless an
    /// identical poster is already there.
    pub async fn sync(
        &self,
        url: &Url,
        directory: &Path,
    ) -> Result<SyncOutcome> {
        let store = PosterStore::new(directory.to_path_buf());
        store.ensure_root().await?;

        let Some(lock) = DirectoryLock::acquire(directory, self.lock).await?
        else {
            debug!("directory busy; not writing");
            return Ok(SyncOutcome::LockUnavailable);
        };

        let result = self.sync_locked(url, &store).await;
        lock.release().await;
        result
    }

    async fn sync_locked(
        &self,
        url: &Url,
        store: &PosterStore,
    ) -> Result<SyncOutcome> {
        let body = match self.source.open(url).await? {
            PosterFetch::Body(body) => body,
            PosterFetch::Unavailable { status } => {
                warn!("poster request returned HTTP {status}");
                return Ok(SyncOutcome::Unavailable { status });
            }
        };

        let mut pending = PendingDownload::create(store).await?;
        let digest = download(&mut pending, body).await?;
        if pending.is_empty() {
            debug!("poster body was empty");
        }

        if let Some(existing) = store.contains_digest(&digest).await? {
            debug!("poster {digest} already stored as {existing}");
            pending.discard().await;
            return Ok(SyncOutcome::Duplicate { existing, digest });
        }

        let target = store.next_available_name().await?;
        let bytes = pending.len();
        pending.publish(&target).await?;
        set_poster_permissions(&target).await;

        info!("saved poster {:?} ({bytes} bytes, {digest})", target);
        Ok(SyncOutcome::Saved {
            path: target,
            digest,
        })
    }
}

async fn download(
    pending: &mut PendingDownload,
    mut body: ByteStream,
) -> Result<ContentDigest> {
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        pending.write_chunk(&chunk).await?;
    }
    pending.finish().await
}

#[cfg(unix)]
async fn set_poster_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(POSTER_MODE);
    if let Err(err) = tokio::fs::set_permissions(path, perms).await {
        warn!("failed to set permissions on {:?}: {err}", path);
    }
}

#[cfg(not(unix))]
async fn set_poster_permissions(_path: &Path) {}
