//! Poster files of a storage directory and downloads in flight.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::cleanup::CleanupOutcome;
use crate::digest::{ContentDigest, ContentHasher, digest_file};
use crate::error::{PosterError, Result};

/// Name used for the first poster stored in a directory.
pub const PRIMARY_POSTER_NAME: &str = "poster.jpg";

const POSTER_PREFIX: &str = "poster";
const POSTER_EXTENSION: &str = ".jpg";
const PARTIAL_PREFIX: &str = ".poster-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Poster files of one media item's storage directory.
///
/// Files are immutable once published: `poster.jpg` first, then
/// `poster-1.jpg`, `poster-2.jpg`, ... using the lowest free number. Mutating
/// calls are only correct while the directory lock is held.
#[derive(Clone, Debug)]
pub struct PosterStore {
    root: PathBuf,
}

impl PosterStore {
    /// Store for the posters in `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Whether `name` is considered a stored poster for deduplication.
    pub fn is_poster_name(name: &str) -> bool {
        name.starts_with(POSTER_PREFIX) && name.ends_with(POSTER_EXTENSION)
    }

    /// `poster.jpg` for slot 0, `poster-<n>.jpg` otherwise.
    pub fn slot_name(slot: u32) -> String {
        if slot == 0 {
            PRIMARY_POSTER_NAME.to_string()
        } else {
            format!("{POSTER_PREFIX}-{slot}{POSTER_EXTENSION}")
        }
    }

    /// Create the directory and any missing parents.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|source| {
            PosterError::StorageDirectory {
                path: self.root.clone(),
                source,
            }
        })
    }

    /// Digest of every poster file currently in the directory, keyed by file
    /// name. Files that cannot be read are skipped.
    pub async fn existing_digests(
        &self,
    ) -> Result<BTreeMap<String, ContentDigest>> {
        let mut digests = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned)
            else {
                continue;
            };
            if !Self::is_poster_name(&name) {
                continue;
            }

            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(err) => {
                    debug!("skipping unreadable poster {:?}: {err}", path);
                    continue;
                }
            }

            match digest_file(&path).await {
                Ok(digest) => {
                    digests.insert(name, digest);
                }
                Err(err) => {
                    debug!("skipping unreadable poster {:?}: {err}", path);
                }
            }
        }

        Ok(digests)
    }

    /// Name of a stored poster whose content hashes to `digest`, if any.
    pub async fn contains_digest(
        &self,
        digest: &ContentDigest,
    ) -> Result<Option<String>> {
        Ok(self
            .existing_digests()
            .await?
            .into_iter()
            .find_map(|(name, existing)| (existing == *digest).then_some(name)))
    }

    /// First free name in the `poster.jpg`, `poster-1.jpg`, ... sequence.
    ///
    /// Holes left by externally deleted files are reused.
    pub async fn next_available_name(&self) -> Result<PathBuf> {
        let mut slot = 0u32;
        loop {
            let candidate = self.root.join(Self::slot_name(slot));
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            slot = slot.checked_add(1).ok_or_else(|| {
                PosterError::Internal(format!(
                    "no free poster slot left in {:?}",
                    self.root
                ))
            })?;
        }
    }

    pub(crate) fn partial_path(&self) -> PathBuf {
        self.root.join(format!(
            "{PARTIAL_PREFIX}{}{PARTIAL_SUFFIX}",
            Uuid::new_v4().simple()
        ))
    }
}

/// A download being written next to its eventual target.
///
/// Its name never matches the poster pattern. It is either published under a
/// poster name or removed; dropping it unpublished removes the file.
#[derive(Debug)]
pub struct PendingDownload {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    hasher: ContentHasher,
    len: u64,
    settled: bool,
}

impl PendingDownload {
    /// Open a fresh partial file in the store's directory.
    pub async fn create(store: &PosterStore) -> Result<Self> {
        let path = store.partial_path();
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Some(file),
            hasher: ContentHasher::new(),
            len: 0,
            settled: false,
        })
    }

    /// Location of the partial file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `chunk` to the file and the running digest.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            PosterError::Internal(format!(
                "pending download {:?} already finished",
                self.path
            ))
        })?;
        self.hasher.update(chunk);
        file.write_all(chunk).await?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Flush and fsync the data, close the handle, and return the digest.
    pub async fn finish(&mut self) -> Result<ContentDigest> {
        let mut file = self.file.take().ok_or_else(|| {
            PosterError::Internal(format!(
                "pending download {:?} already finished",
                self.path
            ))
        })?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        Ok(std::mem::take(&mut self.hasher).finalize())
    }

    /// Remove the partial file without publishing it.
    pub async fn discard(mut self) -> CleanupOutcome {
        self.file.take();
        let outcome =
            CleanupOutcome::from_io(tokio::fs::remove_file(&self.path).await)
                .log("partial poster", &self.path);
        self.settled = true;
        outcome
    }

    /// Atomically rename into `target`, which must be in the same directory.
    pub async fn publish(mut self, target: &Path) -> Result<()> {
        if self.file.is_some() {
            return Err(PosterError::Internal(format!(
                "pending download {:?} published before finish",
                self.path
            )));
        }
        tokio::fs::rename(&self.path, target).await.map_err(|source| {
            PosterError::Publish {
                from: self.path.clone(),
                to: target.to_path_buf(),
                source,
            }
        })?;
        self.settled = true;
        Ok(())
    }
}

impl Drop for PendingDownload {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.file.take();
        CleanupOutcome::from_io(std::fs::remove_file(&self.path))
            .log("partial poster", &self.path);
    }
}
