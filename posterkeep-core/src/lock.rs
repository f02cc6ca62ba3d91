//! Cross-process mutual exclusion over a single storage directory.
//!
//! The lock is a marker directory created with an exclusive `mkdir`. The
//! filesystem refuses to create it twice, so holders in unrelated processes
//! exclude each other without any shared memory. Owner metadata written into
//! the marker is diagnostic only.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cleanup::CleanupOutcome;
use crate::error::Result;

/// Name of the marker directory created inside a locked directory.
pub const LOCK_DIR_NAME: &str = ".poster-lockdir";
/// Diagnostic file inside the marker: `<pid>\n<unix-seconds>\n`.
pub const OWNER_FILE_NAME: &str = "owner";

/// Timing for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// How long to keep retrying before giving up.
    pub timeout: Duration,
    /// Pause between attempts while another holder owns the marker.
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// A held directory lock. Released by [`DirectoryLock::release`] or, failing
/// that, when dropped.
#[derive(Debug)]
pub struct DirectoryLock {
    marker: PathBuf,
    released: bool,
}

impl DirectoryLock {
    /// Marker location for `directory`.
    pub fn marker_path(directory: &Path) -> PathBuf {
        directory.join(LOCK_DIR_NAME)
    }

    /// Try to take the lock for `directory` until `options.timeout` elapses.
    ///
    /// `Ok(None)` means the lock is held elsewhere (or cannot be created for
    /// permission reasons); callers treat it as an ordinary outcome. At least
    /// one attempt is always made, even with a zero timeout.
    pub async fn acquire(
        directory: &Path,
        options: LockOptions,
    ) -> Result<Option<DirectoryLock>> {
        let marker = Self::marker_path(directory);
        // Durations too large to represent as an instant never expire.
        let deadline = Instant::now().checked_add(options.timeout);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match tokio::fs::create_dir(&marker).await {
                Ok(()) => {
                    write_owner(&marker).await;
                    debug!(
                        "acquired poster lock {:?} after {attempts} attempt(s)",
                        marker
                    );
                    return Ok(Some(DirectoryLock {
                        marker,
                        released: false,
                    }));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let pause = match deadline {
                        Some(deadline) => {
                            let now = Instant::now();
                            if now >= deadline {
                                debug!(
                                    "poster lock {:?} still held after {:?}; giving up",
                                    marker, options.timeout
                                );
                                return Ok(None);
                            }
                            options.retry_delay.min(deadline - now)
                        }
                        None => options.retry_delay,
                    };
                    tokio::time::sleep(pause).await;
                }
                Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                    warn!("cannot create poster lock {:?}: {err}", marker);
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The marker directory this lock owns.
    pub fn path(&self) -> &Path {
        &self.marker
    }

    /// Remove the marker. Never fails; the outcome is returned for inspection.
    pub async fn release(mut self) -> CleanupOutcome {
        let owner = self.marker.join(OWNER_FILE_NAME);
        CleanupOutcome::from_io(tokio::fs::remove_file(&owner).await)
            .log("lock owner file", &owner);
        let outcome =
            CleanupOutcome::from_io(tokio::fs::remove_dir(&self.marker).await)
                .log("poster lock", &self.marker);
        // Set only once both removals ran, so a cancelled release still
        // leaves the work to `Drop`.
        self.released = true;
        outcome
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let owner = self.marker.join(OWNER_FILE_NAME);
        CleanupOutcome::from_io(std::fs::remove_file(&owner))
            .log("lock owner file", &owner);
        CleanupOutcome::from_io(std::fs::remove_dir(&self.marker))
            .log("poster lock", &self.marker);
    }
}

async fn write_owner(marker: &Path) {
    let contents = format!(
        "{}\n{}\n",
        std::process::id(),
        chrono::Utc::now().timestamp()
    );
    if let Err(err) =
        tokio::fs::write(marker.join(OWNER_FILE_NAME), contents).await
    {
        debug!("could not record lock owner in {:?}: {err}", marker);
    }
}
