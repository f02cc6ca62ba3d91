//! Best-effort removal of lock markers and partial downloads.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

/// Result of a best-effort removal. Failures are logged, never propagated.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The path existed and was removed.
    Removed,
    /// Nothing to remove.
    AlreadyGone,
    /// Removal failed; the path may still exist.
    Failed(std::io::Error),
}

impl CleanupOutcome {
    pub(crate) fn from_io(result: std::io::Result<()>) -> Self {
        match result {
            Ok(()) => CleanupOutcome::Removed,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                CleanupOutcome::AlreadyGone
            }
            Err(err) => CleanupOutcome::Failed(err),
        }
    }

    pub(crate) fn log(self, what: &str, path: &Path) -> Self {
        match &self {
            CleanupOutcome::Removed => debug!("removed {what} {:?}", path),
            CleanupOutcome::AlreadyGone => {
                debug!("{what} {:?} was already gone", path)
            }
            CleanupOutcome::Failed(err) => {
                warn!("failed to remove {what} {:?}: {err}", path)
            }
        }
        self
    }
}
