//! Drives the pipeline over a whole catalog and reports each item.

use std::io::Write;
use std::path::PathBuf;

use reqwest::StatusCode;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CatalogItem};
use crate::error::CatalogError;
use crate::pipeline::{PosterPipeline, SyncOutcome};

/// Per-item result as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ItemStatus {
    Saved { path: PathBuf },
    Duplicate { existing: String },
    LockUnavailable,
    Unavailable { status: StatusCode },
    /// The catalog gave no media path or poster for the item.
    Skipped,
    Failed { error: String },
}

/// What happened to one catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Title, or the best identifier the catalog offered.
    pub label: String,
    /// Storage directory, when the item resolved to one.
    pub directory: Option<PathBuf>,
    /// Outcome of the item.
    pub status: ItemStatus,
}

/// Receives one report per catalog item, in processing order.
pub trait Reporter: Send {
    /// Called once per item, right after it is processed.
    fn report(&mut self, item: &ItemReport);
}

/// Per-status item counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// New poster files written.
    pub saved: usize,
    /// Remote poster already stored.
    pub duplicate: usize,
    /// Directory held by another writer past the lock timeout.
    pub lock_unavailable: usize,
    /// Server had no poster.
    pub unavailable: usize,
    /// Item could not be resolved to a directory and poster.
    pub skipped: usize,
    /// Item failed with an error.
    pub failed: usize,
}

impl RunSummary {
    /// Number of items seen.
    pub fn total(&self) -> usize {
        self.saved
            + self.duplicate
            + self.lock_unavailable
            + self.unavailable
            + self.skipped
            + self.failed
    }

    fn record(&mut self, status: &ItemStatus) {
        match status {
            ItemStatus::Saved { .. } => self.saved += 1,
            ItemStatus::Duplicate { .. } => self.duplicate += 1,
            ItemStatus::LockUnavailable => self.lock_unavailable += 1,
            ItemStatus::Unavailable { .. } => self.unavailable += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed { .. } => self.failed += 1,
        }
    }
}

/// Sync every catalog item sequentially.
///
/// Only a failure to enumerate the catalog is returned as an error; item
/// failures are reported and the run moves on.
#[instrument(name = "poster_sync.run", skip_all, err)]
pub async fn sync_catalog(
    catalog: &dyn Catalog,
    pipeline: &PosterPipeline,
    reporter: &mut dyn Reporter,
) -> Result<RunSummary, CatalogError> {
    let items = catalog.items().await?;
    info!("syncing posters for {} catalog item(s)", items.len());

    let mut summary = RunSummary::default();
    for item in items {
        let report = sync_item(pipeline, item).await;
        summary.record(&report.status);
        reporter.report(&report);
    }

    info!(
        saved = summary.saved,
        duplicate = summary.duplicate,
        lock_unavailable = summary.lock_unavailable,
        unavailable = summary.unavailable,
        skipped = summary.skipped,
        failed = summary.failed,
        "poster sync finished"
    );
    Ok(summary)
}

async fn sync_item(pipeline: &PosterPipeline, item: CatalogItem) -> ItemReport {
    let CatalogItem { label, target } = item;
    let Some(target) = target else {
        return ItemReport {
            label,
            directory: None,
            status: ItemStatus::Skipped,
        };
    };

    let status = match pipeline.sync(&target.poster_url, &target.directory).await
    {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            warn!("poster sync failed for {label}: {err}");
            ItemStatus::Failed {
                error: err.to_string(),
            }
        }
    };

    ItemReport {
        label,
        directory: Some(target.directory),
        status,
    }
}

impl From<SyncOutcome> for ItemStatus {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Saved { path, .. } => ItemStatus::Saved { path },
            SyncOutcome::Duplicate { existing, .. } => {
                ItemStatus::Duplicate { existing }
            }
            SyncOutcome::LockUnavailable => ItemStatus::LockUnavailable,
            SyncOutcome::Unavailable { status } => {
                ItemStatus::Unavailable { status }
            }
        }
    }
}

/// Status stream: outcomes on `out`, failures on `err`.
#[derive(Debug)]
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl ConsoleReporter<std::io::Stdout, std::io::Stderr> {
    /// Reporter on the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    /// Reporter writing outcomes to `out` and failures to `err`.
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Give back the writers.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write + Send, E: Write + Send> Reporter for ConsoleReporter<O, E> {
    fn report(&mut self, item: &ItemReport) {
        let place = item
            .directory
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| item.label.clone());

        // A closed status stream must not stop the run.
        let _ = match &item.status {
            ItemStatus::Saved { path } => writeln!(
                self.out,
                "Saved new poster for {place}: {}",
                path.display()
            ),
            ItemStatus::Duplicate { existing } => writeln!(
                self.out,
                "No new poster saved for {place} (same as {existing})"
            ),
            ItemStatus::LockUnavailable => writeln!(
                self.out,
                "No new poster saved for {place} (directory locked by another writer)"
            ),
            ItemStatus::Unavailable { status } => writeln!(
                self.out,
                "No new poster saved for {place} (server returned {status})"
            ),
            ItemStatus::Skipped => writeln!(
                self.out,
                "Skipped {} (no media path or poster)",
                item.label
            ),
            ItemStatus::Failed { error } => {
                writeln!(self.err, "Error handling {}: {error}", item.label)
            }
        };
    }
}

/// Collects reports in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    /// Reports in the order received.
    pub reports: Vec<ItemReport>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, item: &ItemReport) {
        self.reports.push(item.clone());
    }
}
