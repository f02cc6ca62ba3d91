//! # posterkeep-core
//!
//! Keeps locally stored poster images in step with a media server catalog.
//! A poster is fetched for each catalog item and written next to the item's
//! media file only when its content differs from every poster already there.
//!
//! ## Guarantees
//!
//! - **No duplicate content**: SHA-256 digests, not file names, decide whether
//!   a poster is already stored ([`digest`], [`store`]).
//! - **No partial files**: downloads land in a hidden partial file, are
//!   fsynced, then renamed into place ([`store::PendingDownload`]).
//! - **One writer per directory**: an exclusively created marker directory
//!   serialises writers across processes ([`lock`]).
//!
//! ## Layout
//!
//! - [`pipeline`]: the fetch-dedup-store sequence for one item
//! - [`source`]: where poster bytes come from (HTTP by default)
//! - [`catalog`]: enumerating items and resolving their directories
//! - [`run`]: driving a whole catalog and reporting per-item outcomes

pub mod catalog;
pub mod cleanup;
pub mod digest;
pub mod error;
pub mod lock;
pub mod pipeline;
pub mod run;
pub mod source;
pub mod store;

pub use catalog::{Catalog, CatalogItem, PlexCatalog, PosterTarget};
pub use cleanup::CleanupOutcome;
pub use digest::{ContentDigest, ContentHasher, digest_bytes, digest_file};
pub use error::{CatalogError, PosterError, Result};
pub use lock::{DirectoryLock, LOCK_DIR_NAME, LockOptions};
pub use pipeline::{PosterPipeline, SyncOutcome};
pub use run::{
    ConsoleReporter, ItemReport, ItemStatus, RecordingReporter, Reporter,
    RunSummary, sync_catalog,
};
pub use source::{ByteStream, HttpPosterSource, PosterFetch, PosterSource};
pub use store::{PRIMARY_POSTER_NAME, PendingDownload, PosterStore};
