//! Error types for the sync pipeline and the catalog client.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while syncing a single item.
#[derive(Error, Debug)]
pub enum PosterError {
    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure fetching the poster.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The item's directory could not be created.
    #[error("failed to create storage directory {path:?}: {source}")]
    StorageDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Renaming the finished download into place failed.
    #[error("failed to publish poster {from:?} -> {to:?}: {source}")]
    Publish {
        /// Partial file.
        from: PathBuf,
        /// Intended poster name.
        to: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A state that correct callers never reach.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias for per-item operations.
pub type Result<T> = std::result::Result<T, PosterError>;

/// Failures that prevent the catalog from being enumerated at all.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The server could not be reached.
    #[error("catalog unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The listing request was answered with an error status.
    #[error("catalog returned HTTP {status} for section {section}")]
    HttpStatus {
        /// Status returned.
        status: reqwest::StatusCode,
        /// Library section requested.
        section: String,
    },

    /// The listing body was not parseable.
    #[error("catalog response for section {section} is not valid XML: {source}")]
    Parse {
        /// Library section requested.
        section: String,
        /// Parser failure.
        #[source]
        source: quick_xml::Error,
    },

    /// The server URL and a path did not form a valid URL.
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
