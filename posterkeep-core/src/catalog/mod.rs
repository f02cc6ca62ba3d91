//! Read-only media catalog client.
//!
//! Lists a library section and resolves each video to the directory holding
//! its primary media file plus the URL of its poster.

pub mod parse;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::CatalogError;

pub use parse::{VideoEntry, parse_library_listing};

const TOKEN_PARAM: &str = "X-Plex-Token";

/// Where one item's poster comes from and where it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterTarget {
    /// Poster image URL, token included.
    pub poster_url: Url,
    /// Directory of the item's media file.
    pub directory: PathBuf,
}

/// One catalog record. `target` is `None` when the item lacks a media path or
/// a poster reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    /// Name used in status lines.
    pub label: String,
    #[allow(missing_docs)]
    pub target: Option<PosterTarget>,
}

/// Source of the items to sync.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Enumerate every item once. Failure here aborts the whole run.
    async fn items(&self) -> Result<Vec<CatalogItem>, CatalogError>;
}

/// Plex-compatible library listing over HTTP.
#[derive(Clone)]
pub struct PlexCatalog {
    client: reqwest::Client,
    server: Url,
    token: String,
    sections: Vec<String>,
}

impl std::fmt::Debug for PlexCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexCatalog")
            .field("server", &self.server.as_str())
            .field("token", &"<redacted>")
            .field("sections", &self.sections)
            .finish()
    }
}

impl PlexCatalog {
    /// Catalog using an existing client.
    pub fn new(
        client: reqwest::Client,
        server: Url,
        token: impl Into<String>,
        sections: Vec<String>,
    ) -> Self {
        Self {
            client,
            server,
            token: token.into(),
            sections,
        }
    }

    /// Catalog with its own client and request timeout.
    pub fn with_timeout(
        server: Url,
        token: impl Into<String>,
        sections: Vec<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self::new(client, server, token, sections))
    }

    /// Listing URL for one library section.
    pub fn section_url(&self, section: &str) -> Result<Url, CatalogError> {
        let mut url = self.join(&format!("/library/sections/{section}/all"))?;
        url.query_pairs_mut().append_pair(TOKEN_PARAM, &self.token);
        Ok(url)
    }

    /// Poster URL for a `thumb` path, carrying the access token.
    pub fn poster_url(&self, thumb: &str) -> Result<Url, CatalogError> {
        let mut url = self.join(thumb)?;
        url.query_pairs_mut().append_pair(TOKEN_PARAM, &self.token);
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, CatalogError> {
        let base = self.server.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Turn a listing entry into a catalog item.
    pub fn resolve(&self, entry: &VideoEntry) -> CatalogItem {
        let label = entry
            .title
            .clone()
            .or_else(|| entry.rating_key.clone())
            .or_else(|| {
                entry
                    .media_file
                    .as_ref()
                    .map(|p| p.display().to_string())
            })
            .unwrap_or_else(|| "<untitled>".to_string());

        let directory = entry
            .media_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);

        let poster_url = entry.thumb.as_deref().and_then(|thumb| {
            self.poster_url(thumb)
                .inspect_err(|err| {
                    debug!("unusable thumb {thumb:?} for {label}: {err}")
                })
                .ok()
        });

        let target = match (directory, poster_url) {
            (Some(directory), Some(poster_url)) => Some(PosterTarget {
                poster_url,
                directory,
            }),
            _ => None,
        };

        CatalogItem { label, target }
    }

    #[instrument(name = "plex_catalog.section", skip(self), err)]
    async fn section_items(
        &self,
        section: &str,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let url = self.section_url(section)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                status,
                section: section.to_string(),
            });
        }

        let body = response.bytes().await?;
        let entries =
            parse_library_listing(&body).map_err(|source| CatalogError::Parse {
                section: section.to_string(),
                source,
            })?;

        info!("section {section} lists {} video(s)", entries.len());
        Ok(entries.iter().map(|entry| self.resolve(entry)).collect())
    }
}

#[async_trait]
impl Catalog for PlexCatalog {
    async fn items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut items = Vec::new();
        for section in &self.sections {
            items.extend(self.section_items(section).await?);
        }
        Ok(items)
    }
}
