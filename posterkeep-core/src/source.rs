//! Where poster bytes come from.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::{PosterError, Result};

/// Poster body as a stream of chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Response to a single poster request.
pub enum PosterFetch {
    /// The body, delivered incrementally.
    Body(ByteStream),
    /// The server answered with a non-success status.
    Unavailable {
        /// Status the server answered with.
        status: StatusCode,
    },
}

impl fmt::Debug for PosterFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PosterFetch::Body(_) => f.write_str("PosterFetch::Body(..)"),
            PosterFetch::Unavailable { status } => f
                .debug_struct("PosterFetch::Unavailable")
                .field("status", status)
                .finish(),
        }
    }
}

/// Where poster bytes come from. One call per item; no retries.
#[async_trait]
pub trait PosterSource: Send + Sync {
    /// Start fetching `url`.
    async fn open(&self, url: &Url) -> Result<PosterFetch>;
}

/// Streams posters over HTTP with a single GET.
#[derive(Clone, Debug)]
pub struct HttpPosterSource {
    client: reqwest::Client,
}

impl HttpPosterSource {
    /// Source using an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Source with its own client and per-request timeout.
    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PosterSource for HttpPosterSource {
    async fn open(&self, url: &Url) -> Result<PosterFetch> {
        // Query strings carry the server token; keep them out of logs.
        debug!("requesting poster {}", url.path());
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(PosterFetch::Unavailable { status });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(PosterError::from))
            .boxed();
        Ok(PosterFetch::Body(body))
    }
}
