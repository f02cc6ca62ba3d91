//! Shared helpers for core integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use posterkeep_core::{PosterError, PosterFetch, PosterSource, Result};
use reqwest::StatusCode;
use url::Url;

/// What the next `open` call answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(StatusCode),
    /// Deliver these bytes, then fail the stream.
    BrokenAfter(Vec<u8>),
}

/// In-memory poster source whose reply can be swapped between runs.
#[derive(Debug)]
pub struct ScriptedSource {
    reply: Mutex<Reply>,
    chunk_size: usize,
    chunk_delay: Duration,
    opened: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            chunk_size: 3,
            chunk_delay: Duration::ZERO,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn slow(reply: Reply, chunk_delay: Duration) -> Self {
        Self {
            chunk_delay,
            ..Self::new(reply)
        }
    }

    pub fn set(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

fn chunked(payload: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    payload.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}

#[async_trait]
impl PosterSource for ScriptedSource {
    async fn open(&self, _url: &Url) -> Result<PosterFetch> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().unwrap().clone();
        let delay = self.chunk_delay;

        let (payload, broken) = match reply {
            Reply::Status(status) => {
                return Ok(PosterFetch::Unavailable { status });
            }
            Reply::Body(payload) => (payload, false),
            Reply::BrokenAfter(payload) => (payload, true),
        };

        let chunks = chunked(&payload, self.chunk_size);
        let body = stream::iter(chunks)
            .then(move |chunk| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(Bytes::from(chunk))
            })
            .chain(stream::iter(broken.then(|| {
                Err(PosterError::Internal("connection reset".to_string()))
            })))
            .boxed();

        Ok(PosterFetch::Body(body))
    }
}

pub fn poster_url() -> Url {
    Url::parse("http://media.test/library/metadata/1/thumb/1").unwrap()
}

/// Sorted names of every entry in `dir`.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
