//! Validated configuration values and the TOML file shape.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use posterkeep_core::LockOptions;
use serde::Deserialize;
use url::Url;

/// Effective configuration after merging every source.
#[derive(Debug, Clone)]
pub struct Config {
    /// Media server to enumerate.
    pub server: ServerConfig,
    /// Sections to sync.
    pub library: LibraryConfig,
    /// Directory lock timing.
    pub lock: LockConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Files the values were read from.
    pub metadata: ConfigMetadata,
}

/// Media server address and access token.
#[derive(Clone)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://localhost:32400`.
    pub url: Url,
    /// Sent as `X-Plex-Token`; never logged in full.
    pub token: String,
}

impl ServerConfig {
    /// First four characters followed by `****`, or just `****` for short
    /// tokens.
    pub fn redacted_token(&self) -> String {
        let visible: String = self.token.chars().take(4).collect();
        if self.token.chars().count() <= 8 {
            "****".to_string()
        } else {
            format!("{visible}****")
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url.as_str())
            .field("token", &self.redacted_token())
            .finish()
    }
}

/// Which parts of the library to sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Library section identifiers, enumerated in order.
    pub sections: Vec<String>,
}

/// Directory lock timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// How long to wait for a busy directory.
    pub timeout: Duration,
    /// Pause between lock attempts.
    pub retry_delay: Duration,
}

impl LockConfig {
    /// The equivalent pipeline lock options.
    pub fn options(&self) -> LockOptions {
        LockOptions {
            timeout: self.timeout,
            retry_delay: self.retry_delay,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Per-poster request timeout.
    pub request_timeout: Duration,
    /// Timeout for catalog listing requests.
    pub catalog_timeout: Duration,
    /// `User-Agent` header for every request.
    pub user_agent: String,
}

/// Where the effective values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    /// TOML file that was read, if any.
    pub config_path: Option<PathBuf>,
    /// `.env` file that was read, if any.
    pub env_file: Option<PathBuf>,
}

/// On-disk TOML shape. Every field is optional; durations are humantime
/// strings such as `"10s"` or `"250ms"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileConfig {
    pub server: FileServer,
    pub library: FileLibrary,
    pub lock: FileLock,
    pub http: FileHttp,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileServer {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileLibrary {
    pub sections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileLock {
    pub timeout: Option<String>,
    pub retry_delay: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileHttp {
    pub request_timeout: Option<String>,
    pub catalog_timeout: Option<String>,
    pub user_agent: Option<String>,
}
