//! Environment keys, file names and defaults.

use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "POSTERKEEP_CONFIG_PATH";
pub const ENV_SERVER_URL: &str = "POSTERKEEP_SERVER_URL";
pub const ENV_TOKEN: &str = "POSTERKEEP_TOKEN";
pub const ENV_SECTIONS: &str = "POSTERKEEP_SECTIONS";
pub const ENV_LOCK_TIMEOUT: &str = "POSTERKEEP_LOCK_TIMEOUT";
pub const ENV_LOCK_RETRY_DELAY: &str = "POSTERKEEP_LOCK_RETRY_DELAY";
pub const ENV_HTTP_TIMEOUT: &str = "POSTERKEEP_HTTP_TIMEOUT";

/// Every variable the loader reads.
pub const MANAGED_KEYS: &[&str] = &[
    ENV_CONFIG_PATH,
    ENV_SERVER_URL,
    ENV_TOKEN,
    ENV_SECTIONS,
    ENV_LOCK_TIMEOUT,
    ENV_LOCK_RETRY_DELAY,
    ENV_HTTP_TIMEOUT,
];

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_CONFIG_FILE: &str = "posterkeep.toml";

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str =
    concat!("posterkeep/", env!("CARGO_PKG_VERSION"));
