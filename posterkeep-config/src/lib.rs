//! Configuration for posterkeep.
//!
//! Values are merged from, in increasing precedence: built-in defaults, a
//! TOML file, a `.env` file, the process environment, and explicit overrides
//! (usually CLI flags). The result is validated once and handed to the sync
//! entry point as a plain value.

#[allow(missing_docs)]
pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoader, ConfigOverrides, error::ConfigLoadError};
pub use models::{
    Config, ConfigMetadata, HttpConfig, LibraryConfig, LockConfig,
    ServerConfig,
};
pub use validation::ConfigGuardRailError;
