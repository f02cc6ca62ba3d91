//! Checks applied to loaded configuration.

use thiserror::Error;

use super::models::{Config, HttpConfig, LockConfig};

/// A loaded value that is well-formed but unusable.
#[derive(Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConfigGuardRailError {
    #[error("server URL must use http or https, got '{scheme}'")]
    UnsupportedScheme { scheme: String },
    #[error("server token is empty")]
    EmptyToken,
    #[error("no library sections configured")]
    NoSections,
    #[error("library section '{section}' is not a valid identifier")]
    InvalidSection { section: String },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("lock retry delay must be shorter than the lock timeout")]
    RetryDelayTooLong,
}

/// Checks on a fully loaded configuration.
pub fn apply_guard_rails(config: &Config) -> Result<(), ConfigGuardRailError> {
    let scheme = config.server.url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigGuardRailError::UnsupportedScheme {
            scheme: scheme.to_string(),
        });
    }

    if config.server.token.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyToken);
    }

    if config.library.sections.is_empty() {
        return Err(ConfigGuardRailError::NoSections);
    }
    for section in &config.library.sections {
        let valid = !section.is_empty()
            && section
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(ConfigGuardRailError::InvalidSection {
                section: section.clone(),
            });
        }
    }

    check_pipeline_settings(&config.lock, &config.http)
}

/// Checks shared by every command that runs the pipeline.
pub fn check_pipeline_settings(
    lock: &LockConfig,
    http: &HttpConfig,
) -> Result<(), ConfigGuardRailError> {
    for (field, value) in [
        ("lock timeout", lock.timeout),
        ("lock retry delay", lock.retry_delay),
        ("HTTP request timeout", http.request_timeout),
        ("catalog timeout", http.catalog_timeout),
    ] {
        if value.is_zero() {
            return Err(ConfigGuardRailError::ZeroDuration { field });
        }
    }

    if lock.retry_delay >= lock.timeout {
        return Err(ConfigGuardRailError::RetryDelayTooLong);
    }

    Ok(())
}
