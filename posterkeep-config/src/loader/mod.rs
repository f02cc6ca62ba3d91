//! Merges configuration sources into a [`Config`].

pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::constants::{
    DEFAULT_CATALOG_TIMEOUT, DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE,
    DEFAULT_HTTP_TIMEOUT, DEFAULT_LOCK_RETRY_DELAY, DEFAULT_LOCK_TIMEOUT,
    DEFAULT_USER_AGENT, ENV_CONFIG_PATH, ENV_HTTP_TIMEOUT,
    ENV_LOCK_RETRY_DELAY, ENV_LOCK_TIMEOUT, ENV_SECTIONS, ENV_SERVER_URL,
    ENV_TOKEN, MANAGED_KEYS,
};
use crate::models::{
    Config, ConfigMetadata, FileConfig, HttpConfig, LibraryConfig, LockConfig,
    ServerConfig,
};
use crate::validation::{apply_guard_rails, check_pipeline_settings};

use error::ConfigLoadError;

/// Values supplied explicitly, typically from command-line flags. They win
/// over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// TOML file to read instead of the default lookup.
    pub config_path: Option<PathBuf>,
    /// Env file to read instead of `./.env`.
    pub env_file: Option<PathBuf>,
    /// Media server base URL.
    pub server_url: Option<String>,
    /// Media server token.
    pub token: Option<String>,
    /// Library sections; empty means not overridden.
    pub sections: Vec<String>,
}

/// Builds a [`Config`] from the environment, files and overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env: HashMap<String, String>,
    /// Files looked up when no explicit path is given; `None` in hermetic
    /// loaders built with [`ConfigLoader::with_env`].
    default_env_file: Option<PathBuf>,
    default_config_file: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Loader reading the process environment and the default `.env` and
    /// `posterkeep.toml` in the working directory.
    pub fn from_process_env() -> Self {
        let env = std::env::vars()
            .filter(|(key, _)| MANAGED_KEYS.contains(&key.as_str()))
            .collect();
        Self {
            env,
            default_env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            default_config_file: Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
            overrides: ConfigOverrides::default(),
        }
    }

    /// Loader that sees only `vars` and never looks for default files.
    pub fn with_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default_env_file: None,
            default_config_file: None,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Replace the explicit overrides.
    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge every source and validate the result.
    pub fn load(&self) -> Result<Config, ConfigLoadError> {
        let mut metadata = ConfigMetadata::default();
        let env = self.effective_env(&mut metadata)?;
        let file = self.read_config_file(&env, &mut metadata)?;

        let server_url = self
            .overrides
            .server_url
            .clone()
            .or_else(|| non_empty(&env, ENV_SERVER_URL))
            .or_else(|| file.server.url.clone())
            .ok_or(ConfigLoadError::MissingServerUrl {
                key: ENV_SERVER_URL,
            })?;
        let url = Url::parse(server_url.trim()).map_err(|source| {
            ConfigLoadError::InvalidServerUrl {
                value: server_url.clone(),
                source,
            }
        })?;

        let token = self
            .overrides
            .token
            .clone()
            .or_else(|| non_empty(&env, ENV_TOKEN))
            .or_else(|| file.server.token.clone())
            .ok_or(ConfigLoadError::MissingToken { key: ENV_TOKEN })?;

        let sections = if !self.overrides.sections.is_empty() {
            self.overrides.sections.clone()
        } else if let Some(raw) = non_empty(&env, ENV_SECTIONS) {
            split_list(&raw)
        } else {
            file.library.sections.clone().unwrap_or_default()
        };

        let (lock, http) = pipeline_settings(&env, &file)?;

        let config = Config {
            server: ServerConfig {
                url,
                token: token.trim().to_string(),
            },
            library: LibraryConfig { sections },
            lock,
            http,
            metadata,
        };

        apply_guard_rails(&config)?;
        Ok(config)
    }

    /// Lock and HTTP settings only, for callers that need no catalog access.
    pub fn load_pipeline_settings(
        &self,
    ) -> Result<(LockConfig, HttpConfig), ConfigLoadError> {
        let mut metadata = ConfigMetadata::default();
        let env = self.effective_env(&mut metadata)?;
        let file = self.read_config_file(&env, &mut metadata)?;
        let (lock, http) = pipeline_settings(&env, &file)?;
        check_pipeline_settings(&lock, &http)?;
        Ok((lock, http))
    }

    /// `.env` values overlaid by the captured environment.
    fn effective_env(
        &self,
        metadata: &mut ConfigMetadata,
    ) -> Result<HashMap<String, String>, ConfigLoadError> {
        let env_file = match &self.overrides.env_file {
            Some(path) => Some(path.clone()),
            None => self
                .default_env_file
                .clone()
                .filter(|path| path.is_file()),
        };

        let mut merged = HashMap::new();
        if let Some(path) = env_file {
            merged.extend(read_env_file(&path)?);
            debug!("loaded env file {}", path.display());
            metadata.env_file = Some(path);
        }
        merged.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(merged)
    }

    fn read_config_file(
        &self,
        env: &HashMap<String, String>,
        metadata: &mut ConfigMetadata,
    ) -> Result<FileConfig, ConfigLoadError> {
        let path = self
            .overrides
            .config_path
            .clone()
            .or_else(|| non_empty(env, ENV_CONFIG_PATH).map(PathBuf::from))
            .or_else(|| {
                self.default_config_file
                    .clone()
                    .filter(|path| path.is_file())
            });

        let Some(path) = path else {
            return Ok(FileConfig::default());
        };

        let config = parse_config_file(&path)?;
        debug!("loaded config file {}", path.display());
        metadata.config_path = Some(path);
        Ok(config)
    }
}

fn pipeline_settings(
    env: &HashMap<String, String>,
    file: &FileConfig,
) -> Result<(LockConfig, HttpConfig), ConfigLoadError> {
    let lock = LockConfig {
        timeout: duration(
            "lock timeout",
            non_empty(env, ENV_LOCK_TIMEOUT).or_else(|| file.lock.timeout.clone()),
            DEFAULT_LOCK_TIMEOUT,
        )?,
        retry_delay: duration(
            "lock retry delay",
            non_empty(env, ENV_LOCK_RETRY_DELAY)
                .or_else(|| file.lock.retry_delay.clone()),
            DEFAULT_LOCK_RETRY_DELAY,
        )?,
    };

    let http = HttpConfig {
        request_timeout: duration(
            "HTTP request timeout",
            non_empty(env, ENV_HTTP_TIMEOUT)
                .or_else(|| file.http.request_timeout.clone()),
            DEFAULT_HTTP_TIMEOUT,
        )?,
        catalog_timeout: duration(
            "catalog timeout",
            file.http.catalog_timeout.clone(),
            DEFAULT_CATALOG_TIMEOUT,
        )?,
        user_agent: file
            .http
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    };

    Ok((lock, http))
}

/// Read and deserialize one TOML file.
pub fn parse_config_file(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::ConfigFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    toml::from_str(&raw).map_err(|source| ConfigLoadError::ConfigFileParse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_env_file(
    path: &Path,
) -> Result<HashMap<String, String>, ConfigLoadError> {
    let wrap = |source: dotenvy::Error| ConfigLoadError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut values = HashMap::new();
    for entry in dotenvy::from_path_iter(path).map_err(wrap)? {
        let (key, value) = entry.map_err(wrap)?;
        if MANAGED_KEYS.contains(&key.as_str()) {
            values.insert(key, value);
        }
    }
    Ok(values)
}

fn non_empty(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn duration(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        None => Ok(default),
        Some(value) => humantime::parse_duration(value.trim()).map_err(
            |source| ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            },
        ),
    }
}
