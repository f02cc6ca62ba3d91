use std::time::Duration;

use posterkeep_config::{ConfigLoadError, ConfigLoader, ConfigOverrides};

const TOML: &str = r#"
[server]
url = "http://file.local:32400"
token = "file-token-123456"

[library]
sections = ["4", "5"]

[lock]
timeout = "3s"
retry_delay = "50ms"

[http]
request_timeout = "12s"
catalog_timeout = "1m"
user_agent = "custom-agent"
"#;

#[test]
fn toml_file_supplies_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posterkeep.toml");
    std::fs::write(&path, TOML).unwrap();

    let config = ConfigLoader::with_env([(
        "POSTERKEEP_CONFIG_PATH",
        path.display().to_string(),
    )])
    .load()
    .unwrap();

    assert_eq!(config.server.url.host_str(), Some("file.local"));
    assert_eq!(config.server.token, "file-token-123456");
    assert_eq!(config.library.sections, vec!["4", "5"]);
    assert_eq!(config.lock.timeout, Duration::from_secs(3));
    assert_eq!(config.lock.retry_delay, Duration::from_millis(50));
    assert_eq!(config.http.request_timeout, Duration::from_secs(12));
    assert_eq!(config.http.catalog_timeout, Duration::from_secs(60));
    assert_eq!(config.http.user_agent, "custom-agent");
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
}

#[test]
fn env_file_overrides_toml_and_process_env_overrides_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("posterkeep.toml");
    std::fs::write(&toml_path, TOML).unwrap();
    let env_path = dir.path().join(".env");
    std::fs::write(
        &env_path,
        "POSTERKEEP_SECTIONS=7,8\nPOSTERKEEP_TOKEN=env-file-token-1\nUNRELATED=1\n",
    )
    .unwrap();

    let config = ConfigLoader::with_env([("POSTERKEEP_TOKEN", "process-token-1")])
        .overrides(ConfigOverrides {
            config_path: Some(toml_path),
            env_file: Some(env_path.clone()),
            ..Default::default()
        })
        .load()
        .unwrap();

    assert_eq!(config.library.sections, vec!["7", "8"]);
    assert_eq!(config.server.token, "process-token-1");
    assert_eq!(config.server.url.host_str(), Some("file.local"));
    assert_eq!(config.metadata.env_file.as_deref(), Some(env_path.as_path()));
}

#[test]
fn unknown_keys_in_the_file_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posterkeep.toml");
    std::fs::write(&path, "[server]\nurl = \"http://x\"\nport = 1\n").unwrap();

    let err = ConfigLoader::with_env(Vec::<(String, String)>::new())
        .overrides(ConfigOverrides {
            config_path: Some(path),
            ..Default::default()
        })
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigLoadError::ConfigFileParse { .. }));
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::with_env(Vec::<(String, String)>::new())
        .overrides(ConfigOverrides {
            config_path: Some(dir.path().join("absent.toml")),
            ..Default::default()
        })
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigLoadError::ConfigFileIo { .. }));
}
