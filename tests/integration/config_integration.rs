//! Integration tests for Configuration System

use practice_context::cli::RunContext;
use practice_context::config::ConfigLoader;
use practice_context::error::ApiError;
use practice_context::resolver::ResolverPolicy;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_workspace_config_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        r#"
[resolver]
max_attempts = 4
backoff_step_ms = 250

[poller]
transitional_secs = 4
throttle_secs = 2

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    assert_eq!(config.resolver.max_attempts, 4);
    assert_eq!(config.poller.transitional_secs, 4);
    assert_eq!(config.poller.throttle(), Duration::from_secs(2));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");

    let policy = ResolverPolicy::from_config(&config.cache, &config.resolver);
    assert_eq!(policy.retry.max_attempts, 4);
    assert_eq!(policy.retry.delay_after(2), Duration::from_millis(500));
}

#[test]
fn test_invalid_config_is_rejected_by_run_context() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_file,
        r#"
[cache]
forced_ttl_secs = 0

[routes]
app_prefix = "app"
"#,
    )
    .unwrap();

    let result = RunContext::new(
        temp_dir.path().to_path_buf(),
        Some(config_file),
        Some(temp_dir.path().join("store")),
    );
    match result {
        Err(ApiError::ConfigError(msg)) => {
            assert!(msg.contains("Cache"));
            assert!(msg.contains("Routes"));
        }
        Err(other) => panic!("expected a configuration error, got {}", other),
        Ok(_) => panic!("invalid configuration was accepted"),
    }
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")),
        Err(ApiError::ConfigError(_))
    ));
}

#[test]
fn test_malformed_config_value() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("typo.toml");
    std::fs::write(&config_file, "[cache]\ncontext_ttl_secs = \"soon\"\n").unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&config_file),
        Err(ApiError::ConfigError(_))
    ));
}
