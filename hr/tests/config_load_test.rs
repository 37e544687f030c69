//! Config loading fallback-chain tests
//!
//! Tests that change the working directory are serialized.

use std::fs;
use std::path::PathBuf;

use handraise::config::Config;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_load_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("handraise.yml");
    fs::write(&path, "presence:\n  heartbeat-interval-ms: 2500\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.presence.heartbeat_interval_ms, 2500);
    // Unspecified sections fall back to defaults
    assert_eq!(config.domains.requester_suffix, "@example.edu");
}

#[test]
fn test_load_explicit_missing_path_fails() {
    assert!(Config::load(Some(&PathBuf::from("/nonexistent/handraise.yml"))).is_err());
}

#[test]
#[serial]
fn test_load_discovers_project_local_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".handraise.yml"),
        "domains:\n  responder-suffix: \"@local.test\"\n  requester-suffix: \"@test\"\n",
    )
    .unwrap();

    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = Config::load(None).unwrap();
    std::env::set_current_dir(original).unwrap();

    assert_eq!(config.domains.responder_suffix, "@local.test");
}

#[test]
#[serial]
fn test_load_without_any_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = Config::load(None).unwrap();
    std::env::set_current_dir(original).unwrap();

    assert_eq!(config.presence.heartbeat_interval_ms, 15_000);
}
