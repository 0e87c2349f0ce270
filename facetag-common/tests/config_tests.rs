//! Configuration loading and root folder resolution
//!
//! Tests that touch FACETAG_ROOT_FOLDER are #[serial] so they do not race.

use std::env;
use std::path::{Path, PathBuf};

use facetag_common::config::{
    resolve_root_folder, TagBackend, TomlConfig, ROOT_FOLDER_ENV,
};
use facetag_common::Error;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_full_config_parses() {
    let config = TomlConfig::from_toml_str(
        r#"
port = 6000
bind_address = "0.0.0.0"
root_folder = "/srv/facetag"
default_image_url = "/photos/mixer.jpg"

[logging]
level = "debug"

[detection]
model_path = "/models/seeta_fd_frontal_v1.0.bin"
input_size = 416
score_threshold = 0.3
retry_score_threshold = 0.1
timeout_secs = 30

[tags]
backend = "file"
"#,
    )
    .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/facetag")));
    assert_eq!(config.default_image_url, "/photos/mixer.jpg");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.tags.backend, TagBackend::File);

    let policy = config.detection.policy();
    assert_eq!(policy.input_size_hint, 416);
    assert_eq!(policy.score_threshold, 0.3);
    assert_eq!(policy.retry_score_threshold, 0.1);
    assert_eq!(policy.timeout.as_secs(), 30);
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = TomlConfig::from_toml_str("port = 7000\n").unwrap();
    assert_eq!(config.port, 7000);
    assert_eq!(config.default_image_url, "/event-photo.jpeg");
    assert_eq!(config.tags.backend, TagBackend::Memory);
    assert_eq!(config.detection.timeout_secs, 60);
}

#[test]
fn test_malformed_config_is_error() {
    assert!(matches!(
        TomlConfig::from_toml_str("port = \"not a number\""),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        TomlConfig::from_toml_str("[tags]\nbackend = \"redis\"\n"),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 5999\n").unwrap();
    assert_eq!(TomlConfig::load(Some(&path)).unwrap().port, 5999);
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/facetag-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/facetag-toml")),
        ..TomlConfig::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/facetag-cli")), &config);
    assert_eq!(root, PathBuf::from("/tmp/facetag-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/facetag-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/facetag-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/tmp/facetag-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/facetag-toml")),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/tmp/facetag-toml"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(fallback.ends_with("facetag") || fallback.ends_with("facetag_data"));
}
