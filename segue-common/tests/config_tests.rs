//! Configuration resolution and graceful degradation tests
//!
//! Tests that touch `SEGUE_CONFIG` are marked `#[serial]` so environment
//! mutations never race.

use segue_common::config::{load_toml_or_default, ConfigResolver, LoggingConfig, CONFIG_ENV_VAR};
use segue_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    name: Option<String>,
}

#[test]
#[serial]
fn test_explicit_path_wins_over_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolver = ConfigResolver::with_path("/tmp/explicit.toml");
    assert_eq!(resolver.resolve(), Some(PathBuf::from("/tmp/explicit.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_variable_is_used() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolver = ConfigResolver::new();
    assert_eq!(resolver.resolve(), Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_no_path_uses_defaults() {
    let config: SampleConfig = load_toml_or_default(None).unwrap();
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_valid_file_is_parsed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name = \"club set\"\n\n[logging]\nlevel = \"debug\"").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.name.as_deref(), Some("club set"));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.file.is_none());
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging\nlevel = ").unwrap();

    let result: segue_common::Result<SampleConfig> = load_toml_or_default(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}
