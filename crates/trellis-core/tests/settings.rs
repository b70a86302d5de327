use std::fs;
use std::time::Duration;

use trellis_core::conflict::ConflictStrategy;
use trellis_core::dependency::Transitivity;
use trellis_core::settings::{ResolutionParameters, Settings};

#[test]
fn defaults() {
    let params = ResolutionParameters::default();
    assert_eq!(params.conflict_strategy, ConflictStrategy::TakeHighest);
    assert_eq!(params.default_transitivity, Transitivity::Runtime);
    assert!(!params.fail_on_error);
    assert_eq!(params.fetch_timeout(), Duration::from_secs(30));
    assert!(params.timeout().is_none());
    assert_eq!(params.max_concurrent_fetches, 8);
}

#[test]
fn empty_toml_yields_defaults() {
    let settings = Settings::parse("").unwrap();
    assert_eq!(settings.resolution, ResolutionParameters::default());
    assert!(settings.repositories.is_empty());
}

#[test]
fn parse_from_toml() {
    let toml = r#"
[resolution]
conflict-strategy = "fail"
default-transitivity = "compile"
fail-on-error = true
timeout-ms = 5000
max-concurrent-fetches = 2

[repositories]
local = "./repo"
"#;
    let settings = Settings::parse(toml).unwrap();
    assert_eq!(settings.resolution.conflict_strategy, ConflictStrategy::Fail);
    assert_eq!(settings.resolution.default_transitivity, Transitivity::Compile);
    assert!(settings.resolution.fail_on_error);
    assert_eq!(settings.resolution.timeout(), Some(Duration::from_secs(5)));
    assert_eq!(settings.resolution.max_concurrent_fetches, 2);
    assert_eq!(settings.repositories.get("local").map(String::as_str), Some("./repo"));
}

#[test]
fn load_missing_file_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(dir.path()).unwrap();
    assert_eq!(settings.resolution, ResolutionParameters::default());
}

#[test]
fn invalid_toml_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trellis.toml"), "[resolution]\nconflict-strategy = 3\n").unwrap();
    let err = Settings::load(dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}
