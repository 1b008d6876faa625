//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate SNDCONV_CONFIG are marked with #[serial]
//! so they never race each other.

use serial_test::serial;
use sndconv_common::config::{
    load_toml_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR,
};
use sndconv_common::Error;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sndconv-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/sndconv-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/sndconv-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sndconv-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/sndconv-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");

    let resolved = resolve_config_path(None);
    assert_ne!(resolved, Some(PathBuf::from("")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let config = load_toml_config(Some(Path::new("/nonexistent/sndconv/config.toml"))).unwrap();

    let defaults = TomlConfig::default();
    assert_eq!(config.logging.level, defaults.logging.level);
    assert_eq!(config.conversion.output, defaults.conversion.output);
}

#[test]
fn test_full_file_is_parsed() {
    let file = write_config(
        r#"
        [logging]
        level = "debug"
        file = "/tmp/sndconv.log"

        [conversion]
        output = "out/telephony.wav"
        flush_resampler = false
        resampler_chunk_frames = 1024
        wav_read_frames = 800
        "#,
    );

    let config = load_toml_config(Some(file.path())).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/sndconv.log")));
    assert_eq!(config.conversion.output, PathBuf::from("out/telephony.wav"));
    assert!(!config.conversion.flush_resampler);
    assert_eq!(config.conversion.resampler_chunk_frames, 1024);
    assert_eq!(config.conversion.wav_read_frames, 800);
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("[conversion\nflush_resampler = ");

    let result = load_toml_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Toml { .. })));
}

#[test]
fn test_invalid_values_rejected() {
    let file = write_config(
        r#"
        [conversion]
        wav_read_frames = 0
        "#,
    );

    let result = load_toml_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}
