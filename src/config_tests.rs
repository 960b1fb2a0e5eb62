//! Configuration loading tests

use std::io::Write;

use tempfile::NamedTempFile;

use crate::config::AppConfig;
use crate::errors::CastCoachError;

const FULL_CONFIG: &str = r#"
[provider]
endpoint = "https://farcaster.example.com/v2"
api_key = "test-provider-key"

[logging]
level = "debug"
backtrace = false

[llm]
llm_endpoint = "http://localhost:11434"
llm_key = "ollama"
llm_model = "llama3.1:8b"

[analysis]
max_casts = 50
days_back = 14
top_n = 3

[cache]
ttl_seconds = 600
"#;

const MINIMAL_CONFIG: &str = r#"
[provider]
api_key = "test-provider-key"

[logging]
level = "info"
backtrace = true

[llm]
llm_endpoint = "http://localhost:11434"
llm_key = "ollama"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn full_config_round_trips() {
    let file = write_config(FULL_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.provider_endpoint(), "https://farcaster.example.com/v2");
    assert_eq!(config.provider_api_key(), "test-provider-key");
    assert_eq!(config.logging.level, "debug");
    assert!(!config.logging.backtrace);
    assert_eq!(config.llm_model(), "llama3.1:8b");
    assert_eq!(config.analysis.max_casts, 50);
    assert_eq!(config.analysis.days_back, 14);
    assert_eq!(config.analysis.top_n, 3);
    assert_eq!(config.cache_ttl_seconds(), 600);
}

#[test]
fn omitted_sections_and_fields_take_defaults() {
    let file = write_config(MINIMAL_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.provider_endpoint(), "https://api.neynar.com/v2");
    assert_eq!(config.llm_model(), "gemma3:27b");
    assert_eq!(config.analysis.max_casts, 100);
    assert_eq!(config.analysis.days_back, 30);
    assert_eq!(config.analysis.velocity_window_hours, 6);
    assert_eq!(config.analysis.cluster_count, 7);
    assert_eq!(config.cache_ttl_seconds(), 6 * 60 * 60);
}

#[test]
fn default_weights_match_scoring_model() {
    let file = write_config(MINIMAL_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();

    let weights = config.engagement_weights();
    assert_eq!(weights.reply, 3.0);
    assert_eq!(weights.like, 1.0);
    assert_eq!(weights.recast, 2.0);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = AppConfig::from_file("/nonexistent/castcoach.toml").unwrap_err();
    assert!(matches!(err, CastCoachError::Io(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("not valid toml [[[");
    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, CastCoachError::TomlParsing(_)));
}
