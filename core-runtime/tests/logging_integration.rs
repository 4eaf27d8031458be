//! Integration tests for logging system

use bridge_traits::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};

#[test]
fn test_logging_configuration() {
    // Only one global subscriber can exist per process, so most checks work
    // on the config itself.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);
}

#[test]
fn test_init_logging_twice_fails() {
    let config = LoggingConfig::default().with_format(LogFormat::Compact);
    let first = init_logging(config.clone());
    let second = init_logging(config);

    assert!(first.is_ok());
    assert!(second.is_err());

    tracing::info!(track_id = "t1", "logging initialized in integration test");
}

#[test]
fn test_invalid_filter_rejected() {
    let config = LoggingConfig::default().with_filter("core_playback=notalevel");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_redaction_of_catalog_credentials() {
    assert_eq!(redact_if_sensitive("access_token", "BQDx..."), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refresh_token", "AQCy..."), "[REDACTED]");
    assert_eq!(
        redact_if_sensitive(
            "stream_url",
            "https://audio.example.net/t1.mp3?token=abc&expires=1"
        ),
        "https://audio.example.net/t1.mp3?[REDACTED]"
    );
}

#[test]
fn test_redaction_passthrough() {
    assert_eq!(redact_if_sensitive("track_id", "t1"), "t1");
    assert_eq!(redact_if_sensitive("title", "After Hours"), "After Hours");
    assert_eq!(redact_if_sensitive("state", "Playing"), "Playing");
}

#[test]
fn test_path_stripping() {
    assert_eq!(
        strip_path("/var/mobile/Containers/Data/Application/X/Library/art.jpg"),
        "art.jpg"
    );
    assert_eq!(strip_path("D:\\cache\\cover.png"), "cover.png");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
