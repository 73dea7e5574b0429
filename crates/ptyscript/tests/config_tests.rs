//! Configuration layering: defaults, TOML files and environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use ptyscript::config::env::{EnvConfig, DEFAULT_PREFIX};
use ptyscript::config::file::ConfigFile;
use ptyscript::config::{DEFAULT_READ_SIZE, DEFAULT_TIMEOUT};
use ptyscript::{Codec, ExpectError, LineEnding, SessionBuilder, SessionConfig};

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ptyscript-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn defaults() {
    let config = SessionConfig::default();
    assert_eq!(config.timeout.default, DEFAULT_TIMEOUT);
    assert_eq!(config.buffer.read_size, DEFAULT_READ_SIZE);
    assert_eq!(config.buffer.search_window, None);
    assert_eq!(config.codec, Codec::Utf8);
    assert_eq!(config.line_ending, LineEnding::Lf);
    assert!(config.echo);
    assert!(config.validate().is_ok());
}

#[test]
fn file_overlays_defaults() {
    let path = write_temp(
        "overlay.toml",
        r#"
            timeout_ms = 2500
            search_window = 512
            codec = "latin-1"
            line_ending = "crlf"
            echo = false

            [terminal]
            cols = 132

            [env]
            TERM = "dumb"
        "#,
    );

    let config = SessionConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.timeout.default, Duration::from_millis(2500));
    assert_eq!(config.buffer.search_window, Some(512));
    assert_eq!(config.codec, Codec::Latin1);
    assert_eq!(config.line_ending, LineEnding::CrLf);
    assert!(!config.echo);
    assert_eq!(config.dimensions, (132, 24));
    assert_eq!(config.env.get("TERM").map(String::as_str), Some("dumb"));
}

#[test]
fn file_rejects_unknown_keys() {
    let err = ConfigFile::from_toml_str("timeout = 5").unwrap_err();
    assert!(matches!(err, ExpectError::Config { .. }));
}

#[test]
fn file_rejects_unknown_codec() {
    let err = ConfigFile::from_toml_str(r#"codec = "ebcdic""#).unwrap_err();
    assert!(err.to_string().contains("ebcdic"));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = SessionConfig::from_file("/nonexistent/ptyscript.toml").unwrap_err();
    assert!(matches!(err, ExpectError::Config { .. }));
}

#[test]
fn invalid_values_fail_validation() {
    let path = write_temp("invalid.toml", "read_size = 0\n");
    let result = SessionConfig::from_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ExpectError::Config { .. })));
}

#[test]
fn env_overrides_file() {
    let path = write_temp("env.toml", "timeout_ms = 100\ncodec = \"ascii\"\n");
    let env = EnvConfig::from_vars(
        DEFAULT_PREFIX,
        [
            ("PTYSCRIPT_CONFIG", path.to_string_lossy().into_owned()),
            ("PTYSCRIPT_TIMEOUT_MS", "900".to_string()),
        ],
    );

    let config = env.apply(SessionConfig::default()).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.timeout.default, Duration::from_millis(900));
    assert_eq!(config.codec, Codec::Ascii);
}

#[test]
fn env_zero_window_means_unbounded() {
    let env = EnvConfig::from_vars(DEFAULT_PREFIX, [("PTYSCRIPT_SEARCH_WINDOW", "0")]);
    let config = env
        .apply(SessionConfig::new().search_window(Some(10)))
        .unwrap();
    assert_eq!(config.buffer.search_window, None);
}

#[test]
fn env_malformed_value_names_the_variable() {
    let env = EnvConfig::from_vars(DEFAULT_PREFIX, [("PTYSCRIPT_ECHO", "sometimes")]);
    let err = env.apply(SessionConfig::default()).unwrap_err();
    assert!(err.to_string().contains("PTYSCRIPT_ECHO"));
}

#[test]
fn env_custom_prefix() {
    let env = EnvConfig::from_vars("MYTOOL", [("MYTOOL_LINE_ENDING", "cr")]);
    let config = env.apply(SessionConfig::default()).unwrap();
    assert_eq!(config.line_ending, LineEnding::Cr);
}

#[test]
fn builder_carries_config() {
    let builder = SessionBuilder::new()
        .command("/bin/sh")
        .timeout(Duration::from_secs(3))
        .search_window(4096)
        .codec(Codec::Raw)
        .line_ending(LineEnding::CrLf)
        .echo(false)
        .dimensions(100, 30);

    assert!(builder.validate().is_ok());
    let config = SessionConfig::from(builder);
    assert_eq!(config.timeout.default, Duration::from_secs(3));
    assert_eq!(config.buffer.search_window, Some(4096));
    assert_eq!(config.codec, Codec::Raw);
    assert_eq!(config.line_ending.as_str(), "\r\n");
    assert!(!config.echo);
    assert_eq!(config.dimensions, (100, 30));
}

#[test]
fn builder_without_command_fails_validation() {
    assert!(SessionBuilder::new().validate().is_err());
}
