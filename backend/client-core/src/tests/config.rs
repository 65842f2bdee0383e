// Unit tests for client config load/save/validate

use crate::PHANTOM_IPC_DEFAULT_URL;
use crate::config::ClientConfig;
use crate::error::config::ConfigError;

use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file yields defaults pointing at the local
/// backend.
///
/// **WHY THIS MATTERS**: First launch has no config; the client must still find the
/// backend on its default port.
///
/// **BUG THIS CATCHES**: Would catch `load` failing on a missing file.
#[test]
fn given_no_config_file_when_loaded_then_defaults() {
    let dir = TempDir::new().unwrap();

    let config = ClientConfig::load(dir.path()).unwrap();

    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.ipc.url, PHANTOM_IPC_DEFAULT_URL);
    assert_eq!(config.ipc.url, "ws://127.0.0.1:19876");
}

/// **VALUE**: Verifies save then load returns the same config.
///
/// **WHY THIS MATTERS**: A user-edited backend URL must survive restarts.
///
/// **BUG THIS CATCHES**: Would catch a field missing from serialization, or the temp
/// file being left behind instead of renamed.
#[test]
fn given_saved_config_when_loaded_then_round_trips() {
    // GIVEN: A non-default config
    let dir = TempDir::new().unwrap();
    let mut config = ClientConfig::default();
    config.ipc.url = "ws://10.0.0.2:4000".to_string();
    config.ipc.request_timeout_secs = 5;

    // WHEN: Saving and reloading
    config.save(dir.path()).unwrap();
    let loaded = ClientConfig::load(dir.path()).unwrap();

    // THEN: Identical, and no temp file remains
    assert_eq!(loaded, config);
    assert!(!dir.path().join("config.json.tmp").exists());
}

/// **VALUE**: Verifies invalid values are rejected by `validate` and by `save`.
///
/// **WHY THIS MATTERS**: An http:// URL or a zero timeout would make every request
/// fail in ways that look like backend outages.
///
/// **BUG THIS CATCHES**: Would catch validation being skipped on save.
#[test]
fn given_invalid_values_when_validated_then_rejected() {
    let dir = TempDir::new().unwrap();

    let mut http = ClientConfig::default();
    http.ipc.url = "http://127.0.0.1:19876".to_string();
    assert!(matches!(
        http.validate(),
        Err(ConfigError::InvalidField {
            field: "ipc.url",
            ..
        })
    ));
    assert!(http.save(dir.path()).is_err());

    let mut zero_timeout = ClientConfig::default();
    zero_timeout.ipc.request_timeout_secs = 0;
    assert!(matches!(
        zero_timeout.validate(),
        Err(ConfigError::InvalidField {
            field: "ipc.request_timeout_secs",
            ..
        })
    ));

    let mut future_version = ClientConfig::default();
    future_version.version = 99;
    assert!(future_version.validate().is_err());

    let mut garbage = ClientConfig::default();
    garbage.ipc.url = "not a url".to_string();
    assert!(garbage.validate().is_err());
}

/// **VALUE**: Verifies a corrupt file is reported as a parse error, not replaced.
///
/// **WHY THIS MATTERS**: Silently falling back to defaults would hide the user's typo.
///
/// **BUG THIS CATCHES**: Would catch parse errors being mapped to `Read` or swallowed.
#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    let result = ClientConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

/// **VALUE**: Verifies the URL override applies valid values and ignores empty ones.
///
/// **WHY THIS MATTERS**: `PHANTOM_IPC_URL` lets developers point the client at a test
/// backend without editing the config file.
///
/// **BUG THIS CATCHES**: Would catch an invalid override clobbering a good URL.
#[test]
fn given_url_override_when_applied_then_only_valid_values_win() {
    let mut config = ClientConfig::default();

    // Empty: ignored
    config.apply_ipc_url_override(Some("  ".to_string())).unwrap();
    assert_eq!(config.ipc.url, PHANTOM_IPC_DEFAULT_URL);

    // Invalid: rejected, unchanged
    assert!(
        config
            .apply_ipc_url_override(Some("ftp://x".to_string()))
            .is_err()
    );
    assert_eq!(config.ipc.url, PHANTOM_IPC_DEFAULT_URL);

    // Valid: applied
    config
        .apply_ipc_url_override(Some("wss://backend.local:9000".to_string()))
        .unwrap();
    assert_eq!(config.ipc.url, "wss://backend.local:9000");
}

/// **VALUE**: Verifies config errors name the file or the field that is wrong.
///
/// **WHY THIS MATTERS**: The user fixes these by hand; "validation failed" alone does
/// not say whether to edit `config.json` or the environment.
///
/// **BUG THIS CATCHES**: Would catch an override error blamed on the config file, or a
/// parse error without the file path.
#[test]
fn given_bad_config_sources_when_rejected_then_message_names_file_or_field() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    let parse = ClientConfig::load(dir.path()).unwrap_err().to_string();
    let mut zero = ClientConfig::default();
    zero.ipc.connect_attempts_max_secs = 0;
    let field = zero.validate().unwrap_err().to_string();
    let override_error = ClientConfig::default()
        .apply_ipc_url_override(Some("http://127.0.0.1:1".to_string()))
        .unwrap_err()
        .to_string();

    assert!(parse.starts_with("Client Config Error: "));
    assert!(parse.contains("config.json is not a valid client config"));
    assert!(field.starts_with(
        "Client Config Error: `ipc.connect_attempts_max_secs` = 0: must be greater than 0 ["
    ));
    assert!(override_error.starts_with(
        "Client Config Error: `ipc.url (from PHANTOM_IPC_URL)` = http://127.0.0.1:1: "
    ));
}
