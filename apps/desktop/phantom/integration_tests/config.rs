use client_core::config::{ClientConfig, IPC_URL_ENV_VAR};

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies `PHANTOM_IPC_URL` overrides the URL from the config file.
///
/// **WHY THIS MATTERS**: Developers point the client at a test backend through `.env`
/// without touching their real config.
///
/// **BUG THIS CATCHES**: Would catch the override being read before the file (and then
/// overwritten by it).
#[test]
#[serial]
fn given_env_override_when_config_loaded_then_env_wins() {
    // GIVEN: A saved config and an override in the environment
    let dir = TempDir::new().unwrap();
    let mut saved = ClientConfig::default();
    saved.ipc.url = "ws://127.0.0.1:1111".to_string();
    saved.save(dir.path()).unwrap();

    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var(IPC_URL_ENV_VAR, "ws://127.0.0.1:2222") };

    // WHEN: Loading and applying the override as main does
    let mut config = ClientConfig::load(dir.path()).unwrap();
    let applied = config.apply_env_override();

    unsafe { std::env::remove_var(IPC_URL_ENV_VAR) };

    // THEN: The environment wins
    applied.unwrap();
    assert_eq!(config.ipc.url, "ws://127.0.0.1:2222");
}

/// **VALUE**: Verifies an absent override leaves the file's URL.
///
/// **WHY THIS MATTERS**: The common case must not be disturbed by the override path.
///
/// **BUG THIS CATCHES**: Would catch an unset variable resetting the URL to default.
#[test]
#[serial]
fn given_no_env_override_when_applied_then_file_value_kept() {
    unsafe { std::env::remove_var(IPC_URL_ENV_VAR) };

    let mut config = ClientConfig::default();
    config.ipc.url = "ws://127.0.0.1:3333".to_string();
    config.apply_env_override().unwrap();

    assert_eq!(config.ipc.url, "ws://127.0.0.1:3333");
}
