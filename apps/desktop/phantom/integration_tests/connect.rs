use phantom::connect::connect_with_retry;
use phantom::error::PhantomError;

use client_core::config::IpcSettings;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

/// **VALUE**: Verifies the client connects once a backend accepts the handshake.
///
/// **WHY THIS MATTERS**: This is the startup path of the binary.
///
/// **BUG THIS CATCHES**: Would catch the settings' URL or timeout not being used.
#[tokio::test]
async fn given_listening_backend_when_connecting_then_succeeds() {
    // GIVEN: A WebSocket server on an ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = accept_async(stream).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    });

    let settings = IpcSettings {
        url: format!("ws://127.0.0.1:{port}"),
        ..IpcSettings::default()
    };

    // WHEN/THEN: Connecting succeeds
    let (bridge, _events) = connect_with_retry(&settings).await.unwrap();
    assert!(!bridge.is_closed());
}

/// **VALUE**: Verifies the retry loop gives up after the configured budget.
///
/// **WHY THIS MATTERS**: Without a bound the client would hang forever when the backend
/// is not installed.
///
/// **BUG THIS CATCHES**: Would catch `max_elapsed_time` not being set on the backoff.
#[tokio::test]
async fn given_no_backend_when_connecting_then_gives_up() {
    // GIVEN: A port nothing listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let settings = IpcSettings {
        url: format!("ws://127.0.0.1:{port}"),
        connect_attempts_max_secs: 1,
        ..IpcSettings::default()
    };

    // WHEN: Connecting
    let result = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        connect_with_retry(&settings),
    )
    .await
    .expect("retry loop did not stop");

    // THEN: Core error naming the URL
    match result {
        Err(PhantomError::Core { message, .. }) => assert!(message.contains(&settings.url)),
        Err(other) => panic!("Expected Core error, got {other:?}"),
        Ok(_) => panic!("Connected to a closed port"),
    }
}
