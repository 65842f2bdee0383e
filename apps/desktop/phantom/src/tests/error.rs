// Unit tests for error module
// Tests serialization (used by `status` output) and core error conversion

use crate::error::PhantomError;

use client_core::error::ipc::IpcError;
use client_core::error::lifecycle::LifecycleError;

use common::{ErrorLocation, ListenerKey};

use std::panic::Location;

/// **VALUE**: Tests that errors serialize with their variant tag and message.
///
/// **WHY THIS MATTERS**: Errors are rendered as JSON next to the status snapshot; an
/// opaque blob would hide which layer failed.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[derive(Serialize)]` or a change of
/// the tag/content layout.
#[test]
fn given_phantom_error_when_serialized_then_contains_tag_and_message() {
    // GIVEN: A console error
    let err = PhantomError::Console {
        message: String::from("Usage: toggle <listen>"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).unwrap();

    // THEN: Tagged with the variant, message inside data
    assert_eq!(json["type"], "Console");
    assert_eq!(json["data"]["message"], "Usage: toggle <listen>");
}

/// **VALUE**: Tests that `?` on core errors records the call site in this crate.
///
/// **WHY THIS MATTERS**: The location in the log line should point at the code that
/// propagated the error, not at the `From` impl.
///
/// **BUG THIS CATCHES**: Would catch `#[track_caller]` being dropped from the `From` impls.
#[test]
fn given_ipc_error_when_propagated_then_location_is_call_site() {
    fn propagate() -> Result<(), PhantomError> {
        Err(IpcError::Closed {
            message: String::from("bridge closed"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(())
    }

    let err = propagate().unwrap_err();

    match err {
        PhantomError::Core { message, location } => {
            assert!(message.contains("bridge closed"));
            assert!(location.to_string().contains("tests"));
            assert!(location.to_string().contains("error.rs"));
        }
        other => panic!("Expected Core, got {other:?}"),
    }
}

/// **VALUE**: Tests that lifecycle errors carry the user-facing message, not the
/// debug chain.
///
/// **WHY THIS MATTERS**: The console prints this text directly to the operator.
///
/// **BUG THIS CATCHES**: Would catch the conversion using `to_string()` and leaking
/// internal locations into the message.
#[test]
fn given_lifecycle_error_when_converted_then_uses_user_message() {
    let err: PhantomError = LifecycleError::NotFound {
        key: ListenerKey::from("127.0.0.1:8080"),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    let PhantomError::Core { message, .. } = err else {
        panic!("Expected Core");
    };
    assert_eq!(message, "Forwarder 127.0.0.1:8080 does not exist");
}
