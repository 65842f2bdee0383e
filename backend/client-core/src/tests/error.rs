// Unit tests for the error module

use crate::error::CoreError;
use crate::error::ipc::IpcError;
use crate::error::lifecycle::LifecycleError;
use crate::forwarder::LifecycleAction;

use common::{ErrorLocation, ListenerKey};

use std::panic::Location;

fn backend_error(message: &str) -> IpcError {
    IpcError::Backend {
        message: message.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// **VALUE**: Verifies the alert text for each lifecycle error.
///
/// **WHY THIS MATTERS**: This is the exact message the user reads when an action fails.
///
/// **BUG THIS CATCHES**: Would catch the action name or the backend's cause missing, or
/// the `[file:line:col]` location leaking into the alert.
#[test]
fn given_lifecycle_errors_when_rendered_for_user_then_name_action_and_cause() {
    let key = ListenerKey::from("127.0.0.1:8080");

    let not_found = LifecycleError::NotFound {
        key: key.clone(),
        location: ErrorLocation::from(Location::caller()),
    };
    let command = LifecycleError::Command {
        action: LifecycleAction::Stop,
        key,
        location: ErrorLocation::from(Location::caller()),
        source: backend_error("tunnel index out of bound"),
    };
    let query = LifecycleError::Query {
        message: String::from("Failed to load forwarder configuration"),
        location: ErrorLocation::from(Location::caller()),
        source: backend_error("backend unreachable"),
    };

    assert_eq!(
        not_found.user_message(),
        "Forwarder 127.0.0.1:8080 does not exist"
    );
    assert_eq!(
        command.user_message(),
        "Failed to stop forwarder 127.0.0.1:8080: tunnel index out of bound"
    );
    assert_eq!(
        query.user_message(),
        "Failed to load forwarder configuration: backend unreachable"
    );
}

/// **VALUE**: Verifies `CoreError` wraps each concern transparently.
///
/// **WHY THIS MATTERS**: Callers that do not care which layer failed propagate a single
/// type; the text must stay the inner error's.
///
/// **BUG THIS CATCHES**: Would catch `#[error(transparent)]` being replaced by a prefix.
#[test]
fn given_ipc_error_when_wrapped_in_core_error_then_display_unchanged() {
    fn propagate() -> Result<(), CoreError> {
        Err(backend_error("boom"))?;
        Ok(())
    }

    let err = propagate().unwrap_err();

    assert!(matches!(err, CoreError::Ipc(IpcError::Backend { .. })));
    assert!(err.to_string().starts_with("Backend Error: boom ["));
}
