// Unit tests for the connection state transition table

use crate::store::connection::{ConnectionSignal, ConnectionState, next_connection_state};

/// **VALUE**: Verifies every legal transition of the connection state machine.
///
/// **WHY THIS MATTERS**: The connection indicator and the connect/disconnect buttons are
/// driven entirely by this table. A missing edge freezes the indicator.
///
/// **BUG THIS CATCHES**: Would catch a dropped `Connecting -> Disconnected` edge (failed
/// connection attempt leaves the UI spinning forever).
#[test]
fn given_legal_signal_when_reduced_then_moves_to_next_state() {
    use ConnectionSignal as S;
    use ConnectionState as C;

    assert_eq!(
        next_connection_state(C::Disconnected, S::Connecting),
        Some(C::Connecting)
    );
    assert_eq!(
        next_connection_state(C::Connecting, S::Connected),
        Some(C::Connected)
    );
    assert_eq!(
        next_connection_state(C::Connected, S::Disconnected),
        Some(C::Disconnected)
    );
    assert_eq!(
        next_connection_state(C::Connecting, S::Disconnected),
        Some(C::Disconnected)
    );
}

/// **VALUE**: Verifies out-of-order and duplicate signals are ignored.
///
/// **WHY THIS MATTERS**: Push-events can arrive late or twice. The state must never jump
/// from `Disconnected` straight to `Connected`.
///
/// **BUG THIS CATCHES**: Would catch a reducer that trusts the signal blindly and assigns
/// the target state regardless of the current one.
#[test]
fn given_illegal_signal_when_reduced_then_is_ignored() {
    use ConnectionSignal as S;
    use ConnectionState as C;

    // GIVEN/WHEN/THEN: Skipping Connecting is refused
    assert_eq!(next_connection_state(C::Disconnected, S::Connected), None);

    // Duplicates are refused
    assert_eq!(next_connection_state(C::Disconnected, S::Disconnected), None);
    assert_eq!(next_connection_state(C::Connecting, S::Connecting), None);
    assert_eq!(next_connection_state(C::Connected, S::Connected), None);

    // Going back to Connecting while connected is refused
    assert_eq!(next_connection_state(C::Connected, S::Connecting), None);
}
