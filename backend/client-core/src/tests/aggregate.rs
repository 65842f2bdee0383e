// Unit tests for the aggregate forwarders reducer

use crate::store::aggregate::{AggregateForwardersState, AggregateSignal};

fn state(starting: bool, started: bool) -> AggregateForwardersState {
    AggregateForwardersState { starting, started }
}

/// **VALUE**: Verifies the three aggregate signals from every reachable state.
///
/// **WHY THIS MATTERS**: "Start all" shows a spinner while `starting` and flips to
/// "Stop all" once `started`. A wrong combination leaves both states on at once.
///
/// **BUG THIS CATCHES**: Would catch `Started` forgetting to clear `starting`, or
/// `Starting` resetting `started`.
#[test]
fn given_aggregate_state_when_reduced_then_follows_table() {
    // starting -> starting=true, started kept
    assert_eq!(
        state(false, false).reduce(AggregateSignal::Starting),
        state(true, false)
    );
    assert_eq!(
        state(false, true).reduce(AggregateSignal::Starting),
        state(true, true)
    );

    // started -> started=true, starting=false
    assert_eq!(
        state(true, false).reduce(AggregateSignal::Started),
        state(false, true)
    );

    // stopped -> both false
    assert_eq!(
        state(true, true).reduce(AggregateSignal::Stopped),
        state(false, false)
    );
}

/// **VALUE**: Verifies a repeated signal leaves the state unchanged.
///
/// **WHY THIS MATTERS**: The store publishes only on change; the reducer must be
/// idempotent for duplicates so no spurious broker publish happens.
///
/// **BUG THIS CATCHES**: Would catch a reducer that toggles instead of assigning.
#[test]
fn given_repeated_signal_when_reduced_then_state_is_stable() {
    let once = state(false, false).reduce(AggregateSignal::Started);
    let twice = once.reduce(AggregateSignal::Started);

    assert_eq!(once, twice);
}
