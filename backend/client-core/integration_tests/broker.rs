use client_core::broker::EventBroker;
use client_core::broker::topics::{
    ClientConnected, ClientConnecting, ForwarderStarted, ForwarderStopped,
};

use common::ListenerKey;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Public API tests for the event broker
// ============================================================================

/// **VALUE**: Verifies a handler is invoked while subscribed and never after
/// `unsubscribe` returns.
///
/// **WHY THIS MATTERS**: A controller that went away must not keep mutating state
/// (or keep the process busy) on every event.
///
/// **BUG THIS CATCHES**: Would catch `unsubscribe` removing the wrong registration or
/// none at all.
#[test]
fn given_subscribed_handler_when_unsubscribed_then_no_longer_invoked() {
    // GIVEN: A handler counting invocations
    let broker = EventBroker::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = broker.subscribe::<ClientConnected, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // WHEN: Publishing, unsubscribing, publishing again
    broker.publish::<ClientConnected>(());
    broker.unsubscribe(subscription);
    broker.publish::<ClientConnected>(());

    // THEN: Only the first publish was seen
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.subscriber_count::<ClientConnected>(), 0);
}

/// **VALUE**: Verifies dropping a `Subscription` releases its handler.
///
/// **WHY THIS MATTERS**: Owners hold subscriptions as fields; release must happen on
/// every exit path without an explicit call.
///
/// **BUG THIS CATCHES**: Would catch a leak where dropped owners keep receiving events.
#[test]
fn given_subscription_when_dropped_then_handler_released() {
    let broker = EventBroker::new();
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let counter = Arc::clone(&calls);
        let _subscription = broker.subscribe::<ClientConnecting, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        broker.publish::<ClientConnecting>(());
        assert_eq!(broker.subscriber_count::<ClientConnecting>(), 1);
    }

    broker.publish::<ClientConnecting>(());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.subscriber_count::<ClientConnecting>(), 0);
}

/// **VALUE**: Verifies delivery is synchronous, in registration order, and typed.
///
/// **WHY THIS MATTERS**: Per-listener handlers receive the `ListenerKey`; ordering keeps
/// derived views consistent with each other.
///
/// **BUG THIS CATCHES**: Would catch handlers stored in a hash set (random order) or a
/// payload mixed up between topics.
#[test]
fn given_several_handlers_when_published_then_called_in_order_with_payload() {
    // GIVEN: Two handlers on ForwarderStarted, one on ForwarderStopped
    let broker = EventBroker::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let seen = Arc::clone(&seen);
        broker.subscribe::<ForwarderStarted, _>(move |key| {
            seen.lock().unwrap().push(format!("first:{key}"));
        })
    };
    let second = {
        let seen = Arc::clone(&seen);
        broker.subscribe::<ForwarderStarted, _>(move |key| {
            seen.lock().unwrap().push(format!("second:{key}"));
        })
    };
    let other = {
        let seen = Arc::clone(&seen);
        broker.subscribe::<ForwarderStopped, _>(move |key| {
            seen.lock().unwrap().push(format!("stopped:{key}"));
        })
    };

    // WHEN: Publishing only ForwarderStarted
    broker.publish::<ForwarderStarted>(ListenerKey::from("127.0.0.1:8080"));

    // THEN: Both started-handlers ran, in order, before publish returned
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first:127.0.0.1:8080", "second:127.0.0.1:8080"]
    );

    drop((first, second, other));
}

/// **VALUE**: Verifies handlers may unsubscribe themselves and subscribe others during
/// a dispatch without deadlock, and a handler added mid-dispatch is not called by it.
///
/// **WHY THIS MATTERS**: A one-shot listener that removes itself on first event is a
/// common pattern; holding the registry lock while dispatching would deadlock it.
///
/// **BUG THIS CATCHES**: Would catch dispatch iterating the live list under the lock.
#[test]
fn given_handler_mutating_subscriptions_when_published_then_no_deadlock() {
    // GIVEN: A one-shot handler that also registers a late handler
    let broker = EventBroker::new();
    let once_calls = Arc::new(AtomicUsize::new(0));
    let late_calls = Arc::new(AtomicUsize::new(0));
    let own = Arc::new(Mutex::new(None));
    let late = Arc::new(Mutex::new(None));

    let subscription = {
        let broker = broker.clone();
        let own = Arc::clone(&own);
        let late = Arc::clone(&late);
        let once_calls = Arc::clone(&once_calls);
        let late_calls = Arc::clone(&late_calls);
        broker.clone().subscribe::<ClientConnected, _>(move |_| {
            once_calls.fetch_add(1, Ordering::SeqCst);
            own.lock().unwrap().take();

            let late_calls = Arc::clone(&late_calls);
            *late.lock().unwrap() = Some(broker.subscribe::<ClientConnected, _>(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
            }));
        })
    };
    *own.lock().unwrap() = Some(subscription);

    // WHEN: Publishing twice
    broker.publish::<ClientConnected>(());
    broker.publish::<ClientConnected>(());

    // THEN: The one-shot ran once; the late handler only saw the second publish
    assert_eq!(once_calls.load(Ordering::SeqCst), 1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.subscriber_count::<ClientConnected>(), 1);
}

/// **VALUE**: Verifies publishing with no subscribers is a silent no-op, and that
/// a subscription outliving its broker drops cleanly.
///
/// **WHY THIS MATTERS**: Events arrive before any view exists, and views may be torn
/// down after the runtime.
///
/// **BUG THIS CATCHES**: Would catch a panic in either path.
#[test]
fn given_no_subscribers_when_published_then_nothing_happens() {
    let broker = EventBroker::new();
    broker.publish::<ForwarderStopped>(ListenerKey::from("a"));
    assert_eq!(broker.subscriber_count::<ForwarderStopped>(), 0);

    let subscription = broker.subscribe::<ForwarderStopped, _>(|_| {});
    drop(broker);
    drop(subscription);
}
