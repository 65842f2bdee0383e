use crate::ListenerKey;

use std::collections::HashMap;

/// **VALUE**: Verifies that a ListenerKey serializes as a bare JSON string.
///
/// **WHY THIS MATTERS**: The backend sends listener addresses as plain strings inside
/// push-event payloads and the listener configuration. A wrapper object would never match.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[serde(transparent)]`.
#[test]
fn given_listener_key_when_serialized_then_is_plain_string() {
    // GIVEN: A listener key
    let key = ListenerKey::from("127.0.0.1:8080");

    // WHEN: Serializing and deserializing
    let json = serde_json::to_string(&key).unwrap();
    let back: ListenerKey = serde_json::from_str("\"127.0.0.1:8080\"").unwrap();

    // THEN: Wire form is the address itself
    assert_eq!(json, "\"127.0.0.1:8080\"");
    assert_eq!(back, key);
}

/// **VALUE**: Verifies byte-exact comparison and map lookup by `&str`.
///
/// **WHY THIS MATTERS**: Controllers are looked up by the address typed in the console;
/// `Borrow<str>` must agree with `Hash`/`Eq`.
///
/// **BUG THIS CATCHES**: Would catch normalisation (trimming, lowercasing) sneaking in,
/// which would make `localhost:80` and `LOCALHOST:80` collide.
#[test]
fn given_keys_when_compared_then_exact_match_only() {
    // GIVEN: A map keyed by ListenerKey
    let mut map = HashMap::new();
    map.insert(ListenerKey::from("localhost:80"), 1);

    // THEN: Lookup by &str works, near-misses do not
    assert_eq!(map.get("localhost:80"), Some(&1));
    assert_eq!(map.get("LOCALHOST:80"), None);
    assert_ne!(ListenerKey::from("localhost:80"), ListenerKey::from("localhost:80 "));
    assert!(ListenerKey::from("a") == "a");
}
