//! Forwarder identity.

use std::borrow::Borrow;
use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// Local listen address identifying one forwarder (e.g. `127.0.0.1:8080`).
///
/// The value is opaque: it is compared byte-for-byte and never parsed. It is
/// both the payload of per-forwarder push-events and the lookup key into the
/// backend's listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerKey(String);

impl ListenerKey {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ListenerKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ListenerKey {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for ListenerKey {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl Borrow<str> for ListenerKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ListenerKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ListenerKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
