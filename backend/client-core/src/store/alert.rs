//! Single user-visible message surface.

use std::sync::{Arc, PoisonError, RwLock};

use log::{error, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

/// Holds the alert currently on screen, if any.
///
/// Showing an alert replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    current: Arc<RwLock<Option<Alert>>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, level: AlertLevel, message: impl Into<String>) {
        let message = message.into();

        match level {
            AlertLevel::Error => error!("Alert: {message}"),
            AlertLevel::Warning => warn!("Alert: {message}"),
            AlertLevel::Info | AlertLevel::Success => info!("Alert: {message}"),
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Alert { level, message });
    }

    pub fn hide(&self) {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn current(&self) -> Option<Alert> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
