//! First connection to the backend, retried with exponential backoff.

use crate::error::PhantomError;

use client_core::config::IpcSettings;
use client_core::ipc::{PushEventStream, WsBridge};

use common::ErrorLocation;

use std::panic::Location;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{info, warn};
use tokio::time::sleep as TokioSleep;

/// Connect to the backend at `settings.url`.
///
/// The backend may still be starting when the client launches, so failed
/// attempts are retried until `connect_attempts_max_secs` have elapsed.
///
/// # Errors
///
/// Returns [`PhantomError::Core`] with the last connection error once the
/// retry budget is spent.
pub async fn connect_with_retry(
    settings: &IpcSettings,
) -> Result<(WsBridge, PushEventStream), PhantomError> {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(settings.connect_attempts_max()),
        ..Default::default()
    };

    info!("Connecting to backend at {}", settings.url);

    loop {
        let error = match WsBridge::connect(&settings.url, settings.request_timeout()).await {
            Ok(connected) => return Ok(connected),
            Err(e) => e,
        };

        match backoff.next_backoff() {
            Some(duration) => {
                warn!(
                    "Backend not reachable ({}), retrying after {duration:?}",
                    error.message()
                );
                TokioSleep(duration).await;
            }
            None => {
                return Err(PhantomError::Core {
                    message: format!(
                        "Backend at {} not reachable within {:?}: {}",
                        settings.url,
                        settings.connect_attempts_max(),
                        error.message()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }
}
