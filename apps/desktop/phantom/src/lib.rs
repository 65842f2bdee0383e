// Library exports for testing
// The binary (main.rs) imports these as well

pub mod connect;
pub mod console;
pub mod error;
pub mod logger;
pub mod panel;

#[cfg(test)]
mod tests;

/// Directory under the platform config dir holding config and logs.
pub const APP_DIR_NAME: &str = "phantom";
