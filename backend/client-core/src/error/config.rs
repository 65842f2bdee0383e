use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

/// Failures around the client's `config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Client Config Error: cannot read {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Client Config Error: {path} is not a valid client config: {reason} {location}")]
    Parse {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Client Config Error: cannot write {path}: {source} {location}")]
    Write {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Client Config Error: cannot encode the client config: {reason} {location}")]
    Serialize {
        location: ErrorLocation,
        reason: String,
    },

    /// `field` is the dotted JSON path, e.g. `ipc.url`.
    #[error("Client Config Error: `{field}` = {value}: {reason} {location}")]
    InvalidField {
        location: ErrorLocation,
        field: &'static str,
        value: String,
        reason: String,
    },
}
