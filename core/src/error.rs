//! Error taxonomy for the timer core.
//!
//! Each type is local to one failure domain so callers can decide how far it
//! propagates: a bad notification is dropped, a bad request is rejected, a
//! persistence failure is logged and retried at the next snapshot point.

use std::path::PathBuf;

use thiserror::Error;

/// A raw feed notification could not be turned into a grant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("{kind} notification is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("bits cheer has a negative amount ({0})")]
    NegativeBits(i64),
}

/// Reading or writing the snapshot file failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read snapshot {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write snapshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("snapshot {path:?} is not valid: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to replace snapshot {path:?}: {source}")]
    Replace {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// A write request carried an invalid payload. Authoritative state is untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid `{field}`: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl RequestError {
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }
}

/// The process configuration file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] confy::ConfyError),
    #[error("invalid grant config: {0}")]
    InvalidGrants(String),
}

impl From<ConfigError> for RequestError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidGrants(reason) => RequestError::Malformed {
                field: "config",
                reason,
            },
            other => RequestError::Malformed {
                field: "config",
                reason: other.to_string(),
            },
        }
    }
}
