use std::{path::PathBuf, result};

use thiserror::Error;

/// Errors produced by the configuration client.
///
/// Variants fall into four groups: configuration errors detected while
/// normalizing [`Conf`](crate::config::Conf), transport errors raised while
/// talking to the authority, persistence errors on the local cache file and
/// lifecycle errors returned by [`Client`](crate::client::Client).
#[derive(Error, Debug)]
pub enum RccError {
    /// A configuration field is missing or invalid
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfig {
        /// The offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Failed to parse a TOML configuration source
    #[error("failed to parse TOML from {location}: {details}")]
    TomlParse {
        /// Location of the TOML (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// The authority could not be reached or answered with an error status
    #[error("request to '{url}' failed: {details}")]
    Transport {
        /// Requested URL, credentials stripped
        url: String,
        /// Transport error details
        details: String,
    },

    /// The authority answered but the body could not be decoded
    #[error("failed to decode response from '{url}': {details}")]
    Decode {
        /// Requested URL, credentials stripped
        url: String,
        /// Decoding error details
        details: String,
    },

    /// Writing the cache snapshot to disk failed
    #[error("failed to persist cache to '{path}': {details}")]
    Persistence {
        /// Target path of the write
        path: PathBuf,
        /// Error details from the persistence operation
        details: String,
    },

    /// Reading the cache snapshot from disk failed
    #[error("I/O error on '{path}': {details}")]
    Io {
        /// Path where the I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// A snapshot could not be serialized or deserialized
    #[error("failed to serialize {content_type}: {details}")]
    Serialization {
        /// Kind of content being processed
        content_type: String,
        /// Serialization error details
        details: String,
    },

    /// `start()` was called while a previous start/stop cycle is still active
    #[error("client is already running")]
    AlreadyRunning,

    /// A live subscriber already owns the change stream
    #[error("change stream already has a subscriber")]
    AlreadySubscribed,
}

/// A specialized `Result` type for client operations.
pub type Result<T> = result::Result<T, RccError>;

impl RccError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        RccError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures talking to the authority.
    pub fn is_transport(&self) -> bool {
        matches!(self, RccError::Transport { .. } | RccError::Decode { .. })
    }
}
