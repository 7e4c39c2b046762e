//! Access to the configuration authority.
//!
//! The client only depends on the [`Requester`] trait; [`HttpRequester`] is
//! the default implementation speaking JSON over HTTP.

mod endpoints;
mod http;

#[cfg(test)]
mod tests;

pub use endpoints::Endpoints;
pub use http::HttpRequester;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Identifier of a configuration version published by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub i64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One configuration entry as returned by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Configuration key.
    pub key: String,
    /// Raw value text.
    pub value: String,
}

impl Item {
    /// Creates an item.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Answer of the version-check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Currently active version.
    pub version_id: VersionId,
}

/// Fetches version information and key/value sets from the authority.
///
/// Implementations are bound to a single project/environment pair.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Returns the version currently active for the bound version line.
    ///
    /// # Errors
    /// Returns a transport or decode error when the authority cannot answer.
    async fn active_version(&self) -> Result<VersionId>;

    /// Returns the full key/value list of `version`.
    ///
    /// # Errors
    /// Returns a transport or decode error when the authority cannot answer.
    async fn items(&self, version: VersionId) -> Result<Vec<Item>>;
}
