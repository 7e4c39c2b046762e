//! Client configuration.
//!
//! A [`Conf`] describes which project/environment pair the client follows, how
//! to reach the authority and how the local cache behaves. It can be built in
//! code or loaded from a TOML file and is normalized once when a
//! [`Client`](crate::client::Client) is constructed.

mod paths;

#[cfg(test)]
mod tests;

pub use paths::CachePaths;

use std::{fs, path::Path, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{RccError, Result};

/// Default polling interval for version checks, in seconds.
pub const DEFAULT_CALLBACK_INTERVAL_SECS: u64 = 60;

/// Default timeout applied to every request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default directory for the persisted cache snapshot.
pub const DEFAULT_CACHE_DIR: &str = ".rcc-cache";

/// Default version line followed by the client.
pub const DEFAULT_VERSION_NAME: &str = "default";

/// Settings for one project/environment binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Conf {
    /// Base URL of the authority, e.g. `http://rcc.internal:8080`.
    pub server_url: String,

    /// Project whose configuration is synchronized.
    pub project_name: String,

    /// Environment inside the project.
    pub env_name: String,

    /// Credential presented with every request.
    pub api_password: String,

    /// Named version line whose active version the client follows.
    pub version_name: String,

    /// Start the background poller and deliver change events.
    pub enable_callback: bool,

    /// Seconds between two version checks.
    pub callback_interval_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Persist every applied snapshot and fall back to it at startup.
    pub enable_cache: bool,

    /// Directory holding the persisted snapshots.
    pub cache_dir: String,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            project_name: String::new(),
            env_name: String::new(),
            api_password: String::new(),
            version_name: DEFAULT_VERSION_NAME.to_string(),
            enable_callback: false,
            callback_interval_secs: DEFAULT_CALLBACK_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            enable_cache: false,
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
        }
    }
}

impl Conf {
    /// Loads a configuration from a TOML file.
    ///
    /// Missing fields take their defaults; the result is not yet normalized.
    ///
    /// # Errors
    /// * `RccError::Io` - If the file cannot be read
    /// * `RccError::TomlParse` - If the content is not a valid `Conf`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RccError::Io {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| RccError::TomlParse {
            location: path.to_string_lossy().to_string(),
            details: e.to_string(),
        })
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    /// Returns `RccError::TomlParse` if the content is not a valid `Conf`.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RccError::TomlParse {
            location: "string".to_string(),
            details: e.to_string(),
        })
    }

    /// Validates the settings and fills in defaults.
    ///
    /// Trims whitespace everywhere and the trailing `/` of the server URL.
    /// An empty cache directory is replaced by [`DEFAULT_CACHE_DIR`].
    ///
    /// # Errors
    /// Returns `RccError::InvalidConfig` naming the first offending field.
    pub fn normalize(mut self) -> Result<Self> {
        self.server_url = self.server_url.trim().trim_end_matches('/').to_string();
        self.project_name = self.project_name.trim().to_string();
        self.env_name = self.env_name.trim().to_string();
        self.api_password = self.api_password.trim().to_string();
        self.version_name = self.version_name.trim().to_string();
        self.cache_dir = self.cache_dir.trim().to_string();

        if self.server_url.is_empty() {
            return Err(RccError::invalid_config("server_url", "must not be empty"));
        }
        let url = Url::parse(&self.server_url)
            .map_err(|e| RccError::invalid_config("server_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RccError::invalid_config(
                "server_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        require_non_empty("project_name", &self.project_name)?;
        require_non_empty("env_name", &self.env_name)?;
        require_non_empty("api_password", &self.api_password)?;
        require_non_empty("version_name", &self.version_name)?;
        require_file_name_safe("project_name", &self.project_name)?;
        require_file_name_safe("env_name", &self.env_name)?;

        if self.callback_interval_secs == 0 {
            return Err(RccError::invalid_config(
                "callback_interval_secs",
                "must be at least 1 second",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(RccError::invalid_config(
                "request_timeout_secs",
                "must be at least 1 second",
            ));
        }

        if self.cache_dir.is_empty() {
            self.cache_dir = DEFAULT_CACHE_DIR.to_string();
        }

        Ok(self)
    }

    /// Interval between two version checks.
    pub fn callback_interval(&self) -> Duration {
        Duration::from_secs(self.callback_interval_secs)
    }

    /// Timeout applied to each request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache file locations for this binding.
    pub fn cache_paths(&self) -> CachePaths {
        CachePaths::new(&self.cache_dir, &self.project_name, &self.env_name)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RccError::invalid_config(field, "must not be empty"));
    }
    Ok(())
}

// Both names end up inside the snapshot file name.
fn require_file_name_safe(field: &str, value: &str) -> Result<()> {
    if value.contains(['/', '\\', '\0']) || value.contains("..") {
        return Err(RccError::invalid_config(
            field,
            "must not contain path separators or '..'",
        ));
    }
    Ok(())
}
